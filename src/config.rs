// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. The project id
//! is required and checked first, so a missing id fails fast before any
//! wallet or network activity.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `UA_PROJECT_ID` | Universal account project identifier | Required |
//! | `UA_UNIVERSAL_GAS` | Pay fees from the aggregated balance | `true` |
//! | `UA_SLIPPAGE_BPS` | Max slippage in basis points (0-10000) | Unset |
//! | `UA_RELAYER_URL` | HTTP relayer base URL | Unset (simulated relayer) |
//! | `UA_RELAYER_TIMEOUT_SECS` | HTTP relayer timeout | `15` |
//! | `OWNER_PRIVATE_KEY` | Hex owner key for the local wallet | Unset |
//! | `OWNER_PRIVATE_KEY_PEM_PATH` | PEM owner key file | Unset |
//! | `UA_CONVERT_AMOUNT` | USDC amount to convert to Solana in the demo flow | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::UaError;
use crate::logging::LogFormat;
use crate::models::TradeConfig;

pub const PROJECT_ID_ENV: &str = "UA_PROJECT_ID";
pub const UNIVERSAL_GAS_ENV: &str = "UA_UNIVERSAL_GAS";
pub const SLIPPAGE_BPS_ENV: &str = "UA_SLIPPAGE_BPS";
pub const RELAYER_URL_ENV: &str = "UA_RELAYER_URL";
pub const RELAYER_TIMEOUT_ENV: &str = "UA_RELAYER_TIMEOUT_SECS";
pub const OWNER_KEY_ENV: &str = "OWNER_PRIVATE_KEY";
pub const OWNER_KEY_PEM_PATH_ENV: &str = "OWNER_PRIVATE_KEY_PEM_PATH";
pub const CONVERT_AMOUNT_ENV: &str = "UA_CONVERT_AMOUNT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_RELAYER_TIMEOUT_SECS: u64 = 15;

/// Where the local wallet gets its owner key from.
#[derive(Clone, PartialEq, Eq)]
pub enum OwnerKeySource {
    Hex(String),
    PemPath(PathBuf),
}

impl fmt::Debug for OwnerKeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerKeySource::Hex(_) => f.write_str("Hex(<redacted>)"),
            OwnerKeySource::PemPath(path) => f.debug_tuple("PemPath").field(path).finish(),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub project_id: String,
    pub trade_config: TradeConfig,
    /// `None` selects the in-process simulated relayer.
    pub relayer_url: Option<Url>,
    pub relayer_timeout: Duration,
    /// `None` means no wallet capability is available.
    pub owner_key: Option<OwnerKeySource>,
    pub convert_amount: Option<String>,
    pub log_format: LogFormat,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, UaError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, UaError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let project_id = get(PROJECT_ID_ENV).ok_or(UaError::MissingProjectId)?;

        let universal_gas_enabled = match get(UNIVERSAL_GAS_ENV) {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                UaError::InvalidTradeConfig(format!("{UNIVERSAL_GAS_ENV}=`{raw}` is not a boolean"))
            })?,
            None => true,
        };

        let slippage_bps = get(SLIPPAGE_BPS_ENV)
            .map(|raw| {
                raw.parse::<u32>().map_err(|_| {
                    UaError::InvalidTradeConfig(format!(
                        "{SLIPPAGE_BPS_ENV}=`{raw}` is not a non-negative integer"
                    ))
                })
            })
            .transpose()?;

        let trade_config = TradeConfig::new(universal_gas_enabled, slippage_bps)?;

        let relayer_url = get(RELAYER_URL_ENV)
            .map(|raw| {
                raw.parse::<Url>().map_err(|e| {
                    UaError::NetworkError(format!("{RELAYER_URL_ENV}=`{raw}` is not a URL: {e}"))
                })
            })
            .transpose()?;

        let relayer_timeout = get(RELAYER_TIMEOUT_ENV)
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_RELAYER_TIMEOUT_SECS));

        let owner_key = get(OWNER_KEY_ENV)
            .map(OwnerKeySource::Hex)
            .or_else(|| get(OWNER_KEY_PEM_PATH_ENV).map(|p| OwnerKeySource::PemPath(p.into())));

        let log_format = get(LOG_FORMAT_ENV)
            .map(|raw| LogFormat::from_name(&raw))
            .unwrap_or_default();

        Ok(Self {
            project_id,
            trade_config,
            relayer_url,
            relayer_timeout,
            owner_key,
            convert_amount: get(CONVERT_AMOUNT_ENV),
            log_format,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
