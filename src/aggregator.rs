// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Asset Aggregation
//!
//! Turns one per-chain balance snapshot into a single USD-valued view.
//!
//! ## Degradation Policy
//!
//! A chain that fails to respond, or a token that cannot be priced, never
//! blanks out the rest of the portfolio. Such entries are kept with a zero
//! value and a [`BalanceFlag`] saying why:
//!
//! | Flag | Meaning |
//! |------|---------|
//! | `Priced` | Amount and price known |
//! | `ConfirmedZero` | The chain reported a zero balance |
//! | `Unpriced` | Non-zero amount, but the price is missing or unusable |
//! | `ChainUnavailable` | The chain could not be queried at all |
//!
//! `ConfirmedZero` and `Unpriced` are never conflated: a zero amount is
//! only ever reported as `ConfirmedZero`.
//!
//! Every supported chain appears at least once in the output, and
//! `total_value_usd` is always the exact sum of the entry values.

use std::collections::HashMap;
use std::str::FromStr;

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::amount::{format_amount, parse_amount, UsdValue, PRICE_DECIMALS};
use crate::chains::{ChainId, TokenType, SUPPORTED_CHAINS};
use crate::models::OwnerAddress;

// =============================================================================
// Raw Snapshot
// =============================================================================

/// One token balance as reported by the relayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTokenBalance {
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Balance in base units, as a decimal integer string
    pub amount: String,
    pub decimals: u8,
    /// Unit price in USD as a decimal string, if the relayer could price it
    #[serde(default)]
    pub price_usd: Option<String>,
}

impl RawTokenBalance {
    pub fn new(
        token_type: TokenType,
        amount: impl Into<String>,
        price_usd: Option<&str>,
    ) -> Self {
        Self {
            token_type,
            amount: amount.into(),
            decimals: token_type.decimals(),
            price_usd: price_usd.map(str::to_string),
        }
    }
}

/// Result of querying one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBalances {
    pub chain: ChainId,
    /// `Err` carries the reason the chain could not be queried.
    pub result: Result<Vec<RawTokenBalance>, String>,
}

/// All chains' balances, obtained in one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSnapshot {
    pub owner: OwnerAddress,
    pub project_id: String,
    pub fetched_at: DateTime<Utc>,
    pub chains: Vec<ChainBalances>,
}

// =============================================================================
// Aggregated View
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceFlag {
    Priced,
    ConfirmedZero,
    Unpriced,
    ChainUnavailable,
}

impl BalanceFlag {
    pub fn is_degraded(&self) -> bool {
        matches!(self, BalanceFlag::Unpriced | BalanceFlag::ChainUnavailable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceEntry {
    pub chain_id: ChainId,
    pub token_type: TokenType,
    /// Human-readable amount
    pub amount: String,
    pub value_usd: UsdValue,
    pub flag: BalanceFlag,
}

/// Portfolio view across all supported chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedAssets {
    pub owner: OwnerAddress,
    pub fetched_at: DateTime<Utc>,
    pub total_value_usd: UsdValue,
    pub per_chain_balances: Vec<BalanceEntry>,
}

impl AggregatedAssets {
    /// Whether any entry could not be valued.
    pub fn is_degraded(&self) -> bool {
        self.per_chain_balances.iter().any(|e| e.flag.is_degraded())
    }

    /// Entries for one chain, in reported order.
    pub fn chain_entries(&self, chain: ChainId) -> impl Iterator<Item = &BalanceEntry> {
        self.per_chain_balances
            .iter()
            .filter(move |e| e.chain_id == chain)
    }
}

// =============================================================================
// Aggregator
// =============================================================================

/// Stateless merge of a balance snapshot into [`AggregatedAssets`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetAggregator;

impl AssetAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate one snapshot. Output chains follow [`SUPPORTED_CHAINS`]
    /// order; a chain missing from the snapshot counts as unavailable.
    pub fn aggregate(&self, snapshot: &AssetSnapshot) -> AggregatedAssets {
        let mut by_chain: HashMap<ChainId, &Result<Vec<RawTokenBalance>, String>> =
            HashMap::new();
        for chain in &snapshot.chains {
            by_chain.entry(chain.chain).or_insert(&chain.result);
        }

        let mut total = UsdValue::ZERO;
        let mut entries = Vec::new();

        for chain in SUPPORTED_CHAINS {
            match by_chain.get(&chain) {
                Some(Ok(tokens)) if tokens.is_empty() => {
                    entries.push(placeholder(chain, BalanceFlag::ConfirmedZero));
                }
                Some(Ok(tokens)) => {
                    for raw in tokens {
                        let mut entry = value_entry(chain, raw);
                        match total.checked_add(entry.value_usd) {
                            Some(sum) => total = sum,
                            None => {
                                warn!(chain = %chain, token = %raw.token_type, "USD total overflow");
                                entry.value_usd = UsdValue::ZERO;
                                entry.flag = BalanceFlag::Unpriced;
                            }
                        }
                        entries.push(entry);
                    }
                }
                Some(Err(reason)) => {
                    warn!(chain = %chain, reason = %reason, "Chain balances unavailable");
                    entries.push(placeholder(chain, BalanceFlag::ChainUnavailable));
                }
                None => {
                    warn!(chain = %chain, "Chain missing from balance snapshot");
                    entries.push(placeholder(chain, BalanceFlag::ChainUnavailable));
                }
            }
        }

        let assets = AggregatedAssets {
            owner: snapshot.owner,
            fetched_at: snapshot.fetched_at,
            total_value_usd: total,
            per_chain_balances: entries,
        };

        debug!(
            owner = %assets.owner,
            total_usd = %assets.total_value_usd,
            entries = assets.per_chain_balances.len(),
            degraded = assets.is_degraded(),
            "Aggregated assets"
        );

        assets
    }
}

fn placeholder(chain: ChainId, flag: BalanceFlag) -> BalanceEntry {
    BalanceEntry {
        chain_id: chain,
        token_type: chain.native_token(),
        amount: "0".to_string(),
        value_usd: UsdValue::ZERO,
        flag,
    }
}

fn value_entry(chain: ChainId, raw: &RawTokenBalance) -> BalanceEntry {
    let unpriced = |amount: String| BalanceEntry {
        chain_id: chain,
        token_type: raw.token_type,
        amount,
        value_usd: UsdValue::ZERO,
        flag: BalanceFlag::Unpriced,
    };

    let Ok(amount) = U256::from_str(raw.amount.trim()) else {
        warn!(chain = %chain, token = %raw.token_type, amount = %raw.amount, "Malformed balance amount");
        return unpriced(raw.amount.clone());
    };
    let display = format_amount(amount, raw.decimals);

    if amount.is_zero() {
        return BalanceEntry {
            chain_id: chain,
            token_type: raw.token_type,
            amount: display,
            value_usd: UsdValue::ZERO,
            flag: BalanceFlag::ConfirmedZero,
        };
    }

    let price = raw
        .price_usd
        .as_deref()
        .and_then(|p| parse_amount(p, PRICE_DECIMALS).ok());

    match price.and_then(|p| UsdValue::of_tokens(amount, raw.decimals, p)) {
        Some(value_usd) => BalanceEntry {
            chain_id: chain,
            token_type: raw.token_type,
            amount: display,
            value_usd,
            flag: BalanceFlag::Priced,
        },
        None => {
            debug!(chain = %chain, token = %raw.token_type, price = ?raw.price_usd, "Token left unpriced");
            unpriced(display)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::owner_a;

    fn snapshot(chains: Vec<ChainBalances>) -> AssetSnapshot {
        AssetSnapshot {
            owner: owner_a(),
            project_id: "demo".into(),
            fetched_at: Utc::now(),
            chains,
        }
    }

    fn all_empty() -> Vec<ChainBalances> {
        SUPPORTED_CHAINS
            .iter()
            .map(|&chain| ChainBalances {
                chain,
                result: Ok(vec![]),
            })
            .collect()
    }

    fn set_chain(chains: &mut [ChainBalances], chain: ChainId, result: Result<Vec<RawTokenBalance>, String>) {
        if let Some(entry) = chains.iter_mut().find(|c| c.chain == chain) {
            entry.result = result;
        }
    }

    fn sum(assets: &AggregatedAssets) -> UsdValue {
        assets
            .per_chain_balances
            .iter()
            .fold(UsdValue::ZERO, |acc, e| acc.checked_add(e.value_usd).unwrap())
    }

    #[test]
    fn empty_account_lists_every_chain() {
        let assets = AssetAggregator::new().aggregate(&snapshot(all_empty()));

        assert!(assets.total_value_usd.is_zero());
        assert_eq!(assets.per_chain_balances.len(), SUPPORTED_CHAINS.len());
        assert!(assets
            .per_chain_balances
            .iter()
            .all(|e| e.flag == BalanceFlag::ConfirmedZero));
        assert!(!assets.is_degraded());
    }

    #[test]
    fn priced_tokens_sum_exactly() {
        let mut chains = all_empty();
        set_chain(
            &mut chains,
            ChainId::ArbitrumMainnet,
            Ok(vec![
                // 1.5 USDC at $1
                RawTokenBalance::new(TokenType::Usdc, "1500000", Some("1")),
                // 0.01 ETH at $3000.25
                RawTokenBalance::new(TokenType::Eth, "10000000000000000", Some("3000.25")),
            ]),
        );
        set_chain(
            &mut chains,
            ChainId::SolanaMainnet,
            // 2 SOL at $150.123456
            Ok(vec![RawTokenBalance::new(TokenType::Sol, "2000000000", Some("150.123456"))]),
        );

        let assets = AssetAggregator::new().aggregate(&snapshot(chains));

        assert_eq!(assets.total_value_usd, UsdValue::parse("331.749412").unwrap());
        assert_eq!(assets.total_value_usd, sum(&assets));

        let arbitrum: Vec<_> = assets.chain_entries(ChainId::ArbitrumMainnet).collect();
        assert_eq!(arbitrum.len(), 2);
        assert_eq!(arbitrum[0].amount, "1.5");
        assert_eq!(arbitrum[0].value_usd, UsdValue::parse("1.5").unwrap());
        assert_eq!(arbitrum[1].amount, "0.01");
        assert_eq!(arbitrum[1].value_usd, UsdValue::parse("30.0025").unwrap());
    }

    #[test]
    fn failed_chain_does_not_blank_portfolio() {
        let mut chains = all_empty();
        set_chain(
            &mut chains,
            ChainId::BaseMainnet,
            Ok(vec![RawTokenBalance::new(TokenType::Usdc, "2000000", Some("1"))]),
        );
        set_chain(&mut chains, ChainId::SolanaMainnet, Err("rpc timeout".into()));

        let assets = AssetAggregator::new().aggregate(&snapshot(chains));

        assert_eq!(assets.total_value_usd, UsdValue::parse("2").unwrap());
        assert_eq!(assets.total_value_usd, sum(&assets));
        assert!(assets.is_degraded());

        let solana: Vec<_> = assets.chain_entries(ChainId::SolanaMainnet).collect();
        assert_eq!(solana.len(), 1);
        assert_eq!(solana[0].flag, BalanceFlag::ChainUnavailable);
        assert_eq!(solana[0].token_type, TokenType::Sol);
        assert!(solana[0].value_usd.is_zero());
    }

    #[test]
    fn missing_chain_is_unavailable() {
        let chains = all_empty()
            .into_iter()
            .filter(|c| c.chain != ChainId::LineaMainnet)
            .collect();

        let assets = AssetAggregator::new().aggregate(&snapshot(chains));
        assert_eq!(assets.per_chain_balances.len(), SUPPORTED_CHAINS.len());
        let linea: Vec<_> = assets.chain_entries(ChainId::LineaMainnet).collect();
        assert_eq!(linea[0].flag, BalanceFlag::ChainUnavailable);
    }

    #[test]
    fn unpriced_is_distinct_from_zero() {
        let mut chains = all_empty();
        set_chain(
            &mut chains,
            ChainId::PolygonMainnet,
            Ok(vec![
                RawTokenBalance::new(TokenType::Pol, "5000000000000000000", None),
                RawTokenBalance::new(TokenType::Usdt, "3000000", Some("not-a-price")),
                RawTokenBalance::new(TokenType::Usdc, "0", None),
                RawTokenBalance::new(TokenType::Eth, "12abc", Some("3000")),
            ]),
        );

        let assets = AssetAggregator::new().aggregate(&snapshot(chains));
        let flags: Vec<_> = assets
            .chain_entries(ChainId::PolygonMainnet)
            .map(|e| e.flag)
            .collect();

        assert_eq!(
            flags,
            vec![
                BalanceFlag::Unpriced,
                BalanceFlag::Unpriced,
                BalanceFlag::ConfirmedZero,
                BalanceFlag::Unpriced,
            ]
        );
        assert!(assets.total_value_usd.is_zero());
        assert!(assets.is_degraded());
    }

    #[test]
    fn duplicate_chain_uses_first_result() {
        let mut chains = all_empty();
        chains.insert(
            0,
            ChainBalances {
                chain: ChainId::EthereumMainnet,
                result: Ok(vec![RawTokenBalance::new(TokenType::Usdc, "1000000", Some("1"))]),
            },
        );

        let assets = AssetAggregator::new().aggregate(&snapshot(chains));
        assert_eq!(assets.total_value_usd, UsdValue::parse("1").unwrap());
        assert_eq!(assets.chain_entries(ChainId::EthereumMainnet).count(), 1);
    }

    #[test]
    fn wire_format_of_entries() {
        let assets = AssetAggregator::new().aggregate(&snapshot(all_empty()));
        let json = serde_json::to_value(&assets.per_chain_balances[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "chainId": 1,
                "tokenType": "ETH",
                "amount": "0",
                "valueUsd": "0",
                "flag": "confirmed_zero"
            })
        );
    }
}
