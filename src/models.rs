// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! Value types shared by the session, the account client and the
//! transaction orchestrator.
//!
//! ## Owner Address Type
//!
//! The [`OwnerAddress`] newtype wraps an EVM address (0x-prefixed, 40 hex
//! characters). Mixed-case input must carry a valid EIP-55 checksum;
//! all-lowercase or all-uppercase input is accepted as unchecksummed. It is
//! always displayed checksummed.
//!
//! ## Transaction Lifecycle
//!
//! `ConvertIntent` -> [`PreparedTransaction`] (built) -> [`SignedSubmission`]
//! (signed) -> [`SubmissionResult`] (submitted). Settlement is reported by
//! [`SettlementStatus`].

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chains::{ChainId, TokenType};
use crate::error::UaError;

// =============================================================================
// Owner Address Type
// =============================================================================

/// Address of the externally-owned key that controls the universal account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerAddress(Address);

impl OwnerAddress {
    /// Parse an owner address, enforcing the checksum on mixed-case input.
    pub fn parse(raw: &str) -> Result<Self, UaError> {
        let raw = raw.trim();
        let hex_part = raw
            .strip_prefix("0x")
            .ok_or_else(|| UaError::InvalidAddress(format!("`{raw}` is missing the 0x prefix")))?;

        if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(UaError::InvalidAddress(format!(
                "`{raw}` is not 20 hex-encoded bytes"
            )));
        }

        let address = Address::from_str(raw)
            .map_err(|e| UaError::InvalidAddress(format!("`{raw}`: {e}")))?;

        let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum(None) != raw {
            return Err(UaError::InvalidAddress(format!("`{raw}` has an invalid checksum")));
        }

        Ok(OwnerAddress(address))
    }

    pub fn from_address(address: Address) -> Self {
        OwnerAddress(address)
    }

    pub fn address(&self) -> Address {
        self.0
    }
}

impl fmt::Display for OwnerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_checksum(None))
    }
}

impl TryFrom<String> for OwnerAddress {
    type Error = UaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        OwnerAddress::parse(&value)
    }
}

impl FromStr for OwnerAddress {
    type Err = UaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OwnerAddress::parse(s)
    }
}

impl From<OwnerAddress> for String {
    fn from(value: OwnerAddress) -> Self {
        value.to_string()
    }
}

// =============================================================================
// Account Configuration and Derived Addresses
// =============================================================================

/// Maximum accepted slippage (100%).
pub const MAX_SLIPPAGE_BPS: u32 = 10_000;

/// Trade options applied to every transaction built for a universal account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeConfig {
    /// Pay network fees from the aggregated balance instead of the
    /// destination chain's native token.
    #[serde(rename = "universalGas")]
    pub universal_gas_enabled: bool,
    /// Maximum acceptable price slippage in basis points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u32>,
}

impl TradeConfig {
    pub fn new(universal_gas_enabled: bool, slippage_bps: Option<u32>) -> Result<Self, UaError> {
        let config = Self {
            universal_gas_enabled,
            slippage_bps,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), UaError> {
        match self.slippage_bps {
            Some(bps) if bps > MAX_SLIPPAGE_BPS => Err(UaError::InvalidTradeConfig(format!(
                "slippage of {bps} bps exceeds {MAX_SLIPPAGE_BPS} bps"
            ))),
            _ => Ok(()),
        }
    }
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            universal_gas_enabled: true,
            slippage_bps: None,
        }
    }
}

/// Per-chain smart account addresses derived from one owner and project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartAccountAddresses {
    pub owner_address: OwnerAddress,
    /// Smart account used on every EVM chain
    #[serde(rename = "smartAccountAddress")]
    pub evm_address: String,
    /// Smart account used on Solana
    #[serde(rename = "solanaSmartAccountAddress")]
    pub solana_address: String,
}

// =============================================================================
// Transactions
// =============================================================================

/// Token and amount the user wants to end up with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectToken {
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Human-readable decimal amount, e.g. `"1"` or `"0.5"`
    pub amount: String,
}

/// Desired outcome of a convert transaction. Not yet authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertIntent {
    pub expect_token: ExpectToken,
    /// Raw chain id; validated when the transaction is built.
    #[serde(rename = "chainId")]
    pub destination_chain_id: u64,
}

impl ConvertIntent {
    pub fn new(token_type: TokenType, amount: impl Into<String>, destination: ChainId) -> Self {
        Self {
            expect_token: ExpectToken {
                token_type,
                amount: amount.into(),
            },
            destination_chain_id: destination.id(),
        }
    }
}

/// Transaction as produced by the relayer's builder.
///
/// `root_hash` commits to `payload`; the pair is only meaningful together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTransaction {
    pub root_hash: B256,
    pub payload: Bytes,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A built transaction bound to the account and session it was built for.
///
/// Immutable: there is no way to alter the payload after the root hash was
/// computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransaction {
    built: BuiltTransaction,
    intent: ConvertIntent,
    owner: OwnerAddress,
    project_id: String,
    session_epoch: u64,
    handle_id: u64,
}

impl PreparedTransaction {
    pub(crate) fn new(
        built: BuiltTransaction,
        intent: ConvertIntent,
        owner: OwnerAddress,
        project_id: String,
        session_epoch: u64,
        handle_id: u64,
    ) -> Self {
        Self {
            built,
            intent,
            owner,
            project_id,
            session_epoch,
            handle_id,
        }
    }

    /// The exact bytes that must be signed.
    pub fn root_hash(&self) -> &[u8] {
        self.built.root_hash.as_slice()
    }

    pub fn root_hash_hex(&self) -> String {
        alloy::hex::encode_prefixed(self.built.root_hash)
    }

    pub fn payload(&self) -> &[u8] {
        &self.built.payload
    }

    pub fn intent(&self) -> &ConvertIntent {
        &self.intent
    }

    pub fn owner(&self) -> &OwnerAddress {
        &self.owner
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.built.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.built.expires_at
    }

    pub fn session_epoch(&self) -> u64 {
        self.session_epoch
    }

    pub fn handle_id(&self) -> u64 {
        self.handle_id
    }
}

/// A prepared transaction with the owner's signature over its root hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSubmission {
    transaction: PreparedTransaction,
    signature: Bytes,
}

impl SignedSubmission {
    pub(crate) fn new(transaction: PreparedTransaction, signature: Bytes) -> Self {
        Self {
            transaction,
            signature,
        }
    }

    /// Pair a transaction with an externally obtained signature.
    ///
    /// Nothing checks the signature here; the relayer verifies it on submit.
    pub fn from_parts(transaction: PreparedTransaction, signature: impl Into<Bytes>) -> Self {
        Self::new(transaction, signature.into())
    }

    pub fn transaction(&self) -> &PreparedTransaction {
        &self.transaction
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn signature_hex(&self) -> String {
        alloy::hex::encode_prefixed(&self.signature)
    }
}

/// Relayer acknowledgement of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
}

/// Returned once the relayer has queued a signed transaction.
///
/// Does not imply on-chain settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    /// Opaque, stable identifier used for settlement tracking
    pub transaction_id: String,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionResult {
    pub fn explorer_url(&self) -> String {
        format!(
            "https://universalx.app/activity/details?id={}",
            self.transaction_id
        )
    }
}

/// Settlement state reported by the relayer for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SettlementStatus {
    Submitted,
    Confirmed,
    Failed(String),
}

impl SettlementStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SettlementStatus::Submitted)
    }
}
