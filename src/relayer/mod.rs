// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Universal account relayer network.
//!
//! The relayer derives smart accounts, reports balances, builds intent
//! transactions and executes signed submissions. Two implementations:
//! - [`HttpRelayer`]: JSON over HTTP
//! - [`SimulatedRelayer`]: in-process, deterministic, scriptable

pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::aggregator::AssetSnapshot;
use crate::error::UaError;
use crate::models::{
    BuiltTransaction, ConvertIntent, OwnerAddress, SettlementStatus, SignedSubmission,
    SmartAccountAddresses, SubmissionResult, TradeConfig,
};

pub use http::HttpRelayer;
pub use memory::SimulatedRelayer;

/// Errors reported by a relayer implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayerError {
    /// The relayer could not be reached, or failed on its side.
    #[error("Relayer unreachable: {0}")]
    Transport(String),

    /// The relayer understood the request and refused it.
    #[error("{0}")]
    Rejected(String),

    #[error("Relayer response was invalid: {0}")]
    InvalidResponse(String),
}

impl From<RelayerError> for UaError {
    fn from(err: RelayerError) -> Self {
        match err {
            RelayerError::Transport(msg) => UaError::NetworkError(msg),
            RelayerError::Rejected(msg) => UaError::RelayRejected(msg),
            RelayerError::InvalidResponse(msg) => {
                UaError::NetworkError(format!("invalid relayer response: {msg}"))
            }
        }
    }
}

pub type RelayerResult<T> = Result<T, RelayerError>;

/// Inputs to [`RelayerNetwork::build_intent_transaction`].
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub owner: &'a OwnerAddress,
    pub project_id: &'a str,
    pub intent: &'a ConvertIntent,
    pub trade_config: &'a TradeConfig,
}

/// Client-side view of the relayer network.
#[async_trait]
pub trait RelayerNetwork: Send + Sync {
    /// Smart account addresses for `owner` under `project_id`. Deterministic.
    async fn derive_smart_accounts(
        &self,
        owner: &OwnerAddress,
        project_id: &str,
    ) -> RelayerResult<SmartAccountAddresses>;

    /// Balances on every supported chain, fetched as one snapshot.
    async fn fetch_aggregated_assets(
        &self,
        owner: &OwnerAddress,
        project_id: &str,
    ) -> RelayerResult<AssetSnapshot>;

    /// Build the transaction for an intent and compute its root hash.
    async fn build_intent_transaction(
        &self,
        request: BuildRequest<'_>,
    ) -> RelayerResult<BuiltTransaction>;

    /// Queue a signed transaction for execution.
    async fn submit_signed_transaction(
        &self,
        submission: &SignedSubmission,
    ) -> RelayerResult<SubmissionResult>;

    /// Settlement state of a previously submitted transaction.
    async fn get_transaction_status(&self, transaction_id: &str)
        -> RelayerResult<SettlementStatus>;
}
