// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Simulated Relayer
//!
//! In-process relayer with the behavior of the real network that the client
//! depends on:
//!
//! - Smart account addresses are a pure function of (project id, owner)
//! - The root hash is `keccak256(payload)`
//! - A submission is accepted only if the EIP-191 signer of the root hash
//!   is the account owner and the intent has not expired
//! - A transaction settles after a fixed number of status polls
//!
//! Balances, chain outages and settlement failures can be scripted.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use alloy::primitives::{keccak256, Address, Bytes, Signature, B256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{BuildRequest, RelayerError, RelayerNetwork, RelayerResult};
use crate::aggregator::{AssetSnapshot, ChainBalances, RawTokenBalance};
use crate::amount::parse_positive_amount;
use crate::chains::{ChainId, SUPPORTED_CHAINS};
use crate::models::{
    BuiltTransaction, ConvertIntent, OwnerAddress, SettlementStatus, SignedSubmission,
    SmartAccountAddresses, SubmissionResult, SubmissionStatus, TradeConfig,
};

const EVM_DOMAIN: &[u8] = b"universal-account/evm/v1";
const SOLANA_DOMAIN: &[u8] = b"universal-account/solana/v1";

/// Default lifetime of a built intent.
const DEFAULT_INTENT_TTL_SECS: i64 = 300;

/// Default number of status polls before a transaction settles.
const DEFAULT_SETTLE_AFTER_POLLS: u32 = 2;

/// Derive the smart account addresses for `owner` under `project_id`.
pub fn derive_addresses(owner: &OwnerAddress, project_id: &str) -> SmartAccountAddresses {
    let mut evm_preimage = Vec::with_capacity(EVM_DOMAIN.len() + project_id.len() + 20);
    evm_preimage.extend_from_slice(EVM_DOMAIN);
    evm_preimage.extend_from_slice(project_id.as_bytes());
    evm_preimage.extend_from_slice(owner.address().as_slice());
    let evm_hash = keccak256(&evm_preimage);
    let evm_address = Address::from_slice(&evm_hash[12..]);

    let mut hasher = Sha256::new();
    hasher.update(SOLANA_DOMAIN);
    hasher.update(project_id.as_bytes());
    hasher.update(owner.address().as_slice());
    let solana_address = bs58::encode(hasher.finalize()).into_string();

    SmartAccountAddresses {
        owner_address: *owner,
        evm_address: evm_address.to_checksum(None),
        solana_address,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IntentPayload<'a> {
    project_id: &'a str,
    owner: &'a OwnerAddress,
    smart_account: &'a str,
    intent: &'a ConvertIntent,
    trade_config: &'a TradeConfig,
    nonce: u64,
    expires_at: DateTime<Utc>,
}

struct PendingIntent {
    owner: OwnerAddress,
    payload: Bytes,
    expires_at: DateTime<Utc>,
}

struct TransactionRecord {
    polls: u32,
    failure: Option<String>,
}

#[derive(Default)]
struct RelayerState {
    balances: HashMap<OwnerAddress, HashMap<ChainId, Vec<RawTokenBalance>>>,
    failing_chains: HashMap<ChainId, String>,
    pending: HashMap<B256, PendingIntent>,
    submitted_roots: HashSet<B256>,
    transactions: HashMap<String, TransactionRecord>,
    settlement_failure: Option<String>,
    offline: bool,
    nonce: u64,
    derive_calls: u64,
    asset_calls: u64,
}

/// In-process relayer. Cheap to share behind an `Arc`.
pub struct SimulatedRelayer {
    state: Mutex<RelayerState>,
    intent_ttl: chrono::Duration,
    settle_after_polls: u32,
    latency: Option<Duration>,
}

impl Default for SimulatedRelayer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRelayer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RelayerState::default()),
            intent_ttl: chrono::Duration::seconds(DEFAULT_INTENT_TTL_SECS),
            settle_after_polls: DEFAULT_SETTLE_AFTER_POLLS,
            latency: None,
        }
    }

    /// Lifetime of built intents.
    pub fn with_intent_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.intent_ttl = ttl;
        self
    }

    /// Number of status polls before a transaction reaches a terminal state.
    pub fn with_settle_after(mut self, polls: u32) -> Self {
        self.settle_after_polls = polls;
        self
    }

    /// Delay applied to account and asset queries.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Set the balances `owner` holds on `chain`.
    pub async fn set_balances(
        &self,
        owner: OwnerAddress,
        chain: ChainId,
        tokens: Vec<RawTokenBalance>,
    ) {
        self.state
            .lock()
            .await
            .balances
            .entry(owner)
            .or_default()
            .insert(chain, tokens);
    }

    /// Make balance queries for `chain` fail until [`Self::restore_chain`].
    pub async fn fail_chain(&self, chain: ChainId, reason: impl Into<String>) {
        self.state
            .lock()
            .await
            .failing_chains
            .insert(chain, reason.into());
    }

    pub async fn restore_chain(&self, chain: ChainId) {
        self.state.lock().await.failing_chains.remove(&chain);
    }

    /// Make every request fail with a transport error.
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// Settle transactions submitted from now on as failed with `reason`.
    pub async fn set_settlement_failure(&self, reason: Option<String>) {
        self.state.lock().await.settlement_failure = reason;
    }

    pub async fn derive_calls(&self) -> u64 {
        self.state.lock().await.derive_calls
    }

    pub async fn asset_calls(&self) -> u64 {
        self.state.lock().await.asset_calls
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn ensure_online(state: &RelayerState) -> RelayerResult<()> {
        if state.offline {
            return Err(RelayerError::Transport("relayer is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RelayerNetwork for SimulatedRelayer {
    async fn derive_smart_accounts(
        &self,
        owner: &OwnerAddress,
        project_id: &str,
    ) -> RelayerResult<SmartAccountAddresses> {
        self.delay().await;
        let mut state = self.state.lock().await;
        Self::ensure_online(&state)?;
        state.derive_calls += 1;

        Ok(derive_addresses(owner, project_id))
    }

    async fn fetch_aggregated_assets(
        &self,
        owner: &OwnerAddress,
        project_id: &str,
    ) -> RelayerResult<AssetSnapshot> {
        self.delay().await;
        let mut state = self.state.lock().await;
        Self::ensure_online(&state)?;
        state.asset_calls += 1;

        let holdings = state.balances.get(owner);
        let chains = SUPPORTED_CHAINS
            .iter()
            .map(|&chain| {
                let result = match state.failing_chains.get(&chain) {
                    Some(reason) => Err(reason.clone()),
                    None => Ok(holdings
                        .and_then(|h| h.get(&chain))
                        .cloned()
                        .unwrap_or_default()),
                };
                ChainBalances { chain, result }
            })
            .collect();

        Ok(AssetSnapshot {
            owner: *owner,
            project_id: project_id.to_string(),
            fetched_at: Utc::now(),
            chains,
        })
    }

    async fn build_intent_transaction(
        &self,
        request: BuildRequest<'_>,
    ) -> RelayerResult<BuiltTransaction> {
        let mut state = self.state.lock().await;
        Self::ensure_online(&state)?;

        let chain = ChainId::try_from(request.intent.destination_chain_id)
            .map_err(|e| RelayerError::Rejected(e.to_string()))?;
        let token = request.intent.expect_token.token_type;
        parse_positive_amount(&request.intent.expect_token.amount, token.decimals())
            .map_err(|e| RelayerError::Rejected(e.to_string()))?;

        state.nonce += 1;
        let created_at = Utc::now();
        let expires_at = created_at + self.intent_ttl;
        let smart_account = derive_addresses(request.owner, request.project_id);

        let payload = serde_json::to_vec(&IntentPayload {
            project_id: request.project_id,
            owner: request.owner,
            smart_account: &smart_account.evm_address,
            intent: request.intent,
            trade_config: request.trade_config,
            nonce: state.nonce,
            expires_at,
        })
        .map_err(|e| RelayerError::InvalidResponse(format!("payload encoding failed: {e}")))?;
        let payload = Bytes::from(payload);
        let root_hash = keccak256(&payload);

        state.pending.insert(
            root_hash,
            PendingIntent {
                owner: *request.owner,
                payload: payload.clone(),
                expires_at,
            },
        );

        debug!(
            root_hash = %root_hash,
            destination = %chain,
            token = %token,
            amount = %request.intent.expect_token.amount,
            "Simulated relayer built intent"
        );

        Ok(BuiltTransaction {
            root_hash,
            payload,
            created_at,
            expires_at,
        })
    }

    async fn submit_signed_transaction(
        &self,
        submission: &SignedSubmission,
    ) -> RelayerResult<SubmissionResult> {
        let mut state = self.state.lock().await;
        Self::ensure_online(&state)?;

        let tx = submission.transaction();
        let root_hash = B256::try_from(tx.root_hash())
            .map_err(|_| RelayerError::Rejected("root hash must be 32 bytes".to_string()))?;

        if state.submitted_roots.contains(&root_hash) {
            return Err(RelayerError::Rejected(
                "intent was already submitted".to_string(),
            ));
        }

        let pending = state
            .pending
            .get(&root_hash)
            .ok_or_else(|| RelayerError::Rejected(format!("unknown root hash {root_hash}")))?;

        if pending.payload.as_ref() != tx.payload() {
            return Err(RelayerError::Rejected(
                "payload does not match root hash".to_string(),
            ));
        }
        if pending.owner != *tx.owner() {
            return Err(RelayerError::Rejected(
                "submission owner does not match intent owner".to_string(),
            ));
        }
        if Utc::now() >= pending.expires_at {
            let expires_at = pending.expires_at;
            state.pending.remove(&root_hash);
            warn!(root_hash = %root_hash, %expires_at, "Rejected expired intent");
            return Err(RelayerError::Rejected(format!(
                "intent expired at {expires_at}"
            )));
        }

        let signature = Signature::try_from(submission.signature())
            .map_err(|e| RelayerError::Rejected(format!("malformed signature: {e}")))?;
        let signer = signature
            .recover_address_from_msg(root_hash.as_slice())
            .map_err(|e| RelayerError::Rejected(format!("signature recovery failed: {e}")))?;

        if signer != pending.owner.address() {
            warn!(
                root_hash = %root_hash,
                expected = %pending.owner,
                recovered = %signer,
                "Rejected signature from wrong signer"
            );
            return Err(RelayerError::Rejected(
                "signature does not match account owner".to_string(),
            ));
        }

        state.pending.remove(&root_hash);
        state.submitted_roots.insert(root_hash);

        let transaction_id = Uuid::new_v4().to_string();
        let failure = state.settlement_failure.clone();
        state
            .transactions
            .insert(transaction_id.clone(), TransactionRecord { polls: 0, failure });

        info!(
            transaction_id = %transaction_id,
            root_hash = %root_hash,
            "Simulated relayer accepted submission"
        );

        Ok(SubmissionResult {
            transaction_id,
            status: SubmissionStatus::Submitted,
            submitted_at: Utc::now(),
        })
    }

    async fn get_transaction_status(
        &self,
        transaction_id: &str,
    ) -> RelayerResult<SettlementStatus> {
        let mut state = self.state.lock().await;
        Self::ensure_online(&state)?;

        let record = state
            .transactions
            .get_mut(transaction_id)
            .ok_or_else(|| {
                RelayerError::Rejected(format!("unknown transaction {transaction_id}"))
            })?;

        record.polls = record.polls.saturating_add(1);
        if record.polls < self.settle_after_polls {
            return Ok(SettlementStatus::Submitted);
        }

        Ok(match &record.failure {
            Some(reason) => SettlementStatus::Failed(reason.clone()),
            None => SettlementStatus::Confirmed,
        })
    }
}
