// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Universal Account Client
//!
//! Owns the current [`UniversalAccountHandle`] and everything derived from
//! it. Re-initializing replaces the handle and drops the derived state in
//! the same step; nothing is patched in place.
//!
//! ## Stale Reads
//!
//! Every fetch remembers the handle it started on. If the handle was
//! replaced while the relayer was answering, the answer is dropped and the
//! caller gets [`UaError::StaleHandle`]. Results for two different owners
//! can therefore never be combined.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::handle::UniversalAccountHandle;
use crate::aggregator::{AggregatedAssets, AssetAggregator};
use crate::error::UaError;
use crate::models::{OwnerAddress, SmartAccountAddresses, TradeConfig};
use crate::relayer::RelayerNetwork;
use crate::wallet::WalletSession;

/// What [`UniversalAccountClient::sync_with_session`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Unchanged,
    Reinitialized(Arc<UniversalAccountHandle>),
    Cleared,
}

#[derive(Default)]
struct ClientState {
    generation: u64,
    handle: Option<Arc<UniversalAccountHandle>>,
    smart_accounts: Option<SmartAccountAddresses>,
    /// Project and trade config of the last initialization, kept across a
    /// disconnect so a reconnect can re-initialize.
    last_settings: Option<(String, TradeConfig)>,
}

impl ClientState {
    fn is_current(&self, handle: &UniversalAccountHandle) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|h| h.generation() == handle.generation())
    }

    fn install(
        &mut self,
        project_id: String,
        owner: OwnerAddress,
        trade_config: TradeConfig,
    ) -> Arc<UniversalAccountHandle> {
        self.generation += 1;
        let handle = Arc::new(UniversalAccountHandle::new(
            self.generation,
            project_id.clone(),
            owner,
            trade_config,
        ));
        self.handle = Some(handle.clone());
        self.smart_accounts = None;
        self.last_settings = Some((project_id, trade_config));
        handle
    }

    fn clear(&mut self) -> bool {
        self.smart_accounts = None;
        self.handle.take().is_some()
    }
}

/// Client for one universal account at a time.
pub struct UniversalAccountClient {
    relayer: Arc<dyn RelayerNetwork>,
    aggregator: AssetAggregator,
    state: RwLock<ClientState>,
}

impl UniversalAccountClient {
    pub fn new(relayer: Arc<dyn RelayerNetwork>) -> Self {
        Self {
            relayer,
            aggregator: AssetAggregator::new(),
            state: RwLock::new(ClientState::default()),
        }
    }

    pub fn relayer(&self) -> Arc<dyn RelayerNetwork> {
        self.relayer.clone()
    }

    /// Construct a new handle, replacing the current one.
    pub async fn initialize(
        &self,
        project_id: &str,
        owner: OwnerAddress,
        trade_config: TradeConfig,
    ) -> Result<Arc<UniversalAccountHandle>, UaError> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(UaError::MissingProjectId);
        }
        trade_config.validate()?;

        let handle = self
            .state
            .write()
            .await
            .install(project_id.to_string(), owner, trade_config);

        info!(
            generation = handle.generation(),
            project_id = %handle.project_id(),
            owner = %handle.owner(),
            universal_gas = trade_config.universal_gas_enabled,
            slippage_bps = ?trade_config.slippage_bps,
            "Universal account initialized"
        );
        Ok(handle)
    }

    /// Initialize for the session's current owner.
    pub async fn initialize_for_session(
        &self,
        session: &WalletSession,
        project_id: &str,
        trade_config: TradeConfig,
    ) -> Result<Arc<UniversalAccountHandle>, UaError> {
        let owner = session.current_address().await?;
        self.initialize(project_id, owner, trade_config).await
    }

    /// Bring the handle in line with the session.
    ///
    /// A disconnected session drops the handle. A different owner gets a new
    /// handle with the previous project id and trade config.
    pub async fn sync_with_session(&self, session: &WalletSession) -> SyncOutcome {
        let snapshot = session.snapshot().await;
        let mut state = self.state.write().await;

        let Some(owner) = snapshot.owner_address else {
            if state.clear() {
                info!("Wallet disconnected, universal account handle dropped");
                return SyncOutcome::Cleared;
            }
            return SyncOutcome::Unchanged;
        };

        if state.handle.as_ref().is_some_and(|h| *h.owner() == owner) {
            return SyncOutcome::Unchanged;
        }

        let Some((project_id, trade_config)) = state.last_settings.clone() else {
            return SyncOutcome::Unchanged;
        };

        let previous = state.handle.as_ref().map(|h| *h.owner());
        let handle = state.install(project_id, owner, trade_config);
        info!(
            generation = handle.generation(),
            from = ?previous.map(|o| o.to_string()),
            to = %owner,
            "Universal account re-initialized for new owner"
        );
        SyncOutcome::Reinitialized(handle)
    }

    /// The live handle.
    pub async fn current_handle(&self) -> Result<Arc<UniversalAccountHandle>, UaError> {
        self.state
            .read()
            .await
            .handle
            .clone()
            .ok_or(UaError::ClientNotInitialized)
    }

    /// Whether `handle` is still the live handle.
    pub async fn is_current(&self, handle: &UniversalAccountHandle) -> bool {
        self.state.read().await.is_current(handle)
    }

    /// Smart account addresses for the live handle, cached per handle.
    pub async fn get_smart_account_options(&self) -> Result<SmartAccountAddresses, UaError> {
        let handle = {
            let state = self.state.read().await;
            let handle = state.handle.clone().ok_or(UaError::ClientNotInitialized)?;
            if let Some(cached) = &state.smart_accounts {
                return Ok(cached.clone());
            }
            handle
        };
        self.fetch_smart_accounts(handle).await
    }

    /// Fetch the smart account addresses again, bypassing the cache.
    pub async fn refresh_smart_account_options(&self) -> Result<SmartAccountAddresses, UaError> {
        let handle = self.current_handle().await?;
        self.fetch_smart_accounts(handle).await
    }

    async fn fetch_smart_accounts(
        &self,
        handle: Arc<UniversalAccountHandle>,
    ) -> Result<SmartAccountAddresses, UaError> {
        let addresses = self
            .relayer
            .derive_smart_accounts(handle.owner(), handle.project_id())
            .await
            .inspect_err(|e| warn!(error = %e, "Smart account derivation failed"))?;

        if addresses.owner_address != *handle.owner() {
            return Err(UaError::NetworkError(format!(
                "relayer derived accounts for {} instead of {}",
                addresses.owner_address,
                handle.owner()
            )));
        }

        let mut state = self.state.write().await;
        if !state.is_current(&handle) {
            debug!(generation = handle.generation(), "Discarding stale smart account result");
            return Err(UaError::StaleHandle);
        }
        state.smart_accounts = Some(addresses.clone());

        debug!(
            generation = handle.generation(),
            evm = %addresses.evm_address,
            solana = %addresses.solana_address,
            "Smart accounts derived"
        );
        Ok(addresses)
    }

    /// Aggregated balances of the live handle's account.
    pub async fn get_primary_assets(&self) -> Result<AggregatedAssets, UaError> {
        let handle = self.current_handle().await?;

        let snapshot = self
            .relayer
            .fetch_aggregated_assets(handle.owner(), handle.project_id())
            .await
            .inspect_err(|e| warn!(error = %e, "Asset fetch failed"))?;

        if snapshot.owner != *handle.owner() {
            return Err(UaError::NetworkError(format!(
                "relayer returned balances of {} instead of {}",
                snapshot.owner,
                handle.owner()
            )));
        }

        if !self.is_current(&handle).await {
            debug!(generation = handle.generation(), "Discarding stale asset snapshot");
            return Err(UaError::StaleHandle);
        }

        let assets = self.aggregator.aggregate(&snapshot);
        if assets.is_degraded() {
            warn!(
                owner = %assets.owner,
                total_usd = %assets.total_value_usd,
                "Portfolio is partially unavailable"
            );
        }
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{BalanceFlag, RawTokenBalance};
    use crate::amount::UsdValue;
    use crate::chains::{ChainId, TokenType, SUPPORTED_CHAINS};
    use crate::relayer::SimulatedRelayer;
    use crate::test_support::{owner_a, owner_b, RecordingWallet, OWNER_B_KEY, PROJECT_ID};
    use crate::wallet::local::signer_from_hex;
    use std::time::Duration;

    fn client_with(relayer: Arc<SimulatedRelayer>) -> Arc<UniversalAccountClient> {
        Arc::new(UniversalAccountClient::new(relayer))
    }

    #[tokio::test]
    async fn initialize_requires_project_id() {
        let client = client_with(Arc::new(SimulatedRelayer::new()));
        let err = client
            .initialize("  ", owner_a(), TradeConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err, UaError::MissingProjectId);
        assert_eq!(client.current_handle().await.unwrap_err(), UaError::ClientNotInitialized);
    }

    #[tokio::test]
    async fn initialize_rejects_invalid_trade_config() {
        let client = client_with(Arc::new(SimulatedRelayer::new()));
        let config = TradeConfig {
            universal_gas_enabled: true,
            slippage_bps: Some(20_000),
        };
        assert!(matches!(
            client.initialize(PROJECT_ID, owner_a(), config).await,
            Err(UaError::InvalidTradeConfig(_))
        ));
    }

    #[tokio::test]
    async fn initialize_for_disconnected_session_fails() {
        let client = client_with(Arc::new(SimulatedRelayer::new()));
        let session = WalletSession::with_wallet(RecordingWallet::owner_a());
        assert_eq!(
            client
                .initialize_for_session(&session, PROJECT_ID, TradeConfig::default())
                .await
                .unwrap_err(),
            UaError::NotConnected
        );
    }

    #[tokio::test]
    async fn queries_require_initialization() {
        let client = client_with(Arc::new(SimulatedRelayer::new()));
        assert_eq!(
            client.get_smart_account_options().await.unwrap_err(),
            UaError::ClientNotInitialized
        );
        assert_eq!(
            client.get_primary_assets().await.unwrap_err(),
            UaError::ClientNotInitialized
        );
    }

    #[tokio::test]
    async fn smart_accounts_are_idempotent_and_cached() {
        let relayer = Arc::new(SimulatedRelayer::new());
        let client = client_with(relayer.clone());
        client
            .initialize("demo", owner_a(), TradeConfig::default())
            .await
            .unwrap();

        let first = client.get_smart_account_options().await.unwrap();
        let second = client.get_smart_account_options().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(relayer.derive_calls().await, 1);

        assert!(!first.evm_address.is_empty());
        assert!(!first.solana_address.is_empty());
        assert_ne!(first.evm_address, owner_a().to_string());
        assert_ne!(first.solana_address, owner_a().to_string());

        let refreshed = client.refresh_smart_account_options().await.unwrap();
        assert_eq!(refreshed, first);
        assert_eq!(relayer.derive_calls().await, 2);

        // Same (project, owner) on a fresh handle yields the same addresses.
        client
            .initialize("demo", owner_a(), TradeConfig::default())
            .await
            .unwrap();
        assert_eq!(client.get_smart_account_options().await.unwrap(), first);
    }

    #[tokio::test]
    async fn reinitialize_never_returns_previous_owner_data() {
        let relayer = Arc::new(SimulatedRelayer::new());
        relayer
            .set_balances(
                owner_a(),
                ChainId::BaseMainnet,
                vec![RawTokenBalance::new(TokenType::Usdc, "5000000", Some("1"))],
            )
            .await;
        let client = client_with(relayer);

        client.initialize("demo", owner_a(), TradeConfig::default()).await.unwrap();
        let a_accounts = client.get_smart_account_options().await.unwrap();
        let a_assets = client.get_primary_assets().await.unwrap();
        assert_eq!(a_assets.total_value_usd, UsdValue::parse("5").unwrap());

        client.initialize("demo", owner_b(), TradeConfig::default()).await.unwrap();
        let b_accounts = client.get_smart_account_options().await.unwrap();
        let b_assets = client.get_primary_assets().await.unwrap();

        assert_eq!(b_accounts.owner_address, owner_b());
        assert_ne!(b_accounts.evm_address, a_accounts.evm_address);
        assert_eq!(b_assets.owner, owner_b());
        assert!(b_assets.total_value_usd.is_zero());
    }

    #[tokio::test]
    async fn in_flight_read_is_discarded_after_reinitialize() {
        let relayer = Arc::new(SimulatedRelayer::new().with_latency(Duration::from_millis(50)));
        let client = client_with(relayer);
        client.initialize("demo", owner_a(), TradeConfig::default()).await.unwrap();

        let in_flight = {
            let client = client.clone();
            tokio::spawn(async move { client.get_primary_assets().await })
        };
        let accounts_in_flight = {
            let client = client.clone();
            tokio::spawn(async move { client.get_smart_account_options().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.initialize("demo", owner_b(), TradeConfig::default()).await.unwrap();

        assert_eq!(in_flight.await.unwrap().unwrap_err(), UaError::StaleHandle);
        assert_eq!(accounts_in_flight.await.unwrap().unwrap_err(), UaError::StaleHandle);

        // The superseded fetch must not have populated the new handle's cache.
        let fresh = client.get_smart_account_options().await.unwrap();
        assert_eq!(fresh.owner_address, owner_b());
    }

    #[tokio::test]
    async fn zero_balance_account_lists_every_chain() {
        let client = client_with(Arc::new(SimulatedRelayer::new()));
        client.initialize("demo", owner_a(), TradeConfig::default()).await.unwrap();

        let assets = client.get_primary_assets().await.unwrap();
        assert!(assets.total_value_usd.is_zero());
        assert_eq!(assets.per_chain_balances.len(), SUPPORTED_CHAINS.len());
    }

    #[tokio::test]
    async fn chain_outage_degrades_instead_of_failing() {
        let relayer = Arc::new(SimulatedRelayer::new());
        relayer
            .set_balances(
                owner_a(),
                ChainId::EthereumMainnet,
                vec![RawTokenBalance::new(TokenType::Usdc, "2500000", Some("1"))],
            )
            .await;
        relayer.fail_chain(ChainId::SolanaMainnet, "rpc timeout").await;
        let client = client_with(relayer.clone());
        client.initialize("demo", owner_a(), TradeConfig::default()).await.unwrap();

        let assets = client.get_primary_assets().await.unwrap();
        assert!(assets.is_degraded());
        assert_eq!(assets.total_value_usd, UsdValue::parse("2.5").unwrap());
        assert!(assets
            .chain_entries(ChainId::SolanaMainnet)
            .all(|e| e.flag == BalanceFlag::ChainUnavailable));

        // Balances are not cached: the next read sees the recovered chain.
        relayer.restore_chain(ChainId::SolanaMainnet).await;
        let assets = client.get_primary_assets().await.unwrap();
        assert!(!assets.is_degraded());
        assert!(assets
            .chain_entries(ChainId::SolanaMainnet)
            .all(|e| e.flag != BalanceFlag::ChainUnavailable));
        assert_eq!(relayer.asset_calls().await, 2);
    }

    #[tokio::test]
    async fn offline_relayer_is_retryable_network_error() {
        let relayer = Arc::new(SimulatedRelayer::new());
        let client = client_with(relayer.clone());
        client.initialize("demo", owner_a(), TradeConfig::default()).await.unwrap();

        relayer.set_offline(true).await;
        let err = client.get_smart_account_options().await.unwrap_err();
        assert!(matches!(err, UaError::NetworkError(_)));
        assert!(err.is_retryable());

        relayer.set_offline(false).await;
        assert!(client.get_smart_account_options().await.is_ok());
    }

    #[tokio::test]
    async fn sync_follows_session_transitions() {
        let wallet = RecordingWallet::owner_a();
        let session = WalletSession::with_wallet(wallet.clone());
        let client = client_with(Arc::new(SimulatedRelayer::new()));

        // Nothing to sync before the first initialization.
        session.connect().await.unwrap();
        assert_eq!(client.sync_with_session(&session).await, SyncOutcome::Unchanged);

        let first = client
            .initialize_for_session(&session, "demo", TradeConfig::new(false, Some(50)).unwrap())
            .await
            .unwrap();
        assert_eq!(client.sync_with_session(&session).await, SyncOutcome::Unchanged);

        wallet
            .inner()
            .switch_signer(signer_from_hex(OWNER_B_KEY).unwrap())
            .unwrap();
        session.drain_events().await;

        let SyncOutcome::Reinitialized(second) = client.sync_with_session(&session).await else {
            panic!("expected re-initialization");
        };
        assert_eq!(*second.owner(), owner_b());
        assert_eq!(second.project_id(), "demo");
        assert_eq!(second.trade_config(), first.trade_config());
        assert!(second.generation() > first.generation());
        assert!(!client.is_current(&first).await);

        session.disconnect().await;
        assert_eq!(client.sync_with_session(&session).await, SyncOutcome::Cleared);
        assert_eq!(client.current_handle().await.unwrap_err(), UaError::ClientNotInitialized);

        // Reconnecting restores a handle with the remembered settings.
        session.connect().await.unwrap();
        assert!(matches!(
            client.sync_with_session(&session).await,
            SyncOutcome::Reinitialized(_)
        ));
    }
}
