// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Orchestrator
//!
//! Drives one convert transaction through
//! `Built -> Signed -> Submitted -> (Confirmed | Failed)`.
//!
//! ## Session Binding
//!
//! A prepared transaction records the session epoch it was built under.
//! Signing and submitting re-check it: a disconnected session fails with
//! [`UaError::NotConnected`], a session that moved on (reconnect or account
//! switch) fails with [`UaError::TransactionInvalidated`]. It also records
//! the generation of the account handle; once the client is re-initialized
//! the transaction fails with [`UaError::StaleHandle`]. Either way the
//! transaction has to be rebuilt.
//!
//! ## Signing
//!
//! The wallet receives exactly the root hash bytes. Nothing is re-encoded
//! on the way.

pub mod tracker;

use std::sync::Arc;

use tracing::{info, warn};

use crate::account::UniversalAccountClient;
use crate::amount::parse_positive_amount;
use crate::chains::ChainId;
use crate::error::UaError;
use crate::models::{
    ConvertIntent, PreparedTransaction, SettlementStatus, SignedSubmission, SubmissionResult,
};
use crate::relayer::{BuildRequest, RelayerNetwork};
use crate::wallet::WalletSession;

pub use tracker::SettlementTracker;

pub struct TransactionOrchestrator {
    session: WalletSession,
    client: Arc<UniversalAccountClient>,
    relayer: Arc<dyn RelayerNetwork>,
}

impl TransactionOrchestrator {
    pub fn new(session: WalletSession, client: Arc<UniversalAccountClient>) -> Self {
        let relayer = client.relayer();
        Self {
            session,
            client,
            relayer,
        }
    }

    /// Validate `intent` and have the relayer build it for the live handle.
    pub async fn build_convert_transaction(
        &self,
        intent: ConvertIntent,
    ) -> Result<PreparedTransaction, UaError> {
        let destination = ChainId::try_from(intent.destination_chain_id)?;
        let token = intent.expect_token.token_type;
        parse_positive_amount(&intent.expect_token.amount, token.decimals())?;

        let session = self.session.snapshot().await;
        let owner = session.owner_address.ok_or(UaError::NotConnected)?;
        let handle = self.client.current_handle().await?;
        if *handle.owner() != owner {
            return Err(UaError::StaleHandle);
        }

        let built = self
            .relayer
            .build_intent_transaction(BuildRequest {
                owner: handle.owner(),
                project_id: handle.project_id(),
                intent: &intent,
                trade_config: handle.trade_config(),
            })
            .await
            .inspect_err(|e| warn!(error = %e, "Intent build failed"))?;

        if !self.client.is_current(&handle).await {
            return Err(UaError::StaleHandle);
        }
        self.ensure_epoch(session.epoch).await?;

        let prepared = PreparedTransaction::new(
            built,
            intent,
            owner,
            handle.project_id().to_string(),
            session.epoch,
            handle.generation(),
        );

        info!(
            root_hash = %prepared.root_hash_hex(),
            destination = %destination,
            token = %token,
            amount = %prepared.intent().expect_token.amount,
            expires_at = %prepared.expires_at(),
            "Convert transaction built"
        );
        Ok(prepared)
    }

    /// Have the owner sign the root hash of `prepared`.
    pub async fn sign_transaction(
        &self,
        prepared: &PreparedTransaction,
    ) -> Result<SignedSubmission, UaError> {
        self.ensure_epoch(prepared.session_epoch()).await?;
        self.ensure_handle(prepared).await?;

        let signature = self
            .session
            .sign_raw_message(prepared.root_hash())
            .await
            .inspect_err(|e| warn!(error = %e, "Signing failed"))?;

        // The session may have changed while the wallet prompt was open.
        self.ensure_epoch(prepared.session_epoch()).await?;
        self.ensure_handle(prepared).await?;

        info!(root_hash = %prepared.root_hash_hex(), "Transaction signed");
        Ok(SignedSubmission::new(prepared.clone(), signature))
    }

    /// Hand a signed transaction to the relayer. Rejections are not retried.
    pub async fn submit(&self, signed: &SignedSubmission) -> Result<SubmissionResult, UaError> {
        self.ensure_epoch(signed.transaction().session_epoch())
            .await?;
        self.ensure_handle(signed.transaction()).await?;

        let result = self
            .relayer
            .submit_signed_transaction(signed)
            .await
            .inspect_err(|e| {
                warn!(
                    root_hash = %signed.transaction().root_hash_hex(),
                    error = %e,
                    "Submission failed"
                )
            })?;

        info!(
            transaction_id = %result.transaction_id,
            explorer = %result.explorer_url(),
            "Transaction submitted"
        );
        Ok(result)
    }

    /// Build, sign and submit in one go.
    pub async fn convert(&self, intent: ConvertIntent) -> Result<SubmissionResult, UaError> {
        let prepared = self.build_convert_transaction(intent).await?;
        let signed = self.sign_transaction(&prepared).await?;
        self.submit(&signed).await
    }

    /// Current settlement state of a submitted transaction.
    pub async fn status(&self, transaction_id: &str) -> Result<SettlementStatus, UaError> {
        Ok(self.relayer.get_transaction_status(transaction_id).await?)
    }

    /// Tracker polling this orchestrator's relayer.
    pub fn tracker(&self) -> SettlementTracker {
        SettlementTracker::new(self.relayer.clone())
    }

    async fn ensure_epoch(&self, epoch: u64) -> Result<(), UaError> {
        let session = self.session.snapshot().await;
        if !session.is_connected() {
            return Err(UaError::NotConnected);
        }
        if session.epoch != epoch {
            return Err(UaError::TransactionInvalidated(format!(
                "built under session {epoch}, current session is {}",
                session.epoch
            )));
        }
        Ok(())
    }

    async fn ensure_handle(&self, prepared: &PreparedTransaction) -> Result<(), UaError> {
        match self.client.current_handle().await {
            Ok(handle) if handle.generation() == prepared.handle_id() => Ok(()),
            _ => Err(UaError::StaleHandle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::TokenType;
    use crate::error::ErrorCategory;
    use crate::models::TradeConfig;
    use crate::relayer::SimulatedRelayer;
    use crate::test_support::{owner_a, RecordingWallet, OWNER_A_KEY, OWNER_B_KEY, PROJECT_ID};
    use crate::wallet::local::signer_from_hex;
    use crate::wallet::{LocalKeyWallet, WalletProvider};

    struct Fixture {
        wallet: Arc<RecordingWallet>,
        session: WalletSession,
        client: Arc<UniversalAccountClient>,
        relayer: Arc<SimulatedRelayer>,
        orchestrator: TransactionOrchestrator,
    }

    async fn fixture_with(relayer: SimulatedRelayer) -> Fixture {
        let wallet = RecordingWallet::owner_a();
        let session = WalletSession::with_wallet(wallet.clone());
        let relayer = Arc::new(relayer);
        let client = Arc::new(UniversalAccountClient::new(relayer.clone()));

        session.connect().await.unwrap();
        client
            .initialize_for_session(&session, PROJECT_ID, TradeConfig::default())
            .await
            .unwrap();

        let orchestrator = TransactionOrchestrator::new(session.clone(), client.clone());
        Fixture {
            wallet,
            session,
            client,
            relayer,
            orchestrator,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(SimulatedRelayer::new()).await
    }

    fn usdc_to_solana(amount: &str) -> ConvertIntent {
        ConvertIntent::new(TokenType::Usdc, amount, ChainId::SolanaMainnet)
    }

    #[tokio::test]
    async fn convert_end_to_end() {
        let f = fixture().await;

        let prepared = f
            .orchestrator
            .build_convert_transaction(usdc_to_solana("1"))
            .await
            .unwrap();
        let signed = f.orchestrator.sign_transaction(&prepared).await.unwrap();
        let result = f.orchestrator.submit(&signed).await.unwrap();

        assert!(!result.transaction_id.is_empty());
        assert!(result.explorer_url().ends_with(&result.transaction_id));
        assert_eq!(f.wallet.signed_messages(), vec![prepared.root_hash().to_vec()]);
        assert_eq!(prepared.owner(), &owner_a());
        assert_eq!(prepared.project_id(), PROJECT_ID);
    }

    #[tokio::test]
    async fn signer_receives_exactly_the_root_hash() {
        let f = fixture().await;
        let prepared = f
            .orchestrator
            .build_convert_transaction(usdc_to_solana("0.5"))
            .await
            .unwrap();
        let signed = f.orchestrator.sign_transaction(&prepared).await.unwrap();

        let signed_messages = f.wallet.signed_messages();
        assert_eq!(signed_messages.len(), 1);
        assert_eq!(signed_messages[0].as_slice(), prepared.root_hash());
        assert_eq!(signed_messages[0].len(), 32);
        assert_eq!(signed.signature().len(), 65);
    }

    #[tokio::test]
    async fn build_validates_intent() {
        let f = fixture().await;

        let mut unknown_chain = usdc_to_solana("1");
        unknown_chain.destination_chain_id = 12345;
        assert!(matches!(
            f.orchestrator.build_convert_transaction(unknown_chain).await,
            Err(UaError::UnsupportedChain(_))
        ));

        for amount in ["0", "", "-1", "abc", "1.1234567", "0.000"] {
            let err = f
                .orchestrator
                .build_convert_transaction(usdc_to_solana(amount))
                .await
                .unwrap_err();
            assert!(
                matches!(err, UaError::InvalidAmount(_)),
                "amount {amount:?} gave {err:?}"
            );
            assert_eq!(err.category(), ErrorCategory::Configuration);
        }
    }

    #[tokio::test]
    async fn build_requires_initialized_client() {
        let wallet = RecordingWallet::owner_a();
        let session = WalletSession::with_wallet(wallet);
        session.connect().await.unwrap();
        let client = Arc::new(UniversalAccountClient::new(Arc::new(SimulatedRelayer::new())));
        let orchestrator = TransactionOrchestrator::new(session, client);

        assert_eq!(
            orchestrator
                .build_convert_transaction(usdc_to_solana("1"))
                .await
                .unwrap_err(),
            UaError::ClientNotInitialized
        );
    }

    #[tokio::test]
    async fn build_refuses_handle_of_previous_owner() {
        let f = fixture().await;
        f.wallet
            .inner()
            .switch_signer(signer_from_hex(OWNER_B_KEY).unwrap())
            .unwrap();
        f.session.drain_events().await;

        assert_eq!(
            f.orchestrator
                .build_convert_transaction(usdc_to_solana("1"))
                .await
                .unwrap_err(),
            UaError::StaleHandle
        );

        f.client.sync_with_session(&f.session).await;
        assert!(f
            .orchestrator
            .build_convert_transaction(usdc_to_solana("1"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn sign_while_disconnected_never_reaches_wallet() {
        let f = fixture().await;
        let prepared = f
            .orchestrator
            .build_convert_transaction(usdc_to_solana("1"))
            .await
            .unwrap();
        f.session.disconnect().await;

        assert_eq!(
            f.orchestrator.sign_transaction(&prepared).await.unwrap_err(),
            UaError::NotConnected
        );
        assert!(f.wallet.signed_messages().is_empty());
    }

    #[tokio::test]
    async fn disconnect_before_submit_blocks_stale_signature() {
        let f = fixture().await;
        let prepared = f
            .orchestrator
            .build_convert_transaction(usdc_to_solana("1"))
            .await
            .unwrap();
        let signed = f.orchestrator.sign_transaction(&prepared).await.unwrap();

        f.session.disconnect().await;
        let err = f.orchestrator.submit(&signed).await.unwrap_err();
        assert_eq!(err, UaError::NotConnected);
        assert_eq!(err.category(), ErrorCategory::State);

        // Reconnecting does not revive the old signature.
        f.session.connect().await.unwrap();
        assert!(matches!(
            f.orchestrator.submit(&signed).await,
            Err(UaError::TransactionInvalidated(_))
        ));
    }

    #[tokio::test]
    async fn account_switch_invalidates_prepared_transaction() {
        let f = fixture().await;
        let prepared = f
            .orchestrator
            .build_convert_transaction(usdc_to_solana("1"))
            .await
            .unwrap();

        f.wallet
            .inner()
            .switch_signer(signer_from_hex(OWNER_B_KEY).unwrap())
            .unwrap();
        f.session.drain_events().await;

        assert!(matches!(
            f.orchestrator.sign_transaction(&prepared).await,
            Err(UaError::TransactionInvalidated(_))
        ));
    }

    #[tokio::test]
    async fn reinitialized_client_invalidates_prepared_transaction() {
        let f = fixture().await;
        let prepared = f
            .orchestrator
            .build_convert_transaction(usdc_to_solana("1"))
            .await
            .unwrap();
        let signed = f.orchestrator.sign_transaction(&prepared).await.unwrap();

        // Same owner and session, different project.
        f.client
            .initialize("other-project", owner_a(), TradeConfig::default())
            .await
            .unwrap();

        assert_eq!(
            f.orchestrator.sign_transaction(&prepared).await.unwrap_err(),
            UaError::StaleHandle
        );
        assert_eq!(
            f.orchestrator.submit(&signed).await.unwrap_err(),
            UaError::StaleHandle
        );
        assert_eq!(f.wallet.signed_messages().len(), 1);

        let rebuilt = f
            .orchestrator
            .build_convert_transaction(usdc_to_solana("1"))
            .await
            .unwrap();
        assert_eq!(rebuilt.project_id(), "other-project");
        assert!(f.orchestrator.convert(usdc_to_solana("1")).await.is_ok());
    }

    #[tokio::test]
    async fn rejected_signature_is_authorization_error() {
        let f = fixture().await;
        let prepared = f
            .orchestrator
            .build_convert_transaction(usdc_to_solana("1"))
            .await
            .unwrap();
        f.wallet.reject_sign(true);

        let err = f.orchestrator.sign_transaction(&prepared).await.unwrap_err();
        assert!(matches!(err, UaError::SigningRejected(_)));
        assert_eq!(err.category(), ErrorCategory::Authorization);
    }

    #[tokio::test]
    async fn mismatched_signature_is_relay_rejected() {
        let f = fixture().await;
        let prepared = f
            .orchestrator
            .build_convert_transaction(usdc_to_solana("1"))
            .await
            .unwrap();

        // Signed by the right key, but over the wrong bytes.
        let other = LocalKeyWallet::from_hex(OWNER_A_KEY).unwrap();
        let signature = other.sign_raw_message(b"not the root hash").await.unwrap();
        let forged = SignedSubmission::from_parts(prepared, signature);

        let err = f.orchestrator.submit(&forged).await.unwrap_err();
        assert!(matches!(err, UaError::RelayRejected(_)));
        assert_eq!(err.category(), ErrorCategory::Protocol);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn expired_intent_is_relay_rejected() {
        let f = fixture_with(SimulatedRelayer::new().with_intent_ttl(chrono::Duration::zero())).await;
        let prepared = f
            .orchestrator
            .build_convert_transaction(usdc_to_solana("1"))
            .await
            .unwrap();
        let signed = f.orchestrator.sign_transaction(&prepared).await.unwrap();

        assert!(matches!(
            f.orchestrator.submit(&signed).await,
            Err(UaError::RelayRejected(msg)) if msg.starts_with("intent expired")
        ));
    }

    #[tokio::test]
    async fn status_reaches_confirmed() {
        let f = fixture_with(SimulatedRelayer::new().with_settle_after(2)).await;

        let result = f.orchestrator.convert(usdc_to_solana("1")).await.unwrap();
        assert_eq!(
            f.orchestrator.status(&result.transaction_id).await.unwrap(),
            SettlementStatus::Submitted
        );
        assert_eq!(
            f.orchestrator.status(&result.transaction_id).await.unwrap(),
            SettlementStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn offline_relayer_build_is_network_error() {
        let f = fixture().await;
        f.relayer.set_offline(true).await;
        let err = f
            .orchestrator
            .build_convert_transaction(usdc_to_solana("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, UaError::NetworkError(_)));
    }
}
