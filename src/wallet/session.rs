// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Session
//!
//! Holds the connection to the owner wallet. This is the only place the
//! owner address is written; everything else reads it and treats a change
//! as a reason to throw derived state away.
//!
//! ## Epochs
//!
//! Every transition (connect, disconnect, account switch) bumps the session
//! epoch. Anything derived from the session records the epoch it was
//! derived under, so staleness is a single integer comparison.
//!
//! ## Events
//!
//! Wallet events are applied explicitly, either by calling
//! [`WalletSession::drain_events`] or by running
//! [`WalletSession::spawn_event_listener`] in the background. Applying the
//! same event twice is harmless.

use std::sync::Arc;

use alloy::primitives::Bytes;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{WalletError, WalletEvent, WalletProvider};
use crate::error::UaError;
use crate::models::OwnerAddress;

/// Snapshot of the session state.
///
/// `owner_address` is `Some` exactly when the session is connected, so a
/// connected session always carries a validated address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub owner_address: Option<OwnerAddress>,
    pub last_error: Option<String>,
    pub epoch: u64,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        self.owner_address.is_some()
    }
}

/// Result of applying a wallet event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    Unchanged,
    AddressChanged {
        from: OwnerAddress,
        to: OwnerAddress,
    },
    Disconnected,
}

struct SessionState {
    session: Session,
    events: Option<broadcast::Receiver<WalletEvent>>,
}

struct SessionInner {
    wallet: Option<Arc<dyn WalletProvider>>,
    state: RwLock<SessionState>,
}

/// Connection to the owner wallet. Cloning shares the same session.
#[derive(Clone)]
pub struct WalletSession {
    inner: Arc<SessionInner>,
}

impl WalletSession {
    /// Create a session. `None` models an environment without a wallet.
    pub fn new(wallet: Option<Arc<dyn WalletProvider>>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                wallet,
                state: RwLock::new(SessionState {
                    session: Session::default(),
                    events: None,
                }),
            }),
        }
    }

    pub fn with_wallet(wallet: Arc<dyn WalletProvider>) -> Self {
        Self::new(Some(wallet))
    }

    /// Request account access and connect with the first returned account.
    pub async fn connect(&self) -> Result<OwnerAddress, UaError> {
        let Some(wallet) = self.inner.wallet.clone() else {
            let err = UaError::NoWalletDetected;
            self.record_error(&err).await;
            return Err(err);
        };

        // Subscribe first so nothing emitted during the request is lost.
        let events = wallet.subscribe();

        let accounts = match wallet.request_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                let err = match e {
                    WalletError::Rejected(msg) => UaError::UserRejected(msg),
                    other => UaError::ConnectFailed(other.to_string()),
                };
                warn!(error = %err, "Wallet connection failed");
                self.record_error(&err).await;
                return Err(err);
            }
        };

        let address = match accounts.first().map(|raw| OwnerAddress::parse(raw)) {
            Some(Ok(address)) => address,
            Some(Err(e)) => {
                let err = UaError::ConnectFailed(format!("wallet returned an invalid account: {e}"));
                self.record_error(&err).await;
                return Err(err);
            }
            None => {
                let err = UaError::ConnectFailed("wallet returned no accounts".to_string());
                self.record_error(&err).await;
                return Err(err);
            }
        };

        let mut state = self.inner.state.write().await;
        if state.session.owner_address != Some(address) {
            state.session.epoch += 1;
        }
        state.session.owner_address = Some(address);
        state.session.last_error = None;
        state.events = Some(events);

        info!(owner = %address, epoch = state.session.epoch, "Wallet connected");
        Ok(address)
    }

    /// Reset to the empty session. The wallet itself is not notified.
    pub async fn disconnect(&self) {
        let mut state = self.inner.state.write().await;
        Self::reset(&mut state);
        state.session.last_error = None;
        info!(epoch = state.session.epoch, "Wallet session disconnected");
    }

    /// Owner address of the connected session.
    pub async fn current_address(&self) -> Result<OwnerAddress, UaError> {
        self.inner
            .state
            .read()
            .await
            .session
            .owner_address
            .ok_or(UaError::NotConnected)
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.state.read().await.session.is_connected()
    }

    pub async fn epoch(&self) -> u64 {
        self.inner.state.read().await.session.epoch
    }

    pub async fn last_error(&self) -> Option<String> {
        self.inner.state.read().await.session.last_error.clone()
    }

    pub async fn snapshot(&self) -> Session {
        self.inner.state.read().await.session.clone()
    }

    /// Have the wallet sign `message` verbatim.
    pub async fn sign_raw_message(&self, message: &[u8]) -> Result<Bytes, UaError> {
        if !self.is_connected().await {
            return Err(UaError::NotConnected);
        }
        let wallet = self.inner.wallet.clone().ok_or(UaError::NoWalletDetected)?;

        wallet.sign_raw_message(message).await.map_err(|e| match e {
            WalletError::Rejected(msg) => UaError::SigningRejected(msg),
            other => UaError::WalletUnavailable(other.to_string()),
        })
    }

    /// Apply one wallet event.
    pub async fn apply_event(&self, event: WalletEvent) -> SessionChange {
        let mut state = self.inner.state.write().await;
        Self::apply_locked(&mut state, event)
    }

    /// Apply every event queued since the last call.
    pub async fn drain_events(&self) -> Vec<SessionChange> {
        let mut state = self.inner.state.write().await;
        let mut pending = Vec::new();

        if let Some(receiver) = state.events.as_mut() {
            loop {
                match receiver.try_recv() {
                    Ok(event) => pending.push(event),
                    Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                        warn!(skipped, "Wallet events lagged");
                    }
                    Err(_) => break,
                }
            }
        }

        pending
            .into_iter()
            .map(|event| Self::apply_locked(&mut state, event))
            .filter(|change| *change != SessionChange::Unchanged)
            .collect()
    }

    /// Apply wallet events as they arrive until `shutdown` is cancelled.
    ///
    /// Returns `None` when no wallet is present.
    pub fn spawn_event_listener(&self, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        let wallet = self.inner.wallet.clone()?;
        let mut events = wallet.subscribe();
        let session = self.clone();

        Some(tokio::spawn(async move {
            info!("Wallet event listener starting");
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Wallet event listener shutting down");
                        return;
                    }
                    received = events.recv() => match received {
                        Ok(event) => {
                            session.apply_event(event).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Wallet events lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("Wallet event stream closed");
                            return;
                        }
                    }
                }
            }
        }))
    }

    fn apply_locked(state: &mut SessionState, event: WalletEvent) -> SessionChange {
        let Some(current) = state.session.owner_address else {
            // Reconnecting needs an explicit connect().
            return SessionChange::Unchanged;
        };

        match event {
            WalletEvent::Disconnected => {
                Self::reset(state);
                info!(epoch = state.session.epoch, "Wallet disconnected by wallet");
                SessionChange::Disconnected
            }
            WalletEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    Self::reset(state);
                    info!(epoch = state.session.epoch, "Wallet revoked account access");
                    SessionChange::Disconnected
                }
                Some(raw) => match OwnerAddress::parse(raw) {
                    Ok(next) if next == current => SessionChange::Unchanged,
                    Ok(next) => {
                        state.session.owner_address = Some(next);
                        state.session.epoch += 1;
                        info!(
                            from = %current,
                            to = %next,
                            epoch = state.session.epoch,
                            "Wallet account changed"
                        );
                        SessionChange::AddressChanged { from: current, to: next }
                    }
                    Err(e) => {
                        Self::reset(state);
                        state.session.last_error = Some(e.to_string());
                        warn!(error = %e, "Wallet switched to an invalid account");
                        SessionChange::Disconnected
                    }
                },
            },
        }
    }

    fn reset(state: &mut SessionState) {
        if state.session.owner_address.take().is_some() {
            state.session.epoch += 1;
        }
        state.events = None;
    }

    async fn record_error(&self, err: &UaError) {
        self.inner.state.write().await.session.last_error = Some(err.to_string());
    }
}
