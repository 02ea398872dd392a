// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Owner wallet integration.
//!
//! This module provides:
//! - The [`WalletProvider`] seam: account access, raw message signing and
//!   account/disconnect events from an external wallet
//! - [`WalletSession`]: the single owner of the connected address
//! - [`LocalKeyWallet`]: a provider backed by an in-memory secp256k1 key

pub mod local;
pub mod session;

use alloy::primitives::Bytes;
use async_trait::async_trait;
use tokio::sync::broadcast;

pub use local::LocalKeyWallet;
pub use session::{Session, SessionChange, WalletSession};

/// Events pushed by the wallet, mirroring `accountsChanged` / `disconnect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The wallet's account list changed. Empty means the user revoked access.
    AccountsChanged(Vec<String>),
    Disconnected,
}

/// Errors reported by a wallet provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WalletError {
    #[error("Request rejected by user: {0}")]
    Rejected(String),

    #[error("Wallet unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),
}

/// External wallet capability: key custody lives behind this trait.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Request account access. The first account is the owner.
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Sign `message` exactly as given, as a personal message.
    async fn sign_raw_message(&self, message: &[u8]) -> Result<Bytes, WalletError>;

    /// Subscribe to account and disconnect events.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}
