// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet provider backed by a local secp256k1 key.
//!
//! Keys can be loaded from hex or from PEM (SEC1 or PKCS#8). Messages are
//! signed as EIP-191 personal messages, which is what a browser wallet does
//! for `signMessage(bytes)`.

use std::path::Path;
use std::sync::RwLock;

use alloy::{
    primitives::{Address, Bytes},
    signers::{local::PrivateKeySigner, Signer},
};
use async_trait::async_trait;
use k256::SecretKey;
use tokio::sync::broadcast;

use super::{WalletError, WalletEvent, WalletProvider};

/// Capacity of the event channel. Slow subscribers see `Lagged`.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// In-memory key wallet.
pub struct LocalKeyWallet {
    signer: RwLock<PrivateKeySigner>,
    events: broadcast::Sender<WalletEvent>,
}

impl LocalKeyWallet {
    pub fn new(signer: PrivateKeySigner) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            signer: RwLock::new(signer),
            events,
        }
    }

    /// Create a wallet from a hex-encoded private key (with or without 0x).
    pub fn from_hex(private_key_hex: &str) -> Result<Self, WalletError> {
        signer_from_hex(private_key_hex).map(Self::new)
    }

    /// Create a wallet from PEM-encoded private key bytes.
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self, WalletError> {
        let hex_key = pem_to_hex(pem_bytes)?;
        Self::from_hex(&hex_key)
    }

    /// Create a wallet from a PEM file.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            WalletError::InvalidKey(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_pem(&bytes)
    }

    /// Address of the key currently held.
    pub fn address(&self) -> Address {
        self.current_signer()
            .map(|s| s.address())
            .unwrap_or_default()
    }

    /// Replace the held key and announce the new account to subscribers.
    pub fn switch_signer(&self, signer: PrivateKeySigner) -> Result<(), WalletError> {
        let address = signer.address();
        {
            let mut guard = self
                .signer
                .write()
                .map_err(|_| WalletError::Unavailable("signer lock poisoned".to_string()))?;
            *guard = signer;
        }
        tracing::debug!(address = %address, "Local wallet switched account");
        // No receivers is fine: nobody is listening yet.
        let _ = self
            .events
            .send(WalletEvent::AccountsChanged(vec![address.to_checksum(None)]));
        Ok(())
    }

    /// Announce a wallet-level disconnect to subscribers.
    pub fn emit_disconnect(&self) {
        let _ = self.events.send(WalletEvent::Disconnected);
    }

    fn current_signer(&self) -> Result<PrivateKeySigner, WalletError> {
        self.signer
            .read()
            .map(|s| s.clone())
            .map_err(|_| WalletError::Unavailable("signer lock poisoned".to_string()))
    }
}

#[async_trait]
impl WalletProvider for LocalKeyWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        let signer = self.current_signer()?;
        Ok(vec![signer.address().to_checksum(None)])
    }

    async fn sign_raw_message(&self, message: &[u8]) -> Result<Bytes, WalletError> {
        let signer = self.current_signer()?;
        let signature = signer
            .sign_message(message)
            .await
            .map_err(|e| WalletError::Unavailable(format!("signing failed: {e}")))?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

/// Create a signer from a hex private key.
pub fn signer_from_hex(private_key_hex: &str) -> Result<PrivateKeySigner, WalletError> {
    let trimmed = private_key_hex.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let key_bytes =
        alloy::hex::decode(trimmed).map_err(|e| WalletError::InvalidKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes).map_err(|e| WalletError::InvalidKey(e.to_string()))
}

/// Parse a private key from PEM format to a hex string.
///
/// Accepts SEC1 (`EC PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`) encodings.
pub fn pem_to_hex(pem_bytes: &[u8]) -> Result<String, WalletError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| WalletError::InvalidKey(format!("Invalid UTF-8: {}", e)))?;

    let pem = pem::parse(pem_str)
        .map_err(|e| WalletError::InvalidKey(format!("Invalid PEM: {}", e)))?;

    let secret_key = SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| parse_pkcs8_to_secret_key(pem.contents()))
        .map_err(|e| WalletError::InvalidKey(format!("Invalid key format: {}", e)))?;

    Ok(alloy::hex::encode(secret_key.to_bytes()))
}

fn parse_pkcs8_to_secret_key(der: &[u8]) -> Result<SecretKey, String> {
    use k256::pkcs8::DecodePrivateKey;
    SecretKey::from_pkcs8_der(der).map_err(|e| e.to_string())
}
