// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::Bytes;
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::models::OwnerAddress;
use crate::wallet::{LocalKeyWallet, WalletError, WalletEvent, WalletProvider};

/// Anvil account 0.
pub const OWNER_A_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const OWNER_A: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// Anvil account 1.
pub const OWNER_B_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const OWNER_B: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

pub const PROJECT_ID: &str = "test-project";

pub fn owner_a() -> OwnerAddress {
    OwnerAddress::parse(OWNER_A).unwrap()
}

pub fn owner_b() -> OwnerAddress {
    OwnerAddress::parse(OWNER_B).unwrap()
}

/// Local key wallet that records every message it is asked to sign and can
/// be told to refuse requests.
pub struct RecordingWallet {
    inner: LocalKeyWallet,
    signed: Mutex<Vec<Vec<u8>>>,
    reject_connect: AtomicBool,
    fail_connect: AtomicBool,
    reject_sign: AtomicBool,
}

impl RecordingWallet {
    pub fn new(key_hex: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalKeyWallet::from_hex(key_hex).unwrap(),
            signed: Mutex::new(Vec::new()),
            reject_connect: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            reject_sign: AtomicBool::new(false),
        })
    }

    pub fn owner_a() -> Arc<Self> {
        Self::new(OWNER_A_KEY)
    }

    pub fn inner(&self) -> &LocalKeyWallet {
        &self.inner
    }

    pub fn reject_connect(&self, reject: bool) {
        self.reject_connect.store(reject, Ordering::SeqCst);
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn reject_sign(&self, reject: bool) {
        self.reject_sign.store(reject, Ordering::SeqCst);
    }

    pub fn signed_messages(&self) -> Vec<Vec<u8>> {
        self.signed.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletProvider for RecordingWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        if self.reject_connect.load(Ordering::SeqCst) {
            return Err(WalletError::Rejected("user closed the prompt".into()));
        }
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(WalletError::Unavailable("extension crashed".into()));
        }
        self.inner.request_accounts().await
    }

    async fn sign_raw_message(&self, message: &[u8]) -> Result<Bytes, WalletError> {
        if self.reject_sign.load(Ordering::SeqCst) {
            return Err(WalletError::Rejected("user declined to sign".into()));
        }
        self.signed.lock().unwrap().push(message.to_vec());
        self.inner.sign_raw_message(message).await
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.inner.subscribe()
    }
}
