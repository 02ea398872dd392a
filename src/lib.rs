// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Universal Account Client - one owner key, smart accounts on every chain
//!
//! This crate connects an externally-owned wallet key to a universal
//! account: per-chain smart accounts sharing one owner and one aggregated
//! balance. Transactions are built by a relayer network, signed by the owner
//! over their root hash, and relayed for execution.
//!
//! ## Modules
//!
//! - `wallet` - Wallet capability and the owner session
//! - `account` - Universal account handle, smart accounts, balances
//! - `aggregator` - Per-chain balances to one USD view
//! - `orchestrator` - Build, sign, submit and track convert transactions
//! - `relayer` - Relayer network seam (HTTP and simulated)
//! - `chains` / `amount` - Supported chains, tokens and decimal amounts

pub mod account;
pub mod aggregator;
pub mod amount;
pub mod chains;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod relayer;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_support;

pub use account::{UniversalAccountClient, UniversalAccountHandle};
pub use aggregator::{AggregatedAssets, AssetAggregator};
pub use error::{ErrorCategory, UaError};
pub use orchestrator::TransactionOrchestrator;
pub use wallet::WalletSession;
