// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Settlement Tracker
//!
//! Polls the relayer for one submitted transaction until it reaches a
//! terminal state. Transport failures are logged and retried on the next
//! tick; a rejection (for example an unknown transaction id) ends tracking.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`, like the wallet event
//! listener.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::UaError;
use crate::models::SettlementStatus;
use crate::relayer::{RelayerError, RelayerNetwork};

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct SettlementTracker {
    relayer: Arc<dyn RelayerNetwork>,
    poll_interval: Duration,
}

impl SettlementTracker {
    pub fn new(relayer: Arc<dyn RelayerNetwork>) -> Self {
        Self {
            relayer,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Poll until the transaction is terminal.
    ///
    /// Returns `Ok(None)` if `shutdown` fires first.
    pub async fn wait_for_settlement(
        &self,
        transaction_id: &str,
        shutdown: CancellationToken,
    ) -> Result<Option<SettlementStatus>, UaError> {
        info!(
            transaction_id = %transaction_id,
            interval_ms = self.poll_interval.as_millis() as u64,
            "Settlement tracking started"
        );

        loop {
            if shutdown.is_cancelled() {
                info!(transaction_id = %transaction_id, "Settlement tracking cancelled");
                return Ok(None);
            }

            match self.relayer.get_transaction_status(transaction_id).await {
                Ok(status) if status.is_terminal() => {
                    info!(transaction_id = %transaction_id, status = ?status, "Transaction settled");
                    return Ok(Some(status));
                }
                Ok(_) => {}
                Err(RelayerError::Transport(e)) => {
                    warn!(transaction_id = %transaction_id, error = %e, "Status poll failed");
                }
                Err(e) => return Err(e.into()),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    info!(transaction_id = %transaction_id, "Settlement tracking cancelled");
                    return Ok(None);
                }
            }
        }
    }

    /// Track in a background task.
    pub fn spawn(
        self,
        transaction_id: String,
        shutdown: CancellationToken,
    ) -> JoinHandle<Result<Option<SettlementStatus>, UaError>> {
        tokio::spawn(async move { self.wait_for_settlement(&transaction_id, shutdown).await })
    }
}
