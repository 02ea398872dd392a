// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Crate-level error type.
//!
//! Every failure the client can surface is a [`UaError`]. Each variant
//! belongs to exactly one [`ErrorCategory`], which tells the caller how to
//! react: retry, ask the user again, fix the input, rebuild the
//! transaction, or fix the integration.

use std::fmt;

/// How a failure should be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// No wallet capability or network unreachable. Retry may succeed.
    Connectivity,
    /// The user rejected a connect or sign request.
    Authorization,
    /// Bad input: missing project id, unsupported chain, invalid amount.
    Configuration,
    /// The relayer rejected a submission. The transaction must be rebuilt.
    Protocol,
    /// Operation attempted against an uninitialized or stale handle/session.
    State,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Connectivity => "connectivity",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::State => "state",
        };
        f.write_str(name)
    }
}

/// Errors returned by the universal account client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UaError {
    #[error("No browser wallet detected. Please install one.")]
    NoWalletDetected,

    #[error("Wallet request rejected by user: {0}")]
    UserRejected(String),

    #[error("Failed to connect wallet: {0}")]
    ConnectFailed(String),

    #[error("Wallet is not connected")]
    NotConnected,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("No project ID configured")]
    MissingProjectId,

    #[error("Invalid trade configuration: {0}")]
    InvalidTradeConfig(String),

    #[error("Universal account client is not initialized")]
    ClientNotInitialized,

    #[error("Universal account handle was superseded by a newer initialization")]
    StaleHandle,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unsupported token type: {0}")]
    UnsupportedToken(String),

    #[error("Signature request rejected: {0}")]
    SigningRejected(String),

    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),

    #[error("Relayer rejected submission: {0}")]
    RelayRejected(String),

    #[error("Transaction was invalidated by a session change: {0}")]
    TransactionInvalidated(String),
}

impl UaError {
    /// Category used to decide how the caller reacts to this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            UaError::NoWalletDetected
            | UaError::ConnectFailed(_)
            | UaError::NetworkError(_)
            | UaError::WalletUnavailable(_) => ErrorCategory::Connectivity,
            UaError::UserRejected(_) | UaError::SigningRejected(_) => {
                ErrorCategory::Authorization
            }
            UaError::InvalidAddress(_)
            | UaError::MissingProjectId
            | UaError::InvalidTradeConfig(_)
            | UaError::UnsupportedChain(_)
            | UaError::InvalidAmount(_)
            | UaError::UnsupportedToken(_) => ErrorCategory::Configuration,
            UaError::RelayRejected(_) => ErrorCategory::Protocol,
            UaError::NotConnected
            | UaError::ClientNotInitialized
            | UaError::StaleHandle
            | UaError::TransactionInvalidated(_) => ErrorCategory::State,
        }
    }

    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            UaError::NoWalletDetected => "no_wallet_detected",
            UaError::UserRejected(_) => "user_rejected",
            UaError::ConnectFailed(_) => "connect_failed",
            UaError::NotConnected => "not_connected",
            UaError::InvalidAddress(_) => "invalid_address",
            UaError::MissingProjectId => "missing_project_id",
            UaError::InvalidTradeConfig(_) => "invalid_trade_config",
            UaError::ClientNotInitialized => "client_not_initialized",
            UaError::StaleHandle => "stale_handle",
            UaError::NetworkError(_) => "network_error",
            UaError::UnsupportedChain(_) => "unsupported_chain",
            UaError::InvalidAmount(_) => "invalid_amount",
            UaError::UnsupportedToken(_) => "unsupported_token",
            UaError::SigningRejected(_) => "signing_rejected",
            UaError::WalletUnavailable(_) => "wallet_unavailable",
            UaError::RelayRejected(_) => "relay_rejected",
            UaError::TransactionInvalidated(_) => "transaction_invalidated",
        }
    }

    /// Whether repeating the same call unchanged may succeed.
    ///
    /// Authorization errors need a fresh user action, protocol errors need a
    /// rebuilt transaction, so only connectivity errors qualify.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Connectivity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(UaError::NoWalletDetected.category(), ErrorCategory::Connectivity);
        assert_eq!(
            UaError::NetworkError("timeout".into()).category(),
            ErrorCategory::Connectivity
        );
        assert_eq!(
            UaError::UserRejected("denied".into()).category(),
            ErrorCategory::Authorization
        );
        assert_eq!(
            UaError::SigningRejected("denied".into()).category(),
            ErrorCategory::Authorization
        );
        assert_eq!(UaError::MissingProjectId.category(), ErrorCategory::Configuration);
        assert_eq!(
            UaError::UnsupportedChain("999".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            UaError::RelayRejected("bad signature".into()).category(),
            ErrorCategory::Protocol
        );
        assert_eq!(UaError::NotConnected.category(), ErrorCategory::State);
        assert_eq!(UaError::StaleHandle.category(), ErrorCategory::State);
    }

    #[test]
    fn only_connectivity_is_retryable() {
        assert!(UaError::NetworkError("reset".into()).is_retryable());
        assert!(!UaError::RelayRejected("expired".into()).is_retryable());
        assert!(!UaError::SigningRejected("no".into()).is_retryable());
        assert!(!UaError::ClientNotInitialized.is_retryable());
    }

    #[test]
    fn error_codes_are_snake_case() {
        let errors = [
            UaError::NoWalletDetected,
            UaError::NotConnected,
            UaError::MissingProjectId,
            UaError::ClientNotInitialized,
            UaError::StaleHandle,
            UaError::RelayRejected("x".into()),
        ];
        for err in errors {
            let code = err.error_code();
            assert!(code.chars().all(|c| c.is_ascii_lowercase() || c == '_'), "{code}");
        }
    }

    #[test]
    fn relay_rejection_message_is_verbatim() {
        let err = UaError::RelayRejected("insufficient funds".into());
        assert_eq!(err.to_string(), "Relayer rejected submission: insufficient funds");
    }
}
