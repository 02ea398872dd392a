// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use universal_account_client::{
    chains::{ChainId, TokenType},
    config::{ClientConfig, OwnerKeySource},
    logging::init_logging,
    models::ConvertIntent,
    relayer::{HttpRelayer, RelayerNetwork, SimulatedRelayer},
    wallet::{LocalKeyWallet, WalletProvider},
    TransactionOrchestrator, UaError, UniversalAccountClient, WalletSession,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = ClientConfig::from_env();
    let format = config.as_ref().map(|c| c.log_format).unwrap_or_default();
    if let Err(e) = init_logging(format) {
        eprintln!("Failed to initialise logging: {e}");
    }

    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.error_code(), category = %e.category(), "{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_wallet(source: &OwnerKeySource) -> Result<Arc<dyn WalletProvider>, UaError> {
    let wallet = match source {
        OwnerKeySource::Hex(hex) => LocalKeyWallet::from_hex(hex),
        OwnerKeySource::PemPath(path) => LocalKeyWallet::from_pem_file(path),
    }
    .map_err(|e| UaError::WalletUnavailable(e.to_string()))?;
    Ok(Arc::new(wallet))
}

fn load_relayer(config: &ClientConfig) -> Result<Arc<dyn RelayerNetwork>, UaError> {
    match &config.relayer_url {
        Some(url) => {
            info!(relayer = %url, "Using HTTP relayer");
            Ok(Arc::new(HttpRelayer::new(url, config.relayer_timeout)?))
        }
        None => {
            warn!("No relayer URL configured, using the simulated relayer");
            Ok(Arc::new(SimulatedRelayer::new()))
        }
    }
}

async fn run(config: ClientConfig) -> Result<(), UaError> {
    let wallet = config.owner_key.as_ref().map(load_wallet).transpose()?;
    let relayer = load_relayer(&config)?;

    let session = WalletSession::new(wallet);
    let owner = session.connect().await?;

    let shutdown = CancellationToken::new();
    let listener = session.spawn_event_listener(shutdown.clone());

    let client = Arc::new(UniversalAccountClient::new(relayer));
    client
        .initialize(&config.project_id, owner, config.trade_config)
        .await?;

    let accounts = client.get_smart_account_options().await?;
    info!(
        owner = %accounts.owner_address,
        evm = %accounts.evm_address,
        solana = %accounts.solana_address,
        "Smart accounts"
    );

    let assets = client.get_primary_assets().await?;
    for entry in &assets.per_chain_balances {
        info!(
            chain = %entry.chain_id,
            token = %entry.token_type,
            amount = %entry.amount,
            value_usd = %entry.value_usd,
            flag = ?entry.flag,
            "Balance"
        );
    }
    info!(
        total_usd = %assets.total_value_usd,
        degraded = assets.is_degraded(),
        "Portfolio"
    );

    if let Some(amount) = &config.convert_amount {
        let orchestrator = TransactionOrchestrator::new(session.clone(), client.clone());
        let intent = ConvertIntent::new(TokenType::Usdc, amount.as_str(), ChainId::SolanaMainnet);
        let result = orchestrator.convert(intent).await?;
        info!(
            transaction_id = %result.transaction_id,
            explorer = %result.explorer_url(),
            "Convert submitted, tracking settlement"
        );

        let tracking = orchestrator
            .tracker()
            .spawn(result.transaction_id.clone(), shutdown.clone());

        tokio::select! {
            outcome = tracking => match outcome {
                Ok(Ok(Some(status))) => info!(status = ?status, "Settlement finished"),
                Ok(Ok(None)) => {}
                Ok(Err(e)) => warn!(error = %e, "Settlement tracking stopped"),
                Err(e) => warn!(error = %e, "Settlement tracker task failed"),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping settlement tracking");
            }
        }
    }

    shutdown.cancel();
    if let Some(listener) = listener {
        let _ = listener.await;
    }
    Ok(())
}
