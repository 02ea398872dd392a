// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP relayer client.
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | derive smart accounts | `POST /v1/accounts/derive` |
//! | fetch assets | `POST /v1/accounts/assets` |
//! | build intent | `POST /v1/transactions/build` |
//! | submit | `POST /v1/transactions/submit` |
//! | status | `GET /v1/transactions/{id}` |
//!
//! Transaction ids are opaque. They are sent back as a single
//! percent-encoded path segment, never interpreted.
//!
//! Bodies are camelCase JSON. Every request carries an `x-request-id`;
//! project-scoped requests also carry `x-project-id`. A 4xx answer is the
//! relayer refusing the request and its body is passed on verbatim. Anything
//! else that goes wrong is a transport failure.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Bytes, B256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use super::{BuildRequest, RelayerError, RelayerNetwork, RelayerResult};
use crate::aggregator::{AssetSnapshot, ChainBalances, RawTokenBalance};
use crate::chains::ChainId;
use crate::models::{
    BuiltTransaction, ConvertIntent, OwnerAddress, SettlementStatus, SignedSubmission,
    SmartAccountAddresses, SubmissionResult, TradeConfig,
};

const PROJECT_ID_HEADER: &str = "x-project-id";
const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OwnerRequest<'a> {
    owner_address: &'a OwnerAddress,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetsResponse {
    chains: Vec<ChainAssets>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainAssets {
    chain_id: u64,
    #[serde(default)]
    tokens: Vec<RawTokenBalance>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildBody<'a> {
    owner_address: &'a OwnerAddress,
    #[serde(flatten)]
    intent: &'a ConvertIntent,
    trade_config: &'a TradeConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildResponse {
    root_hash: String,
    payload: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody {
    owner_address: OwnerAddress,
    root_hash: String,
    payload: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Relayer reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRelayer {
    base_url: Url,
    http: Client,
}

impl HttpRelayer {
    pub fn new(base_url: &Url, timeout: Duration) -> RelayerResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayerError::Transport(format!("failed to build HTTP client: {e}")))?;

        if base_url.cannot_be_a_base() {
            return Err(RelayerError::Transport(format!(
                "relayer URL {base_url} cannot carry a path"
            )));
        }

        Ok(Self {
            base_url: base_url.clone(),
            http,
        })
    }

    /// `segments` appended to the base URL, each percent-encoded on its own.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post_json<B, R>(
        &self,
        segments: &[&str],
        project_id: &str,
        body: &B,
    ) -> RelayerResult<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(segments);
        let path = url.path().to_string();
        let request = self
            .http
            .post(url)
            .header(PROJECT_ID_HEADER, project_id)
            .json(body);
        self.send(request, "POST", &path).await
    }

    async fn get_json<R: DeserializeOwned>(&self, segments: &[&str]) -> RelayerResult<R> {
        let url = self.endpoint(segments);
        let path = url.path().to_string();
        let request = self.http.get(url);
        self.send(request, "GET", &path).await
    }

    async fn send<R: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
        path: &str,
    ) -> RelayerResult<R> {
        let request_id = Uuid::new_v4().to_string();
        debug!(request_id = %request_id, "{method} {path}");

        let response = request
            .header(REQUEST_ID_HEADER, &request_id)
            .send()
            .await
            .map_err(|e| RelayerError::Transport(format!("{method} {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(request_id = %request_id, error = %e, "Failed to read error body");
                    String::new()
                }
            };
            warn!(request_id = %request_id, %status, "{method} {path} returned an error");
            return Err(classify_failure(status, &body, method, path));
        }

        response.json().await.map_err(|e| {
            RelayerError::InvalidResponse(format!("{method} {path} invalid JSON: {e}"))
        })
    }
}

/// Map a non-success response to a relayer error.
fn classify_failure(status: StatusCode, body: &str, method: &str, path: &str) -> RelayerError {
    if status.is_client_error() {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.message)
            .unwrap_or_else(|_| body.trim().to_string());
        if message.is_empty() {
            return RelayerError::Rejected(format!("{method} {path} returned {status}"));
        }
        RelayerError::Rejected(message)
    } else {
        RelayerError::Transport(format!("{method} {path} returned {status}: {body}"))
    }
}

fn snapshot_from_response(
    owner: &OwnerAddress,
    project_id: &str,
    response: AssetsResponse,
) -> AssetSnapshot {
    let chains = response
        .chains
        .into_iter()
        .filter_map(|c| match ChainId::try_from(c.chain_id) {
            Ok(chain) => Some(ChainBalances {
                chain,
                result: match c.error {
                    Some(reason) => Err(reason),
                    None => Ok(c.tokens),
                },
            }),
            Err(_) => {
                debug!(chain_id = c.chain_id, "Ignoring balances for unsupported chain");
                None
            }
        })
        .collect();

    AssetSnapshot {
        owner: *owner,
        project_id: project_id.to_string(),
        fetched_at: Utc::now(),
        chains,
    }
}

fn built_from_response(response: BuildResponse) -> RelayerResult<BuiltTransaction> {
    let root_hash = B256::from_str(&response.root_hash)
        .map_err(|e| RelayerError::InvalidResponse(format!("rootHash: {e}")))?;
    let payload = Bytes::from_str(&response.payload)
        .map_err(|e| RelayerError::InvalidResponse(format!("payload: {e}")))?;

    Ok(BuiltTransaction {
        root_hash,
        payload,
        created_at: response.created_at,
        expires_at: response.expires_at,
    })
}

#[async_trait]
impl RelayerNetwork for HttpRelayer {
    async fn derive_smart_accounts(
        &self,
        owner: &OwnerAddress,
        project_id: &str,
    ) -> RelayerResult<SmartAccountAddresses> {
        let addresses: SmartAccountAddresses = self
            .post_json(
                &["v1", "accounts", "derive"],
                project_id,
                &OwnerRequest {
                    owner_address: owner,
                },
            )
            .await?;

        if addresses.owner_address != *owner {
            return Err(RelayerError::InvalidResponse(format!(
                "derived accounts belong to {} instead of {owner}",
                addresses.owner_address
            )));
        }
        Ok(addresses)
    }

    async fn fetch_aggregated_assets(
        &self,
        owner: &OwnerAddress,
        project_id: &str,
    ) -> RelayerResult<AssetSnapshot> {
        let response: AssetsResponse = self
            .post_json(
                &["v1", "accounts", "assets"],
                project_id,
                &OwnerRequest {
                    owner_address: owner,
                },
            )
            .await?;

        Ok(snapshot_from_response(owner, project_id, response))
    }

    async fn build_intent_transaction(
        &self,
        request: BuildRequest<'_>,
    ) -> RelayerResult<BuiltTransaction> {
        let response: BuildResponse = self
            .post_json(
                &["v1", "transactions", "build"],
                request.project_id,
                &BuildBody {
                    owner_address: request.owner,
                    intent: request.intent,
                    trade_config: request.trade_config,
                },
            )
            .await?;

        built_from_response(response)
    }

    async fn submit_signed_transaction(
        &self,
        submission: &SignedSubmission,
    ) -> RelayerResult<SubmissionResult> {
        let tx = submission.transaction();
        let body = SubmitBody {
            owner_address: *tx.owner(),
            root_hash: tx.root_hash_hex(),
            payload: alloy::hex::encode_prefixed(tx.payload()),
            signature: submission.signature_hex(),
        };

        let result: SubmissionResult = self
            .post_json(&["v1", "transactions", "submit"], tx.project_id(), &body)
            .await?;

        if result.transaction_id.trim().is_empty() {
            return Err(RelayerError::InvalidResponse(
                "submission accepted without a transaction id".into(),
            ));
        }

        info!(
            transaction_id = %result.transaction_id,
            root_hash = %body.root_hash,
            "Relayer accepted submission"
        );
        Ok(result)
    }

    async fn get_transaction_status(
        &self,
        transaction_id: &str,
    ) -> RelayerResult<SettlementStatus> {
        if transaction_id.is_empty() {
            return Err(RelayerError::Rejected("empty transaction id".into()));
        }
        self.get_json(&["v1", "transactions", transaction_id]).await
    }
}
