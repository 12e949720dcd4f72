//! Hand-off of payout batches to whatever signs and sends them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use ridethebus_execution::batcher::Batch;
use ridethebus_execution::TransferOperation;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum BroadcastError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("relay rejected batch: {0}")]
    Rejected(String),
}

/// Sends one ordered batch and returns an opaque id for it.
pub trait Broadcaster: Send + Sync {
    fn broadcast<'a>(
        &'a self,
        token_mint: &'a str,
        batch: &'a Batch<TransferOperation>,
    ) -> BoxFuture<'a, Result<String, BroadcastError>>;
}

/// Logs batches instead of sending them.
#[derive(Default)]
pub struct DryRunBroadcaster {
    sent: AtomicU64,
}

impl DryRunBroadcaster {
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

impl Broadcaster for DryRunBroadcaster {
    fn broadcast<'a>(
        &'a self,
        token_mint: &'a str,
        batch: &'a Batch<TransferOperation>,
    ) -> BoxFuture<'a, Result<String, BroadcastError>> {
        Box::pin(async move {
            let index = self.sent.fetch_add(1, Ordering::Relaxed);
            for transfer in &batch.operations {
                info!(
                    wallet = transfer.wallet.as_str(),
                    amount = transfer.amount,
                    mint = token_mint,
                    "dry run transfer"
                );
            }
            Ok(format!("dry-run-{index}"))
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayRequest<'a> {
    mint: &'a str,
    transfers: &'a [TransferOperation],
}

#[derive(Deserialize)]
struct RelayResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// POSTs each batch as JSON to a signing relay.
pub struct HttpBroadcaster {
    client: reqwest::Client,
    url: String,
}

impl HttpBroadcaster {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BroadcastError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Broadcaster for HttpBroadcaster {
    fn broadcast<'a>(
        &'a self,
        token_mint: &'a str,
        batch: &'a Batch<TransferOperation>,
    ) -> BoxFuture<'a, Result<String, BroadcastError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.url)
                .json(&RelayRequest {
                    mint: token_mint,
                    transfers: &batch.operations,
                })
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(BroadcastError::FailedWithBody { status, body });
            }
            let relay: RelayResponse = response.json().await?;
            match (relay.id, relay.error) {
                (_, Some(error)) => Err(BroadcastError::Rejected(error)),
                (Some(id), None) => Ok(id),
                (None, None) => Err(BroadcastError::Rejected(
                    "relay returned no id".to_string(),
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use ridethebus_execution::batcher;

    fn batch() -> Batch<TransferOperation> {
        let transfers = vec![TransferOperation {
            wallet: "alice".to_string(),
            amount: 10,
        }];
        batcher::pack(transfers, 900).remove(0)
    }

    #[tokio::test]
    async fn test_dry_run_counts_batches() {
        let broadcaster = DryRunBroadcaster::default();
        let id = broadcaster.broadcast("mint", &batch()).await.unwrap();
        assert_eq!(id, "dry-run-0");
        assert_eq!(broadcaster.sent(), 1);
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/relay")
    }

    #[tokio::test]
    async fn test_http_broadcaster_returns_relay_id() {
        let router = Router::new().route(
            "/relay",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["mint"], "mint");
                assert_eq!(body["transfers"][0]["wallet"], "alice");
                Json(serde_json::json!({ "id": "tx-1" }))
            }),
        );
        let url = serve(router).await;
        let broadcaster = HttpBroadcaster::new(url, Duration::from_secs(5)).unwrap();
        let id = broadcaster.broadcast("mint", &batch()).await.unwrap();
        assert_eq!(id, "tx-1");
    }

    #[tokio::test]
    async fn test_http_broadcaster_surfaces_failures() {
        let router = Router::new().route(
            "/relay",
            post(|| async { (axum::http::StatusCode::BAD_GATEWAY, "down") }),
        );
        let url = serve(router).await;
        let broadcaster = HttpBroadcaster::new(url, Duration::from_secs(5)).unwrap();
        let err = broadcaster.broadcast("mint", &batch()).await.unwrap_err();
        assert!(matches!(err, BroadcastError::FailedWithBody { .. }));
    }
}
