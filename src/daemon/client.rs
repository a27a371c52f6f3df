//! JSON-RPC client for a remote wallet daemon.
//!
//! Request/response calls go over HTTP; the SPV sync notification stream is a WebSocket
//! subscription. All methods are async and designed for use with Tokio.

use super::types::*;

use async_trait::async_trait;
use backoff::{ExponentialBackoff, future::retry};
use futures_util::{SinkExt, Stream, StreamExt};
use reqwest::Client;
use serde_json::json;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Stream of sync notifications pushed by the daemon
pub type NotificationStream =
    Pin<Box<dyn Stream<Item = Result<SpvSyncNotification, DaemonError>> + Send>>;

/// Calls the remote backend needs from a wallet daemon.
///
/// The daemon owns the wallet session; implementors only forward requests.
#[async_trait]
pub trait DaemonTransport: Send + Sync {
    async fn wallet_exists(&self) -> Result<bool, DaemonError>;

    /// `seed_hex` is the hex encoded seed entropy
    async fn create_wallet(&self, passphrase: &str, seed_hex: &str) -> Result<(), DaemonError>;

    async fn open_wallet(&self) -> Result<(), DaemonError>;

    async fn best_block(&self) -> Result<u32, DaemonError>;

    async fn subscribe_to_block_notifications(&self) -> Result<(), DaemonError>;

    async fn publish_unmined_transactions(&self) -> Result<(), DaemonError>;

    async fn next_address(&self, account: u32) -> Result<String, DaemonError>;

    async fn transactions(
        &self,
        start_height: i32,
        count: usize,
    ) -> Result<TransactionsPage, DaemonError>;

    async fn rescan(&self) -> Result<(), DaemonError>;

    /// Start SPV sync on the daemon and subscribe to its notifications.
    async fn spv_sync(&self) -> Result<NotificationStream, DaemonError>;
}

/// Wallet daemon client over JSON-RPC
pub struct DaemonRpcClient {
    /// The underlying HTTP client for RPC calls.
    http_client: Client,
    /// The HTTP JSON-RPC endpoint.
    rpc_url: String,
    /// The WebSocket endpoint for notification subscriptions.
    ws_url: String,
    next_id: AtomicU64,
    /// Upper bound for retrying idempotent calls while the daemon is unreachable.
    max_retry_elapsed: Duration,
}

impl DaemonRpcClient {
    /// Create a new daemon client.
    ///
    /// # Arguments
    /// * `rpc_url` - The HTTP endpoint for JSON-RPC calls.
    /// * `ws_url` - The WebSocket endpoint for notifications.
    pub fn new(rpc_url: String, ws_url: String) -> Result<Self, DaemonError> {
        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            http_client,
            rpc_url,
            ws_url,
            next_id: AtomicU64::new(1),
            max_retry_elapsed: Duration::from_secs(30),
        })
    }

    /// Override how long idempotent calls are retried while the daemon is unreachable
    pub fn with_max_retry_elapsed(mut self, max_retry_elapsed: Duration) -> Self {
        self.max_retry_elapsed = max_retry_elapsed;
        self
    }

    /// Execute a single JSON-RPC call.
    ///
    /// # Returns
    /// The `result` member of the response, or `DaemonError::Rpc` when the daemon answered with
    /// an error object.
    pub async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, DaemonError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        debug!("Calling daemon method {} (id {})", method, request.id);

        let response = self
            .http_client
            .post(&self.rpc_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: RpcResponse = response.json().await?;

        if let Some(err) = body.error {
            return Err(DaemonError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        Ok(body.result.unwrap_or(serde_json::Value::Null))
    }

    /// Execute a call that is safe to repeat, retrying while the daemon is unreachable.
    ///
    /// RPC error objects are final; only transport failures are retried.
    async fn call_idempotent(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, DaemonError> {
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(self.max_retry_elapsed),
            ..ExponentialBackoff::default()
        };

        retry(policy, || async {
            self.call(method, params.clone()).await.map_err(|e| match e {
                DaemonError::HttpError(_) => {
                    warn!("Daemon call {} failed, retrying: {}", method, e);
                    backoff::Error::transient(e)
                }
                other => backoff::Error::permanent(other),
            })
        })
        .await
    }
}

#[async_trait]
impl DaemonTransport for DaemonRpcClient {
    async fn wallet_exists(&self) -> Result<bool, DaemonError> {
        let result = self.call_idempotent("walletexists", json!([])).await?;
        wallet_exists_from(&result)
    }

    async fn create_wallet(&self, passphrase: &str, seed_hex: &str) -> Result<(), DaemonError> {
        self.call(
            "createwallet",
            json!({
                "privatePassphrase": passphrase,
                "seed": seed_hex,
            }),
        )
        .await?;
        info!("Daemon created wallet");
        Ok(())
    }

    async fn open_wallet(&self) -> Result<(), DaemonError> {
        self.call("openwallet", json!({})).await?;
        Ok(())
    }

    async fn best_block(&self) -> Result<u32, DaemonError> {
        let result = self.call_idempotent("bestblock", json!([])).await?;
        best_block_from(&result)
    }

    async fn subscribe_to_block_notifications(&self) -> Result<(), DaemonError> {
        self.call("subscribetoblocknotifications", json!({})).await?;
        Ok(())
    }

    async fn publish_unmined_transactions(&self) -> Result<(), DaemonError> {
        self.call("publishunminedtransactions", json!({})).await?;
        Ok(())
    }

    async fn next_address(&self, account: u32) -> Result<String, DaemonError> {
        let result = self
            .call("nextaddress", json!({ "account": account }))
            .await?;
        address_from(&result)
    }

    async fn transactions(
        &self,
        start_height: i32,
        count: usize,
    ) -> Result<TransactionsPage, DaemonError> {
        let result = self
            .call_idempotent(
                "gettransactions",
                json!({
                    "startHeight": start_height,
                    "count": count,
                }),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn rescan(&self) -> Result<(), DaemonError> {
        self.call("rescanblockchain", json!({})).await?;
        Ok(())
    }

    async fn spv_sync(&self) -> Result<NotificationStream, DaemonError> {
        debug!("Attempting WebSocket connection to: {}", self.ws_url);

        let (ws_stream, response) = connect_async(self.ws_url.as_str()).await?;
        debug!(
            "WebSocket connection established, response status: {}",
            response.status()
        );
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let subscribe_message = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": "spvsync",
            "params": {},
        });
        ws_sender
            .send(Message::Text(subscribe_message.to_string()))
            .await?;

        // The first frame answers the subscribe request
        match ws_receiver.next().await {
            Some(msg) => match msg? {
                Message::Text(text) => {
                    let ack: RpcResponse = serde_json::from_str(&text)?;
                    if let Some(err) = ack.error {
                        return Err(DaemonError::Rpc {
                            code: err.code,
                            message: err.message,
                        });
                    }
                }
                _ => {
                    return Err(DaemonError::SubscriptionError(
                        "Unexpected message type during subscribe".to_string(),
                    ));
                }
            },
            None => {
                return Err(DaemonError::SubscriptionError(
                    "Connection closed before subscribe was acknowledged".to_string(),
                ));
            }
        }

        info!("Subscribed to daemon sync notifications");

        let stream = ws_receiver.filter_map(|msg| async move {
            match msg {
                Ok(Message::Text(text)) => notification_from_frame(&text),
                // Ping/pong and close frames carry no notification
                Ok(_) => None,
                Err(e) => Some(Err(DaemonError::WebSocketError(e))),
            }
        });

        Ok(Box::pin(stream))
    }
}

fn wallet_exists_from(result: &serde_json::Value) -> Result<bool, DaemonError> {
    result
        .get("exists")
        .and_then(|e| e.as_bool())
        .ok_or_else(|| DaemonError::NoData("walletexists".to_string()))
}

fn best_block_from(result: &serde_json::Value) -> Result<u32, DaemonError> {
    result
        .get("height")
        .and_then(|h| h.as_u64())
        .and_then(|h| u32::try_from(h).ok())
        .ok_or_else(|| DaemonError::NoData("bestblock".to_string()))
}

fn address_from(result: &serde_json::Value) -> Result<String, DaemonError> {
    result
        .get("address")
        .and_then(|a| a.as_str())
        .map(|a| a.to_string())
        .ok_or_else(|| DaemonError::NoData("nextaddress".to_string()))
}

/// Parse one text frame of the `spvsync` subscription.
///
/// Returns `None` for frames that carry no notification.
fn notification_from_frame(text: &str) -> Option<Result<SpvSyncNotification, DaemonError>> {
    let parsed = match serde_json::from_str::<serde_json::Value>(text) {
        Ok(parsed) => parsed,
        Err(e) => return Some(Err(DaemonError::JsonError(e))),
    };

    if let Some(err) = parsed.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown subscription error");
        return Some(Err(DaemonError::SubscriptionError(message.to_string())));
    }

    match parsed.get("params") {
        Some(params) => match serde_json::from_value::<SpvSyncNotification>(params.clone()) {
            Ok(notification) => Some(Ok(notification)),
            Err(e) => {
                error!("Failed to deserialize sync notification: {}", e);
                Some(Err(DaemonError::JsonError(e)))
            }
        },
        None => {
            debug!("Ignoring frame without params: {}", text);
            None
        }
    }
}
