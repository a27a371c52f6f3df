//! Wire types for the wallet daemon RPC and its sync notification stream

use crate::wallet::TransactionSummary;

use serde::{Deserialize, Serialize};

/// Status code reported when the call was cancelled on the daemon side
pub const STATUS_CANCELLED: i64 = 1;
/// Status code reported when the requested wallet does not exist
pub const STATUS_NOT_FOUND: i64 = 5;
/// Status code reported when the wallet is already created or loaded
pub const STATUS_ALREADY_EXISTS: i64 = 6;
/// Status code reported while the daemon cannot serve requests
pub const STATUS_UNAVAILABLE: i64 = 14;

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: serde_json::Value,
}

/// Error object of a JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// JSON-RPC 2.0 response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// Result of the `gettransactions` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsPage {
    #[serde(default)]
    pub transactions: Vec<TransactionSummary>,
    /// Lowest mined height in the page, absent when nothing in it is mined
    #[serde(default)]
    pub lowest_height: Option<i32>,
}

/// Notifications pushed by the daemon while it runs SPV sync.
///
/// Header counts are per notification, not cumulative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SpvSyncNotification {
    /// A peer connected; `peer_count` is the new total
    #[serde(rename_all = "camelCase")]
    PeerConnected { peer_count: i32 },
    /// A peer disconnected; `peer_count` is the new total
    #[serde(rename_all = "camelCase")]
    PeerDisconnected { peer_count: i32 },
    /// A batch of headers was fetched
    #[serde(rename_all = "camelCase")]
    FetchedHeaders {
        fetched_headers_count: u32,
        /// Unix timestamp of the last header in the batch
        last_header_time: i64,
    },
    /// Address discovery started (`finished == false`) or ended
    DiscoverAddresses { finished: bool },
    /// Rescan has processed blocks up to this height
    #[serde(rename_all = "camelCase")]
    RescanProgress { rescanned_through: u32 },
    /// The wallet is in sync with the network
    Synced { synced: bool },
    /// The wallet fell behind again after being in sync
    Unsynced,
}

/// Error types for daemon transport and RPC status failures
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("No data returned for {0}")]
    NoData(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Subscription error: {0}")]
    SubscriptionError(String),
}
