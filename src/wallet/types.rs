use crate::daemon::DaemonError;
use crate::wallet::confirmations::{self, ConfirmationStatus};

use serde::{Deserialize, Serialize};

/// Result alias used across the wallet layer
pub type WalletResult<T> = Result<T, WalletError>;

/// Coarse classification of a [`WalletError`], for callers that only branch on the kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Unsupported,
    Cancelled,
    InvalidInput,
    Transient,
    Internal,
}

/// Errors surfaced by the session, sync and transaction helpers.
///
/// Every variant carries a message naming the operation and the identifier involved so
/// front-ends can render it without extra context.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WalletError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Backend unreachable: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::NotFound(_) => ErrorKind::NotFound,
            WalletError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            WalletError::Unsupported(_) => ErrorKind::Unsupported,
            WalletError::Cancelled(_) => ErrorKind::Cancelled,
            WalletError::InvalidInput(_) => ErrorKind::InvalidInput,
            WalletError::Transient(_) => ErrorKind::Transient,
            WalletError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Transient errors are safe to retry
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Prefix the message with the operation that failed, keeping the kind.
    pub fn context(self, operation: impl std::fmt::Display) -> Self {
        let wrap = |msg: String| format!("{}: {}", operation, msg);
        match self {
            WalletError::NotFound(m) => WalletError::NotFound(wrap(m)),
            WalletError::AlreadyExists(m) => WalletError::AlreadyExists(wrap(m)),
            WalletError::Unsupported(m) => WalletError::Unsupported(wrap(m)),
            WalletError::Cancelled(m) => WalletError::Cancelled(wrap(m)),
            WalletError::InvalidInput(m) => WalletError::InvalidInput(wrap(m)),
            WalletError::Transient(m) => WalletError::Transient(wrap(m)),
            WalletError::Internal(m) => WalletError::Internal(wrap(m)),
        }
    }
}

impl From<DaemonError> for WalletError {
    fn from(err: DaemonError) -> Self {
        match &err {
            DaemonError::Rpc { code, message } => match *code {
                crate::daemon::STATUS_ALREADY_EXISTS => WalletError::AlreadyExists(message.clone()),
                crate::daemon::STATUS_NOT_FOUND => WalletError::NotFound(message.clone()),
                crate::daemon::STATUS_UNAVAILABLE => WalletError::Transient(message.clone()),
                crate::daemon::STATUS_CANCELLED => WalletError::Cancelled(message.clone()),
                _ => WalletError::Internal(err.to_string()),
            },
            DaemonError::HttpError(_) | DaemonError::WebSocketError(_) => {
                WalletError::Transient(err.to_string())
            }
            _ => WalletError::Internal(err.to_string()),
        }
    }
}

impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => WalletError::NotFound(err.to_string()),
            std::io::ErrorKind::AlreadyExists => WalletError::AlreadyExists(err.to_string()),
            _ => WalletError::Internal(err.to_string()),
        }
    }
}

/// Direction of a wallet transaction relative to this wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionDirection {
    Sent,
    Received,
    Transferred,
    Unknown,
}

/// A transaction as listed in the wallet history.
///
/// `mined_height` is negative for transactions that have not been mined yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub hash: String,
    pub mined_height: i32,
    /// Unix timestamp (seconds)
    pub timestamp: i64,
    pub direction: TransactionDirection,
    /// Net amount in atoms
    pub amount: i64,
    /// Fee in atoms
    pub fee: i64,
}

impl TransactionSummary {
    /// Confirmation count and status for this transaction at the given chain tip.
    pub fn confirmations(&self, best_height: u32, required: i32) -> (i32, ConfirmationStatus) {
        // Clamp tips beyond the classifier's range
        let best_height = i32::try_from(best_height).unwrap_or(i32::MAX);
        confirmations::classify(self.mined_height, best_height, required)
    }
}

/// A batch of history as returned by a backend.
///
/// `lowest_height` is the lowest block height among the mined transactions of the batch,
/// `None` when the batch holds no mined transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryBatch {
    pub transactions: Vec<TransactionSummary>,
    pub lowest_height: Option<i32>,
}

/// Connection summary shown by front-ends next to the balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub network_type: String,
    pub latest_block: u32,
    pub peers_connected: i32,
}

/// An unspent output, referenced only to aggregate its amount
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoRef {
    pub output_key: String,
    /// Amount in atoms
    pub amount: i64,
}

/// Sum the amounts of a set of selected outputs.
pub fn sum_utxos(utxos: &[UtxoRef]) -> i64 {
    utxos.iter().map(|u| u.amount).sum()
}
