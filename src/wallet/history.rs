//! Backward pagination through transaction history, keyed by block height.
//!
//! Each page ends on a block boundary; the next page starts one block below the lowest block
//! seen. A chain reorganization between two calls is not detected and may repeat or skip
//! transactions.

use crate::wallet::backend::{Backend, WalletBackend};
use crate::wallet::{TransactionSummary, WalletError, WalletResult};

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Transactions per page unless the caller asks otherwise
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Next block height to query; `-1` means start from the most recent transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryCursor(pub i32);

impl HistoryCursor {
    pub const START: HistoryCursor = HistoryCursor(-1);

    pub fn is_start(self) -> bool {
        self.0 == -1
    }
}

impl Default for HistoryCursor {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for HistoryCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_start() {
            write!(f, "latest")
        } else {
            write!(f, "height {}", self.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub transactions: Vec<TransactionSummary>,
    /// `None` once there is nothing older to fetch
    pub next_cursor: Option<HistoryCursor>,
}

impl HistoryPage {
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// Fetch one page of history starting at `cursor`.
///
/// The walk is over when the backend returns fewer than `page_size` transactions or the
/// lowest block in the page is the genesis block. Waits on the backend are abandoned with
/// `Cancelled` when `cancel` fires.
pub async fn next_page(
    backend: &Backend,
    cancel: &CancellationToken,
    cursor: HistoryCursor,
    page_size: usize,
) -> WalletResult<HistoryPage> {
    if page_size == 0 {
        return Err(WalletError::InvalidInput(
            "transaction history: page size must be greater than zero".to_string(),
        ));
    }
    if cursor.0 < -1 {
        return Err(WalletError::InvalidInput(format!(
            "transaction history: invalid cursor {}",
            cursor.0
        )));
    }

    let batch = tokio::select! {
        batch = backend.transaction_history(cursor.0, page_size) => batch
            .map_err(|e| e.context(format!("transaction history from {}", cursor)))?,
        _ = cancel.cancelled() => {
            return Err(WalletError::Cancelled(format!("transaction history from {}", cursor)));
        }
    };

    let full_page = batch.transactions.len() >= page_size;
    let next_cursor = match batch.lowest_height {
        _ if !full_page => None,
        Some(lowest) if lowest <= 0 => None,
        Some(lowest) => Some(HistoryCursor(lowest - 1)),
        // A full page of unmined transactions: mined history starts at the tip
        None if cursor.is_start() => {
            let tip = tokio::select! {
                tip = backend.best_block_height() => tip.map_err(|e| e.context("transaction history"))?,
                _ = cancel.cancelled() => {
                    return Err(WalletError::Cancelled(format!("transaction history from {}", cursor)));
                }
            };
            Some(HistoryCursor(tip as i32))
        }
        None => None,
    };

    debug!(
        "History page from {}: {} transactions, next {:?}",
        cursor,
        batch.transactions.len(),
        next_cursor
    );

    Ok(HistoryPage {
        transactions: batch.transactions,
        next_cursor,
    })
}
