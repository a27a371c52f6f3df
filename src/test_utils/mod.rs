//! Scripted stand-ins for the light-client engine and the wallet daemon, for unit tests.

mod daemon;
mod engine;

pub use daemon::MockDaemon;
pub use engine::MockEngine;

use crate::wallet::backend::{Backend, EmbeddedBackend, RemoteBackend};
use crate::wallet::{HistoryBatch, TransactionDirection, TransactionSummary};

use std::path::PathBuf;
use std::sync::Arc;

pub const TEST_NETWORK: &str = "testnet3";

pub fn embedded_backend(engine: MockEngine) -> (Backend, Arc<MockEngine>) {
    embedded_backend_in(engine, std::env::temp_dir().join("wallet-session-sync-unused"))
}

pub fn embedded_backend_in(engine: MockEngine, wallet_dir: PathBuf) -> (Backend, Arc<MockEngine>) {
    let engine = Arc::new(engine);
    let backend = Backend::embedded(EmbeddedBackend::new(engine.clone(), TEST_NETWORK, wallet_dir));
    (backend, engine)
}

pub fn remote_backend(daemon: MockDaemon) -> Backend {
    Backend::remote(RemoteBackend::new(Arc::new(daemon), TEST_NETWORK))
}

pub fn tx(hash: &str, mined_height: i32) -> TransactionSummary {
    TransactionSummary {
        hash: hash.to_string(),
        mined_height,
        timestamp: 1_700_000_000 + mined_height.max(0) as i64 * 300,
        direction: TransactionDirection::Received,
        amount: 100_000,
        fee: 0,
    }
}

/// `count` transactions per block for every height in `heights`, plus `unmined` unmined ones
pub fn ledger(heights: std::ops::RangeInclusive<i32>, per_block: usize, unmined: usize) -> Vec<TransactionSummary> {
    let mut txs = Vec::new();
    for height in heights {
        for n in 0..per_block {
            txs.push(tx(&format!("{}-{}", height, n), height));
        }
    }
    for n in 0..unmined {
        txs.push(tx(&format!("unmined-{}", n), -1));
    }
    txs
}

/// History lookup the way wallet engines answer it.
///
/// `start_height == -1` begins with the unmined transactions, then mined ones newest first.
/// Whole blocks are returned, so a batch may run past `count` to finish its lowest block.
pub fn history_batch(all: &[TransactionSummary], start_height: i32, count: usize) -> HistoryBatch {
    let mut transactions: Vec<TransactionSummary> = Vec::new();
    if start_height == -1 {
        transactions.extend(all.iter().filter(|t| t.mined_height < 0).cloned());
    }

    let mut mined: Vec<&TransactionSummary> = all
        .iter()
        .filter(|t| t.mined_height >= 0 && (start_height == -1 || t.mined_height <= start_height))
        .collect();
    mined.sort_by(|a, b| b.mined_height.cmp(&a.mined_height));

    let mut lowest_height = None;
    for t in mined {
        if transactions.len() >= count && lowest_height != Some(t.mined_height) {
            break;
        }
        lowest_height = Some(t.mined_height);
        transactions.push(t.clone());
    }

    HistoryBatch {
        transactions,
        lowest_height,
    }
}
