use super::history_batch;
use crate::wallet::sync::events::{RawEventSink, RawSyncEvent};
use crate::wallet::{HistoryBatch, LightWalletEngine, TransactionSummary, WalletError, WalletResult};

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct EngineState {
    exists: bool,
    opened: bool,
    open_delay: Option<Duration>,
    open_error: Option<WalletError>,
    best_block: u32,
    peers: i32,
    address_error_after: Option<usize>,
    repeat_addresses: bool,
    transactions: Vec<TransactionSummary>,
    sync_script: Vec<RawSyncEvent>,
    sync_error: Option<WalletError>,
}

/// Light-client engine whose answers are set up by the test
#[derive(Default)]
pub struct MockEngine {
    state: Mutex<EngineState>,
    addresses_issued: AtomicUsize,
    sync_calls: AtomicUsize,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().unwrap()
    }

    pub fn set_exists(&self, exists: bool) {
        self.state().exists = exists;
    }

    pub fn set_open_delay(&self, delay: Duration) {
        self.state().open_delay = Some(delay);
    }

    pub fn set_open_error(&self, error: WalletError) {
        self.state().open_error = Some(error);
    }

    pub fn set_best_block(&self, height: u32) {
        self.state().best_block = height;
    }

    pub fn set_peers(&self, peers: i32) {
        self.state().peers = peers;
    }

    /// Fail address generation once `n` addresses were issued
    pub fn fail_addresses_after(&self, n: usize) {
        self.state().address_error_after = Some(n);
    }

    /// Hand out the same address every time
    pub fn repeat_addresses(&self) {
        self.state().repeat_addresses = true;
    }

    pub fn set_transactions(&self, transactions: Vec<TransactionSummary>) {
        self.state().transactions = transactions;
    }

    /// Events pushed, in order, when sync starts
    pub fn set_sync_script(&self, events: Vec<RawSyncEvent>) {
        self.state().sync_script = events;
    }

    pub fn set_sync_error(&self, error: WalletError) {
        self.state().sync_error = Some(error);
    }

    pub fn wallet_opened_flag(&self) -> bool {
        self.state().opened
    }

    pub fn addresses_issued(&self) -> usize {
        self.addresses_issued.load(Ordering::SeqCst)
    }

    pub fn sync_calls(&self) -> usize {
        self.sync_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LightWalletEngine for MockEngine {
    async fn wallet_exists(&self) -> WalletResult<bool> {
        Ok(self.state().exists)
    }

    async fn create_wallet(&self, _private_passphrase: &str, _seed_words: &str) -> WalletResult<()> {
        let mut state = self.state();
        state.exists = true;
        state.opened = true;
        Ok(())
    }

    async fn open_wallet(&self, public_passphrase: &str) -> WalletResult<()> {
        assert_eq!(public_passphrase, "public");
        let delay = self.state().open_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if let Some(error) = state.open_error.clone() {
            return Err(error);
        }
        state.opened = true;
        Ok(())
    }

    fn wallet_opened(&self) -> bool {
        self.state().opened
    }

    async fn shutdown(&self) {
        self.state().opened = false;
    }

    async fn best_block(&self) -> WalletResult<u32> {
        Ok(self.state().best_block)
    }

    fn peer_count(&self) -> i32 {
        self.state().peers
    }

    async fn spv_sync(&self, sink: RawEventSink) -> WalletResult<()> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        let (script, error) = {
            let state = self.state();
            (state.sync_script.clone(), state.sync_error.clone())
        };
        if let Some(error) = error {
            return Err(error);
        }

        tokio::spawn(async move {
            for event in script {
                if sink.send(event).is_err() {
                    return;
                }
                tokio::task::yield_now().await;
            }
        });
        Ok(())
    }

    async fn next_address(&self, account: u32) -> WalletResult<String> {
        let (fail_after, repeat) = {
            let state = self.state();
            (state.address_error_after, state.repeat_addresses)
        };
        let issued = self.addresses_issued.load(Ordering::SeqCst);
        if fail_after.is_some_and(|n| issued >= n) {
            return Err(WalletError::Transient("address pool unavailable".to_string()));
        }

        self.addresses_issued.fetch_add(1, Ordering::SeqCst);
        if repeat {
            return Ok(format!("TsAcct{}Addr", account));
        }
        Ok(format!("TsAcct{}Addr{}", account, issued))
    }

    async fn transactions(&self, start_height: i32, count: usize) -> WalletResult<HistoryBatch> {
        Ok(history_batch(&self.state().transactions, start_height, count))
    }

    async fn rescan_blocks(&self) -> WalletResult<()> {
        Ok(())
    }
}
