use super::history_batch;
use crate::daemon::{
    DaemonError, DaemonTransport, NotificationStream, STATUS_ALREADY_EXISTS, STATUS_UNAVAILABLE,
    SpvSyncNotification, TransactionsPage,
};
use crate::wallet::TransactionSummary;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct DaemonState {
    exists: bool,
    open_already_loaded: bool,
    open_delay: Option<Duration>,
    create_delay: Option<Duration>,
    best_block: u32,
    created_seed_hex: Option<String>,
    transactions: Vec<TransactionSummary>,
    notifications: Vec<SpvSyncNotification>,
    stream_error: Option<String>,
    subscribe_unavailable: bool,
}

#[derive(Default)]
struct Inner {
    state: Mutex<DaemonState>,
    open_calls: AtomicUsize,
    subscribe_calls: AtomicUsize,
    publish_calls: AtomicUsize,
    addresses_issued: AtomicUsize,
    call_log: Mutex<Vec<&'static str>>,
}

/// Wallet daemon whose answers are set up by the test. Clones share state.
#[derive(Clone, Default)]
pub struct MockDaemon {
    inner: Arc<Inner>,
}

impl MockDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DaemonState> {
        self.inner.state.lock().unwrap()
    }

    pub fn set_exists(&self, exists: bool) {
        self.state().exists = exists;
    }

    /// Answer `openwallet` with the AlreadyExists status, as a daemon that loaded the wallet
    /// at launch does
    pub fn set_open_already_loaded(&self, loaded: bool) {
        self.state().open_already_loaded = loaded;
    }

    pub fn set_open_delay(&self, delay: Duration) {
        self.state().open_delay = Some(delay);
    }

    pub fn set_create_delay(&self, delay: Duration) {
        self.state().create_delay = Some(delay);
    }

    pub fn set_best_block(&self, height: u32) {
        self.state().best_block = height;
    }

    pub fn set_transactions(&self, transactions: Vec<TransactionSummary>) {
        self.state().transactions = transactions;
    }

    pub fn set_notifications(&self, notifications: Vec<SpvSyncNotification>) {
        self.state().notifications = notifications;
    }

    /// End the notification stream with an error after the scripted notifications
    pub fn set_stream_error(&self, message: &str) {
        self.state().stream_error = Some(message.to_string());
    }

    pub fn set_subscribe_unavailable(&self, unavailable: bool) {
        self.state().subscribe_unavailable = unavailable;
    }

    /// Start and end of every create and open call, in the order they happened
    pub fn call_log(&self) -> Vec<&'static str> {
        self.inner.call_log.lock().unwrap().clone()
    }

    fn log_call(&self, entry: &'static str) {
        self.inner.call_log.lock().unwrap().push(entry);
    }

    pub fn created_seed_hex(&self) -> Option<String> {
        self.state().created_seed_hex.clone()
    }

    pub fn open_calls(&self) -> usize {
        self.inner.open_calls.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.inner.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn publish_calls(&self) -> usize {
        self.inner.publish_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DaemonTransport for MockDaemon {
    async fn wallet_exists(&self) -> Result<bool, DaemonError> {
        Ok(self.state().exists)
    }

    async fn create_wallet(&self, _passphrase: &str, seed_hex: &str) -> Result<(), DaemonError> {
        self.log_call("create");
        let delay = self.state().create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let mut state = self.state();
            if state.exists {
                Err(DaemonError::Rpc {
                    code: STATUS_ALREADY_EXISTS,
                    message: "wallet already exists".to_string(),
                })
            } else {
                state.exists = true;
                state.created_seed_hex = Some(seed_hex.to_string());
                Ok(())
            }
        };
        self.log_call("create done");
        result
    }

    async fn open_wallet(&self) -> Result<(), DaemonError> {
        self.inner.open_calls.fetch_add(1, Ordering::SeqCst);
        self.log_call("open");
        let (delay, already_loaded) = {
            let state = self.state();
            (state.open_delay, state.open_already_loaded)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.log_call("open done");
        if already_loaded {
            return Err(DaemonError::Rpc {
                code: STATUS_ALREADY_EXISTS,
                message: "wallet already loaded".to_string(),
            });
        }
        Ok(())
    }

    async fn best_block(&self) -> Result<u32, DaemonError> {
        Ok(self.state().best_block)
    }

    async fn subscribe_to_block_notifications(&self) -> Result<(), DaemonError> {
        self.inner.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.state().subscribe_unavailable {
            return Err(DaemonError::Rpc {
                code: STATUS_UNAVAILABLE,
                message: "consensus server not connected".to_string(),
            });
        }
        Ok(())
    }

    async fn publish_unmined_transactions(&self) -> Result<(), DaemonError> {
        self.inner.publish_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn next_address(&self, account: u32) -> Result<String, DaemonError> {
        let n = self.inner.addresses_issued.fetch_add(1, Ordering::SeqCst);
        Ok(format!("TsDaemon{}Addr{}", account, n))
    }

    async fn transactions(
        &self,
        start_height: i32,
        count: usize,
    ) -> Result<TransactionsPage, DaemonError> {
        let batch = history_batch(&self.state().transactions, start_height, count);
        Ok(TransactionsPage {
            transactions: batch.transactions,
            lowest_height: batch.lowest_height,
        })
    }

    async fn rescan(&self) -> Result<(), DaemonError> {
        Ok(())
    }

    async fn spv_sync(&self) -> Result<NotificationStream, DaemonError> {
        let (notifications, stream_error) = {
            let state = self.state();
            (state.notifications.clone(), state.stream_error.clone())
        };

        let mut items: Vec<Result<SpvSyncNotification, DaemonError>> =
            notifications.into_iter().map(Ok).collect();
        if let Some(message) = stream_error {
            items.push(Err(DaemonError::SubscriptionError(message)));
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }
}
