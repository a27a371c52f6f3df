//! A wallet daemon answering from fixed data, driven through the public transport trait.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use wallet_session_sync::daemon::{
    DaemonError, DaemonTransport, NotificationStream, STATUS_ALREADY_EXISTS, SpvSyncNotification,
    TransactionsPage,
};
use wallet_session_sync::wallet::{TransactionDirection, TransactionSummary};

pub const NETWORK: &str = "testnet3";

pub struct ScriptedDaemon {
    pub best_block: u32,
    pub history: Vec<TransactionSummary>,
    pub notifications: Vec<SpvSyncNotification>,
    pub created_seed_hex: Mutex<Option<String>>,
    pub hook_calls: AtomicUsize,
    addresses: AtomicUsize,
}

impl ScriptedDaemon {
    pub fn new(best_block: u32, history: Vec<TransactionSummary>) -> Self {
        Self {
            best_block,
            history,
            notifications: Vec::new(),
            created_seed_hex: Mutex::new(None),
            hook_calls: AtomicUsize::new(0),
            addresses: AtomicUsize::new(0),
        }
    }

    pub fn with_notifications(mut self, notifications: Vec<SpvSyncNotification>) -> Self {
        self.notifications = notifications;
        self
    }
}

pub fn received(hash: &str, mined_height: i32, amount: i64) -> TransactionSummary {
    TransactionSummary {
        hash: hash.to_string(),
        mined_height,
        timestamp: 1_700_000_000,
        direction: TransactionDirection::Received,
        amount,
        fee: 0,
    }
}

#[async_trait]
impl DaemonTransport for ScriptedDaemon {
    async fn wallet_exists(&self) -> Result<bool, DaemonError> {
        Ok(self.created_seed_hex.lock().unwrap().is_some())
    }

    async fn create_wallet(&self, _passphrase: &str, seed_hex: &str) -> Result<(), DaemonError> {
        let mut created = self.created_seed_hex.lock().unwrap();
        if created.is_some() {
            return Err(DaemonError::Rpc {
                code: STATUS_ALREADY_EXISTS,
                message: "wallet already exists".to_string(),
            });
        }
        *created = Some(seed_hex.to_string());
        Ok(())
    }

    async fn open_wallet(&self) -> Result<(), DaemonError> {
        // The daemon loads its wallet at launch
        Err(DaemonError::Rpc {
            code: STATUS_ALREADY_EXISTS,
            message: "wallet already loaded".to_string(),
        })
    }

    async fn best_block(&self) -> Result<u32, DaemonError> {
        Ok(self.best_block)
    }

    async fn subscribe_to_block_notifications(&self) -> Result<(), DaemonError> {
        self.hook_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn publish_unmined_transactions(&self) -> Result<(), DaemonError> {
        self.hook_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn next_address(&self, account: u32) -> Result<String, DaemonError> {
        let n = self.addresses.fetch_add(1, Ordering::SeqCst);
        Ok(format!("TsAcct{}Change{}", account, n))
    }

    /// One transaction per block, newest first
    async fn transactions(
        &self,
        start_height: i32,
        count: usize,
    ) -> Result<TransactionsPage, DaemonError> {
        let mut mined: Vec<TransactionSummary> = self
            .history
            .iter()
            .filter(|t| t.mined_height >= 0 && (start_height == -1 || t.mined_height <= start_height))
            .cloned()
            .collect();
        mined.sort_by(|a, b| b.mined_height.cmp(&a.mined_height));
        mined.truncate(count);
        let lowest_height = mined.last().map(|t| t.mined_height);
        Ok(TransactionsPage {
            transactions: mined,
            lowest_height,
        })
    }

    async fn rescan(&self) -> Result<(), DaemonError> {
        Ok(())
    }

    async fn spv_sync(&self) -> Result<NotificationStream, DaemonError> {
        let items: Vec<Result<SpvSyncNotification, DaemonError>> =
            self.notifications.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}
