//! Backend over a remote wallet daemon.
//!
//! The daemon owns the wallet session. This backend only holds a reference to it: it never
//! closes or deletes the daemon's wallet, and its open flag is a cached best-effort value.

use super::WalletBackend;
use crate::daemon::DaemonTransport;
use crate::wallet::seed;
use crate::wallet::sync::events::{RawEventSink, RawSyncEvent, SpvNotificationConverter};
use crate::wallet::{HistoryBatch, WalletError, WalletResult};

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

pub struct RemoteBackend {
    transport: Arc<dyn DaemonTransport>,
    network: String,
    /// Written by create and open-if-exists, read by `is_open`
    wallet_open: AtomicBool,
    /// Last peer count reported by the daemon's sync notifications
    peer_count: Arc<AtomicI32>,
    session_lock: Arc<Mutex<()>>,
}

impl RemoteBackend {
    pub fn new(transport: Arc<dyn DaemonTransport>, network: impl Into<String>) -> Self {
        Self {
            transport,
            network: network.into(),
            wallet_open: AtomicBool::new(false),
            peer_count: Arc::new(AtomicI32::new(0)),
            session_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[async_trait]
impl WalletBackend for RemoteBackend {
    fn network(&self) -> &str {
        &self.network
    }

    async fn exists(&self) -> WalletResult<bool> {
        self.transport
            .wallet_exists()
            .await
            .map_err(|e| WalletError::from(e).context("check wallet exists"))
    }

    async fn create(&self, passphrase: &str, seed_words: &str) -> WalletResult<()> {
        let seed_hex = seed::seed_hex(seed_words)?;
        self.transport
            .create_wallet(passphrase, &seed_hex)
            .await
            .map_err(|e| WalletError::from(e).context(format!("create {} wallet", self.network)))?;

        // The daemon opens a wallet as part of creating it
        self.wallet_open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn open(&self) -> WalletResult<()> {
        self.transport
            .open_wallet()
            .await
            .map_err(|e| WalletError::from(e).context(format!("open {} wallet", self.network)))
    }

    async fn close(&self) -> WalletResult<()> {
        // Other consumers of the daemon share this session
        debug!("Leaving daemon wallet open");
        Ok(())
    }

    async fn delete(&self) -> WalletResult<()> {
        Err(WalletError::Unsupported(format!(
            "delete {} wallet: wallet cannot be deleted when connecting via the wallet daemon",
            self.network
        )))
    }

    fn is_open(&self) -> bool {
        self.wallet_open.load(Ordering::SeqCst)
    }

    async fn best_block_height(&self) -> WalletResult<u32> {
        self.transport
            .best_block()
            .await
            .map_err(|e| WalletError::from(e).context("best block"))
    }

    async fn connected_peer_count(&self) -> i32 {
        self.peer_count.load(Ordering::Relaxed)
    }

    async fn start_sync(&self, sink: RawEventSink) -> WalletResult<()> {
        let best_block = self.best_block_height().await?;
        let mut notifications = self
            .transport
            .spv_sync()
            .await
            .map_err(|e| WalletError::from(e).context("start daemon sync"))?;

        info!("Daemon sync started from block {}", best_block);
        let _ = sink.send(RawSyncEvent::Started);

        let mut converter = SpvNotificationConverter::new(best_block, self.peer_count.clone());
        tokio::spawn(async move {
            while let Some(item) = notifications.next().await {
                let events = match item {
                    Ok(notification) => converter.convert(notification),
                    Err(e) => {
                        error!("Daemon sync notification stream failed: {}", e);
                        vec![RawSyncEvent::Ended {
                            error: Some(format!("sync notification stream: {}", e)),
                        }]
                    }
                };

                for event in events {
                    let ended = event.is_terminal();
                    if sink.send(event).is_err() {
                        debug!("Sync event receiver dropped, stopping notification forwarding");
                        return;
                    }
                    if ended {
                        return;
                    }
                }
            }

            let _ = sink.send(RawSyncEvent::Ended {
                error: Some("daemon closed the sync notification stream".to_string()),
            });
        });

        Ok(())
    }

    async fn subscribe_block_notifications(&self) -> WalletResult<()> {
        self.transport
            .subscribe_to_block_notifications()
            .await
            .map_err(|e| WalletError::from(e).context("subscribe to block notifications"))
    }

    async fn publish_unmined_transactions(&self) -> WalletResult<()> {
        self.transport
            .publish_unmined_transactions()
            .await
            .map_err(|e| WalletError::from(e).context("publish unmined transactions"))
    }

    async fn generate_new_address(&self, account: u32) -> WalletResult<String> {
        self.transport
            .next_address(account)
            .await
            .map_err(|e| WalletError::from(e).context(format!("generate address for account {}", account)))
    }

    async fn transaction_history(
        &self,
        start_height: i32,
        count: usize,
    ) -> WalletResult<HistoryBatch> {
        let page = self
            .transport
            .transactions(start_height, count)
            .await
            .map_err(|e| {
                WalletError::from(e).context(format!("transactions from height {}", start_height))
            })?;

        Ok(HistoryBatch {
            transactions: page.transactions,
            lowest_height: page.lowest_height,
        })
    }

    async fn rescan(&self) -> WalletResult<()> {
        self.transport
            .rescan()
            .await
            .map_err(|e| WalletError::from(e).context("rescan blockchain"))
    }

    fn record_open_state(&self, open: bool) {
        self.wallet_open.store(open, Ordering::SeqCst);
    }

    fn session_lock(&self) -> Arc<Mutex<()>> {
        self.session_lock.clone()
    }
}
