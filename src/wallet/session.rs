//! Wallet session lifecycle: open, create, close and delete on the active backend.
//!
//! Opening can stall for as long as another process holds the wallet, so it runs on a detached
//! task the caller can stop waiting for. A watchdog posts a one-time notice when the open is
//! slow; it never aborts the open.

use crate::wallet::backend::{Backend, WalletBackend};
use crate::wallet::{ErrorKind, WalletError, WalletResult};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long an open may run before the slow-open notice is posted
pub const DEFAULT_OPEN_WATCHDOG: Duration = Duration::from_secs(5);

pub const SLOW_OPEN_NOTICE: &str = "It's taking longer than expected to open your wallet. \
    The wallet may already be opened by another app.";

/// Receives informational notices such as [`SLOW_OPEN_NOTICE`]
pub type NoticeHandler = Arc<dyn Fn(&str) + Send + Sync>;

pub struct SessionLifecycle {
    backend: Backend,
    watchdog: Duration,
    notice_handler: Option<NoticeHandler>,
}

impl SessionLifecycle {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            watchdog: DEFAULT_OPEN_WATCHDOG,
            notice_handler: None,
        }
    }

    pub fn with_watchdog(mut self, watchdog: Duration) -> Self {
        self.watchdog = watchdog;
        self
    }

    pub fn with_notice_handler(mut self, handler: NoticeHandler) -> Self {
        self.notice_handler = Some(handler);
        self
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Open the wallet if one exists. Returns whether it existed.
    ///
    /// The existence check and open run on a detached task. If `cancel` fires first this
    /// returns `Cancelled` right away; the detached open keeps running to completion and its
    /// result is discarded. A wallet that is already open counts as opened.
    pub async fn open_if_exists(&self, cancel: &CancellationToken) -> WalletResult<bool> {
        let network = self.backend.network().to_string();

        let lock = self.backend.session_lock();
        let guard = tokio::select! {
            guard = lock.lock_owned() => guard,
            _ = cancel.cancelled() => {
                return Err(WalletError::Cancelled(format!(
                    "open {} wallet: cancelled while another open or create was running",
                    network
                )));
            }
        };

        self.backend.record_open_state(false);

        let open_done = CancellationToken::new();
        self.spawn_watchdog(open_done.clone(), network.clone());

        let (result_tx, result_rx) = oneshot::channel();
        let backend = self.backend.clone();
        tokio::spawn(async move {
            // Held until the open finishes, even when nobody waits for it anymore
            let _guard = guard;
            let _done = open_done.drop_guard();

            let result = open_existing(&backend).await;
            if result_tx.send(result).is_err() {
                debug!("Open finished after the caller stopped waiting, discarding result");
            }
        });

        tokio::select! {
            result = result_rx => {
                let result = result.unwrap_or_else(|_| {
                    Err(WalletError::Internal(format!("open {} wallet: open task ended without a result", network)))
                });
                match result {
                    Ok(existed) => {
                        self.backend.record_open_state(existed);
                        if existed {
                            info!("Opened {} wallet", network);
                        } else {
                            debug!("No {} wallet to open", network);
                        }
                        Ok(existed)
                    }
                    Err(e) => {
                        self.backend.record_open_state(false);
                        Err(e.context(format!("open {} wallet", network)))
                    }
                }
            }
            _ = cancel.cancelled() => {
                info!("Stopped waiting for {} wallet to open", network);
                Err(WalletError::Cancelled(format!("open {} wallet", network)))
            }
        }
    }

    /// Post the slow-open notice once, unless `open_done` fires first.
    fn spawn_watchdog(&self, open_done: CancellationToken, network: String) {
        let watchdog = self.watchdog;
        let handler = self.notice_handler.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(watchdog) => {
                    warn!("{} ({} wallet)", SLOW_OPEN_NOTICE, network);
                    if let Some(handler) = handler {
                        handler(SLOW_OPEN_NOTICE);
                    }
                }
                _ = open_done.cancelled() => {}
            }
        });
    }

    /// Create a wallet from `seed_words`, protected by `passphrase`.
    pub async fn create(&self, passphrase: &str, seed_words: &str) -> WalletResult<()> {
        if passphrase.is_empty() {
            return Err(WalletError::InvalidInput(format!(
                "create {} wallet: passphrase is empty",
                self.backend.network()
            )));
        }

        let lock = self.backend.session_lock();
        let _guard = lock.lock().await;
        self.backend.create(passphrase, seed_words).await
    }

    pub fn generate_seed(&self) -> WalletResult<String> {
        self.backend.generate_seed()
    }

    pub async fn close(&self) -> WalletResult<()> {
        self.backend.close().await
    }

    pub async fn delete(&self) -> WalletResult<()> {
        self.backend.delete().await
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_open()
    }
}

async fn open_existing(backend: &Backend) -> WalletResult<bool> {
    if !backend.exists().await? {
        return Ok(false);
    }

    match backend.open().await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            // Opened earlier by this process, or loaded by the daemon at launch
            debug!("Wallet was already open: {}", e);
            Ok(true)
        }
        Err(e) => Err(e),
    }
}
