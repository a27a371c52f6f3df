//! Backend over an in-process light-client wallet engine.
//!
//! The engine owns the wallet database inside `wallet_dir`; this backend owns the directory.

use super::WalletBackend;
use crate::wallet::seed;
use crate::wallet::sync::events::RawEventSink;
use crate::wallet::{HistoryBatch, WalletError, WalletResult};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Public passphrase the engine's wallet database is opened with
pub const DEFAULT_PUBLIC_PASSPHRASE: &str = "public";

/// The wrapped light-client library, bound to one wallet directory.
#[async_trait]
pub trait LightWalletEngine: Send + Sync {
    async fn wallet_exists(&self) -> WalletResult<bool>;

    async fn create_wallet(&self, private_passphrase: &str, seed_words: &str) -> WalletResult<()>;

    /// May block for a long time while another process holds the database
    async fn open_wallet(&self, public_passphrase: &str) -> WalletResult<()>;

    fn wallet_opened(&self) -> bool;

    /// Orderly shutdown of the open wallet
    async fn shutdown(&self);

    async fn best_block(&self) -> WalletResult<u32>;

    fn peer_count(&self) -> i32;

    /// Run SPV sync, pushing progress into `sink`. Returns once sync is under way.
    async fn spv_sync(&self, sink: RawEventSink) -> WalletResult<()>;

    async fn next_address(&self, account: u32) -> WalletResult<String>;

    async fn transactions(&self, start_height: i32, count: usize) -> WalletResult<HistoryBatch>;

    async fn rescan_blocks(&self) -> WalletResult<()>;
}

pub struct EmbeddedBackend {
    engine: Arc<dyn LightWalletEngine>,
    network: String,
    wallet_dir: PathBuf,
    session_lock: Arc<Mutex<()>>,
}

impl EmbeddedBackend {
    pub fn new(
        engine: Arc<dyn LightWalletEngine>,
        network: impl Into<String>,
        wallet_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            network: network.into(),
            wallet_dir: wallet_dir.into(),
            session_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn wallet_dir(&self) -> &Path {
        &self.wallet_dir
    }
}

#[async_trait]
impl WalletBackend for EmbeddedBackend {
    fn network(&self) -> &str {
        &self.network
    }

    async fn exists(&self) -> WalletResult<bool> {
        self.engine.wallet_exists().await
    }

    async fn create(&self, passphrase: &str, seed_words: &str) -> WalletResult<()> {
        seed::decode_seed(seed_words)?;
        if self.engine.wallet_exists().await? {
            return Err(WalletError::AlreadyExists(format!(
                "create wallet: {} already holds a wallet",
                self.wallet_dir.display()
            )));
        }

        self.engine.create_wallet(passphrase, seed_words).await?;
        info!("Created wallet in {}", self.wallet_dir.display());
        Ok(())
    }

    async fn open(&self) -> WalletResult<()> {
        if self.engine.wallet_opened() {
            return Err(WalletError::AlreadyExists(format!(
                "open wallet: {} is already open",
                self.wallet_dir.display()
            )));
        }
        self.engine.open_wallet(DEFAULT_PUBLIC_PASSPHRASE).await
    }

    async fn close(&self) -> WalletResult<()> {
        debug!("Shutting down wallet in {}", self.wallet_dir.display());
        self.engine.shutdown().await;
        Ok(())
    }

    async fn delete(&self) -> WalletResult<()> {
        self.close().await?;
        tokio::fs::remove_dir_all(&self.wallet_dir)
            .await
            .map_err(|e| {
                WalletError::from(e).context(format!("delete wallet {}", self.wallet_dir.display()))
            })?;
        info!("Deleted wallet directory {}", self.wallet_dir.display());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.engine.wallet_opened()
    }

    async fn best_block_height(&self) -> WalletResult<u32> {
        self.engine.best_block().await
    }

    async fn connected_peer_count(&self) -> i32 {
        self.engine.peer_count()
    }

    async fn start_sync(&self, sink: RawEventSink) -> WalletResult<()> {
        if !self.engine.wallet_opened() {
            return Err(WalletError::NotFound(format!(
                "start sync: no open wallet in {}",
                self.wallet_dir.display()
            )));
        }
        self.engine.spv_sync(sink).await
    }

    // The engine follows the chain tip and rebroadcasts on its own
    async fn subscribe_block_notifications(&self) -> WalletResult<()> {
        Ok(())
    }

    async fn publish_unmined_transactions(&self) -> WalletResult<()> {
        Ok(())
    }

    async fn generate_new_address(&self, account: u32) -> WalletResult<String> {
        self.engine
            .next_address(account)
            .await
            .map_err(|e| e.context(format!("generate address for account {}", account)))
    }

    async fn transaction_history(
        &self,
        start_height: i32,
        count: usize,
    ) -> WalletResult<HistoryBatch> {
        self.engine.transactions(start_height, count).await
    }

    async fn rescan(&self) -> WalletResult<()> {
        self.engine.rescan_blocks().await
    }

    fn session_lock(&self) -> Arc<Mutex<()>> {
        self.session_lock.clone()
    }
}
