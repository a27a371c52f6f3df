//! Ledger-access backends
//!
//! A wallet session runs against one of two backends: the embedded light client, which owns
//! its wallet directory, or a remote wallet daemon, which owns the session and is only driven
//! from here. Both implement [`WalletBackend`]; [`Backend`] is the closed set of the two.
//!
//! The variants differ on purpose:
//! - `close()` on the remote backend is a no-op, since other consumers of the daemon share
//!   the session.
//! - `delete()` on the remote backend always fails with `Unsupported`.
//! - `is_open()` on the remote backend is a cached flag written by the session lifecycle.

/// Embedded light-client backend
pub mod embedded;
/// Remote wallet daemon backend
pub mod remote;

pub use embedded::{DEFAULT_PUBLIC_PASSPHRASE, EmbeddedBackend, LightWalletEngine};
pub use remote::RemoteBackend;

use crate::wallet::seed;
use crate::wallet::sync::events::RawEventSink;
use crate::wallet::{ConnectionInfo, HistoryBatch, WalletError, WalletResult};

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Capabilities every backend provides.
#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// Network identifier, e.g. `testnet3`
    fn network(&self) -> &str;

    async fn exists(&self) -> WalletResult<bool>;

    /// Fresh seed words for a new wallet
    fn generate_seed(&self) -> WalletResult<String> {
        seed::generate_seed()
    }

    async fn create(&self, passphrase: &str, seed_words: &str) -> WalletResult<()>;

    /// Open the existing wallet.
    ///
    /// May fail with `AlreadyExists` when the wallet is already open; the session lifecycle
    /// treats that as success.
    async fn open(&self) -> WalletResult<()>;

    async fn close(&self) -> WalletResult<()>;

    async fn delete(&self) -> WalletResult<()>;

    fn is_open(&self) -> bool;

    async fn best_block_height(&self) -> WalletResult<u32>;

    async fn connected_peer_count(&self) -> i32;

    /// Start syncing. Raw sync events are pushed into `sink` until the run ends.
    async fn start_sync(&self, sink: RawEventSink) -> WalletResult<()>;

    /// Ask to be notified of new chain tips
    async fn subscribe_block_notifications(&self) -> WalletResult<()>;

    /// Rebroadcast transactions that were sent but never mined
    async fn publish_unmined_transactions(&self) -> WalletResult<()>;

    async fn generate_new_address(&self, account: u32) -> WalletResult<String>;

    /// Up to `count` transactions mined at or below `start_height`, newest first.
    /// `start_height == -1` starts from the most recent transaction.
    async fn transaction_history(&self, start_height: i32, count: usize)
    -> WalletResult<HistoryBatch>;

    async fn rescan(&self) -> WalletResult<()>;

    /// Record whether the session is open, for backends that cannot ask authoritatively
    fn record_open_state(&self, _open: bool) {}

    /// Serializes open and create on this backend
    fn session_lock(&self) -> Arc<Mutex<()>>;
}

/// The active backend
#[derive(Clone)]
pub enum Backend {
    Embedded(Arc<EmbeddedBackend>),
    Remote(Arc<RemoteBackend>),
}

macro_rules! dispatch {
    ($self:ident, $backend:ident => $call:expr) => {
        match $self {
            Backend::Embedded($backend) => $call,
            Backend::Remote($backend) => $call,
        }
    };
}

impl Backend {
    pub fn embedded(backend: EmbeddedBackend) -> Self {
        Backend::Embedded(Arc::new(backend))
    }

    pub fn remote(backend: RemoteBackend) -> Self {
        Backend::Remote(Arc::new(backend))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Backend::Embedded(_) => "embedded",
            Backend::Remote(_) => "remote",
        }
    }

    /// Open the wallet if it exists, using the default watchdog.
    ///
    /// See [`SessionLifecycle::open_if_exists`](crate::wallet::SessionLifecycle::open_if_exists).
    pub async fn open_if_exists(
        &self,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> WalletResult<bool> {
        crate::wallet::SessionLifecycle::new(self.clone())
            .open_if_exists(cancel)
            .await
    }

    /// Network, best block and peer count in one summary.
    ///
    /// When the best block cannot be read the summary still carries the network and peer count,
    /// with `latest_block` 0, alongside the error.
    pub async fn connection_info(&self) -> (ConnectionInfo, Option<WalletError>) {
        let peers_connected = self.connected_peer_count().await;
        let (latest_block, error) = match self.best_block_height().await {
            Ok(height) => (height, None),
            Err(e) => (0, Some(e.context("connection info"))),
        };

        (
            ConnectionInfo {
                network_type: self.network().to_string(),
                latest_block,
                peers_connected,
            },
            error,
        )
    }
}

#[async_trait]
impl WalletBackend for Backend {
    fn network(&self) -> &str {
        dispatch!(self, b => b.network())
    }

    async fn exists(&self) -> WalletResult<bool> {
        dispatch!(self, b => b.exists().await)
    }

    fn generate_seed(&self) -> WalletResult<String> {
        dispatch!(self, b => b.generate_seed())
    }

    async fn create(&self, passphrase: &str, seed_words: &str) -> WalletResult<()> {
        dispatch!(self, b => b.create(passphrase, seed_words).await)
    }

    async fn open(&self) -> WalletResult<()> {
        dispatch!(self, b => b.open().await)
    }

    async fn close(&self) -> WalletResult<()> {
        dispatch!(self, b => b.close().await)
    }

    async fn delete(&self) -> WalletResult<()> {
        dispatch!(self, b => b.delete().await)
    }

    fn is_open(&self) -> bool {
        dispatch!(self, b => b.is_open())
    }

    async fn best_block_height(&self) -> WalletResult<u32> {
        dispatch!(self, b => b.best_block_height().await)
    }

    async fn connected_peer_count(&self) -> i32 {
        dispatch!(self, b => b.connected_peer_count().await)
    }

    async fn start_sync(&self, sink: RawEventSink) -> WalletResult<()> {
        dispatch!(self, b => b.start_sync(sink).await)
    }

    async fn subscribe_block_notifications(&self) -> WalletResult<()> {
        dispatch!(self, b => b.subscribe_block_notifications().await)
    }

    async fn publish_unmined_transactions(&self) -> WalletResult<()> {
        dispatch!(self, b => b.publish_unmined_transactions().await)
    }

    async fn generate_new_address(&self, account: u32) -> WalletResult<String> {
        dispatch!(self, b => b.generate_new_address(account).await)
    }

    async fn transaction_history(
        &self,
        start_height: i32,
        count: usize,
    ) -> WalletResult<HistoryBatch> {
        dispatch!(self, b => b.transaction_history(start_height, count).await)
    }

    async fn rescan(&self) -> WalletResult<()> {
        dispatch!(self, b => b.rescan().await)
    }

    fn record_open_state(&self, open: bool) {
        dispatch!(self, b => b.record_open_state(open))
    }

    fn session_lock(&self) -> Arc<Mutex<()>> {
        dispatch!(self, b => b.session_lock())
    }
}
