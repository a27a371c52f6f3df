//! Settings for a wallet session
//!
//! Loaded from a JSON settings file, then overridden from the environment:
//! ```json
//! {
//!   "appDataDir": "/home/user/.wallet",
//!   "network": "testnet3",
//!   "backend": { "kind": "remote", "rpcUrl": "http://127.0.0.1:9111", "wsUrl": "ws://127.0.0.1:9111/ws" },
//!   "requiredConfirmations": 2,
//!   "historyPageSize": 20,
//!   "openWatchdogSecs": 5
//! }
//! ```

use crate::wallet::{DEFAULT_REQUIRED_CONFIRMATIONS, WalletError, WalletResult};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Transactions returned per history page unless configured otherwise
pub const DEFAULT_HISTORY_PAGE_SIZE: usize = 20;
/// Seconds before the slow-open notice fires
pub const DEFAULT_OPEN_WATCHDOG_SECS: u64 = 5;

/// Which backend provides ledger access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendKind {
    /// Light client running in this process, owning its wallet directory
    Embedded,
    /// Wallet daemon reached over JSON-RPC
    #[serde(rename_all = "camelCase")]
    Remote { rpc_url: String, ws_url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConfig {
    pub app_data_dir: PathBuf,
    pub network: String,
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default = "default_required_confirmations")]
    pub required_confirmations: i32,
    #[serde(default = "default_history_page_size")]
    pub history_page_size: usize,
    #[serde(default = "default_open_watchdog_secs")]
    pub open_watchdog_secs: u64,
}

fn default_backend() -> BackendKind {
    BackendKind::Embedded
}

fn default_required_confirmations() -> i32 {
    DEFAULT_REQUIRED_CONFIRMATIONS
}

fn default_history_page_size() -> usize {
    DEFAULT_HISTORY_PAGE_SIZE
}

fn default_open_watchdog_secs() -> u64 {
    DEFAULT_OPEN_WATCHDOG_SECS
}

impl WalletConfig {
    /// Config for `network` under `app_data_dir` with every other setting at its default
    pub fn new(app_data_dir: impl Into<PathBuf>, network: impl Into<String>) -> Self {
        Self {
            app_data_dir: app_data_dir.into(),
            network: network.into(),
            backend: default_backend(),
            required_confirmations: DEFAULT_REQUIRED_CONFIRMATIONS,
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
            open_watchdog_secs: DEFAULT_OPEN_WATCHDOG_SECS,
        }
    }

    /// Load the settings file at `path`, apply environment overrides and validate.
    ///
    /// Environment variables:
    /// - `WALLET_APP_DATA_DIR`: replaces `appDataDir`
    /// - `WALLET_NETWORK`: replaces `network`
    /// - `WALLET_RPC_URL` / `WALLET_WS_URL`: switch to the remote backend with these endpoints
    pub fn load(path: &Path) -> WalletResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WalletError::from(e).context(format!("read config {}", path.display()))
        })?;
        let mut config: WalletConfig = serde_json::from_str(&content).map_err(|e| {
            WalletError::InvalidInput(format!("parse config {}: {}", path.display(), e))
        })?;

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        info!(
            "Loaded config for network {} ({})",
            config.network,
            match config.backend {
                BackendKind::Embedded => "embedded",
                BackendKind::Remote { .. } => "remote",
            }
        );
        Ok(config)
    }

    /// Apply overrides from a variable lookup, normally the process environment
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("WALLET_APP_DATA_DIR") {
            debug!("Overriding app data dir from environment");
            self.app_data_dir = PathBuf::from(dir);
        }
        if let Some(network) = lookup("WALLET_NETWORK") {
            debug!("Overriding network from environment");
            self.network = network;
        }

        let rpc_override = lookup("WALLET_RPC_URL");
        let ws_override = lookup("WALLET_WS_URL");
        if rpc_override.is_none() && ws_override.is_none() {
            return;
        }

        let (mut rpc_url, mut ws_url) = match &self.backend {
            BackendKind::Remote { rpc_url, ws_url } => (rpc_url.clone(), ws_url.clone()),
            BackendKind::Embedded => (String::new(), String::new()),
        };
        if let Some(url) = rpc_override {
            rpc_url = url;
        }
        if let Some(url) = ws_override {
            ws_url = url;
        }
        self.backend = BackendKind::Remote { rpc_url, ws_url };
    }

    pub fn validate(&self) -> WalletResult<()> {
        if self.network.trim().is_empty() {
            return Err(WalletError::InvalidInput("config: network is empty".to_string()));
        }
        if self.history_page_size == 0 {
            return Err(WalletError::InvalidInput(
                "config: historyPageSize must be greater than zero".to_string(),
            ));
        }
        if self.required_confirmations < 0 {
            return Err(WalletError::InvalidInput(format!(
                "config: requiredConfirmations {} is negative",
                self.required_confirmations
            )));
        }
        if let BackendKind::Remote { rpc_url, ws_url } = &self.backend {
            if rpc_url.is_empty() || ws_url.is_empty() {
                return Err(WalletError::InvalidInput(
                    "config: remote backend needs both rpcUrl and wsUrl".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Directory of the wallet for the configured network
    pub fn wallet_dir(&self) -> PathBuf {
        self.app_data_dir.join(&self.network)
    }

    pub fn open_watchdog(&self) -> Duration {
        Duration::from_secs(self.open_watchdog_secs)
    }
}

/// Pick an unused directory for a new wallet on `network`.
///
/// Tries `{app_data_dir}/{network}` first, then `{network}-1`, `{network}-2`, ... so a new
/// wallet never lands in a directory that already holds one.
pub fn resolve_new_wallet_dir(app_data_dir: &Path, network: &str) -> PathBuf {
    let mut candidate = app_data_dir.join(network);
    let mut suffix = 0u32;
    while candidate.exists() {
        suffix += 1;
        candidate = app_data_dir.join(format!("{}-{}", network, suffix));
    }
    candidate
}
