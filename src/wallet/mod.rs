pub mod backend;
pub mod confirmations;
pub mod history;
pub mod seed;
pub mod session;
pub mod sync;
pub mod types;

pub use backend::{Backend, EmbeddedBackend, LightWalletEngine, RemoteBackend, WalletBackend};
pub use confirmations::{ConfirmationStatus, DEFAULT_REQUIRED_CONFIRMATIONS};
pub use history::{HistoryCursor, HistoryPage, next_page};
pub use session::{NoticeHandler, SessionLifecycle};
pub use sync::{SyncCoordinator, SyncRun};
pub use types::*;
