//! Wallet Synchronization Module
//!
//! Drives a backend's sync engine and turns its raw events into progress snapshots for any
//! number of observers:
//!
//! - `coordinator`: Starts a sync run, follows its events and runs the post-sync hooks.
//! - `events`: Raw backend events, the observer trait and registry, and the daemon notification converter.
//! - `progress_tracker`: Folds raw events into monotonic progress snapshots and keeps run statistics.
//! - `observers`: Ready-made observers (callback, latest-value slot, bounded channel, tracing).
//! - `broadcast`: Fans snapshots and connection info out to connected UI clients as JSON packets.
//! - `hooks`: Work that runs once after a successful sync.

/// Event types, observer trait and registry
pub mod events;
/// Serialized fan-out to UI clients
pub mod broadcast;
/// Drives a sync run
pub mod coordinator;
/// Post-sync hooks
pub mod hooks;
/// Ready-made observers
pub mod observers;
/// Tracks synchronization progress and statistics
pub mod progress_tracker;

pub use broadcast::{BroadcastHub, ClientId, ClientReceiver, Packet, PacketEvent};
pub use coordinator::{SyncCoordinator, SyncRun};
pub use events::{
    ObserverError, ObserverId, ObserverRegistry, ProgressObserver, RawEventSink, RawSyncEvent,
    SpvNotificationConverter,
};
pub use hooks::{ChainTipSubscriptionHook, PostSyncHook, UnminedTransactionFlushHook};
pub use observers::{CallbackObserver, ChannelObserver, LatestReportObserver, TracingObserver};
pub use progress_tracker::{ProgressReport, ProgressTracker, SyncOutcome, SyncStage, SyncStats};
