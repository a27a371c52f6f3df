//! Event system for wallet synchronization.
//!
//! Backends push raw, backend-native sync events into a [`RawEventSink`]. The coordinator folds
//! them into [`ProgressReport`] snapshots and hands each snapshot to every observer held by an
//! [`ObserverRegistry`]. Delivery never waits on an observer: each observer decides for itself
//! how to hand a snapshot off without blocking, and a failed delivery is logged and forgotten.

use crate::daemon::SpvSyncNotification;
use crate::wallet::sync::progress_tracker::ProgressReport;

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// Spacing of blocks the header-count estimate assumes, in seconds
pub const TARGET_BLOCK_INTERVAL_SECS: i64 = 300;

/// Events a backend's sync engine emits while syncing
#[derive(Debug, Clone, PartialEq)]
pub enum RawSyncEvent {
    /// The engine began a sync run
    Started,
    /// Connected peer count changed
    PeersUpdated { peer_count: i32 },
    /// Block headers fetched up to `fetched`, out of an estimated `total`
    HeadersFetched {
        fetched: u32,
        total: u32,
        /// Unix timestamp of the most recent header
        last_header_time: Option<i64>,
    },
    /// Address discovery progress; engines may report estimates above 100
    AddressDiscovery { progress: u32 },
    /// Rescan reached `height` out of `total`
    Rescanning { height: u32, total: u32 },
    /// The run ended, with an error message when it failed
    Ended { error: Option<String> },
}

impl RawSyncEvent {
    /// Whether this event ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, RawSyncEvent::Ended { .. })
    }
}

/// Where a backend pushes its raw sync events. Unbounded: the producer is never held back.
pub type RawEventSink = mpsc::UnboundedSender<RawSyncEvent>;

/// A delivery to an observer failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObserverError {
    #[error("observer is closed")]
    Closed,

    #[error("observer failed: {0}")]
    Failed(String),
}

/// Trait for receiving progress snapshots.
///
/// Implementors must return promptly; anything slow belongs behind a non-blocking hand-off
/// (bounded channel, watch slot) owned by the observer.
pub trait ProgressObserver: Send + Sync {
    /// Receive one snapshot.
    fn on_progress(&self, report: &ProgressReport) -> Result<(), ObserverError>;

    /// Get the name of this observer for logging and diagnostics.
    fn name(&self) -> &str;
}

/// Handle returned by [`ObserverRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// The set of observers a coordinator fans snapshots out to.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<Vec<(ObserverId, Arc<dyn ProgressObserver>)>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    ///
    /// Observers receive snapshots in the order they are registered.
    pub fn register(&self, observer: Arc<dyn ProgressObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!("Registered progress observer {}", observer.name());
        self.observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, observer));
        id
    }

    /// Remove an observer. Returns `false` when the id was not registered.
    pub fn unregister(&self, id: ObserverId) -> bool {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a snapshot to every registered observer.
    ///
    /// Errors from observers are logged, but do not stop other observers from receiving the
    /// snapshot. Returns the number of failed deliveries.
    pub fn broadcast(&self, report: &ProgressReport) -> usize {
        // Snapshot the list so observers can (un)register while we deliver
        let observers: Vec<Arc<dyn ProgressObserver>> = self
            .observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        let mut failed = 0;
        for observer in observers {
            if let Err(e) = observer.on_progress(report) {
                tracing::warn!("Observer {} dropped a progress report: {}", observer.name(), e);
                failed += 1;
            }
        }
        failed
    }
}

/// Converts daemon sync notifications into raw sync events.
///
/// Header notifications only carry per-batch counts, so the converter accumulates them on top
/// of the best block known when sync started and estimates the remaining headers from the age
/// of the last header. Peer notifications also update the shared peer counter the remote
/// backend reports.
pub struct SpvNotificationConverter {
    fetched_height: u32,
    estimated_total: u32,
    peer_count: Arc<AtomicI32>,
}

impl SpvNotificationConverter {
    pub fn new(start_height: u32, peer_count: Arc<AtomicI32>) -> Self {
        Self {
            fetched_height: start_height,
            estimated_total: start_height,
            peer_count,
        }
    }

    pub fn convert(&mut self, notification: SpvSyncNotification) -> Vec<RawSyncEvent> {
        self.convert_at(notification, Utc::now())
    }

    /// Convert with an explicit clock, for the header estimate.
    pub fn convert_at(
        &mut self,
        notification: SpvSyncNotification,
        now: DateTime<Utc>,
    ) -> Vec<RawSyncEvent> {
        match notification {
            SpvSyncNotification::PeerConnected { peer_count }
            | SpvSyncNotification::PeerDisconnected { peer_count } => {
                self.peer_count.store(peer_count, Ordering::Relaxed);
                vec![RawSyncEvent::PeersUpdated { peer_count }]
            }
            SpvSyncNotification::FetchedHeaders {
                fetched_headers_count,
                last_header_time,
            } => {
                self.fetched_height = self.fetched_height.saturating_add(fetched_headers_count);
                let behind_secs = (now.timestamp() - last_header_time).max(0);
                let remaining = (behind_secs / TARGET_BLOCK_INTERVAL_SECS) as u32;
                self.estimated_total = self
                    .fetched_height
                    .saturating_add(remaining)
                    .max(self.estimated_total);
                vec![RawSyncEvent::HeadersFetched {
                    fetched: self.fetched_height,
                    total: self.estimated_total,
                    last_header_time: Some(last_header_time),
                }]
            }
            SpvSyncNotification::DiscoverAddresses { finished } => {
                let progress = if finished { 100 } else { 0 };
                vec![RawSyncEvent::AddressDiscovery { progress }]
            }
            SpvSyncNotification::RescanProgress { rescanned_through } => {
                vec![RawSyncEvent::Rescanning {
                    height: rescanned_through,
                    total: self.fetched_height.max(rescanned_through),
                }]
            }
            SpvSyncNotification::Synced { synced: true } => {
                vec![RawSyncEvent::Ended { error: None }]
            }
            SpvSyncNotification::Synced { synced: false } => vec![RawSyncEvent::Ended {
                error: Some("daemon stopped syncing before reaching the network tip".to_string()),
            }],
            // Falling behind after a completed run starts a new one
            SpvSyncNotification::Unsynced => vec![RawSyncEvent::Started],
        }
    }

    pub fn fetched_height(&self) -> u32 {
        self.fetched_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::sync::progress_tracker::SyncStage;
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Vec<SyncStage>>,
        fail: bool,
    }

    impl ProgressObserver for Recording {
        fn on_progress(&self, report: &ProgressReport) -> Result<(), ObserverError> {
            self.seen.lock().unwrap().push(report.stage);
            if self.fail {
                Err(ObserverError::Failed("render failed".to_string()))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[test]
    fn test_failing_observer_does_not_stop_others() {
        let registry = ObserverRegistry::new();
        let failing = Arc::new(Recording { seen: Mutex::new(vec![]), fail: true });
        let healthy = Arc::new(Recording { seen: Mutex::new(vec![]), fail: false });
        registry.register(failing.clone());
        registry.register(healthy.clone());

        let failed = registry.broadcast(&ProgressReport::not_started());
        assert_eq!(failed, 1);
        assert_eq!(failing.seen.lock().unwrap().len(), 1);
        assert_eq!(healthy.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unregister() {
        let registry = ObserverRegistry::new();
        let observer = Arc::new(Recording { seen: Mutex::new(vec![]), fail: false });
        let id = registry.register(observer.clone());
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());

        registry.broadcast(&ProgressReport::not_started());
        assert!(observer.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_converter_accumulates_headers() {
        let peers = Arc::new(AtomicI32::new(0));
        let mut converter = SpvNotificationConverter::new(1000, peers.clone());
        let now = Utc::now();

        let events = converter.convert_at(
            SpvSyncNotification::PeerConnected { peer_count: 4 },
            now,
        );
        assert_eq!(events, vec![RawSyncEvent::PeersUpdated { peer_count: 4 }]);
        assert_eq!(peers.load(Ordering::Relaxed), 4);

        // Last header one hour old: 12 more headers expected at 5 minute spacing
        let events = converter.convert_at(
            SpvSyncNotification::FetchedHeaders {
                fetched_headers_count: 500,
                last_header_time: now.timestamp() - 3600,
            },
            now,
        );
        assert_eq!(
            events,
            vec![RawSyncEvent::HeadersFetched {
                fetched: 1500,
                total: 1512,
                last_header_time: Some(now.timestamp() - 3600),
            }]
        );

        let events = converter.convert_at(
            SpvSyncNotification::RescanProgress { rescanned_through: 1200 },
            now,
        );
        assert_eq!(events, vec![RawSyncEvent::Rescanning { height: 1200, total: 1500 }]);

        let events = converter.convert_at(SpvSyncNotification::Synced { synced: true }, now);
        assert_eq!(events, vec![RawSyncEvent::Ended { error: None }]);
    }
}
