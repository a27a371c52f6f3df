//! Sync coordinator: drives a backend sync run and fans progress out to observers.
//!
//! The backend pushes raw events; the coordinator never polls. Each event becomes a full
//! snapshot that goes to the run's primary observer first and then to every observer in the
//! registry. Once a run succeeds the post-sync hooks run exactly once. Starting another run
//! while one is active is allowed; the backend's sync engine tolerates concurrent starts.

use crate::wallet::backend::{Backend, WalletBackend};
use crate::wallet::sync::events::{ObserverId, ObserverRegistry, ProgressObserver};
use crate::wallet::sync::hooks::{PostSyncHook, default_hooks, run_hooks};
use crate::wallet::sync::observers::CallbackObserver;
use crate::wallet::sync::progress_tracker::{ProgressReport, ProgressTracker, SyncStage};
use crate::wallet::{WalletError, WalletResult};

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct SyncCoordinator {
    backend: Backend,
    registry: Arc<ObserverRegistry>,
    hooks: Vec<Arc<dyn PostSyncHook>>,
}

impl SyncCoordinator {
    /// Coordinator with an empty registry and the default post-sync hooks.
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            registry: Arc::new(ObserverRegistry::new()),
            hooks: default_hooks(),
        }
    }

    /// Share a registry owned by whoever composes the coordinator with its transports
    pub fn with_registry(mut self, registry: Arc<ObserverRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the post-sync hooks; they run in the given order
    pub fn with_post_sync_hooks(mut self, hooks: Vec<Arc<dyn PostSyncHook>>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn add_post_sync_hook(&mut self, hook: Arc<dyn PostSyncHook>) {
        self.hooks.push(hook);
    }

    pub fn registry(&self) -> Arc<ObserverRegistry> {
        self.registry.clone()
    }

    pub fn register_observer(&self, observer: Arc<dyn ProgressObserver>) -> ObserverId {
        self.registry.register(observer)
    }

    pub fn unregister_observer(&self, id: ObserverId) -> bool {
        self.registry.unregister(id)
    }

    /// Start a sync run with a closure as the primary observer.
    pub async fn start_with_callback<F>(&self, callback: F) -> WalletResult<SyncRun>
    where
        F: Fn(&ProgressReport) + Send + Sync + 'static,
    {
        self.start(Some(Arc::new(CallbackObserver::new("sync-callback", callback))))
            .await
    }

    /// Start a sync run.
    ///
    /// Observers first receive a `NotStarted` snapshot. When the backend cannot start syncing
    /// they receive an `Error` snapshot and the error is returned.
    pub async fn start(&self, primary: Option<Arc<dyn ProgressObserver>>) -> WalletResult<SyncRun> {
        let mut tracker = ProgressTracker::new();
        deliver(&primary, &self.registry, &tracker.snapshot());

        let (sink, mut events) = mpsc::unbounded_channel();
        if let Err(e) = self.backend.start_sync(sink).await {
            let e = e.context(format!("start {} sync", self.backend.network()));
            deliver(&primary, &self.registry, &tracker.fail(e.to_string()));
            return Err(e);
        }
        info!("Started {} sync on the {} backend", self.backend.network(), self.backend.kind_name());

        let registry = self.registry.clone();
        let hooks = self.hooks.clone();
        let backend = self.backend.clone();
        let cancel = CancellationToken::new();
        let stop = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    event = events.recv() => event,
                    _ = stop.cancelled() => {
                        debug!("Stopped following sync run");
                        break;
                    }
                };

                let Some(event) = event else {
                    let report = tracker.fail("sync event stream ended before the run finished");
                    deliver(&primary, &registry, &report);
                    break;
                };

                let Some(report) = tracker.apply(&event) else {
                    continue;
                };
                deliver(&primary, &registry, &report);

                if report.is_terminal() {
                    if report.stage == SyncStage::Success {
                        run_hooks(&hooks, &backend).await;
                    }
                    break;
                }
            }

            info!("{}", tracker.get_stats().summary());
            tracker.snapshot()
        });

        Ok(SyncRun { handle, cancel })
    }
}

/// Primary observer first, then the registry. Failures are logged only.
fn deliver(
    primary: &Option<Arc<dyn ProgressObserver>>,
    registry: &ObserverRegistry,
    report: &ProgressReport,
) {
    if let Some(observer) = primary {
        if let Err(e) = observer.on_progress(report) {
            warn!("Observer {} dropped a progress report: {}", observer.name(), e);
        }
    }
    registry.broadcast(report);
}

/// A running sync
pub struct SyncRun {
    handle: JoinHandle<ProgressReport>,
    cancel: CancellationToken,
}

impl SyncRun {
    /// Wait for the run to end and return its final snapshot.
    pub async fn wait(self) -> WalletResult<ProgressReport> {
        self.handle
            .await
            .map_err(|e| WalletError::Internal(format!("sync run task: {}", e)))
    }

    /// Stop following the run. The backend's sync engine keeps going.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
