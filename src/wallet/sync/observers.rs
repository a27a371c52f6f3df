//! Ready-made progress observers.
//!
//! None of these block the coordinator: callbacks run inline and must be quick, the watch and
//! channel observers hand the snapshot off without waiting and keep the newest one.

use crate::wallet::sync::events::{ObserverError, ProgressObserver};
use crate::wallet::sync::progress_tracker::{ProgressReport, SyncStage};

use std::sync::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{error, info};

/// Observer wrapping a closure
pub struct CallbackObserver<F> {
    name: String,
    callback: F,
}

impl<F> CallbackObserver<F>
where
    F: Fn(&ProgressReport) + Send + Sync,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<F> ProgressObserver for CallbackObserver<F>
where
    F: Fn(&ProgressReport) + Send + Sync,
{
    fn on_progress(&self, report: &ProgressReport) -> Result<(), ObserverError> {
        (self.callback)(report);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Keeps only the most recent snapshot; readers always render the latest state.
pub struct LatestReportObserver {
    sender: watch::Sender<ProgressReport>,
}

impl LatestReportObserver {
    /// Create the observer and a receiver that starts at `NotStarted`.
    pub fn new() -> (Self, watch::Receiver<ProgressReport>) {
        let (sender, receiver) = watch::channel(ProgressReport::not_started());
        (Self { sender }, receiver)
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressReport> {
        self.sender.subscribe()
    }
}

impl ProgressObserver for LatestReportObserver {
    fn on_progress(&self, report: &ProgressReport) -> Result<(), ObserverError> {
        // send_replace succeeds even with no receivers left
        self.sender.send_replace(report.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "latest-report"
    }
}

/// Forwards snapshots into a bounded channel.
///
/// A receiver that lags loses the oldest queued snapshots and sees `RecvError::Lagged` once;
/// the newest snapshot is always kept.
pub struct ChannelObserver {
    name: String,
    sender: broadcast::Sender<ProgressReport>,
}

impl ChannelObserver {
    pub fn new(
        name: impl Into<String>,
        capacity: usize,
    ) -> (Self, broadcast::Receiver<ProgressReport>) {
        let (sender, receiver) = broadcast::channel(capacity.max(1));
        (
            Self {
                name: name.into(),
                sender,
            },
            receiver,
        )
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, report: &ProgressReport) -> Result<(), ObserverError> {
        self.sender
            .send(report.clone())
            .map(|_| ())
            .map_err(|_| ObserverError::Closed)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Logs stage transitions and the run outcome
#[derive(Default)]
pub struct TracingObserver {
    last_stage: Mutex<Option<SyncStage>>,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressObserver for TracingObserver {
    fn on_progress(&self, report: &ProgressReport) -> Result<(), ObserverError> {
        let mut last_stage = self
            .last_stage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *last_stage == Some(report.stage) {
            return Ok(());
        }
        *last_stage = Some(report.stage);

        match report.stage {
            SyncStage::Error => error!("{}", report.status_line()),
            _ => info!("Sync stage {:?}: {}", report.stage, report.status_line()),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}
