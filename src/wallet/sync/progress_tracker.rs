//! Progress tracking for wallet synchronization.
//!
//! This module provides the `ProgressTracker`, the state machine that folds raw sync events into
//! full [`ProgressReport`] snapshots. A run moves through
//! `NotStarted -> FetchingHeaders -> DiscoveringAddresses -> RescanningBlocks` and ends in
//! `Success` or `Error`. The stage never moves backwards within a run and the percentage never
//! decreases within a stage.

use crate::utils::days_behind;
use crate::wallet::sync::events::RawSyncEvent;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Stage of a sync run, in the order a run passes through them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncStage {
    NotStarted,
    FetchingHeaders,
    DiscoveringAddresses,
    RescanningBlocks,
    Success,
    Error,
}

impl SyncStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, SyncStage::Success | SyncStage::Error)
    }

    /// 1-based step number for the three working stages
    pub fn step(self) -> Option<u8> {
        match self {
            SyncStage::FetchingHeaders => Some(1),
            SyncStage::DiscoveringAddresses => Some(2),
            SyncStage::RescanningBlocks => Some(3),
            _ => None,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "camelCase")]
pub enum SyncOutcome {
    InProgress,
    Success,
    Error(String),
}

/// Snapshot of sync status delivered to observers.
///
/// Optional fields are `None` until the backend has reported them; `Some(0)` peers is a real
/// reading, not a missing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub stage: SyncStage,
    /// Progress through the current stage, 0-100
    pub percentage: u8,
    pub connected_peers: Option<i32>,
    pub fetched_headers: Option<u32>,
    pub total_headers: Option<u32>,
    /// e.g. "3 days"
    pub days_behind: Option<String>,
    pub rescan_height: Option<u32>,
    pub outcome: SyncOutcome,
}

impl ProgressReport {
    pub fn not_started() -> Self {
        Self {
            stage: SyncStage::NotStarted,
            percentage: 0,
            connected_peers: None,
            fetched_headers: None,
            total_headers: None,
            days_behind: None,
            rescan_height: None,
            outcome: SyncOutcome::InProgress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// One-line human readable status, e.g. for logs
    pub fn status_line(&self) -> String {
        let mut line = match (&self.stage, &self.outcome) {
            (SyncStage::Success, _) => "Synced".to_string(),
            (SyncStage::Error, SyncOutcome::Error(message)) => format!("Sync failed: {}", message),
            (SyncStage::Error, _) => "Sync failed".to_string(),
            (SyncStage::NotStarted, _) => "Starting sync".to_string(),
            (SyncStage::FetchingHeaders, _) => match (self.fetched_headers, self.total_headers) {
                (Some(fetched), Some(total)) => format!(
                    "Fetched {} of {} block headers, {}% through step 1 of 3",
                    fetched, total, self.percentage
                ),
                _ => format!("Fetching block headers, {}% through step 1 of 3", self.percentage),
            },
            (SyncStage::DiscoveringAddresses, _) => format!(
                "Discovering used addresses, {}% through step 2 of 3",
                self.percentage
            ),
            (SyncStage::RescanningBlocks, _) => match (self.rescan_height, self.total_headers) {
                (Some(height), Some(total)) => format!(
                    "Scanning {} of {} block headers, {}% through step 3 of 3",
                    height, total, self.percentage
                ),
                _ => format!("Scanning blocks, {}% through step 3 of 3", self.percentage),
            },
        };

        if let Some(days) = &self.days_behind {
            line.push_str(&format!(", {} behind", days));
        }
        if let Some(peers) = self.connected_peers {
            line.push_str(&format!(", connected to {} peer(s)", peers));
        }
        line
    }
}

/// State machine for a single sync run
///
/// Every accepted event yields a complete snapshot. Events that arrive after the run reached a
/// terminal stage are ignored.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    report: ProgressReport,
    last_header_time: Option<i64>,
    /// Total raw events accepted
    events_processed: usize,
    /// Events that tried to move the stage backwards
    regressions_ignored: usize,
    /// Percentage at which we last logged, per stage
    last_logged_percentage: Option<u8>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            report: ProgressReport::not_started(),
            last_header_time: None,
            events_processed: 0,
            regressions_ignored: 0,
            last_logged_percentage: None,
        }
    }

    pub fn snapshot(&self) -> ProgressReport {
        self.report.clone()
    }

    pub fn stage(&self) -> SyncStage {
        self.report.stage
    }

    /// Apply a raw event and return the resulting snapshot.
    ///
    /// Returns `None` when the run is already over.
    pub fn apply(&mut self, event: &RawSyncEvent) -> Option<ProgressReport> {
        self.apply_at(event, Utc::now())
    }

    /// [`apply`](Self::apply) with an explicit clock for the days-behind estimate.
    pub fn apply_at(&mut self, event: &RawSyncEvent, now: DateTime<Utc>) -> Option<ProgressReport> {
        if self.report.is_terminal() {
            debug!("Ignoring sync event after run ended: {:?}", event);
            return None;
        }
        self.events_processed += 1;

        match event {
            RawSyncEvent::Started => {}
            RawSyncEvent::PeersUpdated { peer_count } => {
                self.report.connected_peers = Some(*peer_count);
            }
            RawSyncEvent::HeadersFetched {
                fetched,
                total,
                last_header_time,
            } => {
                if self.advance_to(SyncStage::FetchingHeaders) {
                    let total = (*total).max(*fetched);
                    self.report.fetched_headers = Some(*fetched);
                    self.report.total_headers = Some(total);
                    if last_header_time.is_some() {
                        self.last_header_time = *last_header_time;
                    }
                    self.raise_percentage(ratio_percentage(*fetched, total));
                }
            }
            RawSyncEvent::AddressDiscovery { progress } => {
                if self.advance_to(SyncStage::DiscoveringAddresses) {
                    // Engines report estimates beyond 100 while discovery overruns
                    self.raise_percentage((*progress).min(100) as u8);
                }
            }
            RawSyncEvent::Rescanning { height, total } => {
                if self.advance_to(SyncStage::RescanningBlocks) {
                    self.report.rescan_height = Some(*height);
                    self.raise_percentage(ratio_percentage(*height, (*total).max(*height)));
                }
            }
            RawSyncEvent::Ended { error: None } => {
                self.report.stage = SyncStage::Success;
                self.report.percentage = 100;
                self.report.outcome = SyncOutcome::Success;
            }
            RawSyncEvent::Ended { error: Some(message) } => {
                self.report.stage = SyncStage::Error;
                self.report.outcome = SyncOutcome::Error(message.clone());
            }
        }

        self.report.days_behind = self
            .last_header_time
            .and_then(|header_time| days_behind(header_time, now));

        self.log_progress(false);
        Some(self.snapshot())
    }

    /// Force the run into the error stage, e.g. when the backend could not start syncing.
    pub fn fail(&mut self, message: impl Into<String>) -> ProgressReport {
        self.report.stage = SyncStage::Error;
        self.report.outcome = SyncOutcome::Error(message.into());
        self.log_progress(true);
        self.snapshot()
    }

    /// Move to `stage` unless that would go backwards. Returns whether the run is now in `stage`.
    fn advance_to(&mut self, stage: SyncStage) -> bool {
        if stage == self.report.stage {
            return true;
        }
        if stage < self.report.stage {
            self.regressions_ignored += 1;
            debug!(
                "Ignoring {:?} progress while in {:?}",
                stage, self.report.stage
            );
            return false;
        }

        self.report.stage = stage;
        self.report.percentage = 0;
        self.last_logged_percentage = None;
        true
    }

    fn raise_percentage(&mut self, percentage: u8) {
        self.report.percentage = self.report.percentage.max(percentage.min(100));
    }

    /// Log on stage changes and every 10% within a stage, or when forced
    pub fn log_progress(&mut self, force: bool) {
        let percentage = self.report.percentage;
        let should_log = force
            || match self.last_logged_percentage {
                None => true,
                Some(last) => percentage >= last.saturating_add(10) || self.report.is_terminal(),
            };

        if should_log {
            info!("Sync progress: {}", self.report.status_line());
            self.last_logged_percentage = Some(percentage);
        }
    }

    pub fn get_stats(&self) -> SyncStats {
        SyncStats {
            final_stage: self.report.stage,
            events_processed: self.events_processed,
            regressions_ignored: self.regressions_ignored,
        }
    }
}

fn ratio_percentage(done: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done as u64 * 100) / total as u64).min(100) as u8
}

/// Statistics about a sync run
#[derive(Debug, Clone)]
pub struct SyncStats {
    pub final_stage: SyncStage,
    pub events_processed: usize,
    pub regressions_ignored: usize,
}

impl SyncStats {
    pub fn summary(&self) -> String {
        format!(
            "Sync run ended in {:?} after {} events{}",
            self.final_stage,
            self.events_processed,
            if self.regressions_ignored == 0 {
                String::new()
            } else {
                format!(" ({} out-of-order events ignored)", self.regressions_ignored)
            }
        )
    }
}
