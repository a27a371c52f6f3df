//! Socket-style fan-out of wallet events.
//!
//! A [`BroadcastHub`] holds one bounded outbound queue per connected client (a WebSocket
//! writer task, typically). Frames are JSON encoded [`Packet`]s. Clients that went away are
//! dropped from the hub. A client that falls behind loses its oldest frames, never the newest,
//! so the final snapshot of a run always reaches it.

use crate::wallet::ConnectionInfo;
use crate::wallet::sync::events::{ObserverError, ProgressObserver};
use crate::wallet::sync::progress_tracker::ProgressReport;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketEvent {
    #[serde(rename = "updateConnInfo")]
    UpdateConnectionInfo,
    #[serde(rename = "syncProgress")]
    SyncProgress,
}

/// Frame sent to every client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub event: PacketEvent,
    pub message: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// Registry of connected clients with broadcast
pub struct BroadcastHub {
    clients: Mutex<HashMap<ClientId, broadcast::Sender<String>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl BroadcastHub {
    /// `queue_capacity` bounds each client's outbound queue
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Add a client; the receiver yields the JSON frames to write to it
    pub fn register(&self) -> (ClientId, ClientReceiver) {
        let (sender, receiver) = broadcast::channel(self.queue_capacity);
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_clients().insert(id, sender);
        debug!("Broadcast client {:?} registered", id);
        (id, ClientReceiver { id, receiver })
    }

    pub fn unregister(&self, id: ClientId) -> bool {
        self.lock_clients().remove(&id).is_some()
    }

    pub fn client_count(&self) -> usize {
        self.lock_clients().len()
    }

    /// Send a packet to every client. Returns how many clients accepted the frame.
    pub fn broadcast(&self, packet: &Packet) -> usize {
        let frame = match serde_json::to_string(packet) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to encode {:?} packet: {}", packet.event, e);
                return 0;
            }
        };

        let mut delivered = 0;
        // A lagging queue overwrites its oldest frame; only a dropped receiver fails
        self.lock_clients().retain(|id, sender| match sender.send(frame.clone()) {
            Ok(_) => {
                delivered += 1;
                true
            }
            Err(_) => {
                debug!("Broadcast client {:?} went away, removing", id);
                false
            }
        });
        delivered
    }

    pub fn send_connection_info(&self, info: &ConnectionInfo) -> usize {
        match serde_json::to_value(info) {
            Ok(message) => self.broadcast(&Packet {
                event: PacketEvent::UpdateConnectionInfo,
                message,
            }),
            Err(e) => {
                warn!("Failed to encode connection info: {}", e);
                0
            }
        }
    }

    fn lock_clients(&self) -> std::sync::MutexGuard<'_, HashMap<ClientId, broadcast::Sender<String>>> {
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Outbound frames of one client, oldest first
pub struct ClientReceiver {
    id: ClientId,
    receiver: broadcast::Receiver<String>,
}

impl ClientReceiver {
    /// Next frame, or `None` once the client was unregistered and its queue drained.
    ///
    /// Frames overwritten while the client lagged are skipped.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.recv().await {
                Ok(frame) => return Some(frame),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Broadcast client {:?} skipped {} stale frames", self.id, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next queued frame without waiting
    pub fn try_recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.try_recv() {
                Ok(frame) => return Some(frame),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!("Broadcast client {:?} skipped {} stale frames", self.id, skipped);
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

impl ProgressObserver for BroadcastHub {
    fn on_progress(&self, report: &ProgressReport) -> Result<(), ObserverError> {
        let message =
            serde_json::to_value(report).map_err(|e| ObserverError::Failed(e.to_string()))?;
        self.broadcast(&Packet {
            event: PacketEvent::SyncProgress,
            message,
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "broadcast-hub"
    }
}
