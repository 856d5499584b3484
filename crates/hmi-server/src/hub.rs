//! Real-time fan-out of committed snapshots.
//!
//! The [`BroadcastHub`] is registered as a [`CommitListener`] on the state
//! coordinator and pushes one [`HmiUpdate`] per commit into a
//! [`tokio::sync::broadcast`] channel. Every connected subscriber sees the
//! same sequence. A subscriber that falls more than the channel capacity
//! behind skips to the newest snapshot instead of slowing the others.

use std::sync::Arc;

use hmi_core::coordinator::{Commit, CommitListener};
use hmi_types::HmiState;
use tokio::sync::broadcast;

/// Event name carried by every snapshot push.
pub const HMI_UPDATE_EVENT: &str = "hmi_update";

/// A snapshot push as it appears on the wire:
/// `{"event": "hmi_update", "payload": <state>}`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HmiUpdate {
    /// Always [`HMI_UPDATE_EVENT`].
    pub event: &'static str,
    /// The committed snapshot.
    pub payload: Arc<HmiState>,
}

impl HmiUpdate {
    /// Wrap a snapshot in an `hmi_update` event.
    pub const fn new(payload: Arc<HmiState>) -> Self {
        Self {
            event: HMI_UPDATE_EVENT,
            payload,
        }
    }
}

/// Broadcast channel for snapshot updates.
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    tx: broadcast::Sender<HmiUpdate>,
}

impl BroadcastHub {
    /// Create a hub buffering up to `capacity` updates per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to future updates.
    pub fn subscribe(&self) -> broadcast::Receiver<HmiUpdate> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish a snapshot to all subscribers.
    ///
    /// Returns the number of receivers that got the message. Returns 0 if
    /// nobody is connected (this is not an error).
    pub fn publish(&self, snapshot: Arc<HmiState>) -> usize {
        // send returns Err only when there are zero receivers,
        // which is normal when no dashboard is connected.
        self.tx.send(HmiUpdate::new(snapshot)).unwrap_or(0)
    }
}

impl CommitListener for BroadcastHub {
    fn on_commit(&self, commit: &Commit) {
        let receivers = self.publish(Arc::clone(&commit.snapshot));
        tracing::debug!(
            tank_id = %commit.reading.tank_id,
            receivers,
            "Broadcast hmi_update"
        );
    }
}
