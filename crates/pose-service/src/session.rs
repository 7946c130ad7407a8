//! Pending-request slots: one outstanding caller handle per category.
//!
//! The table makes request/response pairing explicit. Claiming an occupied
//! slot is an error in its own right; nothing is queued and nothing is
//! silently replaced. Categories are independent: resolving or failing one
//! never touches another.

use common::error::PoseError;
use common::landmark::DetectionResult;
use std::collections::HashMap;
use std::time::Instant;
use telemetry::metrics::POSE_PENDING_REJECTIONS;
use tokio::sync::{oneshot, Mutex};

/// Request categories, each owning an independent pending slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestCategory {
    Image,
    Video,
    LiveCamera,
}

impl RequestCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::LiveCamera => "live_camera",
        }
    }
}

pub type PendingOutcome = Result<DetectionResult, PoseError>;

/// One claimed slot awaiting its result.
pub struct PendingEntry {
    sender: oneshot::Sender<PendingOutcome>,
    /// When the slot was claimed; live latency is measured from here.
    pub submitted_at: Instant,
    /// Dimensions of the analyzed image, echoed into the result.
    pub frame_width: u32,
    pub frame_height: u32,
}

impl PendingEntry {
    /// Deliver the outcome to the waiting caller. Consumes the entry, so a
    /// slot can never be resolved twice. Returns false when the caller
    /// stopped waiting.
    pub fn deliver(self, outcome: PendingOutcome) -> bool {
        self.sender.send(outcome).is_ok()
    }
}

/// Table of pending handles keyed by category.
pub struct PendingTable {
    slots: Mutex<HashMap<RequestCategory, PendingEntry>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Claim the slot for `category`, yielding the receiver the caller
    /// awaits. Fails with a busy error when the slot is occupied.
    pub async fn claim(
        &self,
        category: RequestCategory,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<oneshot::Receiver<PendingOutcome>, PoseError> {
        let mut slots = self.slots.lock().await;
        if slots.contains_key(&category) {
            POSE_PENDING_REJECTIONS
                .with_label_values(&[category.as_str()])
                .inc();
            return Err(PoseError::Busy(category.as_str()));
        }

        let (tx, rx) = oneshot::channel();
        slots.insert(
            category,
            PendingEntry {
                sender: tx,
                submitted_at: Instant::now(),
                frame_width,
                frame_height,
            },
        );
        Ok(rx)
    }

    /// Remove and return the pending entry for `category`, if any.
    pub async fn take(&self, category: RequestCategory) -> Option<PendingEntry> {
        self.slots.lock().await.remove(&category)
    }

    /// Resolve the pending slot for `category` with `outcome`. Returns
    /// false when no handle was waiting.
    pub async fn resolve(&self, category: RequestCategory, outcome: PendingOutcome) -> bool {
        match self.take(category).await {
            Some(entry) => entry.deliver(outcome),
            None => false,
        }
    }

    pub async fn is_pending(&self, category: RequestCategory) -> bool {
        self.slots.lock().await.contains_key(&category)
    }
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}
