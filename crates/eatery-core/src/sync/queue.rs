use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::api::Gateway;
use crate::models::{FavoriteUpdate, Review};

/// Ordered list of writes waiting for connectivity. In memory only.
#[derive(Debug)]
pub struct OfflineQueue<T> {
    entries: Mutex<VecDeque<T>>,
}

impl<T> OfflineQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        // a poisoned lock still holds a usable queue
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn enqueue(&self, entry: T) {
        self.entries().push_back(entry);
    }

    /// Take every pending entry in insertion order, leaving the queue empty.
    pub fn drain_all(&self) -> Vec<T> {
        self.entries().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl<T> Default for OfflineQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub forwarded: usize,
    pub failed: usize,
}

impl DrainReport {
    pub fn total(&self) -> usize {
        self.forwarded + self.failed
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub reviews: DrainReport,
    pub favorites: DrainReport,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.reviews.total() == 0 && self.favorites.total() == 0
    }
}

/// The two pending-write queues, created once at startup and shared.
#[derive(Debug, Default)]
pub struct OfflineQueues {
    pub reviews: OfflineQueue<Review>,
    pub favorites: OfflineQueue<FavoriteUpdate>,
}

impl OfflineQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.reviews.len() + self.favorites.len()
    }

    /// Forward every queued write to the gateway.
    ///
    /// Both queues are emptied up front, so a failed entry is gone for good.
    /// Failures are logged and counted, never returned.
    pub async fn flush(&self, gateway: &dyn Gateway) -> SyncReport {
        let reviews = self.reviews.drain_all();
        let favorites = self.favorites.drain_all();
        if reviews.is_empty() && favorites.is_empty() {
            debug!("No offline writes to flush");
            return SyncReport::default();
        }

        let mut report = SyncReport::default();

        for review in &reviews {
            match gateway.submit_review(review).await {
                Ok(()) => report.reviews.forwarded += 1,
                Err(e) => {
                    warn!(restaurant_id = review.restaurant_id, error = %e, "Dropped offline review");
                    report.reviews.failed += 1;
                }
            }
        }

        for update in favorites {
            match gateway.set_favorite(update).await {
                Ok(()) => report.favorites.forwarded += 1,
                Err(e) => {
                    warn!(restaurant_id = update.restaurant_id, error = %e, "Dropped offline favorite update");
                    report.favorites.failed += 1;
                }
            }
        }

        info!(
            reviews = report.reviews.forwarded,
            favorites = report.favorites.forwarded,
            failed = report.reviews.failed + report.favorites.failed,
            "Flushed offline writes"
        );
        report
    }
}
