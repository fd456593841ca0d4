//! Live traffic narration.
//!
//! [`Hub`] owns the set of connected observers. Every observer gets a
//! bounded queue; [`Hub::broadcast`] offers a line to each queue without
//! ever waiting, so a stuck observer cannot slow request handling. The
//! socket side of an observer lives in [`observer`].
//!
//! All registration, removal and broadcasting goes through one mutex, so
//! a subscriber removed before a broadcast starts never sees that line and
//! a subscriber registered after it started never sees it either.

pub mod observer;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::error::BroadcastError;

pub type SubscriberId = u64;

/// Handed to an observer on registration. Dropping `lines` is how an
/// observer signals it is gone.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub lines: mpsc::Receiver<String>,
}

#[derive(Debug)]
pub struct Hub {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<String>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Hub {
    /// `queue_capacity` is the per-observer backlog; values below 1 are raised to 1.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    // A panic while holding the lock cannot leave the map half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<String>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.lock().insert(id, tx);
        tracing::debug!(subscriber = id, "observer registered");
        Subscription { id, lines: rx }
    }

    /// Returns `false` if the subscriber was already gone.
    pub fn remove(&self, id: SubscriberId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = id, "observer removed");
        }
        removed
    }

    /// Offer `line` to every observer. Returns how many queues accepted it.
    pub fn broadcast(&self, line: &str) -> usize {
        let mut delivered = 0;
        let mut subscribers = self.lock();
        subscribers.retain(|&id, tx| match deliver(id, tx, line) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(err @ BroadcastError::QueueFull(_)) => {
                tracing::warn!(error = %err, "dropping traffic line for slow observer");
                true
            }
            Err(err @ BroadcastError::SubscriberWriteFailure(_)) => {
                tracing::debug!(error = %err, "removing observer");
                false
            }
        });
        delivered
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.lock().contains_key(&id)
    }
}

fn deliver(
    id: SubscriberId,
    tx: &mpsc::Sender<String>,
    line: &str,
) -> Result<(), BroadcastError> {
    tx.try_send(line.to_owned()).map_err(|e| match e {
        mpsc::error::TrySendError::Full(_) => BroadcastError::QueueFull(id),
        mpsc::error::TrySendError::Closed(_) => BroadcastError::SubscriberWriteFailure(id),
    })
}
