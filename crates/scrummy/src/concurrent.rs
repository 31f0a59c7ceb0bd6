//! # Per-Parent Serialization
//!
//! Two deliveries about the same issue or pull request must not interleave
//! their reads and writes: both could see "no stage label yet" and both add
//! one. [`ParentLocks`] hands out one FIFO lock per parent; events about
//! different parents still run in parallel.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Identifies a parent within the process: repository full name and number.
///
/// Issues and pull requests share one number sequence per repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParentKey {
    pub repository: String,
    pub number: u64,
}

impl ParentKey {
    #[must_use]
    pub fn new(repository: &str, number: u64) -> Self {
        Self {
            repository: repository.to_string(),
            number,
        }
    }
}

impl fmt::Display for ParentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repository, self.number)
    }
}

/// Per-parent locks, created on demand and dropped once nobody holds or waits.
#[derive(Debug, Clone, Default)]
pub struct ParentLocks {
    locks: Arc<Mutex<HashMap<ParentKey, Arc<Mutex<()>>>>>,
}

impl ParentLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Waiters are served in arrival order.
    pub async fn lock(&self, key: ParentKey) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.locks.lock().await;
            // Only the map holds an idle slot.
            locks.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        debug!(parent = %key, "Waiting for parent lock");
        slot.lock_owned().await
    }

    /// Number of parents currently locked or awaited.
    pub async fn tracked(&self) -> usize {
        let locks = self.locks.lock().await;
        locks
            .values()
            .filter(|slot| Arc::strong_count(slot) > 1)
            .count()
    }
}
