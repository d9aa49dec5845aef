//! Single-flight access to camera sources.
//!
//! At most one acquisition per source id is in flight. A second caller for
//! the same source either waits (bounded) or is turned away, depending on
//! [`SingleFlightPolicy`]. Different sources never block each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{VisionError, VisionResult};

/// What a caller does when the source is already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleFlightPolicy {
    /// Wait up to `wait_timeout` for the holder to finish.
    Queue { wait_timeout: Duration },
    /// Fail immediately with `SourceBusy`.
    Reject,
}

impl Default for SingleFlightPolicy {
    fn default() -> Self {
        SingleFlightPolicy::Queue {
            wait_timeout: Duration::from_secs(90),
        }
    }
}

/// Per-source lock table.
#[derive(Default)]
pub struct SourceLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl SourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `source_id` under the given policy.
    ///
    /// The returned lease releases the source when dropped.
    pub async fn acquire(
        &self,
        source_id: &str,
        policy: SingleFlightPolicy,
    ) -> VisionResult<SourceLease> {
        let lock = self.get_or_create_lock(source_id).await;
        let requested_at = Instant::now();

        let guard = match policy {
            SingleFlightPolicy::Reject => lock.try_lock_owned().map_err(|_| {
                debug!(source = %source_id, "Source busy, rejecting");
                VisionError::SourceBusy(source_id.to_string())
            })?,
            SingleFlightPolicy::Queue { wait_timeout } => {
                match timeout(wait_timeout, lock.lock_owned()).await {
                    Ok(guard) => guard,
                    Err(_) => {
                        warn!(
                            source = %source_id,
                            timeout_ms = wait_timeout.as_millis() as u64,
                            "Timed out waiting for camera source"
                        );
                        return Err(VisionError::SourceBusy(source_id.to_string()));
                    }
                }
            }
        };

        debug!(
            source = %source_id,
            waited_ms = requested_at.elapsed().as_millis() as u64,
            "Source lease acquired"
        );

        Ok(SourceLease {
            source_id: source_id.to_string(),
            acquired_at: Instant::now(),
            _guard: guard,
        })
    }

    /// Whether someone currently holds `source_id`.
    pub async fn is_held(&self, source_id: &str) -> bool {
        let locks = self.locks.read().await;
        locks
            .get(source_id)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }

    async fn get_or_create_lock(&self, source_id: &str) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(source_id) {
                return Arc::clone(lock);
            }
        }

        let mut locks = self.locks.write().await;
        Arc::clone(
            locks
                .entry(source_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

/// Exclusive hold on one source.
pub struct SourceLease {
    source_id: String,
    acquired_at: Instant,
    _guard: OwnedMutexGuard<()>,
}

impl SourceLease {
    pub fn source_id(&self) -> &str {
        &self.source_id
    }
}

impl Drop for SourceLease {
    fn drop(&mut self) {
        debug!(
            source = %self.source_id,
            held_ms = self.acquired_at.elapsed().as_millis() as u64,
            "Source lease released"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reject_when_held() {
        let locks = SourceLocks::new();
        let lease = locks.acquire("0", SingleFlightPolicy::Reject).await.unwrap();
        assert!(locks.is_held("0").await);

        let second = locks.acquire("0", SingleFlightPolicy::Reject).await;
        assert!(matches!(second, Err(VisionError::SourceBusy(ref id)) if id == "0"));

        drop(lease);
        assert!(!locks.is_held("0").await);
        assert!(locks.acquire("0", SingleFlightPolicy::Reject).await.is_ok());
    }

    #[tokio::test]
    async fn test_queue_times_out() {
        let locks = SourceLocks::new();
        let _lease = locks.acquire("0", SingleFlightPolicy::Reject).await.unwrap();

        let policy = SingleFlightPolicy::Queue {
            wait_timeout: Duration::from_millis(50),
        };
        assert!(matches!(
            locks.acquire("0", policy).await,
            Err(VisionError::SourceBusy(_))
        ));
    }

    #[tokio::test]
    async fn test_queue_waits_for_release() {
        let locks = Arc::new(SourceLocks::new());
        let lease = locks.acquire("0", SingleFlightPolicy::Reject).await.unwrap();

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                locks
                    .acquire("0", SingleFlightPolicy::default())
                    .await
                    .map(|lease| lease.source_id().to_string())
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(lease);
        assert_eq!(waiter.await.unwrap().unwrap(), "0");
    }

    #[tokio::test]
    async fn test_different_sources_are_independent() {
        let locks = SourceLocks::new();
        let _a = locks.acquire("0", SingleFlightPolicy::Reject).await.unwrap();
        assert!(locks.acquire("rtsp://cam2", SingleFlightPolicy::Reject).await.is_ok());
    }
}
