use std::fmt;
use std::time::Duration;

use cachefront_common::cache::{Cache, CacheConfig};
use cachefront_common::time::{Clock, SharedClock};
use cachefront_domain::{CacheError, CacheResult, LockOwner, LockRecord};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Lease-based reentrant lock over a TTL map
///
/// Records live in a bare [`Cache`], so the lock never depends on a locked
/// cache itself. Each claim or release is a single-key
/// [`Cache::update`], which is the only synchronization the protocol needs.
///
/// A holder that never releases stops blocking others once its lease passes.
/// Leases longer than the store TTL end at the store TTL.
#[derive(Clone)]
pub struct LeaseLock {
    store: Cache<String, LockRecord, SharedClock>,
}

impl fmt::Debug for LeaseLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaseLock").field("held", &self.store.len()).finish()
    }
}

impl LeaseLock {
    /// Create a lock whose records expire from the store after `store_ttl`
    pub fn new(store_ttl: Duration, clock: SharedClock) -> Self {
        Self { store: Cache::with_clock(CacheConfig::ttl(store_ttl), clock) }
    }

    /// Acquire `name` for `owner`, polling every `retry_interval` until
    /// `timeout` elapses
    ///
    /// Reentrant: an owner already holding `name` gets a deeper hold at once.
    #[instrument(skip(self, owner, timeout, lease, retry_interval), fields(owner = %owner))]
    pub async fn acquire(
        &self,
        name: &str,
        owner: LockOwner,
        timeout: Duration,
        lease: Duration,
        retry_interval: Duration,
    ) -> CacheResult<LockGuard> {
        let started = Instant::now();
        let lease_millis = u64::try_from(lease.as_millis()).unwrap_or(u64::MAX);

        loop {
            if self.try_claim(name, owner, lease_millis) {
                debug!(lock = name, "Lock acquired");
                return Ok(LockGuard {
                    lock: Some(self.clone()),
                    name: name.to_string(),
                    owner,
                    released: false,
                });
            }

            let waited = started.elapsed();
            if waited >= timeout {
                warn!(lock = name, waited_ms = waited.as_millis(), "Lock acquisition timed out");
                return Err(CacheError::timeout(name, waited));
            }

            tokio::time::sleep(retry_interval.min(timeout - waited)).await;
        }
    }

    /// Release one level of `owner`'s hold on `name`
    ///
    /// Returns `false` when `owner` no longer holds the record (its lease
    /// expired and another owner claimed it, or it was never held); the
    /// current holder's record is left untouched.
    pub fn release(&self, name: &str, owner: &LockOwner) -> bool {
        let mut released = false;

        self.store.update(name.to_string(), |current| match current {
            Some(record) if record.is_owned_by(owner) => {
                released = true;
                record.released()
            }
            other => other.cloned(),
        });

        if released {
            debug!(lock = name, owner = %owner, "Lock released");
        } else {
            warn!(lock = name, owner = %owner, "Ignoring release from a non-holder");
        }
        released
    }

    /// Current record for `name`, if held and within the store TTL
    pub fn holder(&self, name: &str) -> Option<LockRecord> {
        self.store.get(&name.to_string())
    }

    fn try_claim(&self, name: &str, owner: LockOwner, lease_millis: u64) -> bool {
        let now = self.store.clock().millis_since_epoch();
        let mut claimed = false;

        self.store.update(name.to_string(), |current| match current {
            None => {
                claimed = true;
                Some(LockRecord::claim(owner, now, lease_millis))
            }
            Some(record) if record.is_owned_by(&owner) => {
                claimed = true;
                Some(record.reenter(now, lease_millis))
            }
            Some(record) if record.is_expired(now) => {
                debug!(lock = name, previous = %record.owner, "Reclaiming expired lease");
                claimed = true;
                Some(LockRecord::claim(owner, now, lease_millis))
            }
            Some(record) => Some(record.clone()),
        });

        claimed
    }
}

/// Releases its hold when dropped
///
/// Guards handed out for the reserved lock-store cache hold nothing.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    lock: Option<LeaseLock>,
    name: String,
    owner: LockOwner,
    released: bool,
}

impl LockGuard {
    /// Guard that holds nothing
    pub fn noop(name: impl Into<String>, owner: LockOwner) -> Self {
        Self { lock: None, name: name.into(), owner, released: true }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> LockOwner {
        self.owner
    }

    /// Whether dropping this guard releases anything
    pub fn is_held(&self) -> bool {
        !self.released
    }

    /// Release now instead of at drop
    pub fn release(mut self) -> bool {
        self.release_inner()
    }

    fn release_inner(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.lock.as_ref().is_some_and(|lock| lock.release(&self.name, &self.owner))
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("held", &self.is_held())
            .finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}
