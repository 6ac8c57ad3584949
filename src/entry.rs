//! Lifecycle metadata for pooled resources

use std::time::{Duration, Instant};

/// Lifecycle state of a pooled entry. `Destroyed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryState {
    Idle,
    Allocated,
    EvictionCheck,
    Invalid,
    Destroyed,
}

/// Bookkeeping that travels with an entry across its whole lifecycle.
///
/// While a resource is out on loan it lives inside the borrower's guard;
/// the metadata stays behind in the allocated map, keyed by `id`, and the
/// two halves rejoin on return.
#[derive(Debug, Clone)]
pub(crate) struct EntryMeta {
    pub id: u64,
    pub state: EntryState,
    pub created_at: Instant,
    pub last_borrowed_at: Option<Instant>,
    pub last_returned_at: Option<Instant>,
    pub last_used_at: Instant,
    pub borrow_count: u64,
}

impl EntryMeta {
    pub fn new(id: u64) -> Self {
        let now = Instant::now();
        Self {
            id,
            state: EntryState::Idle,
            created_at: now,
            last_borrowed_at: None,
            last_returned_at: None,
            last_used_at: now,
            borrow_count: 0,
        }
    }

    pub fn on_borrow(&mut self, now: Instant) {
        self.state = EntryState::Allocated;
        self.last_borrowed_at = Some(now);
        self.last_used_at = now;
        self.borrow_count += 1;
    }

    pub fn on_return(&mut self, now: Instant) {
        self.state = EntryState::Idle;
        self.last_returned_at = Some(now);
        self.last_used_at = now;
    }

    /// Start of the current idle period: the last return, or creation if
    /// the entry has never been borrowed.
    pub fn idle_since(&self) -> Instant {
        self.last_returned_at.unwrap_or(self.created_at)
    }

    pub fn is_evictable(&self, min_evictable_idle: Duration, now: Instant) -> bool {
        now.duration_since(self.idle_since()) >= min_evictable_idle
    }

    /// Whether a loan has been held past the abandonment threshold.
    pub fn is_abandoned(&self, timeout: Duration, now: Instant) -> bool {
        match self.last_borrowed_at {
            Some(borrowed_at) => now.duration_since(borrowed_at) >= timeout,
            None => false,
        }
    }

    /// How long the current loan has been out.
    pub fn held(&self, now: Instant) -> Duration {
        now.duration_since(self.last_borrowed_at.unwrap_or(self.created_at))
    }
}

/// An entry at rest in the idle set: metadata plus the resource itself.
pub(crate) struct PooledEntry<R> {
    pub meta: EntryMeta,
    pub resource: R,
}

impl<R> PooledEntry<R> {
    pub fn new(id: u64, resource: R) -> Self {
        Self {
            meta: EntryMeta::new(id),
            resource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_borrow_return_stamps() {
        let mut meta = EntryMeta::new(1);
        assert_eq!(meta.state, EntryState::Idle);
        assert_eq!(meta.borrow_count, 0);

        let t1 = Instant::now();
        meta.on_borrow(t1);
        assert_eq!(meta.state, EntryState::Allocated);
        assert_eq!(meta.last_borrowed_at, Some(t1));
        assert_eq!(meta.borrow_count, 1);

        let t2 = t1 + Duration::from_millis(5);
        meta.on_return(t2);
        assert_eq!(meta.state, EntryState::Idle);
        assert_eq!(meta.last_returned_at, Some(t2));
        assert_eq!(meta.last_used_at, t2);
        assert_eq!(meta.idle_since(), t2);
    }

    #[test]
    fn test_evictable_uses_creation_when_never_returned() {
        let meta = EntryMeta::new(1);
        let now = meta.created_at + Duration::from_millis(100);
        assert!(meta.is_evictable(Duration::from_millis(50), now));
        assert!(!meta.is_evictable(Duration::from_millis(200), now));
    }

    #[test]
    fn test_abandonment_needs_a_borrow() {
        let mut meta = EntryMeta::new(1);
        let now = meta.created_at + Duration::from_secs(60);
        assert!(!meta.is_abandoned(Duration::from_secs(1), now));

        meta.on_borrow(meta.created_at);
        assert!(meta.is_abandoned(Duration::from_secs(1), now));
        assert_eq!(meta.held(now), Duration::from_secs(60));
    }
}
