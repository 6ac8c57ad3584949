//! Core pool implementation: borrow, return, close

use crate::config::PoolConfig;
use crate::entry::{EntryMeta, EntryState, PooledEntry};
use crate::errors::{PoolError, PoolResult};
use crate::factory::ResourceFactory;
use crate::metrics::{Counters, PoolStats};
use crate::reaper;

use crossbeam::channel::Sender;
use log::{debug, trace, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// All mutable pool state behind the single pool lock.
///
/// Membership moves between `idle` and `allocated`, so the two collections
/// and the counters are only ever touched together, under one lock.
pub(crate) struct PoolState<R> {
    /// Idle entries, oldest at the front. Borrows pop the back (LIFO),
    /// the evictor scans from the front.
    pub idle: VecDeque<PooledEntry<R>>,

    /// Metadata of entries out on loan, keyed by entry id.
    pub allocated: HashMap<u64, EntryMeta>,

    /// Loans forcibly reclaimed while the borrower still holds the guard.
    /// A late return of one of these ids fails instead of re-idling.
    pub revoked: HashSet<u64>,

    /// FIFO queue of tickets held by blocked borrowers.
    pub waiters: VecDeque<u64>,

    /// Capacity slots reserved for entries transiently outside both
    /// collections while a factory call runs with the lock released.
    pub in_flight: usize,

    pub next_entry_id: u64,
    pub next_ticket: u64,
    pub counters: Counters,
    pub closed: bool,
}

impl<R> PoolState<R> {
    fn new() -> Self {
        Self {
            idle: VecDeque::new(),
            allocated: HashMap::new(),
            revoked: HashSet::new(),
            waiters: VecDeque::new(),
            in_flight: 0,
            next_entry_id: 0,
            next_ticket: 0,
            counters: Counters::default(),
            closed: false,
        }
    }

    /// Current population counted against `max_total`.
    pub fn total(&self) -> usize {
        self.idle.len() + self.allocated.len() + self.in_flight
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        id
    }
}

fn drop_waiter<R>(state: &mut PoolState<R>, ticket: u64) {
    if let Some(pos) = state.waiters.iter().position(|&t| t == ticket) {
        state.waiters.remove(pos);
    }
}

/// Shared core behind `Pool` and every outstanding loan guard.
pub(crate) struct PoolInner<F: ResourceFactory> {
    pub config: PoolConfig,
    pub factory: F,
    pub state: Mutex<PoolState<F::Resource>>,
    /// Signalled whenever an idle entry appears or a capacity slot frees.
    pub available: Condvar,
}

impl<F: ResourceFactory> PoolInner<F> {
    /// Blocking borrow with an optional wait budget.
    fn acquire(self: &Arc<Self>, wait: Option<Duration>) -> PoolResult<Pooled<F>> {
        let deadline = wait.map(|w| Instant::now() + w);
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return Err(PoolError::Closed);
            }

            // Fast path only when nobody is queued ahead; fresh borrowers
            // must not overtake waiting ones.
            if state.waiters.is_empty() {
                if let Some(loan) = self.try_take(&mut state)? {
                    return Ok(loan);
                }
                if self.config.remove_abandoned_on_borrow
                    && self.reclaim_abandoned_locked(&mut state) > 0
                {
                    continue;
                }
            }

            let ticket = state.next_ticket;
            state.next_ticket += 1;
            state.waiters.push_back(ticket);
            trace!("pool exhausted; borrower {ticket} waiting");

            loop {
                match deadline {
                    Some(deadline) => {
                        if self.available.wait_until(&mut state, deadline).timed_out() {
                            drop_waiter(&mut state, ticket);
                            // Let the next ticket re-evaluate the queue head.
                            self.available.notify_all();
                            return Err(PoolError::Timeout(wait.unwrap_or_default()));
                        }
                    }
                    None => self.available.wait(&mut state),
                }

                if state.closed {
                    drop_waiter(&mut state, ticket);
                    return Err(PoolError::Closed);
                }

                let has_room =
                    !state.idle.is_empty() || state.total() < self.config.max_total;
                if state.waiters.front() == Some(&ticket) && has_room {
                    state.waiters.pop_front();
                    break;
                }
                // Spurious wakeup, or not at the head yet.
            }

            if let Some(loan) = self.try_take(&mut state)? {
                return Ok(loan);
            }
            // The slot evaporated between wakeup and take; go around again.
        }
    }

    /// Non-blocking borrow. Queued waiters keep their priority.
    fn try_acquire(self: &Arc<Self>) -> PoolResult<Pooled<F>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(PoolError::Closed);
        }
        if !state.waiters.is_empty() {
            return Err(PoolError::Exhausted);
        }
        if let Some(loan) = self.try_take(&mut state)? {
            return Ok(loan);
        }
        if self.config.remove_abandoned_on_borrow
            && self.reclaim_abandoned_locked(&mut state) > 0
            && let Some(loan) = self.try_take(&mut state)?
        {
            return Ok(loan);
        }
        Err(PoolError::Exhausted)
    }

    /// One attempt to produce a loan: reuse an idle entry or create a new
    /// one if capacity remains. `Ok(None)` means the pool is exhausted.
    ///
    /// Factory calls run with the lock released; the entry (or a reserved
    /// slot) is accounted in `in_flight` so the capacity invariant holds
    /// for concurrent observers.
    fn try_take(
        self: &Arc<Self>,
        state: &mut MutexGuard<'_, PoolState<F::Resource>>,
    ) -> PoolResult<Option<Pooled<F>>> {
        // Hottest entry first: reuse keeps recently exercised resources in
        // rotation and lets stale ones age toward eviction.
        while let Some(mut entry) = state.idle.pop_back() {
            debug_assert_eq!(entry.meta.state, EntryState::Idle);
            if self.config.validation_on_borrow {
                state.in_flight += 1;
                let ok = MutexGuard::unlocked(state, || self.factory.validate(&entry.resource));
                state.in_flight -= 1;

                if !ok {
                    entry.meta.state = EntryState::Invalid;
                    state.counters.destroyed += 1;
                    state.counters.destroyed_by_borrow_validation += 1;
                    // The destroy frees a capacity slot.
                    self.available.notify_all();
                    MutexGuard::unlocked(state, || self.destroy_entry(entry));
                    continue;
                }
                if state.closed {
                    state.counters.destroyed += 1;
                    MutexGuard::unlocked(state, || self.destroy_entry(entry));
                    return Err(PoolError::Closed);
                }
            }
            return Ok(Some(self.lend(state, entry)));
        }

        if state.total() < self.config.max_total {
            state.in_flight += 1;
            let created = MutexGuard::unlocked(state, || self.factory.create());
            state.in_flight -= 1;

            match created {
                Ok(resource) => {
                    let id = state.next_id();
                    state.counters.created += 1;
                    let entry = PooledEntry::new(id, resource);
                    if state.closed {
                        state.counters.destroyed += 1;
                        MutexGuard::unlocked(state, || self.destroy_entry(entry));
                        return Err(PoolError::Closed);
                    }
                    trace!("created entry {id}");
                    return Ok(Some(self.lend(state, entry)));
                }
                Err(err) => {
                    // The reserved slot is free again; a waiter may claim it.
                    self.available.notify_all();
                    return Err(PoolError::Factory(err));
                }
            }
        }

        Ok(None)
    }

    /// Move an entry to the allocated side and wrap it in a loan guard.
    fn lend(
        self: &Arc<Self>,
        state: &mut MutexGuard<'_, PoolState<F::Resource>>,
        mut entry: PooledEntry<F::Resource>,
    ) -> Pooled<F> {
        let now = Instant::now();
        entry.meta.on_borrow(now);
        state.counters.borrowed += 1;
        let PooledEntry { meta, resource } = entry;
        let id = meta.id;
        trace!("lending entry {id} (loan #{})", meta.borrow_count);
        state.allocated.insert(id, meta);
        Pooled {
            inner: Arc::clone(self),
            id,
            taken_at: now,
            resource: Some(resource),
        }
    }

    /// Give a loaned resource back: re-idle it, or destroy it when it
    /// fails validation, exceeds the idle ceiling, or the pool closed.
    pub(crate) fn return_entry(&self, id: u64, resource: F::Resource) -> PoolResult<()> {
        let mut state = self.state.lock();

        if state.revoked.remove(&id) {
            // The reclaim already counted this destroy; the stale loan
            // just surfaces the resource for teardown.
            drop(state);
            self.factory.destroy(resource);
            return Err(PoolError::InvalidReturn);
        }

        let Some(mut meta) = state.allocated.remove(&id) else {
            warn!("rejecting return of unknown entry {id}");
            return Err(PoolError::InvalidReturn);
        };
        debug_assert_eq!(meta.state, EntryState::Allocated);
        state.counters.returned += 1;

        if self.config.validation_on_return && !state.closed {
            state.in_flight += 1;
            let ok = MutexGuard::unlocked(&mut state, || self.factory.validate(&resource));
            state.in_flight -= 1;
            if !ok {
                meta.state = EntryState::Invalid;
                state.counters.destroyed += 1;
                self.available.notify_all();
                drop(state);
                self.destroy_entry(PooledEntry { meta, resource });
                return Ok(());
            }
        }

        if state.closed || state.idle.len() >= self.config.max_idle {
            // Past the idle ceiling there is no slot to go back to; the
            // entry is destroyed even though total capacity remains.
            state.counters.destroyed += 1;
            self.available.notify_all();
            drop(state);
            self.destroy_entry(PooledEntry { meta, resource });
            return Ok(());
        }

        meta.on_return(Instant::now());
        state.idle.push_back(PooledEntry { meta, resource });
        self.available.notify_all();
        Ok(())
    }

    /// Destroy a loaned resource instead of returning it.
    pub(crate) fn discard_entry(&self, id: u64, resource: F::Resource) {
        let mut state = self.state.lock();
        if state.revoked.remove(&id) {
            // Already counted when the loan was reclaimed.
        } else if let Some(mut meta) = state.allocated.remove(&id) {
            meta.state = EntryState::Invalid;
            state.counters.destroyed += 1;
            self.available.notify_all();
        }
        drop(state);
        self.factory.destroy(resource);
    }

    /// Revoke every loan held past the abandonment threshold. Returns the
    /// number of loans reclaimed. Counters update immediately; the held
    /// resource is physically destroyed when the stale guard drops.
    pub(crate) fn reclaim_abandoned_locked(&self, state: &mut PoolState<F::Resource>) -> usize {
        let timeout = self.config.abandoned_timeout;
        let now = Instant::now();
        let stale: Vec<u64> = state
            .allocated
            .iter()
            .filter(|(_, meta)| meta.is_abandoned(timeout, now))
            .map(|(id, _)| *id)
            .collect();

        for id in &stale {
            if let Some(meta) = state.allocated.remove(id) {
                warn!(
                    "reclaiming abandoned entry {id}: borrowed {:?} ago, last used {:?} ago",
                    meta.held(now),
                    now.duration_since(meta.last_used_at),
                );
                state.revoked.insert(*id);
                state.counters.destroyed += 1;
                state.counters.destroyed_by_abandonment += 1;
            }
        }
        if !stale.is_empty() {
            self.available.notify_all();
        }
        stale.len()
    }

    /// Final teardown of an entry that left the pool.
    pub(crate) fn destroy_entry(&self, entry: PooledEntry<F::Resource>) {
        let PooledEntry { mut meta, resource } = entry;
        meta.state = EntryState::Destroyed;
        trace!("destroyed entry {} after {} loans", meta.id, meta.borrow_count);
        self.factory.destroy(resource);
    }
}

struct ReaperHandle {
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ReaperHandle {
    fn idle() -> Self {
        Self {
            shutdown: None,
            thread: None,
        }
    }

    fn spawn<F: ResourceFactory>(inner: &Arc<PoolInner<F>>, interval: Duration) -> Self {
        let (tx, rx) = crossbeam::channel::bounded(0);
        let thread = reaper::spawn(Arc::clone(inner), rx, interval);
        Self {
            shutdown: Some(tx),
            thread: Some(thread),
        }
    }
}

/// Bounded, thread-safe pool of factory-built resources.
///
/// Consumers call [`borrow`](Pool::borrow) and get back a [`Pooled`] guard
/// that returns the resource on drop. Population is bounded by
/// [`PoolConfig::max_total`]; idle population by [`PoolConfig::max_idle`];
/// an optional background thread evicts stale idle entries, tops the pool
/// back up to [`PoolConfig::min_idle`], and reclaims abandoned loans.
///
/// # Examples
///
/// ```
/// use lendpool::{FactoryError, Pool, PoolConfig, ResourceFactory};
///
/// struct Sessions;
/// impl ResourceFactory for Sessions {
///     type Resource = String;
///     fn create(&self) -> Result<String, FactoryError> {
///         Ok("session".to_string())
///     }
/// }
///
/// let pool = Pool::new(Sessions, PoolConfig::new().with_max_total(4).with_max_idle(4)).unwrap();
/// {
///     let session = pool.borrow().unwrap();
///     assert_eq!(&*session, "session");
///     // returned automatically when the guard drops
/// }
/// assert_eq!(pool.stats().num_idle, 1);
/// ```
pub struct Pool<F: ResourceFactory> {
    inner: Arc<PoolInner<F>>,
    reaper: Mutex<ReaperHandle>,
}

impl<F: ResourceFactory> Pool<F> {
    /// Build a pool around a factory, eagerly creating
    /// [`PoolConfig::initial_size`] entries.
    ///
    /// Fails fast on an invalid configuration or a factory error during
    /// startup population; a partial population is torn down before the
    /// error is reported.
    pub fn new(factory: F, config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        debug!(
            "starting pool: initial={} min_idle={} max_idle={} max_total={}",
            config.initial_size, config.min_idle, config.max_idle, config.max_total
        );

        let inner = Arc::new(PoolInner {
            config,
            factory,
            state: Mutex::new(PoolState::new()),
            available: Condvar::new(),
        });

        for _ in 0..inner.config.initial_size {
            match inner.factory.create() {
                Ok(resource) => {
                    let mut state = inner.state.lock();
                    let id = state.next_id();
                    state.counters.created += 1;
                    state.idle.push_back(PooledEntry::new(id, resource));
                }
                Err(err) => {
                    let mut state = inner.state.lock();
                    let victims: Vec<_> = state.idle.drain(..).collect();
                    state.counters.destroyed += victims.len() as u64;
                    drop(state);
                    for entry in victims {
                        inner.destroy_entry(entry);
                    }
                    return Err(PoolError::Factory(err));
                }
            }
        }

        let reaper = match inner.config.eviction_interval {
            Some(interval) => ReaperHandle::spawn(&inner, interval),
            None => ReaperHandle::idle(),
        };

        Ok(Self {
            inner,
            reaper: Mutex::new(reaper),
        })
    }

    /// Borrow a resource, waiting up to the configured
    /// [`PoolConfig::max_wait`] when the pool is exhausted.
    pub fn borrow(&self) -> PoolResult<Pooled<F>> {
        self.inner.acquire(self.inner.config.max_wait)
    }

    /// Borrow with an explicit wait budget for this call only.
    pub fn borrow_timeout(&self, timeout: Duration) -> PoolResult<Pooled<F>> {
        self.inner.acquire(Some(timeout))
    }

    /// Borrow without blocking; exhaustion reports
    /// [`PoolError::Exhausted`] immediately.
    pub fn try_borrow(&self) -> PoolResult<Pooled<F>> {
        self.inner.try_acquire()
    }

    /// Borrow from async code, polling under the configured wait budget.
    pub async fn borrow_async(&self) -> PoolResult<Pooled<F>> {
        match self.inner.config.max_wait {
            Some(budget) => self.borrow_timeout_async(budget).await,
            None => loop {
                match self.try_borrow() {
                    Ok(loan) => return Ok(loan),
                    Err(PoolError::Exhausted) => {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                    Err(err) => return Err(err),
                }
            },
        }
    }

    /// Borrow from async code with an explicit wait budget.
    pub async fn borrow_timeout_async(&self, timeout: Duration) -> PoolResult<Pooled<F>> {
        tokio::time::timeout(timeout, async {
            loop {
                match self.try_borrow() {
                    Ok(loan) => return Ok(loan),
                    Err(PoolError::Exhausted) => {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                    Err(err) => return Err(err),
                }
            }
        })
        .await
        .map_err(|_| PoolError::Timeout(timeout))?
    }

    /// Consistent snapshot of gauges and counters.
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        state
            .counters
            .snapshot(state.allocated.len(), state.idle.len(), self.inner.config.max_total)
    }

    /// Entries currently out on loan.
    pub fn num_active(&self) -> usize {
        self.inner.state.lock().allocated.len()
    }

    /// Entries currently idle.
    pub fn num_idle(&self) -> usize {
        self.inner.state.lock().idle.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Drain and permanently close the pool.
    ///
    /// Destroys every idle entry, revokes all outstanding loans (their
    /// guards finish the teardown when they drop), fails all waiting
    /// borrowers with [`PoolError::Closed`], and stops the maintenance
    /// thread. Calling it again is a no-op.
    pub fn close(&self) {
        // Stop the maintenance thread first so it cannot race the drain.
        let (shutdown, thread) = {
            let mut reaper = self.reaper.lock();
            (reaper.shutdown.take(), reaper.thread.take())
        };
        drop(shutdown);

        let victims = {
            let mut state = self.inner.state.lock();
            if state.closed {
                Vec::new()
            } else {
                state.closed = true;
                let victims: Vec<_> = state.idle.drain(..).collect();
                state.counters.destroyed += victims.len() as u64;

                let loans: Vec<u64> = state.allocated.drain().map(|(id, _)| id).collect();
                state.counters.destroyed += loans.len() as u64;
                debug!(
                    "pool closed: {} idle destroyed, {} loans revoked",
                    victims.len(),
                    loans.len()
                );
                for id in loans {
                    state.revoked.insert(id);
                }

                self.inner.available.notify_all();
                victims
            }
        };

        for entry in victims {
            self.inner.destroy_entry(entry);
        }
        if let Some(thread) = thread {
            let _ = thread.join();
        }
    }
}

impl<F: ResourceFactory> Drop for Pool<F> {
    fn drop(&mut self) {
        self.close();
    }
}

/// A loaned resource that returns itself to the pool when dropped.
pub struct Pooled<F: ResourceFactory> {
    inner: Arc<PoolInner<F>>,
    id: u64,
    taken_at: Instant,
    resource: Option<F::Resource>,
}

impl<F: ResourceFactory> Pooled<F> {
    /// How long this loan has been out.
    pub fn held(&self) -> Duration {
        self.taken_at.elapsed()
    }

    /// Return the resource explicitly.
    ///
    /// Unlike a plain drop, this surfaces [`PoolError::InvalidReturn`]
    /// when the loan was reclaimed as abandoned (or the pool was closed
    /// and the loan revoked) while it was held.
    pub fn release(mut self) -> PoolResult<()> {
        match self.resource.take() {
            Some(resource) => self.inner.return_entry(self.id, resource),
            None => Err(PoolError::InvalidReturn),
        }
    }

    /// Destroy the resource instead of returning it, e.g. after the
    /// borrower observed it misbehaving.
    pub fn invalidate(mut self) {
        if let Some(resource) = self.resource.take() {
            self.inner.discard_entry(self.id, resource);
        }
    }
}

impl<F: ResourceFactory> fmt::Debug for Pooled<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("id", &self.id)
            .field("held", &self.taken_at.elapsed())
            .finish_non_exhaustive()
    }
}

impl<F: ResourceFactory> Deref for Pooled<F> {
    type Target = F::Resource;

    fn deref(&self) -> &Self::Target {
        self.resource.as_ref().expect("resource already taken")
    }
}

impl<F: ResourceFactory> DerefMut for Pooled<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.resource.as_mut().expect("resource already taken")
    }
}

impl<F: ResourceFactory> Drop for Pooled<F> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            let _ = self.inner.return_entry(self.id, resource);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Clone)]
    struct Probe {
        created: Arc<AtomicUsize>,
        destroyed: Arc<AtomicUsize>,
        valid: Arc<AtomicBool>,
        fail_create: Arc<AtomicBool>,
    }

    struct TestFactory {
        probe: Probe,
    }

    fn test_factory() -> (TestFactory, Probe) {
        let probe = Probe {
            created: Arc::new(AtomicUsize::new(0)),
            destroyed: Arc::new(AtomicUsize::new(0)),
            valid: Arc::new(AtomicBool::new(true)),
            fail_create: Arc::new(AtomicBool::new(false)),
        };
        (
            TestFactory {
                probe: probe.clone(),
            },
            probe,
        )
    }

    impl ResourceFactory for TestFactory {
        type Resource = usize;

        fn create(&self) -> Result<usize, crate::FactoryError> {
            if self.probe.fail_create.load(Ordering::SeqCst) {
                return Err("creation refused".into());
            }
            Ok(self.probe.created.fetch_add(1, Ordering::SeqCst))
        }

        fn validate(&self, _resource: &usize) -> bool {
            self.probe.valid.load(Ordering::SeqCst)
        }

        fn destroy(&self, _resource: usize) {
            self.probe.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_borrow_and_automatic_return() {
        let (factory, _probe) = test_factory();
        let pool = Pool::new(factory, PoolConfig::default()).unwrap();

        {
            let loan = pool.borrow().unwrap();
            assert_eq!(*loan, 0);
            assert_eq!(pool.num_active(), 1);
            assert_eq!(pool.num_idle(), 0);
        }

        assert_eq!(pool.num_active(), 0);
        assert_eq!(pool.num_idle(), 1);

        let stats = pool.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.borrowed, 1);
        assert_eq!(stats.returned, 1);
        assert_eq!(stats.destroyed, 0);
    }

    #[test]
    fn test_lazy_create_up_to_cap() {
        let (factory, probe) = test_factory();
        let config = PoolConfig::new().with_max_total(2).with_max_idle(2);
        let pool = Pool::new(factory, config).unwrap();

        let a = pool.borrow().unwrap();
        let b = pool.borrow().unwrap();
        assert_eq!(probe.created.load(Ordering::SeqCst), 2);

        assert!(matches!(pool.try_borrow(), Err(PoolError::Exhausted)));

        drop(a);
        let c = pool.try_borrow().unwrap();
        assert_eq!(probe.created.load(Ordering::SeqCst), 2);
        drop(b);
        drop(c);
    }

    #[test]
    fn test_max_idle_enforced_on_return() {
        let (factory, probe) = test_factory();
        let config = PoolConfig::new().with_max_total(4).with_max_idle(1);
        let pool = Pool::new(factory, config).unwrap();

        let a = pool.borrow().unwrap();
        let b = pool.borrow().unwrap();
        drop(a);
        assert_eq!(pool.num_idle(), 1);

        // No idle slot left for the second return.
        drop(b);
        assert_eq!(pool.num_idle(), 1);
        assert_eq!(probe.destroyed.load(Ordering::SeqCst), 1);

        let stats = pool.stats();
        assert_eq!(stats.returned, 2);
        assert_eq!(stats.destroyed, 1);
        assert_eq!(stats.destroyed_by_evictor, 0);
    }

    #[test]
    fn test_borrow_validation_destroys_invalid() {
        let (factory, probe) = test_factory();
        let config = PoolConfig::new()
            .with_initial_size(2)
            .with_validation_on_borrow();
        let pool = Pool::new(factory, config).unwrap();

        // Both idle entries fail validation; a fresh one is created.
        probe.valid.store(false, Ordering::SeqCst);
        let loan = pool.borrow().unwrap();
        assert_eq!(*loan, 2);

        let stats = pool.stats();
        assert_eq!(stats.destroyed_by_borrow_validation, 2);
        assert_eq!(stats.destroyed, 2);
        assert_eq!(stats.created, 3);
        assert_eq!(probe.destroyed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_factory_failure_leaves_pool_consistent() {
        let (factory, probe) = test_factory();
        let config = PoolConfig::new().with_max_total(2).with_max_idle(2);
        let pool = Pool::new(factory, config).unwrap();

        probe.fail_create.store(true, Ordering::SeqCst);
        assert!(matches!(pool.borrow(), Err(PoolError::Factory(_))));
        assert_eq!(pool.num_active(), 0);
        assert_eq!(pool.num_idle(), 0);

        // The failed attempt must not have consumed a capacity slot.
        probe.fail_create.store(false, Ordering::SeqCst);
        let a = pool.borrow().unwrap();
        let b = pool.borrow().unwrap();
        drop(a);
        drop(b);
    }

    #[test]
    fn test_invalidate_destroys_instead_of_returning() {
        let (factory, probe) = test_factory();
        let pool = Pool::new(factory, PoolConfig::default()).unwrap();

        let loan = pool.borrow().unwrap();
        loan.invalidate();

        assert_eq!(pool.num_active(), 0);
        assert_eq!(pool.num_idle(), 0);
        assert_eq!(probe.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(pool.stats().destroyed, 1);
    }

    #[test]
    fn test_borrow_after_close_fails_fast() {
        let (factory, _probe) = test_factory();
        let pool = Pool::new(factory, PoolConfig::new().with_initial_size(2)).unwrap();

        pool.close();
        assert!(pool.is_closed());
        assert!(matches!(pool.borrow(), Err(PoolError::Closed)));
        assert!(matches!(pool.try_borrow(), Err(PoolError::Closed)));
    }

    #[tokio::test]
    async fn test_borrow_async_and_timeout() {
        let (factory, _probe) = test_factory();
        let config = PoolConfig::new().with_max_total(1).with_max_idle(1);
        let pool = Pool::new(factory, config).unwrap();

        let loan = pool.borrow_async().await.unwrap();
        let err = pool
            .borrow_timeout_async(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::Timeout(_)));
        drop(loan);

        let loan = pool.borrow_async().await.unwrap();
        drop(loan);
    }
}
