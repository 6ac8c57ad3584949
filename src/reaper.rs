//! Background maintenance: idle eviction, abandonment reclaim, min-idle top-up

use crate::entry::{EntryState, PooledEntry};
use crate::factory::ResourceFactory;
use crate::pool::PoolInner;

use crossbeam::channel::{Receiver, RecvTimeoutError};
use log::{debug, warn};
use parking_lot::MutexGuard;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Start the maintenance thread. It ticks every `interval` until the
/// shutdown channel is signalled or disconnected.
pub(crate) fn spawn<F: ResourceFactory>(
    inner: Arc<PoolInner<F>>,
    shutdown: Receiver<()>,
    interval: Duration,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("lendpool-reaper".into())
        .spawn(move || {
            debug!("maintenance thread started, period {interval:?}");
            loop {
                match shutdown.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => run_maintenance(&inner),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("maintenance thread stopped");
        })
        .expect("failed to spawn lendpool maintenance thread")
}

/// One maintenance pass. A failed create or destroy affects only the entry
/// it was for; the pass always finishes and the thread never dies with it.
fn run_maintenance<F: ResourceFactory>(inner: &Arc<PoolInner<F>>) {
    let mut state = inner.state.lock();
    if state.closed {
        return;
    }

    let now = Instant::now();
    let min_idle = inner.config.min_idle;

    // Evict entries that sat idle past the threshold, oldest first, never
    // dropping the idle population below the configured floor. The queue
    // is ordered by return time, so once the front is too young to evict
    // everything behind it is as well.
    let mut victims: Vec<PooledEntry<F::Resource>> = Vec::new();
    while state.idle.len() > min_idle
        && state
            .idle
            .front()
            .is_some_and(|e| e.meta.is_evictable(inner.config.min_evictable_idle, now))
    {
        if let Some(mut entry) = state.idle.pop_front() {
            entry.meta.state = EntryState::EvictionCheck;
            state.counters.destroyed += 1;
            state.counters.destroyed_by_evictor += 1;
            victims.push(entry);
        }
    }
    if !victims.is_empty() {
        // Destroying idle entries frees capacity slots.
        inner.available.notify_all();
    }

    if inner.config.remove_abandoned_on_maintenance {
        inner.reclaim_abandoned_locked(&mut state);
    }

    // Top the idle population back up toward the floor, capacity allowing.
    while state.idle.len() < min_idle && state.total() < inner.config.max_total {
        state.in_flight += 1;
        let created = MutexGuard::unlocked(&mut state, || inner.factory.create());
        state.in_flight -= 1;

        match created {
            Ok(resource) => {
                state.counters.created += 1;
                if state.closed {
                    state.counters.destroyed += 1;
                    drop(state);
                    inner.factory.destroy(resource);
                    for entry in victims {
                        inner.destroy_entry(entry);
                    }
                    return;
                }
                let id = state.next_id();
                state.idle.push_back(PooledEntry::new(id, resource));
                inner.available.notify_all();
            }
            Err(err) => {
                warn!("idle top-up create failed: {err}");
                break;
            }
        }
    }

    let evicted = victims.len();
    drop(state);
    for entry in victims {
        inner.destroy_entry(entry);
    }
    if evicted > 0 {
        debug!("evicted {evicted} idle entries");
    }
}
