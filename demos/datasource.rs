//! A pooled "data source" under concurrent load, then left to drain.
//!
//! Ten worker threads each borrow a connection, run a pretend query, and
//! print the pool's counters. Afterwards the pool sits unused so the
//! eviction sweep can be watched shrinking the idle population back to
//! the configured floor.

use lendpool::{FactoryError, Pool, PoolConfig, PoolStats, ResourceFactory};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct DbConn {
    id: u32,
}

impl DbConn {
    fn query(&self, sql: &str) -> usize {
        // Stand-in for a round trip to the server.
        thread::sleep(Duration::from_millis(30));
        sql.len()
    }
}

struct DbConnFactory {
    next_id: AtomicU32,
}

impl ResourceFactory for DbConnFactory {
    type Resource = DbConn;

    fn create(&self) -> Result<DbConn, FactoryError> {
        // Connection setup is the expensive part being amortized.
        thread::sleep(Duration::from_millis(10));
        Ok(DbConn {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        })
    }

    fn validate(&self, conn: &DbConn) -> bool {
        conn.id != 0
    }
}

fn print_stats(stats: &PoolStats) {
    println!("===========================================================");
    println!("NumActive: {}", stats.num_active);
    println!("NumIdle: {}", stats.num_idle);
    println!("created: {}", stats.created);
    println!("borrowed: {}", stats.borrowed);
    println!("destroyed: {}", stats.destroyed);
    println!("destroyedByEvictor: {}", stats.destroyed_by_evictor);
    println!("destroyedByBorrowValidation: {}", stats.destroyed_by_borrow_validation);
}

fn main() {
    env_logger::init();

    println!("Setting up data source.");
    let config = PoolConfig::new()
        .with_initial_size(3)
        .with_min_idle(3)
        .with_max_idle(5)
        .with_max_total(10)
        .with_max_wait(Duration::from_secs(10))
        .with_validation_on_borrow()
        .with_eviction_interval(Duration::from_millis(500))
        .with_min_evictable_idle(Duration::from_millis(1500));
    let pool = Arc::new(Pool::new(DbConnFactory { next_id: AtomicU32::new(1) }, config).unwrap());
    println!("Done.");

    let mut workers = Vec::new();
    for worker in 0..10 {
        let pool = Arc::clone(&pool);
        workers.push(thread::spawn(move || {
            println!("[worker {worker}] borrowing connection");
            let conn = pool.borrow().expect("borrow connection");
            println!("[worker {worker}] executing query on connection {}", conn.id);
            let _rows = conn.query("select * from authorization");
            print_stats(&pool.stats());
            // Connection returns to the pool here
        }));
        thread::sleep(Duration::from_millis(100));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    // Watch the idle population drain back toward min_idle while the
    // pool sits unused.
    for tick in 1..=8 {
        thread::sleep(Duration::from_millis(500));
        println!("----------------{tick}");
        print_stats(&pool.stats());
    }

    pool.close();
    println!("Data source closed.");
}
