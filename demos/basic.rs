//! Basic usage examples for lendpool

use lendpool::{FactoryError, Pool, PoolConfig, PoolError, ResourceFactory, StatsExporter};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

struct Conn {
    id: u32,
}

struct ConnFactory {
    next_id: AtomicU32,
}

impl ConnFactory {
    fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
        }
    }
}

impl ResourceFactory for ConnFactory {
    type Resource = Conn;

    fn create(&self) -> Result<Conn, FactoryError> {
        Ok(Conn {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        })
    }

    fn validate(&self, conn: &Conn) -> bool {
        conn.id != 0
    }
}

fn main() {
    println!("=== lendpool - Basic Examples ===\n");

    simple_pool();
    bounded_pool();
    try_and_timeout();
    stats_export();
}

fn simple_pool() {
    println!("1. Simple Pool:");
    let pool = Pool::new(ConnFactory::new(), PoolConfig::default()).unwrap();

    {
        let conn = pool.borrow().unwrap();
        println!("   Borrowed connection {}", conn.id);
        // Returned automatically when dropped
    }

    println!("   Idle after return: {}\n", pool.num_idle());
}

fn bounded_pool() {
    println!("2. Bounded Pool:");

    let config = PoolConfig::new()
        .with_initial_size(2)
        .with_max_idle(2)
        .with_max_total(3)
        .with_validation_on_borrow();
    let pool = Pool::new(ConnFactory::new(), config).unwrap();

    let a = pool.borrow().unwrap();
    let b = pool.borrow().unwrap();
    let c = pool.borrow().unwrap();
    println!("   Active: {}, Idle: {}", pool.num_active(), pool.num_idle());

    drop(a);
    drop(b);
    drop(c); // over max_idle, destroyed instead of re-idled
    println!("   After returns - Active: {}, Idle: {}\n", pool.num_active(), pool.num_idle());
}

fn try_and_timeout() {
    println!("3. Try and Timeout:");
    let config = PoolConfig::new().with_max_idle(1).with_max_total(1);
    let pool = Pool::new(ConnFactory::new(), config).unwrap();

    let held = pool.try_borrow().unwrap();
    println!("   First try: Success");

    match pool.try_borrow() {
        Err(PoolError::Exhausted) => println!("   Second try: Exhausted"),
        other => println!("   Second try: unexpected {other:?}"),
    }

    match pool.borrow_timeout(Duration::from_millis(100)) {
        Err(PoolError::Timeout(_)) => println!("   Bounded wait: timed out as expected"),
        other => println!("   Bounded wait: unexpected {other:?}"),
    }

    drop(held);
    println!("   Third try: {}\n", if pool.try_borrow().is_ok() { "Success" } else { "Failed" });
}

fn stats_export() {
    println!("4. Stats:");
    let pool = Pool::new(ConnFactory::new(), PoolConfig::new().with_initial_size(3)).unwrap();

    {
        let _a = pool.borrow().unwrap();
        let _b = pool.borrow().unwrap();

        let stats = pool.stats();
        println!("   Active: {}, Idle: {}", stats.num_active, stats.num_idle);
        println!("   Utilization: {:.1}%", stats.utilization() * 100.0);
    }

    println!("\n   Flat export:");
    for (key, value) in pool.stats().export() {
        println!("     {}: {}", key, value);
    }

    println!("\n   Prometheus export:");
    let text = StatsExporter::export_prometheus(&pool.stats(), "demo", None);
    for line in text.lines().filter(|l| !l.starts_with('#')) {
        println!("     {line}");
    }
}
