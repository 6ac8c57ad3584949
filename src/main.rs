// lendpool - bounded resource pool with eviction and abandonment reclaim

// This is just a binary wrapper - the actual library is in lib.rs
// Run examples with: cargo run --example basic

use lendpool::{FactoryError, Pool, PoolConfig, ResourceFactory};
use std::sync::atomic::{AtomicU32, Ordering};

struct DemoFactory {
    next: AtomicU32,
}

impl ResourceFactory for DemoFactory {
    type Resource = u32;

    fn create(&self) -> Result<u32, FactoryError> {
        Ok(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

fn main() {
    println!("=== lendpool ===");
    println!("See demos/ for usage examples");
    println!("Run: cargo run --example basic");
    println!();

    // Quick demo
    println!("Quick Demo:");
    let factory = DemoFactory {
        next: AtomicU32::new(1),
    };
    let pool = Pool::new(factory, PoolConfig::new().with_initial_size(2))
        .expect("pool construction");

    {
        let resource = pool.borrow().expect("borrow");
        println!("  Borrowed resource: {}", *resource);
    }

    let stats = pool.stats();
    println!("  Idle after return: {}", stats.num_idle);
    println!("  Borrowed so far:   {}", stats.borrowed);
}
