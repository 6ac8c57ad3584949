//! # lendpool
//!
//! Bounded, thread-safe resource pool for expensive-to-create resources
//! such as database connections, with idle eviction, validation, and
//! abandoned-loan reclaim.
//!
//! ## Features
//!
//! - Bounded population (`max_total`) and bounded idle set (`max_idle`)
//! - Automatic return of resources via RAII (Drop trait)
//! - FIFO-fair blocking borrow with per-call or pooled wait budgets
//! - Async borrow with timeout
//! - Factory-driven creation, validation, and destruction
//! - Background eviction of stale idle entries and min-idle top-up
//! - Reclaim of loans abandoned by their borrowers
//! - Consistent lifecycle counters with Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use lendpool::{FactoryError, Pool, PoolConfig, ResourceFactory};
//!
//! struct Conn { fd: u32 }
//!
//! struct ConnFactory;
//! impl ResourceFactory for ConnFactory {
//!     type Resource = Conn;
//!     fn create(&self) -> Result<Conn, FactoryError> {
//!         Ok(Conn { fd: 7 })
//!     }
//! }
//!
//! let config = PoolConfig::new()
//!     .with_initial_size(2)
//!     .with_max_idle(4)
//!     .with_max_total(4);
//! let pool = Pool::new(ConnFactory, config).unwrap();
//! {
//!     let conn = pool.borrow().unwrap();
//!     assert_eq!(conn.fd, 7);
//!     // Returned to the pool when `conn` goes out of scope
//! }
//! assert_eq!(pool.stats().num_idle, 2);
//! ```

mod config;
mod entry;
mod errors;
mod factory;
mod metrics;
mod pool;
mod reaper;

pub use config::PoolConfig;
pub use errors::{FactoryError, PoolError, PoolResult};
pub use factory::ResourceFactory;
pub use metrics::{PoolStats, StatsExporter};
pub use pool::{Pool, Pooled};
