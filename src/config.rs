//! Pool configuration options

use crate::errors::{PoolError, PoolResult};
use std::time::Duration;

/// Immutable tunables for a [`Pool`](crate::Pool).
///
/// A configuration is validated once at pool construction and never
/// changes afterwards. The bounds must satisfy
/// `min_idle <= max_idle <= max_total`.
///
/// # Examples
///
/// ```
/// use lendpool::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new()
///     .with_initial_size(3)
///     .with_min_idle(3)
///     .with_max_idle(5)
///     .with_max_total(10)
///     .with_max_wait(Duration::from_secs(10));
///
/// assert_eq!(config.max_total, 10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of entries created eagerly when the pool is built.
    pub initial_size: usize,

    /// Idle floor the maintenance thread tops the pool back up to.
    pub min_idle: usize,

    /// Idle ceiling: a return that would exceed it destroys the entry.
    pub max_idle: usize,

    /// Hard cap on the total population, idle plus on loan.
    pub max_total: usize,

    /// Default wait budget for `borrow`; `None` waits indefinitely.
    pub max_wait: Option<Duration>,

    /// Run the factory's health check before handing out an idle entry.
    pub validation_on_borrow: bool,

    /// Run the factory's health check when an entry comes back.
    pub validation_on_return: bool,

    /// Maintenance period; `None` disables the background thread entirely.
    pub eviction_interval: Option<Duration>,

    /// Idle age at which an entry becomes a candidate for eviction.
    pub min_evictable_idle: Duration,

    /// Reclaim abandoned loans inline when a borrow finds the pool exhausted.
    pub remove_abandoned_on_borrow: bool,

    /// Reclaim abandoned loans on every maintenance run.
    pub remove_abandoned_on_maintenance: bool,

    /// Loan age after which the borrower is presumed gone.
    pub abandoned_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: 0,
            min_idle: 0,
            max_idle: 8,
            max_total: 8,
            max_wait: Some(Duration::from_secs(30)),
            validation_on_borrow: false,
            validation_on_return: false,
            eviction_interval: None,
            min_evictable_idle: Duration::from_secs(30 * 60),
            remove_abandoned_on_borrow: false,
            remove_abandoned_on_maintenance: false,
            abandoned_timeout: Duration::from_secs(300),
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many entries are created eagerly at startup.
    pub fn with_initial_size(mut self, size: usize) -> Self {
        self.initial_size = size;
        self
    }

    /// Set the idle floor maintained by the background sweeper.
    pub fn with_min_idle(mut self, count: usize) -> Self {
        self.min_idle = count;
        self
    }

    /// Set the idle ceiling enforced on return.
    pub fn with_max_idle(mut self, count: usize) -> Self {
        self.max_idle = count;
        self
    }

    /// Set the hard cap on total population.
    pub fn with_max_total(mut self, count: usize) -> Self {
        self.max_total = count;
        self
    }

    /// Set the default borrow wait budget.
    pub fn with_max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = Some(wait);
        self
    }

    /// Make `borrow` wait indefinitely for a free slot.
    pub fn with_unbounded_wait(mut self) -> Self {
        self.max_wait = None;
        self
    }

    /// Validate entries before handing them out.
    pub fn with_validation_on_borrow(mut self) -> Self {
        self.validation_on_borrow = true;
        self
    }

    /// Validate entries when they come back.
    pub fn with_validation_on_return(mut self) -> Self {
        self.validation_on_return = true;
        self
    }

    /// Enable the background maintenance thread with the given period.
    pub fn with_eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = Some(interval);
        self
    }

    /// Set the idle age at which entries become evictable.
    pub fn with_min_evictable_idle(mut self, idle: Duration) -> Self {
        self.min_evictable_idle = idle;
        self
    }

    /// Set the loan age after which a borrower is presumed gone.
    pub fn with_abandoned_timeout(mut self, timeout: Duration) -> Self {
        self.abandoned_timeout = timeout;
        self
    }

    /// Reclaim abandoned loans when a borrow finds the pool exhausted.
    pub fn with_remove_abandoned_on_borrow(mut self) -> Self {
        self.remove_abandoned_on_borrow = true;
        self
    }

    /// Reclaim abandoned loans on every maintenance run.
    pub fn with_remove_abandoned_on_maintenance(mut self) -> Self {
        self.remove_abandoned_on_maintenance = true;
        self
    }

    /// Check the configuration for internal consistency.
    ///
    /// Called automatically by [`Pool::new`](crate::Pool::new); exposed so
    /// callers can pre-flight a configuration they assemble elsewhere.
    pub fn validate(&self) -> PoolResult<()> {
        if self.max_total == 0 {
            return Err(PoolError::Config("max_total must be at least 1".into()));
        }
        if self.min_idle > self.max_idle {
            return Err(PoolError::Config(format!(
                "min_idle ({}) exceeds max_idle ({})",
                self.min_idle, self.max_idle
            )));
        }
        if self.max_idle > self.max_total {
            return Err(PoolError::Config(format!(
                "max_idle ({}) exceeds max_total ({})",
                self.max_idle, self.max_total
            )));
        }
        if self.initial_size > self.max_total {
            return Err(PoolError::Config(format!(
                "initial_size ({}) exceeds max_total ({})",
                self.initial_size, self.max_total
            )));
        }
        if self.initial_size > self.max_idle {
            return Err(PoolError::Config(format!(
                "initial_size ({}) exceeds max_idle ({})",
                self.initial_size, self.max_idle
            )));
        }
        if self.eviction_interval.is_some_and(|d| d.is_zero()) {
            return Err(PoolError::Config(
                "eviction_interval must be non-zero when set".into(),
            ));
        }
        if self.max_wait.is_some_and(|d| d.is_zero()) {
            return Err(PoolError::Config(
                "max_wait must be non-zero; use try_borrow for non-blocking acquisition".into(),
            ));
        }
        if (self.remove_abandoned_on_borrow || self.remove_abandoned_on_maintenance)
            && self.abandoned_timeout.is_zero()
        {
            return Err(PoolError::Config(
                "abandoned_timeout must be non-zero when abandonment removal is enabled".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = PoolConfig::new()
            .with_initial_size(2)
            .with_min_idle(1)
            .with_max_idle(4)
            .with_max_total(6)
            .with_validation_on_borrow()
            .with_eviction_interval(Duration::from_millis(250))
            .with_min_evictable_idle(Duration::from_secs(1))
            .with_abandoned_timeout(Duration::from_secs(5))
            .with_remove_abandoned_on_maintenance();

        assert_eq!(config.initial_size, 2);
        assert_eq!(config.min_idle, 1);
        assert_eq!(config.max_idle, 4);
        assert_eq!(config.max_total, 6);
        assert!(config.validation_on_borrow);
        assert!(!config.validation_on_return);
        assert_eq!(config.eviction_interval, Some(Duration::from_millis(250)));
        assert!(config.remove_abandoned_on_maintenance);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let config = PoolConfig::new().with_min_idle(5).with_max_idle(3);
        assert!(matches!(config.validate(), Err(PoolError::Config(_))));

        let config = PoolConfig::new().with_max_idle(8).with_max_total(4);
        assert!(matches!(config.validate(), Err(PoolError::Config(_))));

        let config = PoolConfig::new().with_max_total(0);
        assert!(matches!(config.validate(), Err(PoolError::Config(_))));

        let config = PoolConfig::new().with_initial_size(9).with_max_total(8);
        assert!(matches!(config.validate(), Err(PoolError::Config(_))));

        let config = PoolConfig::new().with_initial_size(5).with_max_idle(4);
        assert!(matches!(config.validate(), Err(PoolError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_intervals() {
        let config = PoolConfig::new().with_eviction_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(PoolError::Config(_))));

        let config = PoolConfig::new().with_max_wait(Duration::ZERO);
        assert!(matches!(config.validate(), Err(PoolError::Config(_))));

        let config = PoolConfig::new()
            .with_abandoned_timeout(Duration::ZERO)
            .with_remove_abandoned_on_borrow();
        assert!(matches!(config.validate(), Err(PoolError::Config(_))));
    }
}
