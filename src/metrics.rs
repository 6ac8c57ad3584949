//! Lifecycle counters and stats export

use std::collections::HashMap;

/// Monotonic lifecycle counters.
///
/// Plain integers, not atomics: they live inside the pool lock and are
/// mutated only by the pool core, so every snapshot sees gauges that are
/// consistent with the counter deltas that produced them.
#[derive(Debug, Clone, Default)]
pub(crate) struct Counters {
    pub created: u64,
    pub borrowed: u64,
    pub returned: u64,
    pub destroyed: u64,
    pub destroyed_by_evictor: u64,
    pub destroyed_by_borrow_validation: u64,
    pub destroyed_by_abandonment: u64,
}

impl Counters {
    pub fn snapshot(&self, num_active: usize, num_idle: usize, max_total: usize) -> PoolStats {
        PoolStats {
            num_active,
            num_idle,
            max_total,
            created: self.created,
            borrowed: self.borrowed,
            returned: self.returned,
            destroyed: self.destroyed,
            destroyed_by_evictor: self.destroyed_by_evictor,
            destroyed_by_borrow_validation: self.destroyed_by_borrow_validation,
            destroyed_by_abandonment: self.destroyed_by_abandonment,
        }
    }
}

/// Point-in-time snapshot of pool gauges and counters.
///
/// # Examples
///
/// ```
/// use lendpool::{FactoryError, Pool, PoolConfig, ResourceFactory};
///
/// struct Widgets;
/// impl ResourceFactory for Widgets {
///     type Resource = u32;
///     fn create(&self) -> Result<u32, FactoryError> { Ok(0) }
/// }
///
/// let pool = Pool::new(Widgets, PoolConfig::new().with_initial_size(2)).unwrap();
/// let stats = pool.stats();
/// assert_eq!(stats.num_idle, 2);
/// assert_eq!(stats.created, 2);
/// assert_eq!(stats.borrowed, 0);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolStats {
    /// Entries currently out on loan.
    pub num_active: usize,

    /// Entries currently idle and reusable.
    pub num_idle: usize,

    /// Configured population cap.
    pub max_total: usize,

    /// Resources created by the factory on the pool's behalf.
    pub created: u64,

    /// Successful borrows.
    pub borrowed: u64,

    /// Loans that came back, whether re-idled or destroyed.
    pub returned: u64,

    /// Resources destroyed for any reason.
    pub destroyed: u64,

    /// Destroys performed by the idle-eviction sweep.
    pub destroyed_by_evictor: u64,

    /// Destroys caused by a failed borrow-time validation.
    pub destroyed_by_borrow_validation: u64,

    /// Loans forcibly reclaimed from absent borrowers.
    pub destroyed_by_abandonment: u64,
}

impl PoolStats {
    /// Fraction of the population cap currently out on loan.
    pub fn utilization(&self) -> f64 {
        if self.max_total > 0 {
            self.num_active as f64 / self.max_total as f64
        } else {
            0.0
        }
    }

    /// Export the snapshot as a flat string map.
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("num_active".to_string(), self.num_active.to_string());
        metrics.insert("num_idle".to_string(), self.num_idle.to_string());
        metrics.insert("max_total".to_string(), self.max_total.to_string());
        metrics.insert("created".to_string(), self.created.to_string());
        metrics.insert("borrowed".to_string(), self.borrowed.to_string());
        metrics.insert("returned".to_string(), self.returned.to_string());
        metrics.insert("destroyed".to_string(), self.destroyed.to_string());
        metrics.insert(
            "destroyed_by_evictor".to_string(),
            self.destroyed_by_evictor.to_string(),
        );
        metrics.insert(
            "destroyed_by_borrow_validation".to_string(),
            self.destroyed_by_borrow_validation.to_string(),
        );
        metrics.insert(
            "destroyed_by_abandonment".to_string(),
            self.destroyed_by_abandonment.to_string(),
        );
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization()));
        metrics
    }
}

/// Renders a [`PoolStats`] snapshot in Prometheus exposition format.
pub struct StatsExporter;

impl StatsExporter {
    /// Export a snapshot in Prometheus exposition format.
    ///
    /// # Examples
    ///
    /// ```
    /// use lendpool::{FactoryError, Pool, PoolConfig, ResourceFactory, StatsExporter};
    /// use std::collections::HashMap;
    ///
    /// struct Widgets;
    /// impl ResourceFactory for Widgets {
    ///     type Resource = u32;
    ///     fn create(&self) -> Result<u32, FactoryError> { Ok(0) }
    /// }
    ///
    /// let pool = Pool::new(Widgets, PoolConfig::default()).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = StatsExporter::export_prometheus(&pool.stats(), "widgets", Some(&tags));
    /// assert!(output.contains("lendpool_active"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        stats: &PoolStats,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        // Gauge metrics
        output.push_str("# HELP lendpool_active Entries currently on loan\n");
        output.push_str("# TYPE lendpool_active gauge\n");
        output.push_str(&format!("lendpool_active{{{}}} {}\n", labels, stats.num_active));

        output.push_str("# HELP lendpool_idle Entries currently idle\n");
        output.push_str("# TYPE lendpool_idle gauge\n");
        output.push_str(&format!("lendpool_idle{{{}}} {}\n", labels, stats.num_idle));

        output.push_str("# HELP lendpool_utilization Fraction of the cap on loan\n");
        output.push_str("# TYPE lendpool_utilization gauge\n");
        output.push_str(&format!(
            "lendpool_utilization{{{}}} {:.2}\n",
            labels,
            stats.utilization()
        ));

        // Counter metrics
        let counters: [(&str, &str, u64); 7] = [
            ("lendpool_created_total", "Resources created", stats.created),
            ("lendpool_borrowed_total", "Successful borrows", stats.borrowed),
            ("lendpool_returned_total", "Loans returned", stats.returned),
            ("lendpool_destroyed_total", "Resources destroyed", stats.destroyed),
            (
                "lendpool_destroyed_by_evictor_total",
                "Destroys by the idle evictor",
                stats.destroyed_by_evictor,
            ),
            (
                "lendpool_destroyed_by_borrow_validation_total",
                "Destroys by failed borrow validation",
                stats.destroyed_by_borrow_validation,
            ),
            (
                "lendpool_destroyed_by_abandonment_total",
                "Loans reclaimed from absent borrowers",
                stats.destroyed_by_abandonment,
            ),
        ];
        for (name, help, value) in counters {
            output.push_str(&format!("# HELP {name} {help}\n"));
            output.push_str(&format!("# TYPE {name} counter\n"));
            output.push_str(&format!("{name}{{{labels}}} {value}\n"));
        }

        output
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            for (key, value) in tags {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}
