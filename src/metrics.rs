//! Internal observability metrics for eureka-exporter
//!
//! Tracks how each scrape target behaved so operators can tell a quiet
//! registry from a failing one.
//!
//! # Metrics
//!
//! - `eureka_exporter_scrape_success_total{target="..."}` - Counter of successful scrapes
//! - `eureka_exporter_scrape_failure_total{target="..."}` - Counter of failed scrapes
//! - `eureka_exporter_scrape_duration_seconds{target="..."}` - Histogram of scrape durations
//! - `eureka_exporter_info{version="..."}` - Build information
//!
//! The local node listing is reported as target `local`; cluster members
//! use their base address.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::transformer::{MetricFamily, MetricSample, MetricType};

pub const SCRAPE_SUCCESS_TOTAL: &str = "eureka_exporter_scrape_success_total";
pub const SCRAPE_FAILURE_TOTAL: &str = "eureka_exporter_scrape_failure_total";
pub const SCRAPE_DURATION_SECONDS: &str = "eureka_exporter_scrape_duration_seconds";
pub const EXPORTER_INFO: &str = "eureka_exporter_info";

/// Target name used for the local node listing
pub const LOCAL_TARGET: &str = "local";

/// Default histogram buckets for scrape duration (in seconds)
///
/// Member scrapes may wait up to two minutes on a slow registry, so the
/// upper buckets go past the usual HTTP request range.
pub const DEFAULT_HISTOGRAM_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
];

/// Thread-safe counter using atomic operations
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Thread-safe histogram for measuring distributions
#[derive(Debug)]
pub struct Histogram {
    /// Bucket upper bounds, always ending with +Inf
    buckets: Vec<f64>,
    /// Cumulative count of observations <= bucket bound
    bucket_counts: Vec<AtomicU64>,
    /// f64 bits of the running sum
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Create a new histogram with the given bucket boundaries
    pub fn new(buckets: &[f64]) -> Self {
        let mut sorted_buckets: Vec<f64> = buckets.iter().copied().filter(|b| !b.is_nan()).collect();
        sorted_buckets.sort_by(f64::total_cmp);
        sorted_buckets.dedup();

        if sorted_buckets.last().map_or(true, |v| !v.is_infinite()) {
            sorted_buckets.push(f64::INFINITY);
        }

        let bucket_counts = sorted_buckets.iter().map(|_| AtomicU64::new(0)).collect();

        Self {
            buckets: sorted_buckets,
            bucket_counts,
            sum: AtomicU64::new(0.0_f64.to_bits()),
            count: AtomicU64::new(0),
        }
    }

    pub fn with_default_buckets() -> Self {
        Self::new(DEFAULT_HISTOGRAM_BUCKETS)
    }

    /// Record one observation
    pub fn observe(&self, v: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);

        // CAS loop: there is no atomic f64 add
        let mut current = self.sum.load(Ordering::Relaxed);
        loop {
            let new = (f64::from_bits(current) + v).to_bits();
            match self
                .sum
                .compare_exchange_weak(current, new, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        for (bound, counter) in self.buckets.iter().zip(&self.bucket_counts) {
            if v <= *bound {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn get_sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Bucket bounds with their cumulative counts
    pub fn get_buckets(&self) -> Vec<(f64, u64)> {
        self.buckets
            .iter()
            .zip(&self.bucket_counts)
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::with_default_buckets()
    }
}

/// Per-target metrics
#[derive(Debug, Default)]
pub struct TargetMetrics {
    pub scrape_success_total: Counter,
    pub scrape_failure_total: Counter,
    pub scrape_duration_seconds: Histogram,
}

/// Internal metrics registry
///
/// Cheap to clone; clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct InternalMetrics {
    /// Keyed by target name, sorted for stable output
    targets: Arc<RwLock<BTreeMap<String, Arc<TargetMetrics>>>>,
}

impl InternalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create metrics for a target
    pub fn target(&self, target: &str) -> Arc<TargetMetrics> {
        {
            let targets = self.targets.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(metrics) = targets.get(target) {
                return Arc::clone(metrics);
            }
        }

        let mut targets = self.targets.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(targets.entry(target.to_string()).or_default())
    }

    /// Record a successful scrape for a target
    pub fn record_scrape_success(&self, target: &str, duration_seconds: f64) {
        let metrics = self.target(target);
        metrics.scrape_success_total.inc();
        metrics.scrape_duration_seconds.observe(duration_seconds);
    }

    /// Record a failed scrape for a target
    pub fn record_scrape_failure(&self, target: &str, duration_seconds: f64) {
        let metrics = self.target(target);
        metrics.scrape_failure_total.inc();
        metrics.scrape_duration_seconds.observe(duration_seconds);
    }

    /// Render all targets as metric families
    ///
    /// Returns no families until the first scrape has been recorded.
    pub fn to_families(&self) -> Vec<MetricFamily> {
        let targets = self.targets.read().unwrap_or_else(PoisonError::into_inner);
        if targets.is_empty() {
            return Vec::new();
        }

        let mut success = MetricFamily::new(
            SCRAPE_SUCCESS_TOTAL,
            MetricType::Counter,
            "Total number of successful scrapes",
        );
        let mut failure = MetricFamily::new(
            SCRAPE_FAILURE_TOTAL,
            MetricType::Counter,
            "Total number of failed scrapes",
        );
        let mut duration = MetricFamily::new(
            SCRAPE_DURATION_SECONDS,
            MetricType::Histogram,
            "Histogram of scrape durations",
        );

        for (target, metrics) in targets.iter() {
            success.samples.extend(target_sample(
                SCRAPE_SUCCESS_TOTAL,
                target,
                metrics.scrape_success_total.get() as f64,
            ));
            failure.samples.extend(target_sample(
                SCRAPE_FAILURE_TOTAL,
                target,
                metrics.scrape_failure_total.get() as f64,
            ));

            let histogram = &metrics.scrape_duration_seconds;
            let bucket_name = format!("{}_bucket", SCRAPE_DURATION_SECONDS);
            for (bound, count) in histogram.get_buckets() {
                let le = if bound.is_infinite() {
                    "+Inf".to_string()
                } else {
                    bound.to_string()
                };
                duration.samples.extend(
                    MetricSample::new(
                        bucket_name.as_str(),
                        ["target", "le"],
                        [target.as_str(), le.as_str()],
                        count as f64,
                    )
                    .ok(),
                );
            }
            duration.samples.extend(target_sample(
                &format!("{}_sum", SCRAPE_DURATION_SECONDS),
                target,
                histogram.get_sum(),
            ));
            duration.samples.extend(target_sample(
                &format!("{}_count", SCRAPE_DURATION_SECONDS),
                target,
                histogram.get_count() as f64,
            ));
        }

        vec![success, failure, duration]
    }
}

fn target_sample(name: &str, target: &str, value: f64) -> Option<MetricSample> {
    MetricSample::new(name, ["target"], [target], value).ok()
}

/// `eureka_exporter_info{version}` family
pub fn exporter_info() -> MetricFamily {
    let mut family = MetricFamily::new(
        EXPORTER_INFO,
        MetricType::Gauge,
        "eureka-exporter build information",
    );
    family.samples.extend(
        MetricSample::new(EXPORTER_INFO, ["version"], [env!("CARGO_PKG_VERSION")], 1.0).ok(),
    );
    family
}
