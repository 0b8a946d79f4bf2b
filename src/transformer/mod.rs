//! Metric transformation module
//!
//! Turns parsed registry records into metric families and renders them in
//! the Prometheus text exposition format.

pub mod formatter;
pub mod metric;
pub mod projection;

pub use formatter::{PrometheusFormatter, CONTENT_TYPE};
pub use metric::{MetricFamily, MetricSample, MetricType, Snapshot};
pub use projection::{NODES_INFO, SERVER_INFO};
