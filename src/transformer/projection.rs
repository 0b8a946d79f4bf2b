//! Registry records to metric samples
//!
//! Both families are presence indicators: every sample has the value `1`
//! and carries its information in labels.

use crate::collector::{NodeEntry, ServerStatusEntry};
use crate::config::ScrapeTarget;
use crate::error::TransformError;

use super::metric::{MetricSample, MetricType, Snapshot};

pub const NODES_INFO: &str = "eureka_nodes_info";
pub const NODES_INFO_HELP: &str =
    "A metric shows that the service node info which registered on the eureka server.";
pub const NODES_INFO_LABELS: [&str; 5] =
    ["eureka_cluster", "application", "host", "instance_id", "status"];

pub const SERVER_INFO: &str = "eureka_server_info";
pub const SERVER_INFO_HELP: &str = "A metric shows that eureka servers info.";
pub const SERVER_INFO_LABELS: [&str; 6] = [
    "eureka_cluster",
    "replicas",
    "instance_id",
    "status",
    "renewal_interval_in_secs",
    "duration_in_secs",
];

/// Status reported for a member that refused the connection
pub const STATUS_DOWN: &str = "DOWN";
/// Registry default lease renewal interval
pub const DEFAULT_RENEWAL_INTERVAL_SECS: &str = "30";
/// Registry default lease duration
pub const DEFAULT_DURATION_SECS: &str = "90";

const PRESENT: f64 = 1.0;

/// `eureka_nodes_info` sample for one instance
pub fn node_sample(node: &NodeEntry) -> Result<MetricSample, TransformError> {
    MetricSample::new(
        NODES_INFO,
        NODES_INFO_LABELS,
        [
            node.cluster.as_str(),
            node.application.as_str(),
            node.host.as_str(),
            node.instance_id.as_str(),
            node.status.as_str(),
        ],
        PRESENT,
    )
}

/// `eureka_server_info` sample for one registry member
pub fn server_sample(entry: &ServerStatusEntry) -> Result<MetricSample, TransformError> {
    MetricSample::new(
        SERVER_INFO,
        SERVER_INFO_LABELS,
        [
            entry.cluster.as_str(),
            entry.replicas.as_str(),
            entry.instance_id.as_str(),
            entry.status.as_str(),
            entry.renewal_interval_in_secs.as_str(),
            entry.duration_in_secs.as_str(),
        ],
        PRESENT,
    )
}

/// Synthetic entry for a member that could not be reached.
///
/// `replicas` lists every configured member as `member/`, joined by `, `.
pub fn down_entry(cluster: &str, members: &[ScrapeTarget], member: &ScrapeTarget) -> ServerStatusEntry {
    let replicas = members
        .iter()
        .map(|m| format!("{}/", m.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    ServerStatusEntry {
        cluster: cluster.to_string(),
        replicas,
        instance_id: member.authority().to_string(),
        status: STATUS_DOWN.to_string(),
        renewal_interval_in_secs: DEFAULT_RENEWAL_INTERVAL_SECS.to_string(),
        duration_in_secs: DEFAULT_DURATION_SECS.to_string(),
    }
}

/// Project instances into `eureka_nodes_info` samples, in order
pub fn project_nodes(nodes: &[NodeEntry]) -> Result<Vec<MetricSample>, TransformError> {
    nodes.iter().map(node_sample).collect()
}

/// Project member status entries into `eureka_server_info` samples, in order
pub fn project_servers(entries: &[ServerStatusEntry]) -> Result<Vec<MetricSample>, TransformError> {
    entries.iter().map(server_sample).collect()
}

/// Append `eureka_nodes_info` samples to a snapshot
pub fn push_nodes(snapshot: &mut Snapshot, samples: Vec<MetricSample>) {
    for sample in samples {
        snapshot.push(NODES_INFO, MetricType::Gauge, NODES_INFO_HELP, sample);
    }
}

/// Append `eureka_server_info` samples to a snapshot
pub fn push_servers(snapshot: &mut Snapshot, samples: Vec<MetricSample>) {
    for sample in samples {
        snapshot.push(SERVER_INFO, MetricType::Gauge, SERVER_INFO_HELP, sample);
    }
}
