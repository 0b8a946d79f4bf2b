//! Eureka 레지스트리 메트릭 수집 모듈
//!
//! 로컬 레지스트리의 `/eureka/apps`와 클러스터 멤버별 `/eureka/status`를
//! 순서대로 조회하여 한 번의 수집 주기마다 새 [`Snapshot`]을 만듭니다.
//!
//! # Example
//!
//! ```ignore
//! use eureka_exporter::collector::EurekaCollector;
//! use eureka_exporter::config::Config;
//!
//! let config = Config::load("application.yml")?;
//! let collector = EurekaCollector::new(config.eureka);
//! let snapshot = collector.collect().await;
//! ```

mod client;
mod document;
mod parser;

pub use client::{
    HttpClient, HttpResponse, Method, ResponseHandler, Timeouts, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SOCKET_TIMEOUT, MAX_ATTEMPTS,
};
pub use document::{normalize, PayloadFormat};
pub use parser::{
    is_ipv4, normalize_instance_id, NodeEntry, ParseError, ParseResult, RegistryParser,
    ServerStatusEntry,
};

use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use crate::config::{EurekaConfig, ScrapeTarget};
use crate::error::{HandlerError, HttpError};
use crate::metrics::{InternalMetrics, LOCAL_TARGET};
use crate::transformer::projection::{self, down_entry};
use crate::transformer::{MetricSample, Snapshot};

/// 수집 요청 타임아웃 (연결 15초, 슬롯 획득 3초, 읽기 120초)
pub const SCRAPE_TIMEOUTS: Timeouts = Timeouts {
    connect: Some(Duration::from_millis(15_000)),
    request: Some(Duration::from_millis(3_000)),
    socket: Some(Duration::from_millis(120_000)),
};

/// `/eureka/apps` 응답 → `eureka_nodes_info` 샘플
struct NodeListingHandler<'a> {
    parser: &'a RegistryParser,
}

impl ResponseHandler for NodeListingHandler<'_> {
    type Output = Vec<MetricSample>;

    fn handle(&self, response: HttpResponse) -> Result<Self::Output, HandlerError> {
        let nodes = self.parser.parse_node_listing(response.require_body()?)?;
        Ok(projection::project_nodes(&nodes)?)
    }
}

/// `/eureka/status` 응답 → `eureka_server_info` 샘플
struct ServerStatusHandler<'a> {
    parser: &'a RegistryParser,
}

impl ResponseHandler for ServerStatusHandler<'_> {
    type Output = Vec<MetricSample>;

    fn handle(&self, response: HttpResponse) -> Result<Self::Output, HandlerError> {
        let entries = self.parser.parse_server_status(response.require_body()?)?;
        Ok(projection::project_servers(&entries)?)
    }
}

/// 레지스트리 수집기
///
/// 수집 주기 사이에 상태를 유지하지 않습니다. 자체 관측 메트릭만
/// [`InternalMetrics`]에 누적됩니다.
#[derive(Debug, Clone)]
pub struct EurekaCollector {
    client: HttpClient,
    config: EurekaConfig,
    parser: RegistryParser,
    metrics: InternalMetrics,
}

impl EurekaCollector {
    /// 새 수집기 생성
    pub fn new(config: EurekaConfig) -> Self {
        let parser = RegistryParser::new(config.cluster_name.clone());
        Self {
            client: HttpClient::new(),
            config,
            parser,
            metrics: InternalMetrics::new(),
        }
    }

    /// HTTP 클라이언트 교체
    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.client = client;
        self
    }

    /// 자체 메트릭 레지스트리 공유
    pub fn with_metrics(mut self, metrics: InternalMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &EurekaConfig {
        &self.config
    }

    pub fn metrics(&self) -> &InternalMetrics {
        &self.metrics
    }

    /// 한 번의 수집 주기
    ///
    /// 대상별 실패는 해당 대상의 기여분만 비우며, 이 함수는 실패하지 않습니다.
    pub async fn collect(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();

        if !self.config.enabled {
            debug!("Registry metrics disabled, skipping scrape");
            return snapshot;
        }

        if let Some(samples) = self.scrape_local_nodes().await {
            projection::push_nodes(&mut snapshot, samples);
        }

        for member in &self.config.cluster {
            if let Some(samples) = self.scrape_member(member).await {
                projection::push_servers(&mut snapshot, samples);
            }
        }

        debug!(
            samples = snapshot.sample_count(),
            members = self.config.cluster.len(),
            "Scrape cycle complete"
        );
        snapshot
    }

    /// 로컬 레지스트리 노드 목록 수집, 실패 시 None
    #[instrument(skip(self), fields(url = %self.config.apps_url()))]
    async fn scrape_local_nodes(&self) -> Option<Vec<MetricSample>> {
        let start = Instant::now();
        let handler = NodeListingHandler {
            parser: &self.parser,
        };

        let result = self
            .client
            .get_with(&self.config.apps_url(), None, &handler, SCRAPE_TIMEOUTS)
            .await;
        let elapsed = start.elapsed().as_secs_f64();

        match result {
            Ok(samples) => {
                self.metrics.record_scrape_success(LOCAL_TARGET, elapsed);
                debug!(nodes = samples.len(), "Node listing scraped");
                Some(samples)
            }
            Err(e) => {
                self.metrics.record_scrape_failure(LOCAL_TARGET, elapsed);
                warn!(error = %e, kind = e.kind(), "Failed to scrape node listing");
                None
            }
        }
    }

    /// 클러스터 멤버 상태 수집
    ///
    /// 연결 불가인 멤버는 DOWN 대체 샘플 하나를 반환하고, 그 외 실패는 None.
    #[instrument(skip(self, member), fields(member = %member))]
    async fn scrape_member(&self, member: &ScrapeTarget) -> Option<Vec<MetricSample>> {
        let start = Instant::now();
        let handler = ServerStatusHandler {
            parser: &self.parser,
        };

        let result = self
            .client
            .get_with(&member.status_url(), None, &handler, SCRAPE_TIMEOUTS)
            .await;
        let elapsed = start.elapsed().as_secs_f64();

        match result {
            Ok(samples) => {
                self.metrics.record_scrape_success(member.as_str(), elapsed);
                Some(samples)
            }
            Err(e) => {
                self.metrics.record_scrape_failure(member.as_str(), elapsed);
                warn!(error = %e, kind = e.kind(), "Failed to scrape cluster member");
                if is_unreachable(&e) {
                    self.down_fallback(member)
                } else {
                    None
                }
            }
        }
    }

    fn down_fallback(&self, member: &ScrapeTarget) -> Option<Vec<MetricSample>> {
        let entry = down_entry(&self.config.cluster_name, &self.config.cluster, member);
        match projection::server_sample(&entry) {
            Ok(sample) => Some(vec![sample]),
            Err(e) => {
                warn!(error = %e, "Failed to build DOWN fallback sample");
                None
            }
        }
    }
}

fn is_unreachable(err: &HttpError) -> bool {
    err.as_transport().is_some_and(|e| e.is_unreachable())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformer::{NODES_INFO, SERVER_INFO};

    fn enabled_config(cluster: &[&str]) -> EurekaConfig {
        EurekaConfig {
            enabled: true,
            port: 8761,
            cluster: cluster
                .iter()
                .map(|c| ScrapeTarget::parse(c).unwrap())
                .collect(),
            cluster_name: "prod".to_string(),
        }
    }

    #[test]
    fn test_scrape_timeouts() {
        assert_eq!(SCRAPE_TIMEOUTS.connect, Some(Duration::from_secs(15)));
        assert_eq!(SCRAPE_TIMEOUTS.request, Some(Duration::from_secs(3)));
        assert_eq!(SCRAPE_TIMEOUTS.socket, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_node_listing_handler() {
        let parser = RegistryParser::new("prod");
        let handler = NodeListingHandler { parser: &parser };
        let body = br#"{"applications":{"application":[{"name":"ORDERS","instance":[
            {"app":"ORDERS","hostName":"orders-1","instanceId":"orders-1:8080","status":"UP"}
        ]}]}}"#;

        let samples = handler
            .handle(HttpResponse::new(200, body.to_vec()))
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name(), NODES_INFO);
        assert_eq!(samples[0].label("eureka_cluster"), Some("prod"));
    }

    #[test]
    fn test_handlers_reject_bad_responses() {
        let parser = RegistryParser::new("prod");
        let handler = ServerStatusHandler { parser: &parser };

        let err = handler
            .handle(HttpResponse::new(503, b"busy".to_vec()))
            .unwrap_err();
        assert!(matches!(err, HandlerError::Status(503)));

        let err = handler.handle(HttpResponse::new(200, Vec::new())).unwrap_err();
        assert!(matches!(err, HandlerError::EmptyBody));

        let err = handler
            .handle(HttpResponse::new(200, b"not a payload".to_vec()))
            .unwrap_err();
        assert!(matches!(err, HandlerError::Parse(_)));
    }

    #[test]
    fn test_down_fallback() {
        let collector = EurekaCollector::new(enabled_config(&["a:8761", "b:8761"]));
        let member = &collector.config().cluster[1];

        let samples = collector.down_fallback(member).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name(), SERVER_INFO);
        assert_eq!(samples[0].label("status"), Some("DOWN"));
        assert_eq!(samples[0].label("instance_id"), Some("b:8761"));
        assert_eq!(
            samples[0].label("replicas"),
            Some("http://a:8761/, http://b:8761/")
        );
    }

    #[tokio::test]
    async fn test_disabled_collects_nothing() {
        let mut config = enabled_config(&["127.0.0.1:1"]);
        config.enabled = false;
        let collector = EurekaCollector::new(config);

        let snapshot = collector.collect().await;
        assert!(snapshot.is_empty());
        assert!(collector.metrics().to_families().is_empty());
    }
}
