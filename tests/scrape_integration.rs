//! Scrape integration tests
//!
//! End-to-end tests for the scrape cycle that verify:
//! - Node listing and member status collection
//! - DOWN fallback for unreachable members
//! - Per-target failure isolation
//! - The HTTP metrics endpoint

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use eureka_exporter::collector::EurekaCollector;
use eureka_exporter::config::Config;
use eureka_exporter::metrics::LOCAL_TARGET;
use eureka_exporter::server::{router, AppState};
use eureka_exporter::transformer::{NODES_INFO, SERVER_INFO};
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APPS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<applications>
  <versions__delta>1</versions__delta>
  <apps__hashcode>UP_2_</apps__hashcode>
  <application>
    <name>ORDERS</name>
    <instance>
      <instanceId>orders-1:orders:8080</instanceId>
      <hostName>orders-1</hostName>
      <app>ORDERS</app>
      <ipAddr>10.0.0.11</ipAddr>
      <status>UP</status>
      <port enabled="true">8080</port>
    </instance>
  </application>
  <application>
    <name>BILLING</name>
    <instance>
      <instanceId>billing-1:billing:9000</instanceId>
      <hostName>billing-1</hostName>
      <app>BILLING</app>
      <status>STARTING</status>
    </instance>
  </application>
</applications>"#;

fn status_json(instance_id: &str, host_name: &str, replicas: &str) -> serde_json::Value {
    json!({
        "com.netflix.eureka.util.StatusInfo": {
            "generalStats": {"environment": "prod"},
            "applicationStats": {
                "registered-replicas": replicas,
                "available-replicas": replicas
            },
            "instanceInfo": {
                "instanceId": instance_id,
                "hostName": host_name,
                "app": "EUREKA",
                "status": "UP",
                "leaseInfo": {
                    "renewalIntervalInSecs": 30,
                    "durationInSecs": 90
                }
            }
        }
    })
}

async fn registry_with_apps(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/eureka/apps"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/xml")
                .set_body_string(body),
        )
        .mount(&server)
        .await;
    server
}

async fn member_with_status(instance_id: &str, host_name: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/eureka/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_json(
            instance_id,
            host_name,
            "http://peer1:8761/eureka/,http://peer2:8761/eureka/",
        )))
        .mount(&server)
        .await;
    server
}

async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn config_for(local_port: u16, members: &[String]) -> Config {
    let yaml = format!(
        r#"
server:
  port: {}
metric:
  eureka:
    enabled: true
    cluster: "{}"
    clusterName: prod
"#,
        local_port,
        members.join(",")
    );
    Config::from_yaml_str(&yaml).unwrap()
}

#[tokio::test]
async fn test_full_scrape_cycle() {
    let local = registry_with_apps(APPS_XML).await;
    let peer1 = member_with_status("10.0.0.1:8761", "peer1").await;
    let peer2 = member_with_status("peer2:8761", "peer2").await;

    let config = config_for(local.address().port(), &[peer1.uri(), peer2.uri()]);
    let collector = EurekaCollector::new(config.eureka);
    let snapshot = collector.collect().await;

    let names: Vec<&str> = snapshot.families().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec![NODES_INFO, SERVER_INFO]);

    let nodes = snapshot.samples(NODES_INFO);
    assert_eq!(nodes.len(), 2);
    assert_eq!(
        nodes[0].label_values(),
        ["prod", "ORDERS", "orders-1", "orders-1:orders:8080", "UP"]
    );
    assert_eq!(nodes[1].label("status"), Some("STARTING"));
    assert!(nodes.iter().all(|s| s.value() == 1.0));

    let servers = snapshot.samples(SERVER_INFO);
    assert_eq!(servers.len(), 2);
    // IPv4 host replaced by hostName, port suffix kept
    assert_eq!(servers[0].label("instance_id"), Some("peer1:8761"));
    assert_eq!(servers[1].label("instance_id"), Some("peer2:8761"));
    assert_eq!(
        servers[0].label("replicas"),
        Some("http://peer1:8761/eureka/,http://peer2:8761/eureka/")
    );
    assert_eq!(servers[0].label("renewal_interval_in_secs"), Some("30"));
    assert_eq!(servers[0].label("duration_in_secs"), Some("90"));

    let metrics = collector.metrics();
    assert_eq!(metrics.target(LOCAL_TARGET).scrape_success_total.get(), 1);
    assert_eq!(metrics.target(&peer1.uri()).scrape_success_total.get(), 1);
    assert_eq!(metrics.target(&peer2.uri()).scrape_failure_total.get(), 0);
}

#[tokio::test]
async fn test_unreachable_member_reports_down() {
    let local = registry_with_apps(APPS_XML).await;
    let a = member_with_status("peer-a:8761", "peer-a").await;
    let c = member_with_status("peer-c:8761", "peer-c").await;
    let b = format!("http://127.0.0.1:{}", closed_port().await);

    let config = config_for(local.address().port(), &[a.uri(), b.clone(), c.uri()]);
    let collector = EurekaCollector::new(config.eureka);
    let snapshot = collector.collect().await;

    let servers = snapshot.samples(SERVER_INFO);
    assert_eq!(servers.len(), 3);

    assert_eq!(servers[0].label("instance_id"), Some("peer-a:8761"));
    assert_eq!(servers[0].label("status"), Some("UP"));
    assert_eq!(servers[2].label("instance_id"), Some("peer-c:8761"));
    assert_eq!(servers[2].label("status"), Some("UP"));

    let down = &servers[1];
    assert_eq!(down.label("status"), Some("DOWN"));
    assert_eq!(down.label("eureka_cluster"), Some("prod"));
    assert_eq!(
        down.label("replicas"),
        Some(format!("{}/, {}/, {}/", a.uri(), b, c.uri()).as_str())
    );
    assert_eq!(down.label("instance_id"), b.strip_prefix("http://"));
    assert_eq!(down.label("renewal_interval_in_secs"), Some("30"));
    assert_eq!(down.label("duration_in_secs"), Some("90"));

    assert_eq!(snapshot.samples(NODES_INFO).len(), 2);
    assert_eq!(collector.metrics().target(&b).scrape_failure_total.get(), 1);
}

#[tokio::test]
async fn test_local_failure_is_absorbed() {
    let peer = member_with_status("peer1:8761", "peer1").await;

    let config = config_for(closed_port().await, &[peer.uri()]);
    let collector = EurekaCollector::new(config.eureka);
    let snapshot = collector.collect().await;

    assert!(snapshot.samples(NODES_INFO).is_empty());
    assert_eq!(snapshot.samples(SERVER_INFO).len(), 1);
    assert_eq!(
        collector.metrics().target(LOCAL_TARGET).scrape_failure_total.get(),
        1
    );
}

#[tokio::test]
async fn test_malformed_member_contributes_nothing() {
    let local = registry_with_apps(APPS_XML).await;
    let good = member_with_status("peer1:8761", "peer1").await;

    let garbage = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/eureka/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>oops"))
        .mount(&garbage)
        .await;

    let failing = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/eureka/status"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&failing)
        .await;

    let config = config_for(
        local.address().port(),
        &[garbage.uri(), failing.uri(), good.uri()],
    );
    let collector = EurekaCollector::new(config.eureka);
    let snapshot = collector.collect().await;

    let servers = snapshot.samples(SERVER_INFO);
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].label("instance_id"), Some("peer1:8761"));
    assert!(servers.iter().all(|s| s.label("status") != Some("DOWN")));
    assert_eq!(snapshot.samples(NODES_INFO).len(), 2);
}

#[tokio::test]
async fn test_empty_registry_yields_no_nodes() {
    let local = registry_with_apps(
        "<applications><versions__delta>1</versions__delta><apps__hashcode></apps__hashcode></applications>",
    )
    .await;

    let config = config_for(local.address().port(), &[]);
    let collector = EurekaCollector::new(config.eureka);
    let snapshot = collector.collect().await;

    assert!(snapshot.is_empty());
    assert_eq!(
        collector.metrics().target(LOCAL_TARGET).scrape_success_total.get(),
        1
    );
}

#[tokio::test]
async fn test_disabled_collector_makes_no_requests() {
    let local = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(APPS_XML))
        .expect(0)
        .mount(&local)
        .await;

    let yaml = format!(
        "server:\n  port: {}\nmetric:\n  eureka:\n    enabled: false\n    cluster: \"{}\"\n",
        local.address().port(),
        local.uri()
    );
    let config = Config::from_yaml_str(&yaml).unwrap();
    let collector = EurekaCollector::new(config.eureka);

    assert!(collector.collect().await.is_empty());
}

#[tokio::test]
async fn test_cycles_do_not_accumulate() {
    let local = registry_with_apps(APPS_XML).await;
    let peer = member_with_status("peer1:8761", "peer1").await;

    let config = config_for(local.address().port(), &[peer.uri()]);
    let collector = EurekaCollector::new(config.eureka);

    let first = collector.collect().await;
    let second = collector.collect().await;

    assert_eq!(first.sample_count(), 3);
    assert_eq!(first, second);
    assert_eq!(
        collector.metrics().target(LOCAL_TARGET).scrape_success_total.get(),
        2
    );
}

#[tokio::test]
async fn test_metrics_endpoint_serves_snapshot() {
    let local = registry_with_apps(APPS_XML).await;
    let peer = member_with_status("10.0.0.1:8761", "peer1").await;

    let config = config_for(local.address().port(), &[peer.uri()]);
    let app = router(AppState::new(config));

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(body.contains(
        "# HELP eureka_nodes_info A metric shows that the service node info which registered on the eureka server.\n"
    ));
    assert!(body.contains("# TYPE eureka_nodes_info gauge\n"));
    assert!(body.contains(
        "eureka_nodes_info{eureka_cluster=\"prod\",application=\"BILLING\",host=\"billing-1\",instance_id=\"billing-1:billing:9000\",status=\"STARTING\"} 1\n"
    ));
    assert!(body.contains("# HELP eureka_server_info A metric shows that eureka servers info.\n"));
    assert!(body.contains("instance_id=\"peer1:8761\",status=\"UP\""));
    assert!(body.contains("eureka_exporter_scrape_success_total{target=\"local\"} 1\n"));
    assert!(body.contains("eureka_exporter_info{version="));

    // Registry families come before self-metrics
    let nodes_pos = body.find("# TYPE eureka_nodes_info").unwrap();
    let self_pos = body.find("# TYPE eureka_exporter_scrape_success_total").unwrap();
    assert!(nodes_pos < self_pos);
}
