//! Eureka 응답 파서
//!
//! `/eureka/apps`와 `/eureka/status` 응답을 정규화된 트리에서 읽어
//! 내부 레코드로 변환합니다.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use super::document;

/// 파서 결과 타입
pub type ParseResult<T> = Result<T, ParseError>;

/// 페이로드 파싱 에러
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// 빈 페이로드
    #[error("Payload is empty")]
    Empty,

    /// XML도 JSON도 아닌 페이로드
    #[error("Payload is neither XML nor JSON")]
    UnknownFormat,

    /// UTF-8 디코딩 실패
    #[error("Payload is not valid UTF-8: {0}")]
    Encoding(String),

    /// XML 파싱 에러
    #[error("XML parse error: {0}")]
    Xml(String),

    /// JSON 파싱 에러
    #[error("JSON parse error: {0}")]
    Json(String),

    /// 필수 필드 누락
    #[error("Missing required field '{0}'")]
    MissingField(String),

    /// 예상과 다른 구조
    #[error("Unexpected structure at '{path}': expected {expected}")]
    UnexpectedShape { path: String, expected: &'static str },
}

/// 레지스트리에 등록된 서비스 인스턴스 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntry {
    pub cluster: String,
    pub application: String,
    pub host: String,
    pub instance_id: String,
    pub status: String,
}

/// 레지스트리 서버 멤버의 자기 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatusEntry {
    pub cluster: String,
    /// 등록된 복제본 주소 (쉼표 구분 문자열 그대로)
    pub replicas: String,
    pub instance_id: String,
    pub status: String,
    pub renewal_interval_in_secs: String,
    pub duration_in_secs: String,
}

const STATUS_INFO_KEY: &str = "com.netflix.eureka.util.StatusInfo";

/// Dotted-quad IPv4 literal, octets 0-255 with optional leading zeros
static IPV4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((2(5[0-5]|[0-4]\d))|[0-1]?\d{1,2})(\.((2(5[0-5]|[0-4]\d))|[0-1]?\d{1,2})){3}$")
        .expect("IPv4 pattern is valid")
});

/// 클러스터 라벨을 붙여 레코드를 만드는 파서
#[derive(Debug, Clone)]
pub struct RegistryParser {
    cluster: String,
}

impl RegistryParser {
    /// 새 파서 생성
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    /// 클러스터 라벨
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// `/eureka/apps` 응답 파싱
    ///
    /// `applications → application[] → instance[]` 경로가 비어 있거나 없으면
    /// 빈 결과를 반환합니다.
    pub fn parse_node_listing(&self, payload: &[u8]) -> ParseResult<Vec<NodeEntry>> {
        let tree = document::normalize(payload)?;
        let mut entries = Vec::new();

        for applications in items(field(&tree, "applications"), "applications")? {
            for application in items(field(applications, "application"), "application")? {
                for instance in items(field(application, "instance"), "instance")? {
                    entries.push(NodeEntry {
                        cluster: self.cluster.clone(),
                        application: required_string(instance, "app")?,
                        host: required_string(instance, "hostName")?,
                        instance_id: required_string(instance, "instanceId")?,
                        status: required_string(instance, "status")?,
                    });
                }
            }
        }

        Ok(entries)
    }

    /// `/eureka/status` 응답 파싱
    ///
    /// 각 `StatusInfo`에서 `applicationStats`, `instanceInfo`, `leaseInfo`의
    /// 첫 번째 요소만 사용합니다.
    pub fn parse_server_status(&self, payload: &[u8]) -> ParseResult<Vec<ServerStatusEntry>> {
        let tree = document::normalize(payload)?;
        let mut entries = Vec::new();

        for status_info in items(field(&tree, STATUS_INFO_KEY), STATUS_INFO_KEY)? {
            let stats = first(status_info, "applicationStats")?;
            let replicas = required_string(stats, "registered-replicas")?;

            let instance = first(status_info, "instanceInfo")?;
            let raw_id = required_string(instance, "instanceId")?;
            let host_name = required_string(instance, "hostName")?;
            let status = required_string(instance, "status")?;

            let lease = first(instance, "leaseInfo")?;

            entries.push(ServerStatusEntry {
                cluster: self.cluster.clone(),
                replicas,
                instance_id: normalize_instance_id(&raw_id, &host_name),
                status,
                renewal_interval_in_secs: required_string(lease, "renewalIntervalInSecs")?,
                duration_in_secs: required_string(lease, "durationInSecs")?,
            });
        }

        Ok(entries)
    }
}

/// Replace a literal IPv4 host in `instance_id` with `host_name`.
///
/// The host segment is everything before the first `:`; the `:port` suffix
/// is kept. Hostname-based ids are returned unchanged.
pub fn normalize_instance_id(instance_id: &str, host_name: &str) -> String {
    let (host, suffix) = match instance_id.find(':') {
        Some(idx) => instance_id.split_at(idx),
        None => (instance_id, ""),
    };

    if is_ipv4(host) {
        format!("{}{}", host_name, suffix)
    } else {
        instance_id.to_string()
    }
}

/// Literal IPv4 dotted-quad check
pub fn is_ipv4(candidate: &str) -> bool {
    IPV4.is_match(candidate)
}

fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.as_object().and_then(|map| map.get(key))
}

/// 배열, 단일 객체, 누락을 모두 리스트로 취급
fn items<'a>(value: Option<&'a Value>, path: &str) -> ParseResult<Vec<&'a Value>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(values)) => Ok(values.iter().filter(|v| !is_blank(v)).collect()),
        Some(object @ Value::Object(_)) => Ok(vec![object]),
        Some(v) if is_blank(v) => Ok(Vec::new()),
        Some(_) => Err(ParseError::UnexpectedShape {
            path: path.to_string(),
            expected: "a list of objects",
        }),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn first<'a>(value: &'a Value, key: &str) -> ParseResult<&'a Value> {
    items(field(value, key), key)?
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::MissingField(key.to_string()))
}

fn required_string(value: &Value, key: &str) -> ParseResult<String> {
    match field(value, key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Null) | None => Err(ParseError::MissingField(key.to_string())),
        Some(_) => Err(ParseError::UnexpectedShape {
            path: key.to_string(),
            expected: "a scalar",
        }),
    }
}
