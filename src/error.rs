//! Error types for eureka-exporter
//!
//! This module defines the error types shared by the HTTP client and the
//! scrape pipeline. Configuration errors live in [`crate::config`] and
//! payload errors in [`crate::collector::ParseError`].

use thiserror::Error;

use crate::collector::ParseError;

/// 메트릭 변환 에러
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// 라벨 이름과 값의 개수 불일치
    #[error("Metric '{name}' has {names} label names but {values} label values")]
    LabelArity {
        name: String,
        names: usize,
        values: usize,
    },
}

/// 전송 계층 에러 (연결, 타임아웃, 무응답)
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP 클라이언트 초기화 실패
    #[error("Failed to initialize HTTP client: {0}")]
    ClientInit(#[source] reqwest::Error),

    /// 잘못된 URL
    #[error("Invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// 연결 거부 또는 호스트 도달 불가
    #[error("Connection to {url} failed: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// 연결 슬롯 획득 타임아웃
    #[error("Timed out after {timeout_ms}ms waiting for a connection slot")]
    AcquireTimeout { timeout_ms: u64 },

    /// 연결 슬롯 세마포어가 닫힘
    #[error("Connection slots are closed")]
    SlotsClosed,

    /// 연결/읽기 타임아웃
    #[error("Request to {url} timed out: {source}")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// 서버가 응답 없이 연결을 닫음
    #[error("{url} closed the connection without a response after {attempts} attempts")]
    NoResponse {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// 기타 I/O 및 프로토콜 에러
    #[error("HTTP request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl TransportError {
    /// Classify a reqwest failure for `url`.
    ///
    /// `attempts` is only reported for the no-response class, which is the
    /// only one the client retries.
    pub fn from_reqwest(url: &str, attempts: u32, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if is_no_response(&err) {
            TransportError::NoResponse {
                url,
                attempts,
                source: err,
            }
        } else if err.is_timeout() {
            TransportError::Timeout { url, source: err }
        } else if err.is_connect() {
            TransportError::Unreachable { url, source: err }
        } else {
            TransportError::Request { url, source: err }
        }
    }

    /// 연결 거부/도달 불가 여부
    pub fn is_unreachable(&self) -> bool {
        matches!(self, TransportError::Unreachable { .. })
    }

    /// 연결 이후 응답 대기/읽기 중 타임아웃 여부
    pub fn is_read_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { source, .. } if !source.is_connect())
    }

    /// 타임아웃 여부 (연결, 읽기, 슬롯 획득)
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout { .. } | TransportError::AcquireTimeout { .. }
        )
    }
}

/// Returns true when the server closed the connection before sending any
/// part of a response.
pub(crate) fn is_no_response(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(cause) = source {
        if let Some(hyper_err) = cause.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() {
                return true;
            }
        }
        if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
            if io_err.kind() == std::io::ErrorKind::UnexpectedEof {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

/// 응답 핸들러 에러
#[derive(Error, Debug)]
pub enum HandlerError {
    /// 응답 본문 없음
    #[error("Response body was empty")]
    EmptyBody,

    /// 2xx가 아닌 HTTP 상태
    #[error("HTTP error status: {0}")]
    Status(u16),

    /// 페이로드 파싱 실패
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// 메트릭 변환 실패
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),
}

/// Error returned by a single HTTP exchange
#[derive(Error, Debug)]
pub enum HttpError {
    /// Transport-level failure, possibly after retries
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response arrived but the handler rejected it
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl HttpError {
    /// Returns the transport error, if this is one
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            HttpError::Transport(e) => Some(e),
            HttpError::Handler(_) => None,
        }
    }

    /// Short machine-friendly kind, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            HttpError::Transport(TransportError::Unreachable { .. }) => "unreachable",
            HttpError::Transport(TransportError::NoResponse { .. }) => "no_response",
            HttpError::Transport(e) if e.is_timeout() => "timeout",
            HttpError::Transport(_) => "transport",
            HttpError::Handler(HandlerError::Parse(_)) => "parse",
            HttpError::Handler(_) => "handler",
        }
    }
}

/// Result type alias for HTTP exchanges
pub type HttpResult<T> = Result<T, HttpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_kind() {
        let err = HttpError::from(HandlerError::Status(503));
        assert_eq!(err.kind(), "handler");
        assert!(err.as_transport().is_none());
        assert_eq!(err.to_string(), "HTTP error status: 503");
    }

    #[test]
    fn test_parse_error_kind() {
        let err = HttpError::from(HandlerError::from(ParseError::UnknownFormat));
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn test_acquire_timeout_is_timeout() {
        let err = TransportError::AcquireTimeout { timeout_ms: 3000 };
        assert!(err.is_timeout());
        assert!(!err.is_unreachable());
        assert_eq!(err.to_string(), "Timed out after 3000ms waiting for a connection slot");
    }

    #[test]
    fn test_label_arity_message() {
        let err = TransformError::LabelArity {
            name: "eureka_nodes_info".to_string(),
            names: 5,
            values: 4,
        };
        assert_eq!(
            err.to_string(),
            "Metric 'eureka_nodes_info' has 5 label names but 4 label values"
        );
    }
}
