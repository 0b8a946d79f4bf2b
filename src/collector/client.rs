//! 타임아웃이 제한된 HTTP 클라이언트
//!
//! 연결/슬롯 획득/읽기 타임아웃을 요청마다 따로 지정할 수 있습니다.
//! 서버가 응답 없이 연결을 닫은 경우에만 최대 [`MAX_ATTEMPTS`]회까지
//! 재시도하며, 다른 에러는 즉시 반환합니다.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{is_no_response, HandlerError, HttpResult, TransportError};

/// 기본 연결 타임아웃
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);
/// 기본 연결 슬롯 획득 타임아웃
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(3000);
/// 기본 읽기 타임아웃
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_millis(5000);
/// 핸들러가 없는 요청의 읽기 타임아웃
pub const FIRE_AND_FORGET_SOCKET_TIMEOUT: Duration = Duration::from_millis(1);
/// 무응답 에러에 대한 최대 시도 횟수 (최초 요청 포함)
pub const MAX_ATTEMPTS: u32 = 3;
/// 동시 연결 슬롯 수
pub const DEFAULT_MAX_CONNECTIONS: usize = 20;

/// HTTP 메서드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

/// 요청별 타임아웃 (None이면 기본값)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    /// TCP 연결 타임아웃
    pub connect: Option<Duration>,
    /// 연결 슬롯 획득 타임아웃
    pub request: Option<Duration>,
    /// 소켓 읽기 타임아웃
    pub socket: Option<Duration>,
}

impl Timeouts {
    /// 세 타임아웃을 모두 지정
    pub fn new(connect: Duration, request: Duration, socket: Duration) -> Self {
        Self {
            connect: Some(connect),
            request: Some(request),
            socket: Some(socket),
        }
    }

    fn resolve(&self, has_handler: bool) -> ResolvedTimeouts {
        let socket = if has_handler {
            self.socket.unwrap_or(DEFAULT_SOCKET_TIMEOUT)
        } else {
            FIRE_AND_FORGET_SOCKET_TIMEOUT
        };

        ResolvedTimeouts {
            connect: self.connect.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            request: self.request.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            socket,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResolvedTimeouts {
    connect: Duration,
    request: Duration,
    socket: Duration,
}

/// 핸들러에 전달되는 응답
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: u16,
    body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 2xx가 아니거나 본문이 비어 있으면 에러
    pub fn require_body(&self) -> Result<&[u8], HandlerError> {
        if !self.is_success() {
            return Err(HandlerError::Status(self.status));
        }
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Err(HandlerError::EmptyBody);
        }
        Ok(&self.body)
    }
}

/// 응답 처리기
///
/// 연결 슬롯이 반환되기 전에 호출됩니다.
pub trait ResponseHandler {
    type Output;

    fn handle(&self, response: HttpResponse) -> Result<Self::Output, HandlerError>;
}

impl<F, T> ResponseHandler for F
where
    F: Fn(HttpResponse) -> Result<T, HandlerError>,
{
    type Output = T;

    fn handle(&self, response: HttpResponse) -> Result<T, HandlerError> {
        self(response)
    }
}

/// 타임아웃 제한 HTTP 클라이언트
///
/// 요청마다 새 연결을 사용하고, 동시 요청 수는 연결 슬롯으로 제한합니다.
#[derive(Debug, Clone)]
pub struct HttpClient {
    slots: Arc<Semaphore>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// 새 클라이언트 생성
    pub fn new() -> Self {
        Self::with_max_connections(DEFAULT_MAX_CONNECTIONS)
    }

    /// 연결 슬롯 수를 지정하여 생성
    pub fn with_max_connections(max_connections: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max_connections.max(1))),
        }
    }

    /// 응답 처리기와 함께 GET 요청
    pub async fn get_with<H: ResponseHandler>(
        &self,
        url: &str,
        params: Option<&[(&str, &str)]>,
        handler: &H,
        timeouts: Timeouts,
    ) -> HttpResult<H::Output> {
        self.request_with(Method::Get, url, params, handler, timeouts)
            .await
    }

    /// 응답 처리기와 함께 POST 요청
    pub async fn post_with<H: ResponseHandler>(
        &self,
        url: &str,
        params: Option<&[(&str, &str)]>,
        handler: &H,
        timeouts: Timeouts,
    ) -> HttpResult<H::Output> {
        self.request_with(Method::Post, url, params, handler, timeouts)
            .await
    }

    /// 응답을 기다리지 않는 GET 요청
    pub async fn get(
        &self,
        url: &str,
        params: Option<&[(&str, &str)]>,
        timeouts: Timeouts,
    ) -> HttpResult<()> {
        self.request(Method::Get, url, params, timeouts).await
    }

    /// 응답을 기다리지 않는 POST 요청
    pub async fn post(
        &self,
        url: &str,
        params: Option<&[(&str, &str)]>,
        timeouts: Timeouts,
    ) -> HttpResult<()> {
        self.request(Method::Post, url, params, timeouts).await
    }

    /// 요청을 보내고 응답을 `handler`로 처리
    #[instrument(skip(self, params, handler, timeouts))]
    pub async fn request_with<H: ResponseHandler>(
        &self,
        method: Method,
        url: &str,
        params: Option<&[(&str, &str)]>,
        handler: &H,
        timeouts: Timeouts,
    ) -> HttpResult<H::Output> {
        let timeouts = timeouts.resolve(true);
        let (_slot, response) = self.execute(method, url, params, timeouts).await?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(url, 1, e))?;

        debug!(status, bytes = body.len(), "Response received");

        let output = handler.handle(HttpResponse::new(status, body.to_vec()))?;
        Ok(output)
    }

    /// 응답 본문을 읽지 않는 요청
    ///
    /// 읽기 타임아웃은 1ms로 고정되며 그로 인한 타임아웃은 무시합니다.
    #[instrument(skip(self, params, timeouts))]
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        params: Option<&[(&str, &str)]>,
        timeouts: Timeouts,
    ) -> HttpResult<()> {
        let timeouts = timeouts.resolve(false);
        match self.execute(method, url, params, timeouts).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_read_timeout() => {
                debug!("Ignoring read timeout for request without handler");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        params: Option<&[(&str, &str)]>,
        timeouts: ResolvedTimeouts,
    ) -> Result<(SemaphorePermit<'_>, reqwest::Response), TransportError> {
        let target = build_url(method, url, params)?;
        let slot = self.acquire(timeouts.request).await?;
        let client = build_client(timeouts)?;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut request = client.request(method.as_reqwest(), target.clone());
            if method == Method::Post {
                if let Some(form) = params.filter(|p| !p.is_empty()) {
                    request = request.form(&form);
                }
            }

            match request.send().await {
                Ok(response) => return Ok((slot, response)),
                Err(e) if attempt < MAX_ATTEMPTS && is_no_response(&e) => {
                    warn!(
                        url = %url,
                        attempt,
                        max = MAX_ATTEMPTS,
                        "Server closed connection without response, retrying"
                    );
                }
                Err(e) => return Err(TransportError::from_reqwest(url, attempt, e)),
            }
        }
    }

    async fn acquire(&self, timeout: Duration) -> Result<SemaphorePermit<'_>, TransportError> {
        let timeout_ms = timeout.as_millis() as u64;
        match tokio::time::timeout(timeout, self.slots.acquire()).await {
            Ok(Ok(slot)) => Ok(slot),
            Ok(Err(_)) => Err(TransportError::SlotsClosed),
            Err(_) => Err(TransportError::AcquireTimeout { timeout_ms }),
        }
    }

    /// 사용 가능한 연결 슬롯 수
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

fn build_client(timeouts: ResolvedTimeouts) -> Result<Client, TransportError> {
    ClientBuilder::new()
        .connect_timeout(timeouts.connect)
        .read_timeout(timeouts.socket)
        .pool_max_idle_per_host(0)
        .user_agent(concat!("eureka-exporter/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(TransportError::ClientInit)
}

/// GET 파라미터는 쿼리 문자열로 인코딩
fn build_url(
    method: Method,
    url: &str,
    params: Option<&[(&str, &str)]>,
) -> Result<Url, TransportError> {
    let mut parsed = Url::parse(url).map_err(|source| TransportError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;

    if method == Method::Get {
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            parsed.query_pairs_mut().extend_pairs(params.iter());
        }
    }

    Ok(parsed)
}
