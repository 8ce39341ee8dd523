//! HTTP server around the dispatcher.

use crate::error::ApiError;
use crate::http::{ApiRequest, ApiResponse, Method, QueryParams};
use crate::routing::{HEALTH_PATH, INFO_PATH};
use crate::runtime::{App, Dispatcher, ServerConfig};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Shared state for connection tasks.
struct ServerState {
    dispatcher: Dispatcher,
    config: ServerConfig,
    info: Value,
}

/// HTTP/1.1 server. One task per connection; each request is buffered and
/// handed to the [`Dispatcher`].
pub struct Server {
    state: Arc<ServerState>,
}

impl Server {
    /// Create a server for `app`.
    pub fn new(app: App, config: ServerConfig) -> Self {
        let info = app.info();
        let dispatcher = app.into_dispatcher();
        Self {
            state: Arc::new(ServerState {
                dispatcher,
                config,
                info,
            }),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.state.dispatcher
    }

    /// Start the HTTP server.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = self.state.config.bind_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;

        info!(
            "Listening on http://{} ({} endpoint(s))",
            addr,
            self.state.dispatcher.router().len()
        );
        if self.state.config.enable_info {
            info!("Endpoint listing at http://{}/info", addr);
        }

        self.spawn_sweeper();

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let state = self.state.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let state = state.clone();
                    async move { handle_request(req, state, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection: {:?}", err);
                }
            });
        }
    }

    /// Periodically drop elapsed rate-limit windows so the table does not
    /// grow with every client ever seen.
    fn spawn_sweeper(&self) {
        let limiter = self.state.dispatcher.rate_limiter();
        let period = self.state.config.sweep_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let removed = limiter.sweep();
                if removed > 0 {
                    debug!(removed, remaining = limiter.len(), "Swept rate-limit windows");
                }
            }
        });
    }
}

/// Handle an incoming HTTP request.
async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ServerState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let path = normalize_path(req.uri().path());

    if state.config.enable_health && path == HEALTH_PATH {
        return Ok(build_response(ApiResponse::success(json!("ok"))));
    }

    if state.config.enable_info && path == INFO_PATH && req.method() == hyper::Method::GET {
        return Ok(build_response(ApiResponse::success(state.info.clone())));
    }

    let method = match Method::try_from(req.method()) {
        Ok(method) => method,
        Err(e) => {
            warn!("{} from {}", e, remote_addr);
            return Ok(build_response(ApiResponse::failure(
                &ApiError::UnsupportedMethod(e.0),
            )));
        }
    };

    let request = match convert_request(req, method, path, &state.config, remote_addr).await {
        Ok(request) => request,
        Err(err) => {
            warn!("Failed to read request from {}: {}", remote_addr, err);
            return Ok(build_response(ApiResponse::failure(&err)));
        }
    };

    Ok(build_response(state.dispatcher.handle(request).await))
}

/// Convert a hyper Request to an ApiRequest.
async fn convert_request(
    req: Request<Incoming>,
    method: Method,
    path: String,
    config: &ServerConfig,
    remote_addr: SocketAddr,
) -> Result<ApiRequest, ApiError> {
    let query = req.uri().query().map(QueryParams::parse).unwrap_or_default();

    let mut headers = HashMap::new();
    for (name, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_ascii_lowercase(), v.to_string());
        }
    }

    let declared_len = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok());
    let body = read_body(req.into_body(), declared_len, config.max_body_size).await?;

    let client_ip = client_ip(&headers, config, remote_addr);

    Ok(ApiRequest {
        method,
        path,
        query,
        headers,
        body,
        client_ip,
    })
}

/// Buffer a request body of at most `limit` bytes.
///
/// A declared length over the limit is refused before reading; otherwise
/// the stream is cut off as soon as it passes the limit, so chunked uploads
/// are never buffered past it.
async fn read_body<B>(
    body: B,
    declared_len: Option<usize>,
    limit: usize,
) -> Result<Option<Bytes>, ApiError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if declared_len.is_some_and(|len| len > limit) {
        return Err(ApiError::PayloadTooLarge { limit });
    }

    let bytes = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                ApiError::PayloadTooLarge { limit }
            } else {
                ApiError::InvalidBody(e.to_string())
            }
        })?
        .to_bytes();

    Ok((!bytes.is_empty()).then_some(bytes))
}

/// Client address, optionally taken from the first `X-Forwarded-For` hop.
fn client_ip(
    headers: &HashMap<String, String>,
    config: &ServerConfig,
    remote_addr: SocketAddr,
) -> IpAddr {
    if config.trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .and_then(|hop| hop.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }
    remote_addr.ip()
}

/// Strip trailing slashes; the root stays `/`.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Build a hyper Response from an ApiResponse.
fn build_response(api_response: ApiResponse) -> Response<Full<Bytes>> {
    let status = hyper::StatusCode::from_u16(api_response.status.0).unwrap_or_else(|_| {
        warn!(
            "Invalid status code {}, falling back to 500 Internal Server Error",
            api_response.status.0
        );
        hyper::StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut response = Response::new(Full::new(api_response.body.unwrap_or_default()));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in api_response.headers {
        match (
            hyper::header::HeaderName::from_bytes(name.as_bytes()),
            hyper::header::HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!("Dropping invalid response header {}", name),
        }
    }

    response
}
