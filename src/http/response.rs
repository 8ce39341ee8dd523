//! Response type and the JSON envelope every endpoint answers with.

use crate::error::ApiError;
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(405);
    pub const PAYLOAD_TOO_LARGE: StatusCode = StatusCode(413);
    pub const TOO_MANY_REQUESTS: StatusCode = StatusCode(429);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// Check if the status code indicates a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }
}

/// Response produced by the dispatcher.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// HTTP headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Option<Bytes>,
}

impl ApiResponse {
    /// Create a new response with the given status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// `{"success": true, "data": ...}` with status 200.
    pub fn success(data: Value) -> Self {
        Self::envelope(StatusCode::OK, &json!({ "success": true, "data": data }))
    }

    /// `{"success": false, "error": ...}` with the status mapped from `err`.
    pub fn failure(err: &ApiError) -> Self {
        let response = Self::envelope(
            err.status(),
            &json!({ "success": false, "error": err.to_string() }),
        );

        match err {
            ApiError::MethodNotAllowed { allowed, .. } => {
                let allowed = allowed
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                response.header("Allow", allowed)
            }
            ApiError::RateLimitExceeded { retry_after } => {
                response.header("Retry-After", retry_after_secs(*retry_after).to_string())
            }
            _ => response,
        }
    }

    /// Empty-bodied response, used for CORS preflight.
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    fn envelope(status: StatusCode, body: &Value) -> Self {
        Self::new(status)
            .header("Content-Type", "application/json")
            .body(body.to_string())
    }

    /// Add a header to the response.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add several headers at once.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in headers {
            self.headers.insert(k.into(), v.into());
        }
        self
    }

    /// Set the response body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Get a header value by exact name.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Parse the body as JSON if present.
    pub fn json_body(&self) -> Option<Result<Value, serde_json::Error>> {
        self.body.as_ref().map(|b| serde_json::from_slice(b))
    }
}

/// Whole seconds to wait, rounded up so a client that waits exactly this
/// long lands outside the current window. Never zero.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl From<ApiError> for ApiResponse {
    fn from(err: ApiError) -> Self {
        ApiResponse::failure(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::security::{RateDecision, RateLimiter};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Instant;

    #[test]
    fn test_success_envelope() {
        let response = ApiResponse::success(json!(5));
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.get_header("content-type"), Some("application/json"));
        assert_eq!(
            response.json_body().unwrap().unwrap(),
            json!({ "success": true, "data": 5 })
        );
    }

    #[test]
    fn test_failure_envelope() {
        let response = ApiResponse::failure(&ApiError::MissingParameter { name: "b".into() });
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json_body().unwrap().unwrap(),
            json!({ "success": false, "error": "missing parameter: b" })
        );
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let response: ApiResponse = ApiError::MethodNotAllowed {
            method: Method::Delete,
            allowed: vec![Method::Get, Method::Post],
        }
        .into();
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.get_header("Allow"), Some("GET, POST"));
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ApiResponse::failure(&ApiError::RateLimitExceeded {
            retry_after: Duration::from_millis(1500),
        });
        assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.get_header("Retry-After"), Some("2"));
    }

    #[test]
    fn test_retry_after_rounding() {
        assert_eq!(retry_after_secs(Duration::from_secs(3)), 3);
        assert_eq!(retry_after_secs(Duration::from_millis(59_500)), 60);
        assert_eq!(retry_after_secs(Duration::from_millis(1)), 1);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
    }

    #[test]
    fn test_waiting_retry_after_clears_the_limit() {
        let limiter = RateLimiter::new();
        let ip = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1));
        let start = Instant::now();

        assert!(limiter.check_at("/s", ip, 1, start).is_allowed());
        let denied_at = start + Duration::from_millis(500);
        let retry_after = match limiter.check_at("/s", ip, 1, denied_at) {
            RateDecision::Denied { retry_after } => retry_after,
            other => panic!("expected a denial, got {other:?}"),
        };

        let response = ApiResponse::failure(&ApiError::RateLimitExceeded { retry_after });
        let wait: u64 = response.get_header("Retry-After").unwrap().parse().unwrap();
        assert_eq!(wait, 60);

        let retried_at = denied_at + Duration::from_secs(wait);
        assert!(limiter.check_at("/s", ip, 1, retried_at).is_allowed());
    }

    #[test]
    fn test_server_error_range() {
        assert!(StatusCode::INTERNAL_SERVER_ERROR.is_server_error());
        assert!(!StatusCode::TOO_MANY_REQUESTS.is_server_error());
    }
}
