//! Ordered security gate run before parameter binding.

use crate::error::ApiError;
use crate::function::Endpoint;
use crate::http::{ApiRequest, ApiResponse};
use crate::security::api_key::{verify_api_key, API_KEY_HEADER};
use crate::security::cors::{check_origin, CorsHeaders};
use crate::security::rate_limit::{RateDecision, RateLimiter};
use std::sync::Arc;
use tracing::warn;

/// A failed request, together with any CORS headers already granted.
///
/// Once the CORS step has passed, later failures still carry its headers so
/// a browser caller can read the error body.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub error: ApiError,
    pub cors: CorsHeaders,
}

impl Rejection {
    pub fn new(error: ApiError, cors: CorsHeaders) -> Self {
        Self { error, cors }
    }

    pub fn into_response(self) -> ApiResponse {
        self.cors.apply(ApiResponse::failure(&self.error))
    }
}

impl From<ApiError> for Rejection {
    fn from(error: ApiError) -> Self {
        Self::new(error, CorsHeaders::none())
    }
}

/// Outcome of a request that passed every check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clearance {
    /// Headers granted by the CORS step.
    pub cors: CorsHeaders,
    /// Calls left in the current window, when the endpoint is rate limited.
    pub remaining: Option<u32>,
}

impl Clearance {
    /// Annotate a successful response.
    pub fn apply(self, response: ApiResponse) -> ApiResponse {
        let response = self.cors.apply(response);
        match self.remaining {
            Some(remaining) => {
                response.header(RATE_LIMIT_REMAINING_HEADER, remaining.to_string())
            }
            None => response,
        }
    }
}

/// Header reporting the calls left in the current rate-limit window.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "X-RateLimit-Remaining";

/// CORS → API key → rate limit, stopping at the first failure.
#[derive(Clone)]
pub struct SecurityChain {
    limiter: Arc<RateLimiter>,
}

impl SecurityChain {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }

    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.limiter.clone()
    }

    /// Run every check configured on `endpoint`.
    pub fn enforce(
        &self,
        endpoint: &Endpoint,
        request: &ApiRequest,
    ) -> Result<Clearance, Rejection> {
        let policy = endpoint.security();
        let cors = self.preflight(endpoint, request)?;

        if let Some(expected) = &policy.api_key {
            if let Err(err) = verify_api_key(expected, request.get_header(API_KEY_HEADER)) {
                warn!(
                    endpoint = %endpoint.path(),
                    client = %request.client_ip,
                    "Rejected request: {}",
                    err
                );
                return Err(Rejection::new(err, cors));
            }
        }

        let mut remaining = None;
        if let Some(limit) = policy.rate_limit {
            match self.limiter.check(endpoint.path(), request.client_ip, limit) {
                RateDecision::Allowed { remaining: left } => remaining = Some(left),
                RateDecision::Denied { retry_after } => {
                    warn!(
                        endpoint = %endpoint.path(),
                        client = %request.client_ip,
                        limit,
                        "Rate limit exceeded"
                    );
                    return Err(Rejection::new(
                        ApiError::RateLimitExceeded { retry_after },
                        cors,
                    ));
                }
            }
        }

        Ok(Clearance { cors, remaining })
    }

    /// Run only the CORS step.
    pub fn preflight(
        &self,
        endpoint: &Endpoint,
        request: &ApiRequest,
    ) -> Result<CorsHeaders, Rejection> {
        check_origin(
            endpoint.security().allowed_origins.as_ref(),
            request.get_header("origin"),
            endpoint.methods(),
        )
        .map_err(|err| {
            warn!(
                endpoint = %endpoint.path(),
                client = %request.client_ip,
                "Rejected request: {}",
                err
            );
            Rejection::from(err)
        })
    }
}

impl Default for SecurityChain {
    fn default() -> Self {
        Self::new(Arc::new(RateLimiter::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{Args, FnFunction, ParameterSpec};
    use crate::http::Method;
    use serde_json::Value;

    fn endpoint(path: &str) -> crate::function::EndpointBuilder {
        Endpoint::builder(path).methods([Method::Post])
    }

    fn noop() -> FnFunction<impl Fn(Args) -> Result<Value, ApiError> + Send + Sync> {
        FnFunction::new("noop", ParameterSpec::new(), |_| Ok(Value::Null))
    }

    #[test]
    fn test_open_endpoint_passes() {
        let chain = SecurityChain::default();
        let ep = endpoint("/open").handler(noop());
        let clearance = chain.enforce(&ep, &ApiRequest::new(Method::Post, "/open")).unwrap();
        assert!(clearance.cors.is_empty());
        assert_eq!(clearance.remaining, None);
        assert!(chain.limiter().is_empty());
    }

    #[test]
    fn test_origin_checked_before_api_key() {
        let chain = SecurityChain::default();
        let ep = endpoint("/s")
            .api_key("k")
            .allowed_origins(["https://a.com"])
            .handler(noop());

        let request = ApiRequest::new(Method::Post, "/s").header("Origin", "https://evil.com");
        let rejection = chain.enforce(&ep, &request).unwrap_err();
        assert!(matches!(rejection.error, ApiError::ForbiddenOrigin { .. }));
        assert!(rejection.cors.is_empty());
    }

    #[test]
    fn test_api_key_rejection_keeps_cors_headers() {
        let chain = SecurityChain::default();
        let ep = endpoint("/s")
            .api_key("k")
            .allowed_origins(["*"])
            .handler(noop());

        let request = ApiRequest::new(Method::Post, "/s").header("Origin", "https://a.com");
        let rejection = chain.enforce(&ep, &request).unwrap_err();
        assert_eq!(rejection.error, ApiError::Unauthorized("missing API key"));
        assert_eq!(
            rejection.cors.get("Access-Control-Allow-Origin"),
            Some("https://a.com")
        );

        let response = rejection.into_response();
        assert_eq!(response.status.0, 401);
        assert_eq!(
            response.get_header("Access-Control-Allow-Origin"),
            Some("https://a.com")
        );
    }

    #[test]
    fn test_unauthorized_requests_do_not_consume_rate_limit() {
        let chain = SecurityChain::default();
        let ep = endpoint("/s").api_key("k").rate_limit(1).handler(noop());

        for _ in 0..3 {
            let bad = ApiRequest::new(Method::Post, "/s").header("X-API-Key", "nope");
            assert_eq!(
                chain.enforce(&ep, &bad).unwrap_err().error,
                ApiError::Unauthorized("invalid API key")
            );
        }

        let good = ApiRequest::new(Method::Post, "/s").header("X-API-Key", "k");
        assert!(chain.enforce(&ep, &good).is_ok());
        assert!(matches!(
            chain.enforce(&ep, &good).unwrap_err().error,
            ApiError::RateLimitExceeded { .. }
        ));
    }

    #[test]
    fn test_clearance_reports_remaining_calls() {
        let chain = SecurityChain::default();
        let ep = endpoint("/s").rate_limit(2).handler(noop());
        let request = ApiRequest::new(Method::Post, "/s");

        let clearance = chain.enforce(&ep, &request).unwrap();
        assert_eq!(clearance.remaining, Some(1));
        let response = clearance.apply(ApiResponse::success(Value::Null));
        assert_eq!(response.get_header("X-RateLimit-Remaining"), Some("1"));

        assert_eq!(chain.enforce(&ep, &request).unwrap().remaining, Some(0));
    }
}
