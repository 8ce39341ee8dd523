//! Request dispatch: route → security → bind → invoke → envelope.

use crate::error::ApiError;
use crate::function::{bind, decode_body, Args, Endpoint};
use crate::http::{ApiRequest, ApiResponse, Method};
use crate::routing::Router;
use crate::security::{RateLimiter, Rejection, SecurityChain};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Turns buffered requests into responses. Every failure along the way ends
/// up as a JSON error envelope; `handle` itself cannot fail.
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<Router>,
    security: SecurityChain,
}

impl Dispatcher {
    pub fn new(router: Arc<Router>) -> Self {
        Self::with_security(router, SecurityChain::default())
    }

    pub fn with_security(router: Arc<Router>, security: SecurityChain) -> Self {
        Self { router, security }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn rate_limiter(&self) -> Arc<RateLimiter> {
        self.security.limiter()
    }

    /// Handle one request.
    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let started = Instant::now();
        let response = match self.dispatch(&request).await {
            Ok(response) => response,
            Err(rejection) => rejection.into_response(),
        };

        debug!(
            method = %request.method,
            path = %request.path,
            client = %request.client_ip,
            status = response.status.0,
            elapsed_us = started.elapsed().as_micros() as u64,
            "Dispatched request"
        );
        response
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, Rejection> {
        let endpoint = match self.router.resolve(&request.path, &request.method) {
            Ok(endpoint) => endpoint,
            Err(err) => return self.unresolved(err, request),
        };

        let clearance = self.security.enforce(&endpoint, request)?;

        let args = decode_body(request)
            .and_then(|body| {
                bind(
                    endpoint.parameters(),
                    &request.method,
                    &request.query,
                    body.as_ref(),
                )
            })
            .map_err(|err| Rejection::new(err, clearance.cors.clone()))?;

        match invoke(&endpoint, args).await {
            Ok(data) => Ok(clearance.apply(ApiResponse::success(data))),
            Err(err) => Err(Rejection::new(err, clearance.cors)),
        }
    }

    /// A path served without `OPTIONS` still answers CORS preflight when it
    /// has an origin policy.
    fn unresolved(&self, err: ApiError, request: &ApiRequest) -> Result<ApiResponse, Rejection> {
        if request.method == Method::Options {
            if let Some(endpoint) = self.router.lookup(&request.path) {
                if endpoint.security().allowed_origins.is_some() {
                    let cors = self.security.preflight(endpoint, request)?;
                    return Ok(cors.apply(ApiResponse::no_content()));
                }
            }
        }
        Err(err.into())
    }
}

/// Run the handler on its own task so a panic surfaces as a 500 instead of
/// tearing down the connection.
async fn invoke(endpoint: &Endpoint, args: Args) -> Result<Value, ApiError> {
    let handler = endpoint.handler();
    let outcome = tokio::spawn(async move { handler.call(args).await }).await;

    match outcome {
        Ok(Ok(data)) => Ok(data),
        Ok(Err(err)) => {
            if err.status().is_server_error() {
                error!(endpoint = %endpoint.path(), "Handler failed: {}", err);
            }
            Err(err)
        }
        Err(join_err) => {
            error!(endpoint = %endpoint.path(), "Handler panicked: {}", join_err);
            Err(ApiError::Internal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{to_data, FnFunction, ParamType, ParameterSpec};
    use crate::http::StatusCode;
    use serde_json::json;

    fn dispatcher() -> Dispatcher {
        let mut router = Router::new();
        router
            .register(
                Endpoint::builder("/add")
                    .methods([Method::Get, Method::Post])
                    .handler(FnFunction::new(
                        "add",
                        ParameterSpec::new()
                            .required("a", ParamType::Integer)
                            .required("b", ParamType::Integer),
                        |args: Args| to_data(args.get::<i64>("a")? + args.get::<i64>("b")?),
                    )),
            )
            .unwrap();
        router
            .register(Endpoint::builder("/fail").handler(FnFunction::new(
                "fail",
                ParameterSpec::new(),
                |_| Err(ApiError::handler("division by zero")),
            )))
            .unwrap();
        router
            .register(Endpoint::builder("/panic").handler(FnFunction::new(
                "panic",
                ParameterSpec::new(),
                |_| -> Result<Value, ApiError> { panic!("handler bug") },
            )))
            .unwrap();
        Dispatcher::new(Arc::new(router))
    }

    fn run(request: ApiRequest) -> (StatusCode, Value) {
        let response = tokio_test::block_on(dispatcher().handle(request));
        let body = response.json_body().unwrap().unwrap();
        (response.status, body)
    }

    #[test]
    fn test_success() {
        let (status, body) = run(ApiRequest::new(Method::Get, "/add?a=2&b=3"));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "data": 5 }));
    }

    #[test]
    fn test_missing_parameter() {
        let (status, body) = run(ApiRequest::new(Method::Get, "/add?a=2"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "success": false, "error": "missing parameter: b" }));
    }

    #[test]
    fn test_post_body() {
        let request = ApiRequest::new(Method::Post, "/add").json(&json!({ "a": 40, "b": 2 }));
        let (status, body) = run(request);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], 42);
    }

    #[test]
    fn test_invalid_body() {
        let request = ApiRequest::new(Method::Post, "/add").body("not json");
        let (status, body) = run(request);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[test]
    fn test_route_errors() {
        let (status, _) = run(ApiRequest::new(Method::Get, "/nope"));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = run(ApiRequest::new(Method::Delete, "/add"));
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_handler_failure_is_500() {
        let (status, body) = run(ApiRequest::new(Method::Get, "/fail"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "success": false, "error": "division by zero" }));
    }

    #[test]
    fn test_handler_panic_is_contained() {
        let (status, body) = run(ApiRequest::new(Method::Get, "/panic"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
    }
}
