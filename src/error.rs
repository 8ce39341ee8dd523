//! Error types for request dispatch and endpoint registration.

use crate::http::{Method, StatusCode};
use std::any::Any;
use std::time::Duration;
use thiserror::Error;

/// A request-time failure. Every variant is turned into a JSON error
/// envelope by the dispatcher; none escapes it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("no endpoint registered at '{path}'")]
    RouteNotFound { path: String },

    #[error("method {method} not allowed")]
    MethodNotAllowed { method: Method, allowed: Vec<Method> },

    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("origin '{origin}' is not allowed")]
    ForbiddenOrigin { origin: String },

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("rate limit exceeded")]
    RateLimitExceeded { retry_after: Duration },

    #[error("missing parameter: {name}")]
    MissingParameter { name: String },

    #[error("invalid value for parameter '{parameter}': expected {expected}, got {received}")]
    TypeCoercion {
        parameter: String,
        expected: String,
        received: String,
    },

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The wrapped function itself reported a failure.
    #[error("{0}")]
    Handler(String),

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    /// Wrap an application-level failure raised by a handler.
    pub fn handler(err: impl std::fmt::Display) -> Self {
        ApiError::Handler(err.to_string())
    }

    /// Like [`ApiError::handler`], but an `ApiError` is passed through with
    /// its own status.
    pub fn from_handler<E: std::fmt::Display + 'static>(err: E) -> Self {
        match (&err as &dyn Any).downcast_ref::<ApiError>() {
            Some(api_err) => api_err.clone(),
            None => ApiError::Handler(err.to_string()),
        }
    }

    pub fn type_coercion(
        parameter: impl Into<String>,
        expected: impl Into<String>,
        received: impl Into<String>,
    ) -> Self {
        ApiError::TypeCoercion {
            parameter: parameter.into(),
            expected: expected.into(),
            received: received.into(),
        }
    }

    /// HTTP status code this failure is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } | ApiError::UnsupportedMethod(_) => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            ApiError::ForbiddenOrigin { .. } => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::MissingParameter { .. }
            | ApiError::TypeCoercion { .. }
            | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Handler(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A configuration mistake detected while registering endpoints. These are
/// not recoverable; startup must abort.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("path '{0}' is already registered")]
    DuplicatePath(String),

    #[error("path '{0}' must start with '/' and must not end with '/'")]
    InvalidPath(String),

    #[error("path '{0}' is reserved by the server")]
    ReservedPath(String),

    #[error("endpoint '{0}' must allow at least one method")]
    NoMethods(String),

    #[error("endpoint '{0}' has a rate limit of zero")]
    ZeroRateLimit(String),
}
