//! # fnserve - Functions as HTTP endpoints
//!
//! fnserve exposes ordinary Rust functions as JSON-over-HTTP endpoints.
//! Each endpoint declares its path, allowed methods and an optional security
//! policy (API key, per-client rate limit, CORS origin whitelist). Incoming
//! parameters are coerced to the declared types before the function runs,
//! and every answer is wrapped in a uniform envelope:
//!
//! ```text
//! {"success": true,  "data": ...}
//! {"success": false, "error": "..."}
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Server (hyper, http1)                     │
//! └──────────────────────────────────────────────────────────────┘
//!                               │ ApiRequest
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Dispatcher                          │
//! │  Router → SecurityChain → Binder → ApiFunction → envelope    │
//! │           (CORS, API key,  (coercion)                        │
//! │            rate limit)                                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fnserve::prelude::*;
//!
//! /// Add two numbers.
//! #[api_function]
//! fn add(a: i64, b: i64) -> i64 {
//!     a + b
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut app = App::new("Demo API", "1.0.0");
//!     app.api(
//!         Endpoint::builder("/add").methods([Method::Get, Method::Post]),
//!         AddFunction,
//!     )?;
//!
//!     app.into_server(ServerConfig::from_env()?).run().await
//! }
//! ```
//!
//! `GET /add?a=2&b=3` then answers `{"success":true,"data":5}`.
//!
//! ## Status codes
//!
//! | Failure                         | Status |
//! |---------------------------------|--------|
//! | unknown path                    | 404    |
//! | method not allowed              | 405    |
//! | origin not whitelisted          | 403    |
//! | missing or wrong API key        | 401    |
//! | rate limit exceeded             | 429    |
//! | missing or malformed parameter  | 400    |
//! | handler failure                 | 500    |

pub mod error;
pub mod function;
pub mod http;
pub mod routing;
pub mod runtime;
pub mod security;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::error::{ApiError, RegistrationError};
    pub use crate::function::{
        ApiFunction, Args, Endpoint, EndpointBuilder, FnFunction, ParamType, ParameterSpec,
    };
    pub use crate::http::{ApiRequest, ApiResponse, Method, StatusCode};
    pub use crate::runtime::{App, Dispatcher, Server, ServerConfig};
    pub use async_trait::async_trait;
    pub use fnserve_macro::api_function;
}

// Re-export for convenience
pub use error::{ApiError, RegistrationError};
pub use function::{ApiFunction, Endpoint};
pub use fnserve_macro::api_function;
pub use runtime::{App, ServerConfig};

#[doc(hidden)]
pub mod __private {
    pub use async_trait::async_trait;
    pub use serde_json::Value;
}
