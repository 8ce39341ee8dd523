//! HTTP types consumed and produced by the dispatch pipeline.

mod request;
mod response;

pub use request::{ApiRequest, Method, QueryParams, UnsupportedMethod};
pub use response::{ApiResponse, StatusCode};
