//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved endpoint + request:
//!     → cors.rs (origin whitelist, response annotations)
//!     → api_key.rs (shared-secret header)
//!     → rate_limit.rs (fixed window per endpoint and client IP)
//!     → Pass to parameter binding
//! ```
//!
//! Checks run in that order and stop at the first rejection.

pub mod api_key;
pub mod chain;
pub mod cors;
pub mod rate_limit;

pub use chain::{Clearance, Rejection, SecurityChain, RATE_LIMIT_REMAINING_HEADER};
pub use cors::{AllowedOrigins, CorsHeaders};
pub use rate_limit::{RateDecision, RateLimiter};

use serde::Serialize;

/// Per-endpoint security settings. Every field is optional; an empty policy
/// lets all requests through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityPolicy {
    /// Secret expected in the `X-API-Key` header.
    pub api_key: Option<String>,
    /// Calls per minute allowed for one client IP.
    pub rate_limit: Option<u32>,
    /// Origins allowed to call the endpoint from a browser.
    pub allowed_origins: Option<AllowedOrigins>,
}

impl SecurityPolicy {
    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.rate_limit.is_none() && self.allowed_origins.is_none()
    }

    /// Public view of the policy; never exposes the secret.
    pub fn summary(&self) -> SecuritySummary {
        SecuritySummary {
            secured: self.api_key.is_some(),
            rate_limit: self.rate_limit,
            cors: self.allowed_origins.is_some(),
        }
    }
}

/// What the listing endpoint reports about a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SecuritySummary {
    pub secured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
    pub cors: bool,
}
