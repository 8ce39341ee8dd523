//! Path and method lookup for registered endpoints.
//!
//! Paths match by exact string equality; there are no pattern segments.
//! The table is filled before serving starts and only read afterwards, so
//! request tasks share it behind an `Arc` without locking.

use crate::error::{ApiError, RegistrationError};
use crate::function::Endpoint;
use crate::http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Path of the built-in endpoint listing.
pub const INFO_PATH: &str = "/info";

/// Path of the built-in health check.
pub const HEALTH_PATH: &str = "/_health";

/// Registry of endpoints keyed by path.
#[derive(Debug, Default)]
pub struct Router {
    endpoints: HashMap<String, Arc<Endpoint>>,
}

impl Router {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint. Fails if the path is taken or the endpoint is
    /// misconfigured.
    pub fn register(&mut self, endpoint: Endpoint) -> Result<(), RegistrationError> {
        let path = endpoint.path().to_string();

        // Incoming paths lose their trailing slash before lookup.
        if !path.starts_with('/') || (path.len() > 1 && path.ends_with('/')) {
            return Err(RegistrationError::InvalidPath(path));
        }
        if path == INFO_PATH || path == HEALTH_PATH {
            return Err(RegistrationError::ReservedPath(path));
        }
        if endpoint.methods().is_empty() {
            return Err(RegistrationError::NoMethods(path));
        }
        if endpoint.security().rate_limit == Some(0) {
            return Err(RegistrationError::ZeroRateLimit(path));
        }
        if self.endpoints.contains_key(&path) {
            return Err(RegistrationError::DuplicatePath(path));
        }

        info!(
            path = %path,
            methods = ?endpoint.methods(),
            params = endpoint.parameters().len(),
            "Registered endpoint"
        );
        self.endpoints.insert(path, Arc::new(endpoint));
        Ok(())
    }

    /// Find the endpoint for `path` regardless of method.
    pub fn lookup(&self, path: &str) -> Option<&Arc<Endpoint>> {
        self.endpoints.get(path)
    }

    /// Find the endpoint serving `method` on `path`.
    pub fn resolve(&self, path: &str, method: &Method) -> Result<Arc<Endpoint>, ApiError> {
        let endpoint = self.lookup(path).ok_or_else(|| ApiError::RouteNotFound {
            path: path.to_string(),
        })?;

        if !endpoint.allows(method) {
            return Err(ApiError::MethodNotAllowed {
                method: *method,
                allowed: endpoint.methods().iter().copied().collect(),
            });
        }

        Ok(endpoint.clone())
    }

    /// All endpoints, ordered by path.
    pub fn endpoints(&self) -> Vec<&Arc<Endpoint>> {
        let mut endpoints: Vec<_> = self.endpoints.values().collect();
        endpoints.sort_by(|a, b| a.path().cmp(b.path()));
        endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
