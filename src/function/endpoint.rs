//! Endpoint registration records.

use crate::function::handler::ApiFunction;
use crate::function::params::ParameterSpec;
use crate::http::Method;
use crate::security::{AllowedOrigins, SecurityPolicy, SecuritySummary};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A function bound to a path, its allowed methods and its security policy.
///
/// Built once at startup and never mutated afterwards. The parameter table
/// is read from the handler when the endpoint is built, not per request.
pub struct Endpoint {
    path: String,
    methods: BTreeSet<Method>,
    handler: Arc<dyn ApiFunction>,
    parameters: ParameterSpec,
    security: SecurityPolicy,
    description: Option<String>,
}

impl Endpoint {
    /// Start building an endpoint for `path`.
    pub fn builder(path: impl Into<String>) -> EndpointBuilder {
        EndpointBuilder::new(path)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn methods(&self) -> &BTreeSet<Method> {
        &self.methods
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    pub fn parameters(&self) -> &ParameterSpec {
        &self.parameters
    }

    pub fn security(&self) -> &SecurityPolicy {
        &self.security
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Shared handle on the handler, for invoking it off the request task.
    pub fn handler(&self) -> Arc<dyn ApiFunction> {
        self.handler.clone()
    }

    /// Discovery view used by the listing endpoint.
    pub fn info(&self) -> EndpointInfo<'_> {
        EndpointInfo {
            path: &self.path,
            name: self.handler.name(),
            methods: self.methods.iter().copied().collect(),
            parameters: &self.parameters,
            description: self.description(),
            security: self.security.summary(),
        }
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("handler", &self.handler.name())
            .field("parameters", &self.parameters)
            .field("security", &self.security.summary())
            .finish()
    }
}

/// Serializable summary of an endpoint.
#[derive(Debug, Serialize)]
pub struct EndpointInfo<'a> {
    pub path: &'a str,
    pub name: &'a str,
    pub methods: Vec<Method>,
    pub parameters: &'a ParameterSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(flatten)]
    pub security: SecuritySummary,
}

/// Builder for [`Endpoint`]. Methods default to `GET` when none are given.
#[derive(Debug, Clone)]
pub struct EndpointBuilder {
    path: String,
    methods: Option<BTreeSet<Method>>,
    security: SecurityPolicy,
    description: Option<String>,
}

impl EndpointBuilder {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            methods: None,
            security: SecurityPolicy::default(),
            description: None,
        }
    }

    /// Set the allowed HTTP methods.
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = Some(methods.into_iter().collect());
        self
    }

    /// Require `X-API-Key: <key>` on every call.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.security.api_key = Some(key.into());
        self
    }

    /// Allow at most `calls_per_minute` calls per client IP.
    pub fn rate_limit(mut self, calls_per_minute: u32) -> Self {
        self.security.rate_limit = Some(calls_per_minute);
        self
    }

    /// Restrict browser callers to these origins (`"*"` for any).
    pub fn allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.security.allowed_origins = Some(AllowedOrigins::from_list(origins));
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach the handler, reading its parameter table once. Without an
    /// explicit description, the handler's own one is used.
    pub fn handler(self, handler: impl ApiFunction + 'static) -> Endpoint {
        let parameters = handler.parameters();
        let description = self
            .description
            .or_else(|| handler.description().map(str::to_string));
        Endpoint {
            path: self.path,
            methods: self
                .methods
                .unwrap_or_else(|| BTreeSet::from([Method::Get])),
            handler: Arc::new(handler),
            parameters,
            security: self.security,
            description,
        }
    }
}
