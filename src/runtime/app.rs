//! Application object owning the endpoint registry.

use crate::error::RegistrationError;
use crate::function::{ApiFunction, Endpoint, EndpointBuilder};
use crate::routing::Router;
use crate::runtime::{Dispatcher, Server, ServerConfig};
use serde_json::{json, Value};
use std::sync::Arc;

/// A set of endpoints plus the metadata shown on `/info`.
///
/// Each `App` owns its registry, so independent instances can coexist in
/// one process.
#[derive(Debug)]
pub struct App {
    title: String,
    version: String,
    router: Router,
}

impl App {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            router: Router::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Register a fully built endpoint.
    pub fn register(&mut self, endpoint: Endpoint) -> Result<&mut Self, RegistrationError> {
        self.router.register(endpoint)?;
        Ok(self)
    }

    /// Register `handler` with the options collected in `builder`.
    pub fn api(
        &mut self,
        builder: EndpointBuilder,
        handler: impl ApiFunction + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        self.register(builder.handler(handler))
    }

    /// Listing of every registered endpoint.
    pub fn info(&self) -> Value {
        json!({
            "title": self.title,
            "version": self.version,
            "endpoints": self
                .router
                .endpoints()
                .into_iter()
                .map(|endpoint| endpoint.info())
                .collect::<Vec<_>>(),
        })
    }

    /// Freeze the registry and build a dispatcher over it.
    pub fn into_dispatcher(self) -> Dispatcher {
        Dispatcher::new(Arc::new(self.router))
    }

    /// Freeze the registry and wrap it in an HTTP server.
    pub fn into_server(self, config: ServerConfig) -> Server {
        Server::new(self, config)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new("fnserve", env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::function::{Args, FnFunction, ParamType, ParameterSpec};
    use crate::http::Method;

    fn echo() -> FnFunction<impl Fn(Args) -> Result<Value, ApiError> + Send + Sync> {
        FnFunction::new(
            "echo",
            ParameterSpec::new().required("msg", ParamType::String),
            |args| args.get::<Value>("msg"),
        )
    }

    #[test]
    fn test_register_and_info() {
        let mut app = App::new("Demo API", "1.0.0");
        app.api(
            Endpoint::builder("/echo").methods([Method::Get, Method::Post]),
            echo(),
        )
        .unwrap()
        .api(Endpoint::builder("/secret").api_key("k").rate_limit(3), echo())
        .unwrap();

        let info = app.info();
        assert_eq!(info["title"], "Demo API");
        assert_eq!(info["version"], "1.0.0");
        assert_eq!(info["endpoints"].as_array().unwrap().len(), 2);
        assert_eq!(info["endpoints"][0]["path"], "/echo");
        assert_eq!(info["endpoints"][1]["secured"], true);
        assert_eq!(info["endpoints"][1]["rate_limit"], 3);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut app = App::default();
        app.api(Endpoint::builder("/echo"), echo()).unwrap();
        let err = app.api(Endpoint::builder("/echo"), echo()).unwrap_err();
        assert_eq!(err, RegistrationError::DuplicatePath("/echo".into()));
    }

    #[test]
    fn test_instances_are_independent() {
        let mut first = App::default();
        let second = App::default();
        first.api(Endpoint::builder("/echo"), echo()).unwrap();
        assert_eq!(first.router().len(), 1);
        assert!(second.router().is_empty());
    }
}
