//! Handler trait for functions exposed as endpoints.

use crate::error::ApiError;
use crate::function::params::{Args, ParameterSpec};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// A function that can be called over HTTP.
///
/// Implementations are usually generated by `#[api_function]`, which derives
/// [`ApiFunction::parameters`] from the Rust signature. Hand-written
/// implementations are fine too.
#[async_trait]
pub trait ApiFunction: Send + Sync {
    /// Get the function name.
    fn name(&self) -> &str;

    /// Short human-readable summary shown in the endpoint listing.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Declared parameters, in call order. Read once, at registration.
    fn parameters(&self) -> ParameterSpec;

    /// Invoke the function with bound arguments.
    ///
    /// Application-level failures should be reported as
    /// [`ApiError::Handler`], which is answered with a 500.
    async fn call(&self, args: Args) -> Result<Value, ApiError>;
}

/// Serialize a handler's return value into the response `data` field.
pub fn to_data<T: Serialize>(value: T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!("Failed to serialize handler output: {}", e);
        ApiError::Internal
    })
}

/// Adapter turning a synchronous closure plus an explicit parameter table
/// into an [`ApiFunction`].
pub struct FnFunction<F> {
    name: String,
    parameters: ParameterSpec,
    func: F,
}

impl<F> FnFunction<F>
where
    F: Fn(Args) -> Result<Value, ApiError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, parameters: ParameterSpec, func: F) -> Self {
        Self {
            name: name.into(),
            parameters,
            func,
        }
    }
}

#[async_trait]
impl<F> ApiFunction for FnFunction<F>
where
    F: Fn(Args) -> Result<Value, ApiError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> ParameterSpec {
        self.parameters.clone()
    }

    async fn call(&self, args: Args) -> Result<Value, ApiError> {
        (self.func)(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::params::ParamType;
    use serde_json::json;

    #[test]
    fn test_fn_function_call() {
        let double = FnFunction::new(
            "double",
            ParameterSpec::new().required("x", ParamType::Integer),
            |args: Args| to_data(args.get::<i64>("x")? * 2),
        );

        assert_eq!(double.name(), "double");
        assert_eq!(double.parameters().len(), 1);

        let mut args = Args::new();
        args.push("x", json!(21));
        let out = tokio_test::block_on(double.call(args)).unwrap();
        assert_eq!(out, json!(42));
    }

    #[test]
    fn test_to_data() {
        #[derive(Serialize)]
        struct Point {
            x: i32,
            y: i32,
        }

        assert_eq!(to_data(Point { x: 1, y: 2 }).unwrap(), json!({ "x": 1, "y": 2 }));
        assert_eq!(to_data("pong").unwrap(), json!("pong"));
        assert_eq!(to_data(()).unwrap(), Value::Null);
    }
}
