//! Parameter specifications and bound argument lists.
//!
//! A [`ParameterSpec`] is derived once, when an endpoint is registered, and
//! drives the binder for every request afterwards.

use crate::error::ApiError;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Declared type of a handler parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Integer,
    Float,
    String,
    Boolean,
    List(Box<ParamType>),
    /// No declared type; the raw value is passed through.
    Any,
}

impl ParamType {
    /// Shorthand for `List(Box::new(inner))`.
    pub fn list(inner: ParamType) -> Self {
        ParamType::List(Box::new(inner))
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamType::Integer => f.write_str("integer"),
            ParamType::Float => f.write_str("float"),
            ParamType::String => f.write_str("string"),
            ParamType::Boolean => f.write_str("boolean"),
            ParamType::List(inner) => write!(f, "list<{inner}>"),
            ParamType::Any => f.write_str("any"),
        }
    }
}

impl Serialize for ParamType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, ty: ParamType, required: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            required,
            default: None,
        }
    }

    /// Value supplied when the parameter is optional and absent.
    pub fn fallback(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }
}

/// Ordered table of a handler's parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterSpec {
    params: Vec<ParamSpec>,
}

impl ParameterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter that must be present in every request.
    pub fn required(self, name: impl Into<String>, ty: ParamType) -> Self {
        self.param(ParamSpec::new(name, ty, true))
    }

    /// Append a parameter that binds to `null` when absent.
    pub fn optional(self, name: impl Into<String>, ty: ParamType) -> Self {
        self.param(ParamSpec::new(name, ty, false))
    }

    /// Append an optional parameter with a declared default.
    pub fn with_default(self, name: impl Into<String>, ty: ParamType, default: Value) -> Self {
        let mut spec = ParamSpec::new(name, ty, false);
        spec.default = Some(default);
        self.param(spec)
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParamSpec> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<'a> IntoIterator for &'a ParameterSpec {
    type Item = &'a ParamSpec;
    type IntoIter = std::slice::Iter<'a, ParamSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

/// Arguments bound for one call, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<(String, Value)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.values.push((name.into(), value));
    }

    /// Raw bound value for `name`.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Deserialize the bound value for `name` into the handler's concrete
    /// type. A value that passed coercion but does not fit `T` (an integer
    /// out of range for `u8`, say) is still a client error.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, ApiError> {
        let value = self
            .value(name)
            .ok_or_else(|| ApiError::MissingParameter {
                name: name.to_string(),
            })?;

        serde_json::from_value(value.clone()).map_err(|_| {
            ApiError::type_coercion(name, short_type_name::<T>(), value.to_string())
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Positional values in declaration order.
    pub fn into_values(self) -> Vec<Value> {
        self.values.into_iter().map(|(_, v)| v).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    // Keep generic arguments intact, only trim the leading module path.
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_type_display() {
        assert_eq!(ParamType::Integer.to_string(), "integer");
        assert_eq!(ParamType::list(ParamType::Float).to_string(), "list<float>");
        assert_eq!(
            ParamType::list(ParamType::list(ParamType::Boolean)).to_string(),
            "list<list<boolean>>"
        );
    }

    #[test]
    fn test_spec_serialization() {
        let spec = ParameterSpec::new()
            .required("a", ParamType::Integer)
            .with_default("name", ParamType::String, json!("World"));

        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!([
                { "name": "a", "type": "integer", "required": true },
                { "name": "name", "type": "string", "required": false, "default": "World" }
            ])
        );
    }

    #[test]
    fn test_args_get() {
        let mut args = Args::new();
        args.push("a", json!(300));
        args.push("tags", json!(["x", "y"]));
        args.push("maybe", Value::Null);

        assert_eq!(args.get::<i64>("a").unwrap(), 300);
        assert_eq!(args.get::<Vec<String>>("tags").unwrap(), vec!["x", "y"]);
        assert_eq!(args.get::<Option<i32>>("maybe").unwrap(), None);

        match args.get::<u8>("a") {
            Err(ApiError::TypeCoercion { parameter, expected, received }) => {
                assert_eq!(parameter, "a");
                assert_eq!(expected, "u8");
                assert_eq!(received, "300");
            }
            other => panic!("unexpected: {other:?}"),
        }

        assert_eq!(
            args.get::<i64>("missing"),
            Err(ApiError::MissingParameter { name: "missing".into() })
        );
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<u8>(), "u8");
        assert_eq!(short_type_name::<String>(), "String");
        assert!(short_type_name::<Vec<String>>().starts_with("Vec<"));
    }
}
