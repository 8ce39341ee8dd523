//! Type coercion from raw request values into declared parameter types.
//!
//! The set of target types is closed (see [`ParamType`]) and each has one
//! explicit rule. Coercion never truncates or falls back to a default: any
//! value that does not fit is reported as [`ApiError::TypeCoercion`].

use crate::error::ApiError;
use crate::function::params::ParamType;
use serde_json::{Number, Value};

/// A value as it arrived on the wire.
#[derive(Debug, Clone, Copy)]
pub enum RawValue<'a> {
    /// A query-string value.
    Text(&'a str),
    /// A field of a decoded JSON body.
    Json(&'a Value),
}

impl RawValue<'_> {
    fn describe(&self) -> String {
        match self {
            RawValue::Text(s) => Value::String((*s).to_string()).to_string(),
            RawValue::Json(v) => v.to_string(),
        }
    }
}

/// Convert `raw` into a JSON value of type `target`.
pub fn coerce(parameter: &str, raw: RawValue<'_>, target: &ParamType) -> Result<Value, ApiError> {
    let fail = || ApiError::type_coercion(parameter, target.to_string(), raw.describe());

    match (target, raw) {
        (ParamType::Any, RawValue::Text(s)) => Ok(Value::String(s.to_string())),
        (ParamType::Any, RawValue::Json(v)) => Ok(v.clone()),

        (ParamType::Integer, RawValue::Text(s)) => parse_integer(s).ok_or_else(fail),
        (ParamType::Integer, RawValue::Json(Value::Number(n))) => {
            if n.is_i64() || n.is_u64() {
                Ok(Value::Number(n.clone()))
            } else {
                Err(fail())
            }
        }
        (ParamType::Integer, RawValue::Json(Value::String(s))) => {
            parse_integer(s).ok_or_else(fail)
        }

        (ParamType::Float, RawValue::Text(s)) => parse_float(s).ok_or_else(fail),
        (ParamType::Float, RawValue::Json(Value::Number(n))) => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(fail),
        (ParamType::Float, RawValue::Json(Value::String(s))) => parse_float(s).ok_or_else(fail),

        (ParamType::String, RawValue::Text(s)) => Ok(Value::String(s.to_string())),
        (ParamType::String, RawValue::Json(Value::String(s))) => Ok(Value::String(s.clone())),
        (ParamType::String, RawValue::Json(v)) if v.is_number() || v.is_boolean() => {
            Ok(Value::String(v.to_string()))
        }

        (ParamType::Boolean, RawValue::Text(s)) => parse_bool(s).ok_or_else(fail),
        (ParamType::Boolean, RawValue::Json(Value::Bool(b))) => Ok(Value::Bool(*b)),
        (ParamType::Boolean, RawValue::Json(Value::String(s))) => parse_bool(s).ok_or_else(fail),

        (ParamType::List(inner), RawValue::Text(s)) => {
            if s.is_empty() {
                return Ok(Value::Array(Vec::new()));
            }
            s.split(',')
                .map(|piece| coerce(parameter, RawValue::Text(piece), inner))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        (ParamType::List(inner), RawValue::Json(Value::Array(items))) => items
            .iter()
            .map(|item| coerce(parameter, RawValue::Json(item), inner))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (ParamType::List(inner), RawValue::Json(Value::String(s))) => {
            coerce(parameter, RawValue::Text(s), &ParamType::List(inner.clone()))
        }

        _ => Err(fail()),
    }
}

/// Same range as JSON integers: anything that fits `i64` or `u64`.
fn parse_integer(s: &str) -> Option<Value> {
    match s.parse::<i64>() {
        Ok(n) => Some(Value::from(n)),
        Err(_) => s.parse::<u64>().ok().map(Value::from),
    }
}

fn parse_float(s: &str) -> Option<Value> {
    let f = s.parse::<f64>().ok()?;
    Number::from_f64(f).map(Value::Number)
}

fn parse_bool(s: &str) -> Option<Value> {
    if s.eq_ignore_ascii_case("true") || s == "1" {
        Some(Value::Bool(true))
    } else if s.eq_ignore_ascii_case("false") || s == "0" {
        Some(Value::Bool(false))
    } else {
        None
    }
}
