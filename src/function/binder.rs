//! Binds request values to a handler's declared parameters.
//!
//! Source precedence:
//! - `GET`, `DELETE`, `HEAD`, `OPTIONS`: query string only.
//! - `POST`, `PUT`, `PATCH`: JSON body merged with the query string. When a
//!   key appears in both, the query string wins.
//!
//! Keys that no parameter declares are ignored.

use crate::error::ApiError;
use crate::function::coerce::{coerce, RawValue};
use crate::function::params::{Args, ParamSpec, ParamType, ParameterSpec};
use crate::http::{ApiRequest, Method, QueryParams};
use serde_json::{Map, Value};

/// Decoded JSON object body.
pub type JsonBody = Map<String, Value>;

/// Decode the request body for methods that carry one.
///
/// Returns `None` when the method ignores bodies, the body is empty, or the
/// declared content type is not JSON.
pub fn decode_body(request: &ApiRequest) -> Result<Option<JsonBody>, ApiError> {
    if !request.method.carries_body() || !request.is_json() {
        return Ok(None);
    }

    let bytes = match &request.body {
        Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => bytes,
        _ => return Ok(None),
    };

    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(ApiError::InvalidBody("expected a JSON object".to_string())),
        Err(e) => Err(ApiError::InvalidBody(e.to_string())),
    }
}

/// Build the argument list for `spec` from the request sources.
pub fn bind(
    spec: &ParameterSpec,
    method: &Method,
    query: &QueryParams,
    body: Option<&JsonBody>,
) -> Result<Args, ApiError> {
    let body = body.filter(|_| method.carries_body());
    let mut args = Args::new();

    for param in spec {
        let value = match from_query(param, query)? {
            Some(value) => value,
            None => match body.and_then(|b| b.get(&param.name)) {
                Some(raw) => coerce(&param.name, RawValue::Json(raw), &param.ty)?,
                None if param.required => {
                    return Err(ApiError::MissingParameter {
                        name: param.name.clone(),
                    })
                }
                None => param.fallback(),
            },
        };
        args.push(param.name.clone(), value);
    }

    Ok(args)
}

/// Lists gather every occurrence of the key; scalars take the first.
fn from_query(param: &ParamSpec, query: &QueryParams) -> Result<Option<Value>, ApiError> {
    if !query.contains(&param.name) {
        return Ok(None);
    }

    match &param.ty {
        ParamType::List(_) => {
            let mut items = Vec::new();
            for raw in query.all(&param.name) {
                if let Value::Array(chunk) = coerce(&param.name, RawValue::Text(raw), &param.ty)? {
                    items.extend(chunk);
                }
            }
            Ok(Some(Value::Array(items)))
        }
        ty => query
            .first(&param.name)
            .map(|raw| coerce(&param.name, RawValue::Text(raw), ty))
            .transpose(),
    }
}
