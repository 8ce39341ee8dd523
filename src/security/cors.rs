//! CORS origin checks and response annotations.

use crate::error::ApiError;
use crate::http::{ApiResponse, Method};
use std::collections::BTreeSet;

/// Origins an endpoint accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Wildcard: any origin.
    Any,
    List(BTreeSet<String>),
}

impl AllowedOrigins {
    /// Build from a list; a `*` entry anywhere makes it a wildcard.
    pub fn from_list<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = origins.into_iter().map(Into::into).collect();
        if set.contains("*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(set)
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        match self {
            AllowedOrigins::Any => true,
            AllowedOrigins::List(set) => set.contains(origin),
        }
    }
}

/// CORS headers to attach to the eventual response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsHeaders {
    headers: Vec<(String, String)>,
}

impl CorsHeaders {
    pub fn none() -> Self {
        Self::default()
    }

    fn for_origin(origin: &str, methods: &BTreeSet<Method>) -> Self {
        let methods = methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            headers: vec![
                ("Access-Control-Allow-Origin".into(), origin.to_string()),
                ("Access-Control-Allow-Methods".into(), methods),
                (
                    "Access-Control-Allow-Headers".into(),
                    "Content-Type, X-API-Key".into(),
                ),
                ("Access-Control-Max-Age".into(), "86400".into()),
                ("Vary".into(), "Origin".into()),
            ],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn apply(self, response: ApiResponse) -> ApiResponse {
        response.headers(self.headers)
    }
}

/// Run the CORS step for one request.
///
/// Requests without an `Origin` header are not browser cross-origin calls
/// and pass without annotations. The allowed origin is echoed back, never `*`.
pub fn check_origin(
    allowed: Option<&AllowedOrigins>,
    origin: Option<&str>,
    methods: &BTreeSet<Method>,
) -> Result<CorsHeaders, ApiError> {
    let (allowed, origin) = match (allowed, origin) {
        (Some(allowed), Some(origin)) if !origin.is_empty() => (allowed, origin),
        _ => return Ok(CorsHeaders::none()),
    };

    if allowed.allows(origin) {
        Ok(CorsHeaders::for_origin(origin, methods))
    } else {
        Err(ApiError::ForbiddenOrigin {
            origin: origin.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn methods() -> BTreeSet<Method> {
        [Method::Get, Method::Post].into_iter().collect()
    }

    #[test]
    fn test_wildcard_from_list() {
        assert_eq!(AllowedOrigins::from_list(["https://a.com", "*"]), AllowedOrigins::Any);
        assert!(AllowedOrigins::Any.allows("https://anything.example"));
    }

    #[test]
    fn test_allowed_origin_is_echoed() {
        let allowed = AllowedOrigins::from_list(["https://a.com"]);
        let headers = check_origin(Some(&allowed), Some("https://a.com"), &methods()).unwrap();
        assert_eq!(headers.get("Access-Control-Allow-Origin"), Some("https://a.com"));
        assert_eq!(headers.get("Access-Control-Allow-Methods"), Some("GET, POST"));
        assert_eq!(headers.get("vary"), Some("Origin"));
    }

    #[test]
    fn test_forbidden_origin() {
        let allowed = AllowedOrigins::from_list(["https://a.com"]);
        let err = check_origin(Some(&allowed), Some("https://evil.com"), &methods()).unwrap_err();
        assert_eq!(
            err,
            ApiError::ForbiddenOrigin {
                origin: "https://evil.com".into()
            }
        );
    }

    #[test]
    fn test_no_origin_or_no_policy() {
        let allowed = AllowedOrigins::from_list(["https://a.com"]);
        assert!(check_origin(Some(&allowed), None, &methods()).unwrap().is_empty());
        assert!(check_origin(None, Some("https://evil.com"), &methods())
            .unwrap()
            .is_empty());
    }
}
