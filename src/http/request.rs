//! Incoming request representation handed to the dispatcher.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// HTTP method enumeration.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    /// Whether parameters for this method are read from a JSON body as well
    /// as from the query string.
    pub fn carries_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a method name is not one of the supported verbs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedMethod(pub String);

impl std::fmt::Display for UnsupportedMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsupported HTTP method: {}", self.0)
    }
}

impl std::error::Error for UnsupportedMethod {}

impl FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(UnsupportedMethod(s.to_string())),
        }
    }
}

impl TryFrom<&hyper::Method> for Method {
    type Error = UnsupportedMethod;

    fn try_from(method: &hyper::Method) -> Result<Self, Self::Error> {
        match *method {
            hyper::Method::GET => Ok(Method::Get),
            hyper::Method::POST => Ok(Method::Post),
            hyper::Method::PUT => Ok(Method::Put),
            hyper::Method::DELETE => Ok(Method::Delete),
            hyper::Method::PATCH => Ok(Method::Patch),
            hyper::Method::HEAD => Ok(Method::Head),
            hyper::Method::OPTIONS => Ok(Method::Options),
            _ => Err(UnsupportedMethod(method.to_string())),
        }
    }
}

/// Decoded query string, keeping every occurrence of a key in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Decode an `application/x-www-form-urlencoded` query string.
    pub fn parse(query: &str) -> Self {
        let pairs = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// First value for `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `name`, in the order they appeared.
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == name)
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// A buffered HTTP request as seen by the dispatch pipeline.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Request path without the query string.
    pub path: String,
    /// Decoded query parameters.
    pub query: QueryParams,
    /// HTTP headers, keyed by lowercase name.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<Bytes>,
    /// Address of the calling client.
    pub client_ip: IpAddr,
}

impl ApiRequest {
    /// Create a request for `target`, which may carry a `?query` suffix.
    pub fn new(method: Method, target: impl AsRef<str>) -> Self {
        let target = target.as_ref();
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, QueryParams::parse(query)),
            None => (target, QueryParams::default()),
        };

        Self {
            method,
            path: path.to_string(),
            query,
            headers: HashMap::new(),
            body: None,
            client_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }

    /// Add a header to the request.
    pub fn header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body along with its content type.
    pub fn json(self, value: &serde_json::Value) -> Self {
        self.header("Content-Type", "application/json")
            .body(value.to_string())
    }

    /// Set the client address.
    pub fn client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = ip;
        self
    }

    /// Get a header value; the lookup is case-insensitive.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether the declared content type, if any, is JSON.
    pub fn is_json(&self) -> bool {
        self.get_header("content-type")
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(true)
    }
}

impl Default for ApiRequest {
    fn default() -> Self {
        Self::new(Method::Get, "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!("get".parse::<Method>(), Ok(Method::Get));
        assert_eq!("PATCH".parse::<Method>(), Ok(Method::Patch));
        assert!("TRACE".parse::<Method>().is_err());
    }

    #[test]
    fn test_method_carries_body() {
        assert!(Method::Post.carries_body());
        assert!(Method::Put.carries_body());
        assert!(Method::Patch.carries_body());
        assert!(!Method::Get.carries_body());
        assert!(!Method::Delete.carries_body());
    }

    #[test]
    fn test_request_splits_query() {
        let request = ApiRequest::new(Method::Get, "/add?a=2&b=3&tag=x&tag=y%20z");
        assert_eq!(request.path, "/add");
        assert_eq!(request.query.first("a"), Some("2"));
        assert_eq!(request.query.first("b"), Some("3"));
        assert_eq!(request.query.all("tag").collect::<Vec<_>>(), vec!["x", "y z"]);
        assert!(!request.query.contains("c"));
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let request = ApiRequest::new(Method::Get, "/").header("X-API-Key", "k");
        assert_eq!(request.get_header("x-api-key"), Some("k"));
        assert_eq!(request.get_header("X-Api-Key"), Some("k"));
    }

    #[test]
    fn test_is_json() {
        let plain = ApiRequest::new(Method::Post, "/");
        assert!(plain.is_json());

        let json = plain.clone().header("Content-Type", "application/json; charset=utf-8");
        assert!(json.is_json());

        let form = plain.header("Content-Type", "application/x-www-form-urlencoded");
        assert!(!form.is_json());
    }
}
