use uuid::Uuid;

use super::body::HttpBody;
use super::headers::Headers;
use super::method::Method;
use super::path::{parse_query, split_path_and_query, split_segments};

/// The HTTP protocol version a request arrived on. The pipeline doesn't
/// otherwise distinguish behavior by version; transport adapters use this
/// for logging and for `Connection`-header decisions of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http11,
    Http2,
}

/// The original query string plus its parsed, order-preserving pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub original: String,
    pub pairs: Vec<(String, String)>,
}

impl Query {
    pub fn parse(original: &str) -> Self {
        Query {
            original: original.to_string(),
            pairs: parse_query(original),
        }
    }

    /// The first value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// All values bound to `name`, in arrival order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// The original path string plus its decoded segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub original: String,
    pub segments: Vec<String>,
}

impl Path {
    pub fn parse(original: &str) -> Self {
        Path {
            original: original.to_string(),
            segments: split_segments(original),
        }
    }
}

/// An inbound request, immutable once the transport has finished decoding
/// it. The body, if present, is still a lazy stream at this point.
pub struct HttpRequest {
    pub id: Uuid,
    pub method: Method,
    pub path: Path,
    pub query: Option<Query>,
    pub headers: Headers,
    pub version: HttpVersion,
    pub body: Option<HttpBody>,
}

impl HttpRequest {
    /// Build a request from a raw request-target (`/a/b?x=1`), splitting
    /// it into path and query per the external wire contract.
    pub fn new(
        id: Uuid,
        method: Method,
        target: &str,
        headers: Headers,
        version: HttpVersion,
        body: Option<HttpBody>,
    ) -> Self {
        let (path, query) = split_path_and_query(target);
        HttpRequest {
            id,
            method,
            path: Path::parse(path),
            query: query.map(Query::parse),
            headers,
            version,
            body,
        }
    }
}
