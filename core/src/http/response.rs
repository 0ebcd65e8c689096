use super::body::HttpBody;
use super::headers::Headers;

/// Numeric status plus an optional human-readable reason phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const ACCEPTED: StatusCode = StatusCode(202);
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
    pub const SERVICE_UNAVAILABLE: StatusCode = StatusCode(503);
    pub const BAD_GATEWAY: StatusCode = StatusCode(502);

    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

pub struct HttpResponse {
    pub status: StatusCode,
    pub message: Option<String>,
    pub headers: Headers,
    pub body: Option<HttpBody>,
}

impl HttpResponse {
    pub fn new(status: StatusCode) -> Self {
        HttpResponse {
            status,
            message: None,
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: HttpBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::media_type::MediaType;

    #[test]
    fn builder_sets_body_and_headers() {
        let resp = HttpResponse::new(StatusCode::OK)
            .with_header("x-request-id", "abc")
            .with_body(HttpBody::from_bytes(MediaType::json(), "{}"));
        assert_eq!(resp.status.as_u16(), 200);
        assert_eq!(resp.headers.get_first("x-request-id"), Some("abc"));
        assert!(resp.body.is_some());
    }
}
