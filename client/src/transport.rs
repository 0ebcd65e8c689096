//! The interface [`crate::submit`] sends through: everything wire-level
//! (connection pooling, TLS, HTTP/1.1 vs HTTP/2 framing) is someone else's
//! concern, per §1's "consumed only via interfaces" rule. A production
//! deployment implements this over whatever HTTP client it already uses;
//! tests implement it over an in-process stub.

use async_trait::async_trait;
use pel_core::errors::Error;
use pel_core::http::{HttpRequest, HttpResponse};

#[async_trait]
pub trait RawTransport: Send + Sync {
    /// Send `request` and return the response it drew, or an already-typed
    /// [`Error`] if the send itself failed (connection refused, reset,
    /// malformed response, ...). Does not need to implement its own
    /// timeout — [`crate::submit`] races this future against one.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error>;
}
