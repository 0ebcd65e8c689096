//! Error taxonomy shared by the operation state machine, the pipeline, and
//! the transport adapter. Kinds are closed (no "catch-all with a string" as
//! the only variant): every non-`Unknown` path names why the operation
//! terminated, so the transport can pick a wire status without inspecting
//! text.

use crate::http::StatusCode;

/// Opaque upstream cause, kept as a formatted string. The pipeline doesn't
/// need to downcast causes, only log and translate them.
#[derive(Debug, Clone)]
pub struct Cause(pub String);

impl<E: std::fmt::Display> From<E> for Cause {
    fn from(e: E) -> Self {
        Cause(e.to_string())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The operation's abort signal was tripped: explicit client
    /// disconnect, explicit `fail(ABORTED)`, or an upstream cancellation.
    #[error("operation aborted{}", describe(.description))]
    Aborted { description: Option<String> },

    /// The operation's request timeout elapsed before completion.
    #[error("operation timed out{}", describe(.description))]
    Timeout { description: Option<String> },

    /// The underlying source or connection closed before the operation
    /// could finish (distinct from a client-initiated abort).
    #[error("operation's source closed{}", describe(.description))]
    Closed { description: Option<String> },

    /// Any other failure: an unhandled panic caught at a stage boundary,
    /// a handler error not otherwise classified, etc.
    #[error("unknown error{}", describe(.description))]
    Unknown { description: Option<String> },
}

fn describe(description: &Option<String>) -> String {
    match description {
        Some(d) => format!(": {d}"),
        None => String::new(),
    }
}

impl Error {
    pub fn aborted(description: impl Into<String>) -> Self {
        Error::Aborted { description: Some(description.into()) }
    }

    pub fn timeout() -> Self {
        Error::Timeout { description: None }
    }

    pub fn unknown(description: impl Into<String>) -> Self {
        Error::Unknown { description: Some(description.into()) }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Error::Aborted { description }
            | Error::Timeout { description }
            | Error::Closed { description }
            | Error::Unknown { description } => description.as_deref(),
        }
    }

    /// The wire status a transport should send if this failure occurred
    /// before response headers were written. Per the propagation policy:
    /// ABORTED has no good status of its own (the connection is usually
    /// already gone) but falls back to 500 when headers are still unsent.
    pub fn to_wire_status(&self) -> StatusCode {
        match self {
            Error::Aborted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Closed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Unknown { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Translate an arbitrary stage/handler failure into the closed taxonomy.
/// Already-typed [`Error`]s pass through unchanged; everything else
/// becomes `Unknown` with its message preserved, except cancellation,
/// which is recognized and mapped to `Aborted`.
pub fn translate_http_error(err: anyhow::Error) -> Error {
    match err.downcast::<Error>() {
        Ok(typed) => typed,
        Err(err) => {
            if err.is::<tokio::sync::AcquireError>() || is_cancellation(&err) {
                Error::aborted(err.to_string())
            } else {
                Error::unknown(err.to_string())
            }
        }
    }
}

fn is_cancellation(err: &anyhow::Error) -> bool {
    err.to_string().to_ascii_lowercase().contains("cancel")
}
