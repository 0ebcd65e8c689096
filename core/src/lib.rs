//! Core data model, concurrency primitives, and the per-request state
//! machine shared by the router, pipeline, transport, and client crates.

pub mod concurrency;
pub mod context;
pub mod errors;
pub mod handler;
pub mod http;
pub mod operation;
pub mod params;

pub use context::OperationContext;
pub use errors::{translate_http_error, Cause, Error};
pub use handler::Handler;
pub use operation::{Operation, OperationEvent, OperationState};
pub use params::{parse_param_value, ParamValue, RouteParams};
