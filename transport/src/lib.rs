//! Transport-adapter contract (§4.6): how operations enter a
//! [`pel_pipeline::Pipeline`] from the outside world, and how a bound
//! response gets written back out. [`channel_source`] supplies the
//! minimal `{readable, writable}` halves any adapter is built from;
//! [`tcp`] is a reference HTTP/1.1-over-TCP adapter built on top of it;
//! [`health`] and [`ready`] implement the `/health`/`/ready` bypass that
//! every adapter wires in ahead of the pipeline.

pub mod channel_source;
pub mod health;
pub mod ready;
pub mod tcp;

pub use channel_source::{channel_source, ChannelSource, ChannelSourceHandle};
pub use health::{try_handle, HEALTH_PATH, READY_PATH};
pub use ready::ReadyFlag;
pub use tcp::{TcpAdapter, TcpError};
