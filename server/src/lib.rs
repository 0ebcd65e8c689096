//! Binary-wiring library for the `pel-server` executable (§4.10):
//! configuration loading, telemetry init, and the [`Application`] that
//! assembles a [`pel_router::Router`] into a running pipeline served over
//! [`pel_transport::TcpAdapter`]. Exposed as a library (not just inlined
//! into `main.rs`) so deployments can embed `Application` with their own
//! router and shutdown signal rather than using the stock binary.

pub mod application;
pub mod config;
pub mod telemetry;

pub use application::Application;
pub use config::{Args, Config};
