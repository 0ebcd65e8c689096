//! Staged transform composition over operations (§4.4): a fixed chain of
//! named stages, each with its own concurrency mode, carrying an
//! [`pel_core::OperationContext`] from an [`OperationSource`] through to a
//! terminal writer. Built on [`pel_core`] (the operation state machine
//! and HTTP data model) and [`pel_router`] (route resolution).

pub mod concurrency_mode;
pub mod config;
pub mod load_shedding;
pub mod middleware;
pub mod pause;
pub mod pipeline;
pub mod source;
pub mod stage;
pub mod stages;

pub use concurrency_mode::{ConcurrencyMode, ConcurrencyPermit};
pub use config::{LoadShedderConfig, PipelineConfig, PriorityOrdering, SourceConfig};
pub use load_shedding::{LoadSheddingTransform, PrioritySemaphore};
pub use middleware::{Middleware, MiddlewareList};
pub use pause::PauseGate;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use source::OperationSource;
pub use stage::{Stage, StageKind, Transform};
