//! Pipeline-level configuration (§6): the knobs a deployment sets when
//! assembling a [`crate::pipeline::Pipeline`], independent of any one
//! transport's wire settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `{autoDestroy, transforms, middleware}` from §6. `transforms`/`middleware`
/// are named lists at the config-file layer (resolved to actual transform
/// instances by the binary wiring them up, since a transform is a trait
/// object — a plain `Vec<String>` names which collaborators to attach, the
/// way the rest of this crate's optional stages are opt-in) while the
/// [`crate::pipeline::PipelineBuilder`] used by Rust callers takes the
/// resolved instances directly.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Destroy (drop) an operation's resources as soon as it finishes,
    /// rather than keeping it referenced until the transport has drained
    /// the response body. Kept for config-surface parity with §6; the
    /// pipeline here always holds only a transient `Arc` and drops it
    /// naturally, so this is a no-op flag preserved for shape.
    pub auto_destroy: bool,
    pub transforms: Vec<String>,
    pub middleware: Vec<String>,
}

/// Per-source `{maxConcurrency, highWaterMark}` from §6.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Maximum operations concurrently in flight from this source. `None`
    /// is unbounded (Parallel source ingestion).
    pub max_concurrency: Option<usize>,
    /// Buffer depth before the source itself starts applying backpressure
    /// to its upstream (e.g. the transport's accept loop).
    pub high_water_mark: Option<usize>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig { max_concurrency: None, high_water_mark: Some(1024) }
    }
}

/// How LOAD_SHEDDING orders contenders for the same slot (§6's
/// `priority: ordering`). `Fifo` disables priority entirely (every
/// operation is priority `0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityOrdering {
    #[default]
    Fifo,
    Descending,
}

/// `{maxOutstandingRequests, priority}` from §6.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadShedderConfig {
    pub max_outstanding_requests: usize,
    pub priority: PriorityOrdering,
    /// How long a request may wait at the LOAD_SHEDDING gate for a slot,
    /// queued against other contenders by priority, before being shed with
    /// SERVICE_UNAVAILABLE. An instantaneous (zero) wait degenerates to
    /// "whoever asks first while a slot is free", since a lone arrival has
    /// no other priority to be ordered against.
    #[serde(with = "humantime_serde")]
    pub admission_wait: Duration,
}

impl Default for LoadShedderConfig {
    fn default() -> Self {
        LoadShedderConfig {
            max_outstanding_requests: usize::MAX,
            priority: PriorityOrdering::default(),
            admission_wait: Duration::from_millis(10),
        }
    }
}
