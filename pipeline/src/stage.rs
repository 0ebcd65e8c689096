//! The fixed stage order and the tagged-variant dispatch that builds a
//! stage's executor from its configured concurrency mode, per the
//! "dynamic subtyping → tagged variants" redesign note.

use std::sync::Arc;

use async_trait::async_trait;
use pel_core::OperationContext;

use crate::concurrency_mode::ConcurrencyMode;

/// One pipeline stage: receives a context and either returns it (proceed
/// to the next stage) or returns `None` (drop/short-circuit — the
/// operation has already terminated or bound a response for the writer).
#[async_trait]
pub trait Transform: Send + Sync {
    async fn apply(&self, ctx: OperationContext) -> Option<OperationContext>;

    /// Used only for tracing spans and backpressure metric labels.
    fn name(&self) -> &'static str;
}

/// The fixed stage order from spec §4.4. `MiddlewareBefore`/`MiddlewareAfter`
/// each iterate a whole list of middlewares rather than being one
/// transform, but are still single named positions in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Dequeue,
    Routing,
    LoadShedding,
    Authentication,
    RateLimiting,
    Authorization,
    Caching,
    MiddlewareBefore,
    Handler,
    MiddlewareAfter,
    Complete,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Dequeue => "dequeue",
            StageKind::Routing => "routing",
            StageKind::LoadShedding => "load_shedding",
            StageKind::Authentication => "authentication",
            StageKind::RateLimiting => "rate_limiting",
            StageKind::Authorization => "authorization",
            StageKind::Caching => "caching",
            StageKind::MiddlewareBefore => "middleware.before_request",
            StageKind::Handler => "handler",
            StageKind::MiddlewareAfter => "middleware.after_response",
            StageKind::Complete => "complete",
        }
    }
}

/// A stage bound to its concurrency mode: the executable form of a
/// [`StageKind`], per the glossary's "Transform" entry.
pub struct Stage {
    pub kind: StageKind,
    pub transform: Arc<dyn Transform>,
    pub mode: ConcurrencyMode,
}

impl Stage {
    pub fn new(kind: StageKind, transform: Arc<dyn Transform>, mode: ConcurrencyMode) -> Self {
        Stage { kind, transform, mode }
    }
}
