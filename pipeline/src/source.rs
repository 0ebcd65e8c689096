//! `OperationSource` (§4.4's "input source"): a transport adapter hands
//! the pipeline a stream of operations to drive through the stage chain.
//! Pulling rather than pushing keeps backpressure explicit — a source
//! that has nothing new simply doesn't return from `recv` until it does,
//! and a source that's done returns `None` once and stays done.

use std::sync::Arc;

use async_trait::async_trait;
use pel_core::Operation;

/// One adapter's operation stream. Implemented by transport crates (an
/// HTTP listener's accept loop, a queue consumer, ...); consumed by
/// [`crate::pipeline::Pipeline::add_source`].
#[async_trait]
pub trait OperationSource: Send {
    /// Identifies this source in traces and the task name used for its
    /// driving loop.
    fn name(&self) -> &str;

    /// Yield the next operation to run through the pipeline, or `None`
    /// once this source is exhausted (§4.4's "when the source emits
    /// `finished` the triple is torn down").
    async fn recv(&mut self) -> Option<Arc<Operation>>;
}
