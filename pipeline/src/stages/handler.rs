//! HANDLER (§4.4): invokes the routed (or default) handler under the
//! operation's scoped context, binds the returned response into the
//! context (not yet into the operation — MIDDLEWARE.afterResponse may
//! still rewrite it before the COMPLETE writer finalizes), and drains any
//! unread request body so the transport can release its connection.

use std::sync::Arc;

use async_trait::async_trait;
use pel_core::{Handler, OperationContext};

use crate::stage::Transform;

pub struct HandlerTransform {
    /// Used only when routing left no handler bound (e.g. a source with no
    /// router attached at all); routing's own 404 path covers "no match in
    /// an attached router".
    default_handler: Option<Handler>,
}

impl HandlerTransform {
    pub fn new(default_handler: Option<Handler>) -> Self {
        HandlerTransform { default_handler }
    }
}

#[async_trait]
impl Transform for HandlerTransform {
    async fn apply(&self, ctx: OperationContext) -> Option<OperationContext> {
        // A beforeRequest middleware already bound a response: skip
        // invoking the handler entirely, per the short-circuit contract.
        if ctx.response().is_some() {
            return Some(ctx);
        }

        let handler = match ctx.handler().cloned().or_else(|| self.default_handler.clone()) {
            Some(handler) => handler,
            None => {
                tracing::error!("HANDLER stage reached with no resolved handler");
                ctx.operation().fail(Some(pel_core::Error::unknown("no handler resolved")));
                return None;
            }
        };

        let op = ctx.operation().clone();
        let result = ctx.clone().scope(handler(op.clone())).await;

        if let Some(body) = op.request().body.as_ref() {
            body.drain().await;
            // Usually a no-op: `dequeue`'s own hook (core/src/operation.rs)
            // already advanced READING -> PROCESSING the instant `drain`
            // finished. Called here too so the transition doesn't depend
            // on that hook's spawned task winning a race against this
            // stage reaching COMPLETE.
            op.mark_body_drained();
        }

        match result {
            Ok(response) => Some(ctx.with_response(Arc::new(response))),
            Err(err) => {
                tracing::warn!(error = %err, "handler failed");
                op.fail(Some(err));
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "handler"
    }
}
