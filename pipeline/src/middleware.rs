//! MIDDLEWARE.beforeRequest / MIDDLEWARE.afterResponse (§4.4): an ordered
//! list of middlewares, each optionally short-circuiting the request
//! (before) or mutating the bound response in place (after).

use std::sync::Arc;

use async_trait::async_trait;
use pel_core::http::HttpResponse;
use pel_core::OperationContext;

/// A single middleware. Default method bodies make each hook optional, the
/// way `tower::Layer`/axum middleware commonly leave one side a no-op.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Runs before the handler, in declared order. Returning `Some(response)`
    /// binds it into the context and skips later middlewares and the
    /// handler — `afterResponse` still runs over the short-circuited
    /// response, per the stage contract.
    async fn before_request(&self, _ctx: &OperationContext) -> Option<HttpResponse> {
        None
    }

    /// Runs after the handler (or after an `before_request` short-circuit),
    /// in declared order, with the chance to replace the bound response.
    async fn after_response(&self, ctx: &OperationContext, response: HttpResponse) -> HttpResponse {
        let _ = ctx;
        response
    }

    fn name(&self) -> &'static str {
        "middleware"
    }
}

pub type MiddlewareList = Vec<Arc<dyn Middleware>>;
