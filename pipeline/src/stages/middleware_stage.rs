//! MIDDLEWARE.beforeRequest and MIDDLEWARE.afterResponse (§4.4): the two
//! named positions in the fixed stage order that each iterate the
//! configured [`crate::middleware::MiddlewareList`] in declared order.

use std::sync::Arc;

use async_trait::async_trait;
use pel_core::OperationContext;

use crate::middleware::MiddlewareList;
use crate::stage::Transform;

pub struct BeforeRequestTransform {
    middlewares: MiddlewareList,
}

impl BeforeRequestTransform {
    pub fn new(middlewares: MiddlewareList) -> Self {
        BeforeRequestTransform { middlewares }
    }
}

#[async_trait]
impl Transform for BeforeRequestTransform {
    async fn apply(&self, mut ctx: OperationContext) -> Option<OperationContext> {
        for middleware in &self.middlewares {
            if let Some(response) = middleware.before_request(&ctx).await {
                tracing::debug!(middleware = middleware.name(), "beforeRequest short-circuited");
                ctx = ctx.with_response(Arc::new(response));
                break;
            }
        }
        Some(ctx)
    }

    fn name(&self) -> &'static str {
        "middleware.before_request"
    }
}

pub struct AfterResponseTransform {
    middlewares: MiddlewareList,
}

impl AfterResponseTransform {
    pub fn new(middlewares: MiddlewareList) -> Self {
        AfterResponseTransform { middlewares }
    }
}

#[async_trait]
impl Transform for AfterResponseTransform {
    async fn apply(&self, ctx: OperationContext) -> Option<OperationContext> {
        let (ctx, bound) = ctx.take_response();
        let Some(response) = bound else {
            return Some(ctx);
        };
        // `ctx` no longer holds a reference, so if no other stage kept one
        // around this `Arc` is uniquely ours and unwraps for free — no
        // clone of the (non-`Clone`) body stream required.
        let mut response = Arc::try_unwrap(response)
            .unwrap_or_else(|_| panic!("response Arc unexpectedly shared entering MIDDLEWARE.afterResponse"));
        for middleware in &self.middlewares {
            response = middleware.after_response(&ctx, response).await;
        }
        Some(ctx.with_response(Arc::new(response)))
    }

    fn name(&self) -> &'static str {
        "middleware.after_response"
    }
}
