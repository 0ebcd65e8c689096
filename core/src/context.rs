//! Per-operation context, carried explicitly through the pipeline's stage
//! chain and additionally exposed to handler/middleware code that is
//! suspended deep inside an async call tree via a task-local scope.
//!
//! The context itself is cheap to clone (an `Arc<Operation>` plus small
//! `Option`s and an `Arc`-wrapped value map); "enriching" it means
//! producing a new value with one more entry, never mutating in place, so
//! two stages can never observe each other's half-applied writes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::Handler;
use crate::operation::Operation;
use crate::params::RouteParams;

#[derive(Clone)]
pub struct OperationContext {
    operation: Arc<Operation>,
    response: Option<Arc<crate::http::HttpResponse>>,
    handler: Option<Handler>,
    priority: Option<i32>,
    params: RouteParams,
    values: Arc<HashMap<String, serde_json::Value>>,
}

impl OperationContext {
    pub fn new(operation: Arc<Operation>) -> Self {
        OperationContext {
            operation,
            response: None,
            handler: None,
            priority: None,
            params: RouteParams::new(),
            values: Arc::new(HashMap::new()),
        }
    }

    pub fn operation(&self) -> &Arc<Operation> {
        &self.operation
    }

    pub fn response(&self) -> Option<&Arc<crate::http::HttpResponse>> {
        self.response.as_ref()
    }

    pub fn with_response(&self, response: Arc<crate::http::HttpResponse>) -> Self {
        let mut next = self.clone();
        next.response = Some(response);
        next
    }

    /// Consume `self`, handing back the bound response (if any) alongside
    /// an otherwise-identical context with no response bound. Unlike
    /// [`Self::with_response`], this takes `self` by value rather than
    /// cloning, so a caller holding the sole reference to the response
    /// `Arc` (the common case — one context flows through one stage at a
    /// time) gets a uniquely-owned value back out of `Arc::try_unwrap`
    /// instead of being forced to clone the body stream it wraps.
    pub fn take_response(mut self) -> (Self, Option<Arc<crate::http::HttpResponse>>) {
        let response = self.response.take();
        (self, response)
    }

    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn with_handler(&self, handler: Handler) -> Self {
        let mut next = self.clone();
        next.handler = Some(handler);
        next
    }

    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    pub fn with_priority(&self, priority: i32) -> Self {
        let mut next = self.clone();
        next.priority = Some(priority);
        next
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    pub fn with_params(&self, params: RouteParams) -> Self {
        let mut next = self.clone();
        next.params = params;
        next
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Return a new context with `key` bound to `value`, leaving `self`
    /// untouched.
    pub fn with_value(&self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut values = (*self.values).clone();
        values.insert(key.into(), value);
        let mut next = self.clone();
        next.values = Arc::new(values);
        next
    }
}

tokio::task_local! {
    static CURRENT: OperationContext;
}

impl OperationContext {
    /// Run `fut` with `self` as the ambient context, reachable via
    /// [`OperationContext::current`] from anywhere inside it, including
    /// across `.await` points. Scoping is per-task and torn down when
    /// `fut` completes, so one operation never leaks its context into
    /// another's.
    pub async fn scope<F, T>(self, fut: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        CURRENT.scope(self, fut).await
    }

    pub fn try_current() -> Option<OperationContext> {
        CURRENT.try_with(|ctx| ctx.clone()).ok()
    }

    /// Panics if called outside a [`OperationContext::scope`] call; only
    /// safe to use from code the pipeline guarantees runs within one
    /// (handlers, middleware).
    pub fn current() -> OperationContext {
        Self::try_current().expect("OperationContext::current() called outside an operation scope")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Headers, HttpRequest, HttpVersion, Method};
    use uuid::Uuid;

    fn test_operation() -> Arc<Operation> {
        Operation::new(HttpRequest::new(
            Uuid::new_v4(),
            Method::Get,
            "/x",
            Headers::new(),
            HttpVersion::Http2,
            None,
        ))
    }

    #[test]
    fn with_value_does_not_mutate_original() {
        let ctx = OperationContext::new(test_operation());
        let enriched = ctx.with_value("k", serde_json::json!("v"));
        assert!(ctx.get("k").is_none());
        assert_eq!(enriched.get("k"), Some(&serde_json::json!("v")));
    }

    #[tokio::test]
    async fn current_is_reachable_across_suspension() {
        let ctx = OperationContext::new(test_operation()).with_value("tag", serde_json::json!(42));
        ctx.scope(async {
            tokio::task::yield_now().await;
            let current = OperationContext::current();
            assert_eq!(current.get("tag"), Some(&serde_json::json!(42)));
        })
        .await;
    }

    #[test]
    fn current_outside_scope_is_none() {
        assert!(OperationContext::try_current().is_none());
    }
}
