//! ROUTING (§4.4): consults the bound [`pel_router::Router`] and either
//! stores the resolved handler + extracted parameters in the context, or
//! finalizes the operation with 404 directly — the "not found yields 404"
//! exit condition from §6, which the generic writer's UNKNOWN→500 fallback
//! would otherwise miss since no handler/response is ever bound for it.

use std::sync::Arc;

use async_trait::async_trait;
use pel_core::http::{HttpResponse, StatusCode};
use pel_core::OperationContext;
use pel_router::Router;

use crate::stage::Transform;

/// Reads a priority out of a routed context for the LOAD_SHEDDING stage
/// (DESIGN.md's resolution of §9's "priority key" Open Question): a
/// pluggable callback rather than a fixed header/field, since the source
/// of priority is deployment-specific (a header, a route annotation, ...).
pub type PriorityExtractor = Arc<dyn Fn(&OperationContext) -> Option<i32> + Send + Sync>;

pub struct RoutingTransform {
    router: Arc<Router>,
    priority_extractor: Option<PriorityExtractor>,
}

impl RoutingTransform {
    pub fn new(router: Arc<Router>) -> Self {
        RoutingTransform { router, priority_extractor: None }
    }

    pub fn with_priority_extractor(mut self, extractor: PriorityExtractor) -> Self {
        self.priority_extractor = Some(extractor);
        self
    }
}

#[async_trait]
impl Transform for RoutingTransform {
    async fn apply(&self, ctx: OperationContext) -> Option<OperationContext> {
        let request = ctx.operation().request();
        match self.router.lookup(&request.path.original, request.method) {
            Some(found) => {
                tracing::debug!(template = %found.template, "routed");
                let mut next = ctx.with_handler(found.handler).with_params(found.params);
                if let Some(extractor) = &self.priority_extractor {
                    if let Some(priority) = extractor(&next) {
                        next = next.with_priority(priority);
                    }
                }
                Some(next)
            }
            None => {
                tracing::debug!(path = %request.path.original, method = %request.method, "no route matched");
                ctx.operation().complete(HttpResponse::new(StatusCode::NOT_FOUND));
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "routing"
    }
}
