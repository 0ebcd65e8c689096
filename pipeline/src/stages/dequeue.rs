//! DEQUEUE (§4.4): advances QUEUED→READING(→PROCESSING), and is where
//! pause parks new work (§4.4's "upstream is parked at the DEQUEUE stage").

use async_trait::async_trait;
use pel_core::http::{HttpResponse, StatusCode};
use pel_core::OperationContext;

use crate::pause::PauseGate;
use crate::stage::Transform;

pub struct DequeueTransform {
    pause: PauseGate,
}

impl DequeueTransform {
    pub fn new(pause: PauseGate) -> Self {
        DequeueTransform { pause }
    }
}

#[async_trait]
impl Transform for DequeueTransform {
    async fn apply(&self, ctx: OperationContext) -> Option<OperationContext> {
        if self.pause.wait_until_resumed_or_shed().await {
            tracing::debug!("shedding operation: pipeline paused with shedding enabled");
            ctx.operation().complete(HttpResponse::new(StatusCode::SERVICE_UNAVAILABLE));
            return None;
        }
        if !ctx.operation().dequeue() {
            tracing::warn!("dequeue() rejected — operation was not in QUEUED");
            return None;
        }
        Some(ctx)
    }

    fn name(&self) -> &'static str {
        "dequeue"
    }
}
