//! The default for AUTHENTICATION/RATE_LIMITING/AUTHORIZATION/CACHING
//! (§4.4's "optional, order-preserving stages") when the pipeline builder
//! is not given one: proceed unchanged.

use async_trait::async_trait;
use pel_core::OperationContext;

use crate::stage::Transform;

pub struct PassthroughTransform(pub &'static str);

#[async_trait]
impl Transform for PassthroughTransform {
    async fn apply(&self, ctx: OperationContext) -> Option<OperationContext> {
        Some(ctx)
    }

    fn name(&self) -> &'static str {
        self.0
    }
}
