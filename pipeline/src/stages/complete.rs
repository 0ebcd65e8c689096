//! COMPLETE (§4.4): the terminal writer. Binds whatever response the chain
//! produced; an operation that reaches here with no response at all is a
//! pipeline bug (a stage dropped the context without itself finalizing the
//! operation), surfaced as `fail(UNKNOWN)` per the stage contract rather
//! than silently hanging.

use async_trait::async_trait;
use pel_core::{Error, OperationContext};

use crate::stage::Transform;

pub struct CompleteTransform;

#[async_trait]
impl Transform for CompleteTransform {
    async fn apply(&self, ctx: OperationContext) -> Option<OperationContext> {
        let (ctx, response) = ctx.take_response();
        match response {
            Some(response) => {
                let response = std::sync::Arc::try_unwrap(response)
                    .unwrap_or_else(|_| panic!("response Arc unexpectedly shared entering COMPLETE"));
                ctx.operation().complete(response);
            }
            None => {
                tracing::error!("COMPLETE stage reached with no bound response");
                ctx.operation().fail(Some(Error::unknown("no response was bound")));
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "complete"
    }
}
