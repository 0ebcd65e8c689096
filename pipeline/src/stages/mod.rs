//! Built-in stage transforms, one module per named position in the fixed
//! stage order (§4.4).

mod complete;
mod dequeue;
mod handler;
mod middleware_stage;
mod passthrough;
mod routing;

pub use complete::CompleteTransform;
pub use dequeue::DequeueTransform;
pub use handler::HandlerTransform;
pub use middleware_stage::{AfterResponseTransform, BeforeRequestTransform};
pub use passthrough::PassthroughTransform;
pub use routing::{PriorityExtractor, RoutingTransform};
