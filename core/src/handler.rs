use std::sync::Arc;

use futures::future::BoxFuture;

use crate::errors::Error;
use crate::http::HttpResponse;
use crate::operation::Operation;

/// A request handler resolved by routing (or configured as a source's
/// default). Takes the whole operation rather than a borrowed request so
/// the boxed future can be `'static` without threading lifetimes through
/// every stage.
pub type Handler = Arc<
    dyn Fn(Arc<Operation>) -> BoxFuture<'static, Result<HttpResponse, Error>> + Send + Sync,
>;
