use pel_core::http::Method;

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("route template does not match the grammar: {0}")]
    InvalidTemplate(String),

    #[error("terminator '**' must be the final segment of the template: {0}")]
    TerminatorNotFinal(String),

    #[error("parameter/wildcard/terminator conflict at the same position in: {0}")]
    NodeKindConflict(String),

    #[error("duplicate handler registered for {method} {template}")]
    DuplicateHandler { template: String, method: Method },

    #[error("cannot attach a handler at {0}: a sub-router is already attached there")]
    HandlerRouterConflict(String),

    #[error("cannot attach a sub-router at {0}: a handler is already attached there")]
    RouterHandlerConflict(String),

    #[error("a sub-router is already attached at: {0}")]
    DuplicateRouter(String),
}
