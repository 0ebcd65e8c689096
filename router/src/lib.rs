//! A trie router: parses route templates into literal/parameter/wildcard/
//! terminator segments, merges them into a tree at construction time, and
//! resolves `(path, method)` lookups against it with parameter extraction
//! and sub-router delegation.

mod error;
mod router;
mod template;
mod trie;

pub use error::RoutingError;
pub use router::{Router, RouterBuilder, RouteMatch};
pub use template::{parse_template, Segment};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pel_core::http::{HttpResponse, Method, StatusCode};
    use pel_core::operation::Operation;

    use super::*;

    fn noop_handler() -> pel_core::Handler {
        Arc::new(|_op: Arc<Operation>| {
            Box::pin(async { Ok(HttpResponse::new(StatusCode::OK)) })
        })
    }

    #[test]
    fn literal_route_matches_exactly_and_rejects_extra_segment() {
        let mut builder = Router::builder();
        builder.add_handler("/hello", Some(Method::Get), noop_handler()).unwrap();
        let router = builder.build();

        assert!(router.lookup("/hello", Method::Get).is_some());
        assert!(router.lookup("/hello/x", Method::Get).is_none());
        assert!(router.lookup("/hello", Method::Post).is_none());
    }

    #[test]
    fn parameter_segment_extracts_named_value() {
        let mut builder = Router::builder();
        builder
            .add_handler("/path/ends/with/:variable", None, noop_handler())
            .unwrap();
        let router = builder.build();

        let found = router.lookup("/path/ends/with/v123", Method::Get).unwrap();
        assert_eq!(found.template, "/path/ends/with/:variable");
        assert_eq!(found.params.get("variable").unwrap().as_str(), Some("v123"));
    }

    #[test]
    fn conflicting_param_and_wildcard_at_same_position_fails_and_leaves_prior_intact() {
        let mut builder = Router::builder();
        builder.add_handler("/one/:two/three", None, noop_handler()).unwrap();
        let err = builder.add_handler("/one/*/three", None, noop_handler());
        assert!(err.is_err());

        let router = builder.build();
        let found = router.lookup("/one/abc/three", Method::Get).unwrap();
        assert_eq!(found.params.get("two").unwrap().as_str(), Some("abc"));
    }

    #[test]
    fn terminator_at_root_matches_any_non_empty_path() {
        let mut builder = Router::builder();
        builder.add_handler("/**", None, noop_handler()).unwrap();
        let router = builder.build();

        assert!(router.lookup("/a/b/c", Method::Get).is_some());
        assert!(router.lookup("/", Method::Get).is_none());
    }

    #[test]
    fn wildcard_at_root_matches_exactly_one_segment() {
        let mut builder = Router::builder();
        builder.add_handler("/*", None, noop_handler()).unwrap();
        let router = builder.build();

        assert!(router.lookup("/a", Method::Get).is_some());
        assert!(router.lookup("/a/b", Method::Get).is_none());
    }

    #[test]
    fn duplicate_registration_fails_but_second_method_succeeds() {
        let mut builder = Router::builder();
        builder.add_handler("/x", Some(Method::Get), noop_handler()).unwrap();
        assert!(builder.add_handler("/x", Some(Method::Get), noop_handler()).is_err());
        assert!(builder.add_handler("/x", Some(Method::Post), noop_handler()).is_ok());
    }

    #[test]
    fn sub_router_delegation_merges_params_preferring_inner() {
        let mut inner_builder = Router::builder();
        inner_builder
            .add_handler("/:id", None, noop_handler())
            .unwrap();
        let inner = Arc::new(inner_builder.build());

        let mut outer_builder = Router::builder();
        outer_builder.add_router("/users", inner).unwrap();
        let outer = outer_builder.build();

        let found = outer.lookup("/users/42", Method::Get).unwrap();
        assert_eq!(found.params.get("id").unwrap().as_str(), Some("42"));
    }

    #[test]
    fn handler_and_router_at_same_position_conflict() {
        let mut builder = Router::builder();
        builder.add_handler("/x", None, noop_handler()).unwrap();
        let sub = Arc::new(Router::builder().build());
        assert!(builder.add_router("/x", sub).is_err());
    }
}
