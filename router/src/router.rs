use std::sync::Arc;

use pel_core::http::{split_segments, Method};
use pel_core::{parse_param_value, Handler, RouteParams};

use crate::error::RoutingError;
use crate::template::parse_template;
use crate::trie::{NonLiteralChild, Node};

/// A successful lookup: the template that matched, its resolved handler,
/// and the parameters extracted along the way.
pub struct RouteMatch {
    pub template: String,
    pub handler: Handler,
    pub params: RouteParams,
}

/// An immutable, read-only router. Built once via [`RouterBuilder`] and
/// shared behind an `Arc` for the lifetime of the pipeline — mutation
/// after construction is not exposed, matching the read-mostly trie
/// policy the pipeline relies on.
pub struct Router {
    root: Node,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn lookup(&self, path: &str, method: Method) -> Option<RouteMatch> {
        let segments = split_segments(path);
        self.lookup_segments(&segments, method)
    }

    pub(crate) fn lookup_segments(&self, segments: &[String], method: Method) -> Option<RouteMatch> {
        Self::descend(&self.root, segments, 0, method, RouteParams::new())
    }

    fn descend(
        node: &Node,
        segments: &[String],
        idx: usize,
        method: Method,
        params: RouteParams,
    ) -> Option<RouteMatch> {
        if idx == segments.len() {
            return node.handlers.get(&method).map(|entry| RouteMatch {
                template: entry.template.clone(),
                handler: entry.handler.clone(),
                params,
            });
        }

        if let Some(sub) = &node.sub_router {
            if let Some(mut result) = sub.lookup_segments(&segments[idx..], method) {
                let mut merged = params.clone();
                merged.merge_preferring(result.params);
                result.params = merged;
                return Some(result);
            }
        }

        if let Some(child) = node.literal_children.get(&segments[idx]) {
            if let Some(result) = Self::descend(child, segments, idx + 1, method, params.clone()) {
                return Some(result);
            }
        }

        match &node.non_literal {
            Some(NonLiteralChild::Param { name, node: child }) => {
                let mut next_params = params;
                next_params.insert(name.clone(), parse_param_value(&segments[idx]));
                Self::descend(child, segments, idx + 1, method, next_params)
            }
            Some(NonLiteralChild::Wildcard { node: child }) => {
                Self::descend(child, segments, idx + 1, method, params)
            }
            Some(NonLiteralChild::Terminator { node: child }) => {
                child.handlers.get(&method).map(|entry| RouteMatch {
                    template: entry.template.clone(),
                    handler: entry.handler.clone(),
                    params,
                })
            }
            None => None,
        }
    }
}

/// Mutable construction surface. Registration order does not matter for
/// the resulting tree shape, but conflicts (duplicate handlers, clashing
/// parameter names, handler/router collisions) are rejected as soon as
/// they're inserted and leave the prior registrations intact.
pub struct RouterBuilder {
    root: Node,
}

impl RouterBuilder {
    pub fn new() -> Self {
        RouterBuilder { root: Node::default() }
    }

    pub fn add_handler(
        &mut self,
        template: &str,
        method: Option<Method>,
        handler: Handler,
    ) -> Result<(), RoutingError> {
        let segments = parse_template(template)?;
        self.root.insert_handler(&segments, method, handler, template)
    }

    pub fn add_router(&mut self, template: &str, router: Arc<Router>) -> Result<(), RoutingError> {
        let segments = parse_template(template)?;
        self.root.insert_router(&segments, router, template)
    }

    pub fn build(self) -> Router {
        Router { root: self.root }
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
