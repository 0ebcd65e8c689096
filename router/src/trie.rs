use std::collections::HashMap;
use std::sync::Arc;

use pel_core::http::Method;
use pel_core::Handler;

use crate::error::RoutingError;
use crate::router::Router;
use crate::template::Segment;

pub(crate) struct HandlerEntry {
    pub handler: Handler,
    pub template: String,
}

pub(crate) enum NonLiteralChild {
    Param { name: String, node: Box<Node> },
    Wildcard { node: Box<Node> },
    Terminator { node: Box<Node> },
}

#[derive(Default)]
pub(crate) struct Node {
    pub literal_children: HashMap<String, Node>,
    pub non_literal: Option<NonLiteralChild>,
    pub handlers: HashMap<Method, HandlerEntry>,
    pub sub_router: Option<Arc<Router>>,
}

enum NonLiteralKind {
    Param(String),
    Wildcard,
    Terminator,
}

impl Node {
    /// Find (or create) the non-literal child matching `kind`, rejecting a
    /// conflicting kind already occupying this position.
    fn non_literal_child(&mut self, kind: NonLiteralKind, template: &str) -> Result<&mut Node, RoutingError> {
        let matches_existing = match (&self.non_literal, &kind) {
            (Some(NonLiteralChild::Param { name, .. }), NonLiteralKind::Param(requested)) => {
                name == requested
            }
            (Some(NonLiteralChild::Wildcard { .. }), NonLiteralKind::Wildcard) => true,
            (Some(NonLiteralChild::Terminator { .. }), NonLiteralKind::Terminator) => true,
            (Some(_), _) => false,
            (None, _) => true,
        };
        if !matches_existing {
            return Err(RoutingError::NodeKindConflict(template.to_string()));
        }
        if self.non_literal.is_none() {
            self.non_literal = Some(match kind {
                NonLiteralKind::Param(name) => NonLiteralChild::Param { name, node: Box::default() },
                NonLiteralKind::Wildcard => NonLiteralChild::Wildcard { node: Box::default() },
                NonLiteralKind::Terminator => NonLiteralChild::Terminator { node: Box::default() },
            });
        }
        Ok(match self.non_literal.as_mut().unwrap() {
            NonLiteralChild::Param { node, .. } => node,
            NonLiteralChild::Wildcard { node } => node,
            NonLiteralChild::Terminator { node } => node,
        })
    }

    fn descend_mut(&mut self, segments: &[Segment], depth: usize, template: &str) -> Result<&mut Node, RoutingError> {
        if depth == segments.len() {
            return Ok(self);
        }
        match &segments[depth] {
            Segment::Literal(lit) => {
                let child = self.literal_children.entry(lit.clone()).or_default();
                child.descend_mut(segments, depth + 1, template)
            }
            Segment::Param(name) => {
                let child = self.non_literal_child(NonLiteralKind::Param(name.clone()), template)?;
                child.descend_mut(segments, depth + 1, template)
            }
            Segment::Wildcard => {
                let child = self.non_literal_child(NonLiteralKind::Wildcard, template)?;
                child.descend_mut(segments, depth + 1, template)
            }
            Segment::Terminator => {
                let child = self.non_literal_child(NonLiteralKind::Terminator, template)?;
                // Terminator is always the final segment (grammar-enforced),
                // so this recursion immediately bottoms out.
                child.descend_mut(segments, depth + 1, template)
            }
        }
    }

    pub fn insert_handler(
        &mut self,
        segments: &[Segment],
        method: Option<Method>,
        handler: Handler,
        template: &str,
    ) -> Result<(), RoutingError> {
        let node = self.descend_mut(segments, 0, template)?;
        if node.sub_router.is_some() {
            return Err(RoutingError::HandlerRouterConflict(template.to_string()));
        }
        let methods: Vec<Method> = match method {
            Some(m) => vec![m],
            None => Method::ALL.to_vec(),
        };
        for m in &methods {
            if node.handlers.contains_key(m) {
                return Err(RoutingError::DuplicateHandler {
                    template: template.to_string(),
                    method: *m,
                });
            }
        }
        for m in methods {
            node.handlers.insert(
                m,
                HandlerEntry {
                    handler: handler.clone(),
                    template: template.to_string(),
                },
            );
        }
        Ok(())
    }

    pub fn insert_router(
        &mut self,
        segments: &[Segment],
        router: Arc<Router>,
        template: &str,
    ) -> Result<(), RoutingError> {
        let node = self.descend_mut(segments, 0, template)?;
        if !node.handlers.is_empty() {
            return Err(RoutingError::RouterHandlerConflict(template.to_string()));
        }
        if node.sub_router.is_some() {
            return Err(RoutingError::DuplicateRouter(template.to_string()));
        }
        node.sub_router = Some(router);
        Ok(())
    }
}
