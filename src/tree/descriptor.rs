//! Output records of a parse.

use std::fmt;

use serde::Serialize;

use crate::registry::{HandlerFn, MiddlewareFn};

/// A concrete, router-agnostic route.
///
/// `middleware` is applied in order: the first entry is the outermost
/// wrapper around `handler`.
#[derive(Clone)]
pub struct RouteDescriptor {
    pub methods: Vec<String>,
    pub pattern: String,
    pub host: String,
    pub schemes: Vec<String>,
    pub queries: Vec<String>,
    pub headers: Vec<String>,
    pub handler: HandlerFn,
    pub handler_name: String,
    pub middleware: Vec<MiddlewareFn>,
    pub middleware_names: Vec<String>,
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("methods", &self.methods)
            .field("pattern", &self.pattern)
            .field("host", &self.host)
            .field("schemes", &self.schemes)
            .field("queries", &self.queries)
            .field("headers", &self.headers)
            .field("handler", &self.handler_name)
            .field("middleware", &self.middleware_names)
            .finish()
    }
}

/// A resolved route that names its functions instead of holding them.
///
/// Produced without consulting the registry, for inspection tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutePlan {
    pub methods: Vec<String>,
    pub pattern: String,
    pub host: String,
    pub schemes: Vec<String>,
    pub queries: Vec<String>,
    pub headers: Vec<String>,
    pub handler: String,
    pub middleware: Vec<String>,
}
