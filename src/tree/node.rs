//! Capabilities a definition node provides to the tree walker.
//!
//! # Responsibilities
//! - `Merge`: fill unset fields from the resolved parent
//! - `Build`: turn a resolved node into route descriptors
//! - `RouteNode`: decode a JSON object into a typed node
//!
//! # Design Decisions
//! - The parent is passed to `merge` explicitly; nodes never store it
//! - `Build` is optional per node type, checked at walk time through
//!   `RouteNode::as_build`

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{ParseError, ParseResult};
use crate::registry::{Callable, Entry, HandlerFn, MiddlewareFn, Registry, Role};
use crate::tree::descriptor::{RouteDescriptor, RoutePlan};
use crate::tree::middleware::GroupIndex;

/// Keys starting with this character are child route segments.
pub const SEGMENT_PREFIX: char = '/';

/// Returns true if a node key names a child route.
pub fn is_segment(key: &str) -> bool {
    key.starts_with(SEGMENT_PREFIX)
}

/// Inheritance from a resolved parent.
pub trait Merge {
    /// Fill every unset field from `parent`.
    ///
    /// Must be idempotent: merging twice against the same parent yields the
    /// same fields.
    fn merge(&mut self, parent: &Self) -> ParseResult<()>;
}

/// State available while building descriptors.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub registry: &'a Registry,
    pub groups: &'a GroupIndex,
}

impl BuildContext<'_> {
    /// Resolve `qualified_name` to a registered handler.
    pub fn handler(&self, qualified_name: &str, location: &str) -> ParseResult<ResolvedHandler> {
        resolve_handler(self.registry, qualified_name, location)
    }

    /// Resolve `qualified_name` to a registered middleware.
    pub fn middleware(&self, qualified_name: &str, location: &str) -> ParseResult<ResolvedMiddleware> {
        resolve_middleware(self.registry, qualified_name, location)
    }
}

/// A handler looked up in the registry.
#[derive(Clone)]
pub struct ResolvedHandler {
    /// Package the handler was registered under.
    pub package: String,
    pub function: HandlerFn,
}

/// A middleware looked up in the registry.
#[derive(Clone)]
pub struct ResolvedMiddleware {
    /// Qualified name.
    pub name: String,
    pub function: MiddlewareFn,
}

impl fmt::Debug for ResolvedMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResolvedMiddleware").field(&self.name).finish()
    }
}

fn lookup<'r>(registry: &'r Registry, qualified_name: &str, location: &str) -> ParseResult<&'r Entry> {
    registry
        .lookup(qualified_name)
        .ok_or_else(|| ParseError::reference(qualified_name, location, "has not been registered"))
}

fn role_mismatch(qualified_name: &str, location: &str, expected: Role, actual: Role) -> ParseError {
    ParseError::RoleMismatch {
        name: qualified_name.to_string(),
        location: location.to_string(),
        expected,
        actual,
    }
}

pub(crate) fn resolve_handler(
    registry: &Registry,
    qualified_name: &str,
    location: &str,
) -> ParseResult<ResolvedHandler> {
    let entry = lookup(registry, qualified_name, location)?;
    match &entry.callable {
        Callable::Handler(function) => Ok(ResolvedHandler {
            package: entry.package.clone(),
            function: function.clone(),
        }),
        Callable::Middleware(_) => Err(role_mismatch(
            qualified_name,
            location,
            Role::Handler,
            Role::Middleware,
        )),
    }
}

pub(crate) fn resolve_middleware(
    registry: &Registry,
    qualified_name: &str,
    location: &str,
) -> ParseResult<ResolvedMiddleware> {
    let entry = lookup(registry, qualified_name, location)?;
    match &entry.callable {
        Callable::Middleware(function) => Ok(ResolvedMiddleware {
            name: entry.qualified_name(),
            function: function.clone(),
        }),
        Callable::Handler(_) => Err(role_mismatch(
            qualified_name,
            location,
            Role::Middleware,
            Role::Handler,
        )),
    }
}

/// Emission of route descriptors from a merged node.
pub trait Build {
    /// Returns true if this node produces routes.
    fn should_build(&self) -> bool;

    /// Describe the routes by qualified name, without touching the registry.
    fn plan(&self, groups: &GroupIndex) -> ParseResult<Vec<RoutePlan>>;

    /// Resolve names against the registry and produce descriptors.
    fn build(&self, ctx: &BuildContext<'_>) -> ParseResult<Vec<RouteDescriptor>>;
}

/// A node type the walker can instantiate.
pub trait RouteNode: Merge + Sized {
    /// The synthetic parent of the `routes` root.
    fn root() -> Self;

    /// Decode the attribute keys of `object`. `segment` is the key this
    /// object was found under, empty for the root. `parent` is already
    /// merged and only serves as error context.
    fn decode(object: &Map<String, Value>, segment: &str, parent: &Self) -> ParseResult<Self>;

    /// Path of this node, used for error context and logs.
    fn location(&self) -> &str;

    /// The build capability, if this node type has one.
    fn as_build(&self) -> Option<&dyn Build> {
        None
    }
}
