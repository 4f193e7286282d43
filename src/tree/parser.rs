//! Tree walker.
//!
//! # Responsibilities
//! - Validate the document against the configured schema version
//! - Resolve the `middlewares` section into a group index
//! - Walk `routes` depth first, merging each node into its parent
//! - Collect descriptors from every node that builds
//!
//! # Design Decisions
//! - All or nothing: the first error aborts the parse
//! - Emission is pre-order: a node's own route precedes its children's,
//!   children in declaration order
//! - The registry is read through one snapshot per parse
//! - Parse state is passed down explicitly, nodes hold none of it

use std::sync::{Arc, LazyLock};

use serde_json::{Map, Value};

use crate::config::ParserConfig;
use crate::error::{ParseError, ParseResult};
use crate::registry::{self, Registry};
use crate::schema::{self, Schema};
use crate::tree::descriptor::{RouteDescriptor, RoutePlan};
use crate::tree::middleware::GroupIndex;
use crate::tree::node::{is_segment, Build, BuildContext, RouteNode};
use crate::tree::route_def::RouteDef;

/// Top-level key holding middleware groups.
pub const MIDDLEWARES_KEY: &str = "middlewares";

/// Top-level key holding the route tree.
pub const ROUTES_KEY: &str = "routes";

/// Compiles definition documents into routes.
#[derive(Debug, Clone)]
pub struct Parser {
    schema_version: Option<String>,
    registry: Option<Arc<Registry>>,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            schema_version: Some(schema::DEFAULT_VERSION.to_string()),
            registry: None,
        }
    }
}

impl Parser {
    /// Parser with the default schema version that reads the process-wide
    /// registry at the start of every parse.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a parser from loaded configuration.
    pub fn from_config(config: &ParserConfig) -> ParseResult<Self> {
        let parser = Self::new().with_schema_version(&config.schema_version)?;
        if config.validate {
            Ok(parser)
        } else {
            Ok(parser.without_validation())
        }
    }

    /// Resolve against `registry` instead of the process-wide one.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Pin validation to a schema version.
    pub fn with_schema_version(mut self, version: &str) -> ParseResult<Self> {
        schema::check_version(version)?;
        self.schema_version = Some(version.to_string());
        Ok(self)
    }

    /// Skip schema validation. Structural checks still apply.
    pub fn without_validation(mut self) -> Self {
        self.schema_version = None;
        self
    }

    /// Schema version in use, `None` if validation is off.
    pub fn schema_version(&self) -> Option<&str> {
        self.schema_version.as_deref()
    }

    /// Parse a JSON document into routes.
    pub fn parse(&self, document: &str) -> ParseResult<Vec<RouteDescriptor>> {
        let document: Value = serde_json::from_str(document)?;
        self.parse_value(&document)
    }

    /// Parse an already decoded document into routes.
    pub fn parse_value(&self, document: &Value) -> ParseResult<Vec<RouteDescriptor>> {
        self.parse_with::<RouteDef>(document)
    }

    /// Parse using a custom node type.
    pub fn parse_with<N: RouteNode>(&self, document: &Value) -> ParseResult<Vec<RouteDescriptor>> {
        let top = self.prepare(document)?;
        let registry = self.registry.clone().unwrap_or_else(registry::snapshot);
        let groups = GroupIndex::from_section(middlewares(top)?, Some(registry.as_ref()))?;
        let ctx = BuildContext {
            registry: &registry,
            groups: &groups,
        };

        let mut routes = Vec::new();
        walk(routes_root(top)?, "", &N::root(), &mut |node: &N| {
            let build = buildable(node)?;
            if build.should_build() {
                routes.extend(build.build(&ctx)?);
            }
            Ok(())
        })?;

        tracing::info!(
            routes = routes.len(),
            groups = groups.len(),
            schema_version = ?self.schema_version,
            "Route definition parsed"
        );
        Ok(routes)
    }

    /// Resolve a JSON document by name only, without the registry.
    pub fn plan(&self, document: &str) -> ParseResult<Vec<RoutePlan>> {
        let document: Value = serde_json::from_str(document)?;
        self.plan_value(&document)
    }

    /// Resolve an already decoded document by name only.
    pub fn plan_value(&self, document: &Value) -> ParseResult<Vec<RoutePlan>> {
        self.plan_with::<RouteDef>(document)
    }

    /// Resolve by name only, using a custom node type.
    pub fn plan_with<N: RouteNode>(&self, document: &Value) -> ParseResult<Vec<RoutePlan>> {
        let top = self.prepare(document)?;
        let groups = GroupIndex::from_section(middlewares(top)?, None)?;

        let mut plans = Vec::new();
        walk(routes_root(top)?, "", &N::root(), &mut |node: &N| {
            let build = buildable(node)?;
            if build.should_build() {
                plans.extend(build.plan(&groups)?);
            }
            Ok(())
        })?;

        tracing::info!(routes = plans.len(), groups = groups.len(), "Route definition planned");
        Ok(plans)
    }

    fn prepare<'d>(&self, document: &'d Value) -> ParseResult<&'d Map<String, Value>> {
        if let Some(version) = &self.schema_version {
            Schema::load(version)?.validate(document)?;
        }
        document
            .as_object()
            .ok_or_else(|| ParseError::structural("document", "top level must be an object"))
    }
}

/// Parse `document` with the default parser and the process-wide registry.
pub fn parse(document: &str) -> ParseResult<Vec<RouteDescriptor>> {
    Parser::new().parse(document)
}

fn middlewares(top: &Map<String, Value>) -> ParseResult<&Map<String, Value>> {
    static EMPTY: LazyLock<Map<String, Value>> = LazyLock::new(Map::new);
    match top.get(MIDDLEWARES_KEY) {
        None => Ok(&*EMPTY),
        Some(Value::Object(section)) => Ok(section),
        Some(_) => Err(ParseError::structural(MIDDLEWARES_KEY, "must be an object")),
    }
}

fn routes_root(top: &Map<String, Value>) -> ParseResult<&Map<String, Value>> {
    match top.get(ROUTES_KEY) {
        None => Err(ParseError::structural("document", "no routes defined")),
        Some(Value::Object(root)) => Ok(root),
        Some(_) => Err(ParseError::structural(ROUTES_KEY, "must be an object")),
    }
}

fn buildable<N: RouteNode>(node: &N) -> ParseResult<&dyn Build> {
    node.as_build().ok_or_else(|| {
        ParseError::structural(node.location(), "node type does not implement the build capability")
    })
}

/// Decode, merge and visit `object`, then recurse into its child routes.
fn walk<N, F>(object: &Map<String, Value>, segment: &str, parent: &N, visit: &mut F) -> ParseResult<()>
where
    N: RouteNode,
    F: FnMut(&N) -> ParseResult<()>,
{
    let mut node = N::decode(object, segment, parent)?;
    node.merge(parent)?;
    tracing::debug!(location = node.location(), "Node merged");

    visit(&node)?;

    for (key, value) in object.iter().filter(|(key, _)| is_segment(key)) {
        let child = value.as_object().ok_or_else(|| {
            ParseError::structural(
                node.location(),
                format!("route {:?} can't be recursed down, it is not an object", key),
            )
        })?;
        walk(child, key, &node, visit)?;
    }
    Ok(())
}
