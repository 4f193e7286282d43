//! The built-in route definition node.
//!
//! One `RouteDef` is decoded per object under `routes`. As the tree is
//! walked, `merge` pulls unset fields down from the parent; only nodes that
//! name a `function` turn into routes.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ParseError, ParseResult};
use crate::registry::{qualify, MiddlewareFn};
use crate::tree::descriptor::{RouteDescriptor, RoutePlan};
use crate::tree::middleware::{GroupIndex, MiddlewareDef};
use crate::tree::node::{is_segment, Build, BuildContext, Merge, RouteNode, SEGMENT_PREFIX};

/// Attribute fields of one node, as written in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
struct RouteFields {
    methods: Vec<String>,
    host: String,
    schemes: Vec<String>,
    headers: Vec<String>,
    queries: Vec<String>,
    function: String,
    package: String,
    pattern: String,
    middlewares: MiddlewareDef,
    exclude: Vec<String>,
}

/// A node of the route tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteDef {
    pub methods: Vec<String>,
    pub host: String,
    pub schemes: Vec<String>,
    pub headers: Vec<String>,
    pub queries: Vec<String>,
    pub function: String,
    pub package: String,
    pub pattern: String,
    pub middlewares: MiddlewareDef,

    /// Key this node was declared under, empty for the root.
    pub segment: String,
}

fn child_pattern(parent: &str, segment: &str) -> String {
    if segment.is_empty() {
        parent.to_string()
    } else if parent == "/" {
        segment.to_string()
    } else {
        format!("{}{}", parent, segment)
    }
}

fn inherit_list(field: &mut Vec<String>, parent: &[String]) {
    if field.is_empty() {
        *field = parent.to_vec();
    }
}

fn inherit_scalar(field: &mut String, parent: &str) {
    if field.is_empty() {
        *field = parent.to_string();
    }
}

impl RouteDef {
    /// Qualified name of the handler.
    pub fn handler_name(&self) -> String {
        qualify(&self.package, &self.function)
    }

    fn resolved_pattern(&self, parent: &str) -> String {
        child_pattern(parent, &self.segment)
    }
}

impl Merge for RouteDef {
    fn merge(&mut self, parent: &Self) -> ParseResult<()> {
        if !self.segment.is_empty() && !is_segment(&self.segment) {
            return Err(ParseError::Merge {
                location: parent.pattern.clone(),
                reason: format!(
                    "child key {:?} does not start with {:?}",
                    self.segment, SEGMENT_PREFIX
                ),
            });
        }

        inherit_list(&mut self.methods, &parent.methods);
        inherit_scalar(&mut self.host, &parent.host);
        inherit_list(&mut self.schemes, &parent.schemes);
        inherit_list(&mut self.headers, &parent.headers);
        inherit_list(&mut self.queries, &parent.queries);
        inherit_scalar(&mut self.package, &parent.package);

        // The pattern comes from the key, never from the object itself
        self.pattern = self.resolved_pattern(&parent.pattern);

        self.middlewares.merge(&parent.middlewares);
        Ok(())
    }
}

impl Build for RouteDef {
    fn should_build(&self) -> bool {
        !self.function.is_empty()
    }

    fn plan(&self, groups: &GroupIndex) -> ParseResult<Vec<RoutePlan>> {
        Ok(vec![RoutePlan {
            methods: self.methods.clone(),
            pattern: self.pattern.clone(),
            host: self.host.clone(),
            schemes: self.schemes.clone(),
            queries: self.queries.clone(),
            headers: self.headers.clone(),
            handler: self.handler_name(),
            middleware: self.middlewares.function_names(groups, &self.pattern)?,
        }])
    }

    fn build(&self, ctx: &BuildContext<'_>) -> ParseResult<Vec<RouteDescriptor>> {
        let handler_name = self.handler_name();
        let handler = ctx.handler(&handler_name, &self.pattern)?;
        if handler.package != self.package {
            return Err(ParseError::reference(
                handler_name,
                self.pattern.as_str(),
                format!("is registered in package {:?}, not {:?}", handler.package, self.package),
            ));
        }

        let (middleware_names, middleware): (Vec<String>, Vec<MiddlewareFn>) = self
            .middlewares
            .load_functions(ctx, &self.pattern)?
            .into_iter()
            .map(|mw| (mw.name, mw.function))
            .unzip();

        tracing::debug!(
            pattern = %self.pattern,
            handler = %handler_name,
            middleware = ?middleware_names,
            "Route built"
        );

        Ok(vec![RouteDescriptor {
            methods: self.methods.clone(),
            pattern: self.pattern.clone(),
            host: self.host.clone(),
            schemes: self.schemes.clone(),
            queries: self.queries.clone(),
            headers: self.headers.clone(),
            handler: handler.function,
            handler_name,
            middleware,
            middleware_names,
        }])
    }
}

impl RouteNode for RouteDef {
    fn root() -> Self {
        Self {
            pattern: "/".to_string(),
            ..Default::default()
        }
    }

    fn decode(object: &Map<String, Value>, segment: &str, parent: &Self) -> ParseResult<Self> {
        // Only attribute keys are copied; child subtrees are walked separately
        let attributes: Map<String, Value> = object
            .iter()
            .filter(|(key, _)| !is_segment(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let fields: RouteFields =
            serde_json::from_value(Value::Object(attributes)).map_err(|source| ParseError::Decode {
                location: child_pattern(&parent.pattern, segment),
                source,
            })?;

        let mut middlewares = fields.middlewares;
        middlewares.exclude.extend(fields.exclude);

        Ok(Self {
            methods: fields.methods,
            host: fields.host,
            schemes: fields.schemes,
            headers: fields.headers,
            queries: fields.queries,
            function: fields.function,
            package: fields.package,
            pattern: fields.pattern,
            middlewares,
            segment: segment.to_string(),
        })
    }

    fn location(&self) -> &str {
        if self.pattern.is_empty() {
            &self.segment
        } else {
            &self.pattern
        }
    }

    fn as_build(&self) -> Option<&dyn Build> {
        Some(self)
    }
}
