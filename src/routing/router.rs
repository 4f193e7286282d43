//! axum router construction from route descriptors.
//!
//! # Responsibilities
//! - Convert descriptor patterns to axum path syntax
//! - Wrap each handler in its middleware chain
//! - Dispatch between descriptors that share a path
//!
//! # Design Decisions
//! - One axum route per distinct path; descriptors sharing it are tried in
//!   descriptor order and the first full match wins
//! - Path matched but method did not → 405, nothing matched → 404
//! - The first listed middleware is the outermost wrapper

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;

use crate::registry::{HandlerFn, MiddlewareFn};
use crate::routing::matcher::{
    AndMatcher, HeaderMatcher, HostMatcher, Matcher, MethodMatcher, QueryMatcher, SchemeMatcher,
};
use crate::routing::RouterError;
use crate::tree::RouteDescriptor;

/// Convert `:name` and `*name` segments to axum's `{name}` / `{*name}`.
///
/// Rejects patterns axum would refuse to route: a missing leading `/`,
/// empty parameter names, literal braces and a catch-all that is not the
/// last segment.
pub fn axum_path(pattern: &str) -> Result<String, RouterError> {
    if pattern.is_empty() || pattern == "/" {
        return Ok("/".to_string());
    }
    if !pattern.starts_with('/') {
        return Err(invalid_path(pattern, "must start with '/'"));
    }

    let segments: Vec<&str> = pattern.split('/').collect();
    let last = segments.len() - 1;
    let mut converted = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        if segment.contains(['{', '}']) {
            return Err(invalid_path(pattern, format!("segment {:?} contains a brace", segment)));
        }
        let segment = if let Some(name) = segment.strip_prefix(':') {
            param_name(pattern, name)?;
            format!("{{{}}}", name)
        } else if let Some(name) = segment.strip_prefix('*') {
            param_name(pattern, name)?;
            if i != last {
                return Err(invalid_path(pattern, "catch-all must be the last segment"));
            }
            format!("{{*{}}}", name)
        } else {
            segment.to_string()
        };
        converted.push(segment);
    }
    Ok(converted.join("/"))
}

fn param_name(pattern: &str, name: &str) -> Result<(), RouterError> {
    if name.is_empty() {
        return Err(invalid_path(pattern, "parameter has no name"));
    }
    if name.contains([':', '*']) {
        return Err(invalid_path(pattern, format!("parameter name {:?} is not valid", name)));
    }
    Ok(())
}

fn invalid_path(pattern: &str, reason: impl Into<String>) -> RouterError {
    RouterError::InvalidPath {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

/// `path` with parameter names erased. axum refuses two routes with the
/// same shape, e.g. `/teams/{id}` and `/teams/{key}`.
fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("{*") {
                "{*}"
            } else if segment.starts_with('{') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Wrap `handler` so that `middleware[0]` runs first.
pub fn compose(handler: HandlerFn, middleware: &[MiddlewareFn]) -> HandlerFn {
    middleware.iter().rev().fold(handler, |inner, mw| mw(inner))
}

struct Candidate {
    name: String,
    method: MethodMatcher,
    conditions: AndMatcher,
    handler: HandlerFn,
}

impl Candidate {
    fn new(route: RouteDescriptor) -> Result<Self, RouterError> {
        let mut conditions: Vec<Box<dyn Matcher>> = Vec::new();
        if !route.host.is_empty() {
            conditions.push(Box::new(HostMatcher::new(route.host.as_str())));
        }
        if !route.schemes.is_empty() {
            conditions.push(Box::new(SchemeMatcher::new(&route.schemes)));
        }
        if !route.headers.is_empty() {
            conditions.push(Box::new(HeaderMatcher::new(&route.headers)?));
        }
        if !route.queries.is_empty() {
            conditions.push(Box::new(QueryMatcher::new(&route.queries)?));
        }

        Ok(Self {
            method: MethodMatcher::new(&route.methods)?,
            conditions: AndMatcher::new(conditions),
            handler: compose(route.handler, &route.middleware),
            name: route.handler_name,
        })
    }
}

struct DispatchTable {
    candidates: Vec<Candidate>,
}

impl DispatchTable {
    async fn dispatch(&self, req: Request) -> Response {
        let mut method_mismatch = false;
        for candidate in &self.candidates {
            if !candidate.conditions.matches(&req) {
                continue;
            }
            if candidate.method.matches(&req) {
                tracing::trace!(handler = %candidate.name, path = %req.uri().path(), "Dispatching");
                return (candidate.handler)(req).await;
            }
            method_mismatch = true;
        }

        if method_mismatch {
            StatusCode::METHOD_NOT_ALLOWED.into_response()
        } else {
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Build an axum router serving `routes`.
pub fn build_router(routes: Vec<RouteDescriptor>) -> Result<Router, RouterError> {
    let mut paths: Vec<(String, Vec<Candidate>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut shapes: HashMap<String, String> = HashMap::new();

    for route in routes {
        let path = axum_path(&route.pattern)?;
        let shape = path_shape(&path);
        if let Some(existing) = shapes.get(&shape).filter(|existing| **existing != path) {
            return Err(invalid_path(
                &route.pattern,
                format!("conflicts with {:?}, which names its parameters differently", existing),
            ));
        }
        shapes.entry(shape).or_insert_with(|| path.clone());
        tracing::debug!(
            path = %path,
            handler = %route.handler_name,
            methods = ?route.methods,
            "Binding route"
        );
        let candidate = Candidate::new(route)?;
        match index.get(&path) {
            Some(&i) => paths[i].1.push(candidate),
            None => {
                index.insert(path.clone(), paths.len());
                paths.push((path, vec![candidate]));
            }
        }
    }

    let mut router = Router::new();
    for (path, candidates) in paths {
        let table = Arc::new(DispatchTable { candidates });
        router = router.route(
            &path,
            any(move |req: Request| {
                let table = table.clone();
                async move { table.dispatch(req).await }
            }),
        );
    }
    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axum_path() {
        assert_eq!(axum_path("/teams/:id").unwrap(), "/teams/{id}");
        assert_eq!(axum_path("/files/*rest").unwrap(), "/files/{*rest}");
        assert_eq!(axum_path("/teams/:id/roster").unwrap(), "/teams/{id}/roster");
        assert_eq!(axum_path("/").unwrap(), "/");
        assert_eq!(axum_path("").unwrap(), "/");
    }

    #[test]
    fn test_axum_path_rejects_unroutable_patterns() {
        for pattern in [
            "/teams/:/id",
            "/teams/:",
            "/files/*",
            "/teams/{id}",
            "/teams/a}b",
            "/files/*rest/more",
            "/teams/::id",
            "teams",
        ] {
            assert!(
                matches!(axum_path(pattern), Err(RouterError::InvalidPath { .. })),
                "{pattern} should be rejected"
            );
        }
    }

    #[test]
    fn test_path_shape() {
        assert_eq!(path_shape("/teams/{id}"), path_shape("/teams/{key}"));
        assert_eq!(path_shape("/files/{*rest}"), "/files/{*}");
        assert_ne!(path_shape("/teams/{id}"), path_shape("/teams/{*id}"));
    }
}
