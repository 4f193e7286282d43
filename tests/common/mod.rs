//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use routedef::registry::Callable;
use routedef::{HandlerFn, MiddlewareFn, Registry};

/// Header middleware fixtures append their tag to.
pub const CHAIN_HEADER: &str = "x-chain";

/// Handler that answers `<name>|<middleware chain>`.
pub fn named(name: &'static str) -> HandlerFn {
    Arc::new(move |req: Request| -> BoxFuture<'static, Response> {
        let chain = req
            .headers()
            .get(CHAIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Box::pin(async move { format!("{}|{}", name, chain).into_response() })
    })
}

/// Middleware that appends `tag` to the chain header before calling on.
pub fn tagging(tag: &'static str) -> MiddlewareFn {
    Arc::new(move |next: HandlerFn| -> HandlerFn {
        Arc::new(move |mut req: Request| {
            let chain = match req.headers().get(CHAIN_HEADER).and_then(|v| v.to_str().ok()) {
                Some(existing) => format!("{},{}", existing, tag),
                None => tag.to_string(),
            };
            if let Ok(value) = HeaderValue::from_str(&chain) {
                req.headers_mut().insert(CHAIN_HEADER, value);
            }
            next(req)
        })
    })
}

/// Registry with the handlers and middleware used across the tests.
pub fn registry() -> Arc<Registry> {
    let mut registry = Registry::new();
    for name in ["GetTeams", "GetTeam", "GetRoster", "GetFighters", "Home"] {
        registry.register("api", name, Callable::Handler(named(name)));
    }
    registry.register("admin", "Dashboard", Callable::Handler(named("Dashboard")));
    for name in ["Validate", "LoadUser", "Log", "Auth", "Trace"] {
        registry.register("mw", name, Callable::Middleware(tagging(name)));
    }
    registry.register("other", "OtherMW", Callable::Middleware(tagging("OtherMW")));
    Arc::new(registry)
}

/// A two level document under package `api`.
pub const TEAMS: &str = r#"{
    "routes": {
        "/teams": {
            "function": "GetTeams",
            "package": "api",
            "methods": ["GET"],
            "host": "example.com",
            "schemes": ["https"],
            "headers": ["X-Api", "1"],
            "queries": ["page", "{page}"],
            "/:id": {
                "function": "GetTeam"
            }
        }
    }
}"#;
