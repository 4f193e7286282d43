//! Route definition compiler.
//!
//! Compiles a nested JSON route definition into a flat list of route
//! descriptors, resolving handler and middleware names against a function
//! registry, and adapts the result to an axum `Router`.
//!
//! ```text
//!  register_handler / register_middleware
//!                │
//!                ▼
//!         ┌────────────┐
//!         │  registry  │◀──────────────┐
//!         └────────────┘               │ lookup
//!                                      │
//!  definition ──▶ schema ──▶ tree::Parser ──▶ Vec<RouteDescriptor> ──▶ routing ──▶ axum::Router
//!  (JSON)        (validate)  (merge, build)
//! ```

pub mod error;
pub mod registry;
pub mod schema;
pub mod tree;
pub mod routing;
pub mod config;
pub mod observability;

pub use config::ParserConfig;
pub use error::{ParseError, ParseResult};
pub use registry::{register_handler, register_middleware, HandlerFn, MiddlewareFn, Registry, Role};
pub use routing::build_router;
pub use tree::{parse, Parser, RouteDescriptor, RoutePlan};
