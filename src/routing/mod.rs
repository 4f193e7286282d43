//! Router adapter.
//!
//! # Data Flow
//! ```text
//! Vec<RouteDescriptor> (from Parser::parse)
//!     → router.rs (group by path, compose middleware)
//!     → matcher.rs (host/scheme/header/query/method conditions)
//!     → axum::Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime
//! - No regex in the hot path
//! - Deterministic: same descriptors always dispatch the same way

use thiserror::Error;

pub mod matcher;
pub mod router;

pub use router::build_router;

/// Errors turning descriptors into router bindings.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A method string is not a valid HTTP method token.
    #[error("Invalid HTTP method: {0:?}")]
    InvalidMethod(String),

    /// A route pattern cannot be served by axum.
    #[error("Invalid route path {pattern:?}: {reason}")]
    InvalidPath { pattern: String, reason: String },

    /// A header or query matcher list is not made of key/value pairs.
    #[error("{kind} must be key/value pairs, got {count} entries")]
    OddPairs { kind: &'static str, count: usize },
}
