//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry, tree, routing
//!     → tracing events (structured fields: pattern, handler, group)
//!     → logging.rs subscriber (stderr)
//! ```
//!
//! # Design Decisions
//! - Library code only emits events; the binary installs the subscriber
//! - Parse failures are returned as errors, never only logged

pub mod logging;

pub use logging::init_logging;
