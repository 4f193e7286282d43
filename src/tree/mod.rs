//! Route tree compilation.
//!
//! # Data Flow
//! ```text
//! definition document (JSON)
//!     → parser.rs (validate, group phase, depth-first walk)
//!     → route_def.rs (decode node, merge with parent)
//!     → middleware.rs (merge + resolve middleware, expand $groups)
//!     → descriptor.rs (RouteDescriptor per node with a function)
//! ```
//!
//! # Design Decisions
//! - Nodes are typed structs decoded with serde, not reflected maps
//! - Inheritance is a per-field rule: a field is either set locally or
//!   copied whole from the parent
//! - Middleware inheritance is ordered set algebra (set.rs)
//! - Output order is deterministic for a given document

pub mod descriptor;
pub mod middleware;
pub mod node;
pub mod parser;
pub mod route_def;
pub mod set;

pub use descriptor::{RouteDescriptor, RoutePlan};
pub use middleware::{GroupIndex, MiddlewareDef};
pub use node::{Build, BuildContext, Merge, ResolvedHandler, ResolvedMiddleware, RouteNode};
pub use parser::{parse, Parser};
pub use route_def::RouteDef;
