//! Function registry.
//!
//! # Data Flow
//! ```text
//! register_handler / register_middleware (startup)
//!     → copy-on-write update of the global ArcSwap<Registry>
//!
//! Parser::parse
//!     → snapshot() once per parse
//!     → lookup("package.Function") during build
//! ```
//!
//! # Design Decisions
//! - Names are supplied explicitly, there is no runtime introspection
//! - Last registration for a qualified name wins
//! - Each parse reads one immutable snapshot, so parses never observe a
//!   half-finished registration
//! - Registrations must complete before parsing; a registration that
//!   races a parse is not seen by it

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use axum::extract::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;

/// Type-erased request handler.
pub type HandlerFn = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Type-erased middleware: wraps a handler in another handler.
pub type MiddlewareFn = Arc<dyn Fn(HandlerFn) -> HandlerFn + Send + Sync>;

/// Role a registered function plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Handler,
    Middleware,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Handler => write!(f, "handler"),
            Role::Middleware => write!(f, "middleware"),
        }
    }
}

/// A registered callable.
#[derive(Clone)]
pub enum Callable {
    Handler(HandlerFn),
    Middleware(MiddlewareFn),
}

impl Callable {
    pub fn role(&self) -> Role {
        match self {
            Callable::Handler(_) => Role::Handler,
            Callable::Middleware(_) => Role::Middleware,
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable::{:?}", self.role())
    }
}

/// One registry entry.
#[derive(Debug, Clone)]
pub struct Entry {
    pub package: String,
    pub name: String,
    pub callable: Callable,
}

impl Entry {
    /// `package.name`, or the bare name when no package was given.
    pub fn qualified_name(&self) -> String {
        qualify(&self.package, &self.name)
    }

    pub fn role(&self) -> Role {
        self.callable.role()
    }
}

/// Join a package and a function name.
pub fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package, name)
    }
}

/// Map from qualified name to registered function.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: HashMap<String, Entry>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a callable under `package.name`, replacing any previous entry.
    pub fn register(&mut self, package: &str, name: &str, callable: Callable) {
        let entry = Entry {
            package: package.to_string(),
            name: name.to_string(),
            callable,
        };
        self.entries.insert(entry.qualified_name(), entry);
    }

    /// Register an async request handler.
    pub fn register_handler<F, Fut>(&mut self, package: &str, name: &str, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.register(package, name, Callable::Handler(handler_fn(handler)));
    }

    /// Register a middleware that wraps handlers.
    pub fn register_middleware<F>(&mut self, package: &str, name: &str, middleware: F)
    where
        F: Fn(HandlerFn) -> HandlerFn + Send + Sync + 'static,
    {
        self.register(package, name, Callable::Middleware(Arc::new(middleware)));
    }

    /// Look up an entry by its qualified name.
    pub fn lookup(&self, qualified_name: &str) -> Option<&Entry> {
        self.entries.get(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Erase an async fn into a [`HandlerFn`].
pub fn handler_fn<F, Fut>(handler: F) -> HandlerFn
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req: Request| -> BoxFuture<'static, Response> { Box::pin(handler(req)) })
}

static GLOBAL: LazyLock<ArcSwap<Registry>> = LazyLock::new(|| ArcSwap::from_pointee(Registry::new()));

/// Register a handler in the process-wide registry.
pub fn register_handler<F, Fut>(package: &str, name: &str, handler: F)
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    register(package, name, Callable::Handler(handler_fn(handler)));
}

/// Register a middleware in the process-wide registry.
pub fn register_middleware<F>(package: &str, name: &str, middleware: F)
where
    F: Fn(HandlerFn) -> HandlerFn + Send + Sync + 'static,
{
    register(package, name, Callable::Middleware(Arc::new(middleware)));
}

/// Register any callable in the process-wide registry.
pub fn register(package: &str, name: &str, callable: Callable) {
    GLOBAL.rcu(|current| {
        let mut next = Registry::clone(current);
        next.register(package, name, callable.clone());
        next
    });
    tracing::debug!(
        function = %qualify(package, name),
        role = %callable.role(),
        "Function registered"
    );
}

/// Current state of the process-wide registry.
pub fn snapshot() -> Arc<Registry> {
    GLOBAL.load_full()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    async fn ok(_req: Request) -> Response {
        "ok".into_response()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());
        registry.register_handler("api", "GetTeams", ok);
        registry.register_middleware("mw", "Auth", |next| next);

        let entry = registry.lookup("api.GetTeams").unwrap();
        assert_eq!(entry.package, "api");
        assert_eq!(entry.name, "GetTeams");
        assert_eq!(entry.role(), Role::Handler);
        assert_eq!(registry.lookup("mw.Auth").unwrap().role(), Role::Middleware);
        assert!(registry.lookup("api.Missing").is_none());
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = Registry::new();
        registry.register_handler("api", "Thing", ok);
        registry.register_middleware("api", "Thing", |next| next);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("api.Thing").unwrap().role(), Role::Middleware);
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("api", "Get"), "api.Get");
        assert_eq!(qualify("", "Get"), "Get");
    }

    #[test]
    fn test_global_snapshot_is_immutable() {
        register_handler("registry_test", "Before", ok);
        let before = snapshot();

        register_handler("registry_test", "After", ok);
        let after = snapshot();

        assert!(before.lookup("registry_test.Before").is_some());
        assert!(before.lookup("registry_test.After").is_none());
        assert!(after.lookup("registry_test.After").is_some());
    }
}
