//! Request matching logic for compiled routes.
//!
//! # Responsibilities
//! - Match method, host, scheme, headers and query parameters
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Host matching is case-insensitive and ignores the port
//! - Header/query lists are flat key/value pairs; an empty value or a
//!   `{var}` template only requires the key to be present
//! - Empty condition = always matches (wildcard)

use axum::extract::{Query, Request};
use axum::http::Method;

use crate::routing::RouterError;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request) -> bool;
}

/// Matches any of a set of HTTP methods.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    methods: Vec<Method>,
}

impl MethodMatcher {
    pub fn new(methods: &[String]) -> Result<Self, RouterError> {
        let methods = methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.to_uppercase().as_bytes())
                    .map_err(|_| RouterError::InvalidMethod(m.clone()))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { methods })
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &Request) -> bool {
        self.methods.is_empty() || self.methods.contains(req.method())
    }
}

/// Matches the Host header.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// Create a new host matcher.
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &Request) -> bool {
        let host = req
            .headers()
            .get("host")
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().host());
        host.map(|h| strip_port(h).to_lowercase() == self.expected_host)
            .unwrap_or(false)
    }
}

/// Matches the request scheme.
///
/// Uses the URI scheme when present, then `X-Forwarded-Proto`, else `http`.
#[derive(Debug, Clone)]
pub struct SchemeMatcher {
    schemes: Vec<String>,
}

impl SchemeMatcher {
    pub fn new(schemes: &[String]) -> Self {
        Self {
            schemes: schemes.iter().map(|s| s.to_lowercase()).collect(),
        }
    }
}

impl Matcher for SchemeMatcher {
    fn matches(&self, req: &Request) -> bool {
        let scheme = req
            .uri()
            .scheme_str()
            .map(str::to_string)
            .or_else(|| {
                req.headers()
                    .get("x-forwarded-proto")
                    .and_then(|h| h.to_str().ok())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "http".to_string())
            .to_lowercase();
        self.schemes.iter().any(|s| *s == scheme)
    }
}

/// One key/value condition. `None` means the key only has to be present.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Pair {
    key: String,
    value: Option<String>,
}

fn pairs(kind: &'static str, list: &[String]) -> Result<Vec<Pair>, RouterError> {
    if list.len() % 2 != 0 {
        return Err(RouterError::OddPairs {
            kind,
            count: list.len(),
        });
    }
    Ok(list
        .chunks(2)
        .map(|kv| {
            let value = &kv[1];
            let is_template = value.starts_with('{') && value.ends_with('}');
            Pair {
                key: kv[0].clone(),
                value: (!value.is_empty() && !is_template).then(|| value.clone()),
            }
        })
        .collect())
}

/// Matches request headers.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    pairs: Vec<Pair>,
}

impl HeaderMatcher {
    pub fn new(headers: &[String]) -> Result<Self, RouterError> {
        Ok(Self {
            pairs: pairs("headers", headers)?,
        })
    }
}

impl Matcher for HeaderMatcher {
    fn matches(&self, req: &Request) -> bool {
        self.pairs.iter().all(|pair| {
            let Some(actual) = req.headers().get(pair.key.as_str()) else {
                return false;
            };
            match &pair.value {
                Some(expected) => actual.to_str().map(|v| v == expected.as_str()).unwrap_or(false),
                None => true,
            }
        })
    }
}

/// Matches query string parameters.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    pairs: Vec<Pair>,
}

impl QueryMatcher {
    pub fn new(queries: &[String]) -> Result<Self, RouterError> {
        Ok(Self {
            pairs: pairs("queries", queries)?,
        })
    }
}

impl Matcher for QueryMatcher {
    fn matches(&self, req: &Request) -> bool {
        // A query string that does not decode matches nothing
        let Ok(Query(params)) = Query::<Vec<(String, String)>>::try_from_uri(req.uri()) else {
            return false;
        };

        self.pairs.iter().all(|pair| {
            params.iter().any(|(k, v)| {
                *k == pair.key && pair.value.as_deref().map(|expected| v == expected).unwrap_or(true)
            })
        })
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &Request) -> bool {
        // All matchers must pass (AND)
        self.matchers.iter().all(|m| m.matches(req))
    }
}
