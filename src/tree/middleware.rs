//! Middleware specs, groups and their resolution.
//!
//! # Responsibilities
//! - Merge a node's middleware declaration with its parent's
//! - Resolve the top-level `middlewares` section into a group index
//! - Expand `$group` aliases and resolve names against the registry
//!
//! # Design Decisions
//! - Names are qualified at merge time, so an inherited `Auth` keeps the
//!   package of the level that declared it even if a child switches package
//! - Aliased entries keep the group's package, never the node's
//! - Groups cannot reference other groups
//! - Resolved lists keep duplicates; application order is significant

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ParseError, ParseResult};
use crate::registry::{qualify, Registry};
use crate::tree::node::{resolve_middleware, BuildContext, ResolvedMiddleware};
use crate::tree::set::{difference, union};

/// Prefix marking a reference to a middleware group.
pub const GROUP_PREFIX: char = '$';

/// Returns the group name if `name` is a `$group` alias.
pub fn group_ref(name: &str) -> Option<&str> {
    name.strip_prefix(GROUP_PREFIX)
}

/// Returns true if `name` already carries a package qualifier.
pub fn has_package(name: &str) -> bool {
    name.contains('.')
}

/// Qualify a bare function name with `package`. Aliases and already
/// qualified names are returned unchanged.
pub fn qualify_name(package: &str, name: &str) -> String {
    if group_ref(name).is_some() || has_package(name) {
        name.to_string()
    } else {
        qualify(package, name)
    }
}

fn qualify_all(package: &str, names: &[String]) -> Vec<String> {
    names.iter().map(|n| qualify_name(package, n)).collect()
}

/// Middleware declaration of a node or group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MiddlewareDef {
    pub package: String,
    pub functions: Vec<String>,
    pub exclude: Vec<String>,
}

impl MiddlewareDef {
    /// Inherit from `parent`:
    /// - drop the parent's exclusions from its functions
    /// - surviving parent functions first, then this level's own
    /// - apply this level's exclusions
    /// - keep this level's package if set, else take the parent's
    ///
    /// A child can re-add something a parent excluded by listing it again.
    pub fn merge(&mut self, parent: &MiddlewareDef) {
        if self.package.is_empty() {
            self.package = parent.package.clone();
        }
        self.functions = qualify_all(&self.package, &self.functions);
        self.exclude = qualify_all(&self.package, &self.exclude);

        let inherited = difference(&parent.functions, &parent.exclude);
        self.functions = difference(&union(&inherited, &self.functions), &self.exclude);
    }

    /// Qualified names in application order, with aliases expanded.
    pub fn function_names(&self, groups: &GroupIndex, location: &str) -> ParseResult<Vec<String>> {
        let mut names = Vec::with_capacity(self.functions.len());
        for function in &self.functions {
            match group_ref(function) {
                Some(group) => {
                    let members = groups.names(group).ok_or_else(|| unknown_group(function, location))?;
                    names.extend(members.iter().cloned());
                }
                None => names.push(qualify_name(&self.package, function)),
            }
        }
        Ok(names)
    }

    /// Resolve every function to a registered middleware.
    pub fn load_functions(
        &self,
        ctx: &BuildContext<'_>,
        location: &str,
    ) -> ParseResult<Vec<ResolvedMiddleware>> {
        let mut entries = Vec::with_capacity(self.functions.len());
        for function in &self.functions {
            if let Some(group) = group_ref(function) {
                let members = ctx
                    .groups
                    .entries(group)
                    .ok_or_else(|| unknown_group(function, location))?;
                entries.extend(members.iter().cloned());
                continue;
            }
            let name = qualify_name(&self.package, function);
            entries.push(ctx.middleware(&name, location)?);
        }
        Ok(entries)
    }
}

fn unknown_group(alias: &str, location: &str) -> ParseError {
    ParseError::reference(alias, location, "refers to an unknown middleware group")
}

#[derive(Debug, Clone, Default)]
struct Group {
    names: Vec<String>,
    entries: Vec<ResolvedMiddleware>,
}

/// Named middleware groups, resolved once per parse.
#[derive(Debug, Clone, Default)]
pub struct GroupIndex {
    groups: HashMap<String, Group>,
}

impl GroupIndex {
    /// Build the index from the document's `middlewares` section.
    ///
    /// With a registry every name is resolved and checked for the
    /// middleware role; without one only names are recorded.
    pub fn from_section(section: &Map<String, Value>, registry: Option<&Registry>) -> ParseResult<Self> {
        let mut groups = HashMap::with_capacity(section.len());

        for (key, value) in section {
            let location = format!("middlewares.{}", key);
            let def: MiddlewareDef = serde_json::from_value(value.clone()).map_err(|source| {
                ParseError::Decode {
                    location: location.clone(),
                    source,
                }
            })?;

            if let Some(alias) = def.functions.iter().find(|f| group_ref(f).is_some()) {
                return Err(ParseError::reference(
                    alias.as_str(),
                    location,
                    "group aliases cannot be used inside a middleware group",
                ));
            }

            let names = difference(
                &qualify_all(&def.package, &def.functions),
                &qualify_all(&def.package, &def.exclude),
            );

            let entries = match registry {
                Some(registry) => names
                    .iter()
                    .map(|name| resolve_middleware(registry, name, &location))
                    .collect::<ParseResult<Vec<_>>>()?,
                None => Vec::new(),
            };

            tracing::debug!(group = %key, functions = ?names, "Middleware group resolved");
            groups.insert(key.clone(), Group { names, entries });
        }

        Ok(Self { groups })
    }

    /// Qualified member names of a group.
    pub fn names(&self, group: &str) -> Option<&[String]> {
        self.groups.get(group).map(|g| g.names.as_slice())
    }

    /// Resolved members of a group. Empty when built without a registry.
    pub fn entries(&self, group: &str) -> Option<&[ResolvedMiddleware]> {
        self.groups.get(group).map(|g| g.entries.as_slice())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Role;
    use axum::extract::Request;
    use axum::response::{IntoResponse, Response};
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn handler(_req: Request) -> Response {
        "ok".into_response()
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_middleware("pkg", "Validate", |next| next);
        registry.register_middleware("other", "OtherMW", |next| next);
        registry.register_middleware("mw", "Auth", |next| next);
        registry.register_handler("api", "GetTeams", handler);
        registry
    }

    fn section(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test section must be an object"),
        }
    }

    #[test]
    fn test_group_ref() {
        assert_eq!(group_ref("$ref"), Some("ref"));
        assert_eq!(group_ref("notref"), None);
        assert_eq!(group_ref(""), None);
    }

    #[test]
    fn test_qualify_name() {
        assert_eq!(qualify_name("mw", "Auth"), "mw.Auth");
        assert_eq!(qualify_name("mw", "other.Auth"), "other.Auth");
        assert_eq!(qualify_name("mw", "$api"), "$api");
        assert_eq!(qualify_name("", "Auth"), "Auth");
    }

    #[test]
    fn test_merge_inherits_surviving_parent_functions_first() {
        let parent = MiddlewareDef {
            package: String::new(),
            functions: strings(&["Auth", "Log"]),
            exclude: strings(&["Log"]),
        };
        let mut child = MiddlewareDef {
            functions: strings(&["Trace"]),
            ..Default::default()
        };
        child.merge(&parent);
        assert_eq!(child.functions, strings(&["Auth", "Trace"]));
    }

    #[test]
    fn test_merge_child_exclude_and_readd() {
        let parent = MiddlewareDef {
            package: "mw".into(),
            functions: strings(&["mw.Auth", "mw.Log"]),
            exclude: strings(&["mw.Log"]),
        };

        let mut child = MiddlewareDef {
            functions: strings(&["Log"]),
            exclude: strings(&["Auth"]),
            ..Default::default()
        };
        child.merge(&parent);
        assert_eq!(child.package, "mw");
        assert_eq!(child.functions, strings(&["mw.Log"]));
    }

    #[test]
    fn test_merge_keeps_parent_package_on_inherited_names() {
        let mut parent = MiddlewareDef {
            package: "mw".into(),
            functions: strings(&["Auth"]),
            ..Default::default()
        };
        parent.merge(&MiddlewareDef::default());

        let mut child = MiddlewareDef {
            package: "other".into(),
            functions: strings(&["OtherMW"]),
            ..Default::default()
        };
        child.merge(&parent);
        assert_eq!(child.functions, strings(&["mw.Auth", "other.OtherMW"]));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let parent = MiddlewareDef {
            package: "mw".into(),
            functions: strings(&["mw.Auth", "mw.Log", "$api"]),
            exclude: strings(&["mw.Log"]),
        };
        let mut child = MiddlewareDef {
            functions: strings(&["Trace", "Log"]),
            exclude: strings(&["Auth"]),
            ..Default::default()
        };
        child.merge(&parent);
        let once = child.clone();
        child.merge(&parent);
        assert_eq!(child, once);
    }

    #[test]
    fn test_group_alias_expansion() {
        let registry = registry();
        let groups = GroupIndex::from_section(
            &section(json!({ "api": { "package": "pkg", "functions": ["Validate"] } })),
            Some(&registry),
        )
        .unwrap();

        let def = MiddlewareDef {
            package: "other".into(),
            functions: strings(&["$api", "OtherMW"]),
            ..Default::default()
        };
        let ctx = BuildContext {
            registry: &registry,
            groups: &groups,
        };
        let entries = def.load_functions(&ctx, "/route").unwrap();
        let names: Vec<String> = entries.iter().map(|mw| mw.name.clone()).collect();
        assert_eq!(names, strings(&["pkg.Validate", "other.OtherMW"]));

        assert_eq!(
            def.function_names(&groups, "/route").unwrap(),
            strings(&["pkg.Validate", "other.OtherMW"])
        );
    }

    #[test]
    fn test_duplicates_are_kept() {
        let registry = registry();
        let groups = GroupIndex::from_section(
            &section(json!({ "api": { "functions": ["pkg.Validate"] } })),
            Some(&registry),
        )
        .unwrap();
        let def = MiddlewareDef {
            functions: strings(&["$api", "pkg.Validate"]),
            ..Default::default()
        };
        let ctx = BuildContext {
            registry: &registry,
            groups: &groups,
        };
        assert_eq!(def.load_functions(&ctx, "/").unwrap().len(), 2);
    }

    #[test]
    fn test_load_functions_errors() {
        let registry = registry();
        let groups = GroupIndex::default();
        let ctx = BuildContext {
            registry: &registry,
            groups: &groups,
        };

        let missing = MiddlewareDef {
            package: "mw".into(),
            functions: strings(&["Missing"]),
            ..Default::default()
        };
        match missing.load_functions(&ctx, "/x") {
            Err(ParseError::Reference { name, location, .. }) => {
                assert_eq!(name, "mw.Missing");
                assert_eq!(location, "/x");
            }
            other => panic!("expected reference error, got {:?}", other),
        }

        let wrong_role = MiddlewareDef {
            functions: strings(&["api.GetTeams"]),
            ..Default::default()
        };
        assert!(matches!(
            wrong_role.load_functions(&ctx, "/x"),
            Err(ParseError::RoleMismatch {
                expected: Role::Middleware,
                actual: Role::Handler,
                ..
            })
        ));

        let unknown_group = MiddlewareDef {
            functions: strings(&["$nope"]),
            ..Default::default()
        };
        assert!(matches!(
            unknown_group.load_functions(&ctx, "/x"),
            Err(ParseError::Reference { .. })
        ));
    }

    #[test]
    fn test_group_section_errors() {
        let registry = registry();

        let nested = section(json!({ "a": { "functions": ["$b"] } }));
        assert!(matches!(
            GroupIndex::from_section(&nested, Some(&registry)),
            Err(ParseError::Reference { .. })
        ));

        let unregistered = section(json!({ "a": { "package": "mw", "functions": ["Nope"] } }));
        match GroupIndex::from_section(&unregistered, Some(&registry)) {
            Err(ParseError::Reference { location, .. }) => assert_eq!(location, "middlewares.a"),
            other => panic!("expected reference error, got {:?}", other),
        }

        let malformed = section(json!({ "a": { "functions": "Auth" } }));
        assert!(matches!(
            GroupIndex::from_section(&malformed, Some(&registry)),
            Err(ParseError::Decode { .. })
        ));
    }

    #[test]
    fn test_group_exclude_and_names_only() {
        let groups = GroupIndex::from_section(
            &section(json!({ "a": { "package": "mw", "functions": ["Auth", "Log"], "exclude": ["Log"] } })),
            None,
        )
        .unwrap();
        assert_eq!(groups.names("a").unwrap(), strings(&["mw.Auth"]).as_slice());
        assert!(groups.entries("a").unwrap().is_empty());
        assert_eq!(groups.len(), 1);
        assert!(!groups.is_empty());
        assert!(GroupIndex::from_section(&Map::new(), None).unwrap().is_empty());
    }
}
