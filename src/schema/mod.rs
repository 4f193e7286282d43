//! Versioned schema table and document validation.
//!
//! # Responsibilities
//! - Hold the JSON schema text for every supported document version
//! - Reject malformed (`x.y.z`) and unknown version strings
//! - Validate a document, reporting the first violation
//!
//! # Design Decisions
//! - Schemas are compiled into the binary, keyed by semantic version
//! - Validation is a pure check over a parsed `serde_json::Value`

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;

use crate::error::{ParseError, ParseResult};

/// Version used when none is configured.
pub const DEFAULT_VERSION: &str = "0.1.0";

/// Every known schema, keyed by version.
pub const SCHEMA_VERSIONS: &[(&str, &str)] = &[("0.1.0", include_str!("v0_1_0.json"))];

static VERSION_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").expect("version pattern is valid"));

/// Schema text registered for `version`, if any.
pub fn schema_text(version: &str) -> Option<&'static str> {
    SCHEMA_VERSIONS
        .iter()
        .find(|(v, _)| *v == version)
        .map(|(_, text)| *text)
}

/// Check that `version` is well formed and known.
pub fn check_version(version: &str) -> ParseResult<&'static str> {
    if !VERSION_FORMAT.is_match(version) {
        return Err(version_error(version, "version string not in form x.y.z"));
    }
    schema_text(version).ok_or_else(|| version_error(version, "no schema registered for this version"))
}

fn version_error(version: &str, reason: impl Into<String>) -> ParseError {
    ParseError::SchemaVersion {
        version: version.to_string(),
        reason: reason.into(),
    }
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON pointer to the offending value.
    pub path: String,
    pub message: String,
}

impl From<Violation> for ParseError {
    fn from(v: Violation) -> Self {
        ParseError::Validation {
            path: v.path,
            message: v.message,
        }
    }
}

/// A compiled schema for one document version.
#[derive(Clone)]
pub struct Schema {
    version: String,
    validator: Arc<jsonschema::Validator>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").field("version", &self.version).finish()
    }
}

impl Schema {
    /// Compile the schema registered for `version`.
    pub fn load(version: &str) -> ParseResult<Self> {
        let text = check_version(version)?;
        let schema: Value = serde_json::from_str(text)
            .map_err(|e| version_error(version, format!("schema text is not valid JSON: {}", e)))?;
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| version_error(version, format!("schema does not compile: {}", e)))?;

        Ok(Self {
            version: version.to_string(),
            validator: Arc::new(validator),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Every violation in `document`, empty if it is valid.
    pub fn violations(&self, document: &Value) -> Vec<Violation> {
        self.validator
            .iter_errors(document)
            .map(|e| Violation {
                path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect()
    }

    /// Fail with the first violation, if any.
    pub fn validate(&self, document: &Value) -> ParseResult<()> {
        match self.violations(document).into_iter().next() {
            Some(violation) => Err(violation.into()),
            None => Ok(()),
        }
    }
}

/// Validate `document` against the schema registered for `version`.
pub fn validate(document: &Value, version: &str) -> ParseResult<()> {
    Schema::load(version)?.validate(document)
}
