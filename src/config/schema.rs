//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::schema::DEFAULT_VERSION;

/// Root configuration for the route compiler.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Schema version definitions are validated against (`x.y.z`).
    pub schema_version: String,

    /// Validate documents before parsing.
    pub validate: bool,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            schema_version: DEFAULT_VERSION.to_string(),
            validate: true,
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ParserConfig::default();
        assert_eq!(config.schema_version, "0.1.0");
        assert!(config.validate);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ParserConfig = toml::from_str("validate = false").unwrap();
        assert!(!config.validate);
        assert_eq!(config.schema_version, DEFAULT_VERSION);

        let config: ParserConfig = toml::from_str("[observability]\nlog_level = \"debug\"").unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.validate);
    }
}
