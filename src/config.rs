//! TOML configuration support for access rules.
//!
//! Rules can be loaded from a TOML document, either embedded at compile time
//! or read from a file at runtime.
//!
//! # Example TOML Format
//!
//! ```toml
//! [[rules]]
//! methods = ["POST", "PUT", "DELETE"]
//! path = "/api/*"
//! permission = "api:write"
//!
//! [[rules]]
//! methods = "*"
//! path = "/*"
//! permission = "audit"
//! block = true
//!
//! [[rules]]
//! methods = "GET,POST"
//! path = "/*"
//! permission = ["read", "edit"]
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use rest_access::RuleStore;
//!
//! // Compile-time embedded config
//! const ACCESS_CONFIG: &str = include_str!("../access.toml");
//! let store = RuleStore::from_toml(ACCESS_CONFIG)?;
//!
//! // Or runtime file loading
//! let store = RuleStore::from_toml_file("config/access.toml")?;
//! ```

use crate::rule::{RuleDecl, RuleField};
use crate::store::RuleStore;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Ordered list of access rules. Order is the evaluation order.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// A single rule in the configuration file.
///
/// The struct shape makes the 3-or-4-field arity a non-issue for rules that
/// come from TOML; only programmatic [`RuleDecl::from_fields`] declarations
/// can be malformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Methods covered by the rule: a delimited string (`"POST,PUT"`), a
    /// list, or `"*"` for all methods.
    pub methods: StringOrList,
    /// Path pattern with `/`-separated segments; `*` segments are wildcards.
    pub path: String,
    /// Required permission expression: a delimited string or a list of
    /// scope patterns.
    pub permission: StringOrList,
    /// Whether this is a block (exclusion) rule.
    #[serde(default)]
    pub block: bool,
}

/// A string or a list of strings, for fields that accept both shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    /// A single (possibly delimited) string.
    One(String),
    /// A list of tokens.
    Many(Vec<String>),
}

impl From<StringOrList> for RuleField {
    fn from(value: StringOrList) -> Self {
        match value {
            StringOrList::One(s) => RuleField::One(s),
            StringOrList::Many(list) => RuleField::Many(list),
        }
    }
}

impl RuleConfig {
    /// Convert to a rule declaration.
    pub fn into_decl(self) -> RuleDecl {
        if self.block {
            RuleDecl::block(RuleField::from(self.methods), self.path, RuleField::from(self.permission))
        } else {
            RuleDecl::new(RuleField::from(self.methods), self.path, RuleField::from(self.permission))
        }
    }
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// File I/O error.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl RulesConfig {
    /// Parse configuration from a TOML string.
    ///
    /// # Example
    /// ```
    /// use rest_access::RulesConfig;
    ///
    /// let toml = r#"
    /// [[rules]]
    /// methods = "GET"
    /// path = "/signup/*"
    /// permission = "tool-*"
    /// "#;
    ///
    /// let config = RulesConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.rules.len(), 1);
    /// ```
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: RulesConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.path.is_empty() {
                return Err(ConfigError::Invalid(format!("rule {i}: path must not be empty")));
            }
            let empty_methods = match &rule.methods {
                StringOrList::One(s) => s.trim().is_empty(),
                StringOrList::Many(list) => list.is_empty(),
            };
            if empty_methods {
                return Err(ConfigError::Invalid(format!("rule {i}: methods must not be empty")));
            }
        }
        Ok(())
    }

    /// Convert the configuration into an ordered rule declaration list.
    pub fn into_decls(self) -> Vec<RuleDecl> {
        self.rules.into_iter().map(RuleConfig::into_decl).collect()
    }
}

impl RuleStore {
    /// Create a rule store from a TOML configuration string.
    ///
    /// # Example
    /// ```
    /// use rest_access::RuleStore;
    ///
    /// const CONFIG: &str = r#"
    /// [[rules]]
    /// methods = "*"
    /// path = "/*"
    /// permission = "audit"
    /// block = true
    ///
    /// [[rules]]
    /// methods = ["GET", "POST"]
    /// path = "/api/*"
    /// permission = "api:read,api:write"
    /// "#;
    ///
    /// let store = RuleStore::from_toml(CONFIG).unwrap();
    /// assert_eq!(store.len(), 2);
    /// ```
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config = RulesConfig::from_toml(toml_str)?;
        Ok(RuleStore::with_rules(config.into_decls()))
    }

    /// Create a rule store from a TOML configuration file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = RulesConfig::from_file(path)?;
        Ok(RuleStore::with_rules(config.into_decls()))
    }
}
