//! Runtime configuration (introspectable.toml)
//!
//! ```toml
//! [proxy]
//! class_name_prefix = "$Proxy"
//! cache_classes = true
//!
//! [annotation]
//! cache_hash_code = true
//! cache_representation = true
//! ```
//!
//! Every key is optional. The process-wide configuration is fixed by the
//! first call to [`IntrospectionConfig::install`] or
//! [`IntrospectionConfig::current`], whichever comes first.

use std::path::Path;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static INSTALLED: OnceCell<IntrospectionConfig> = OnceCell::new();

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to render TOML
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// A configuration is already in effect
    #[error("Configuration already installed")]
    AlreadyInstalled,
}

/// Configuration root
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IntrospectionConfig {
    /// Proxy engine settings
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Annotation builder settings
    #[serde(default)]
    pub annotation: AnnotationConfig,
}

/// Proxy engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyConfig {
    /// Name prefix of synthesized proxy classes (default: "$Proxy")
    #[serde(default = "default_class_name_prefix")]
    pub class_name_prefix: String,

    /// Share one synthesized class per contract set (default: true)
    #[serde(default = "default_true")]
    pub cache_classes: bool,
}

fn default_class_name_prefix() -> String {
    "$Proxy".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            class_name_prefix: default_class_name_prefix(),
            cache_classes: true,
        }
    }
}

/// Annotation builder settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotationConfig {
    /// Compute an instance's hash once (default: true)
    #[serde(default = "default_true")]
    pub cache_hash_code: bool,

    /// Render an instance's text once (default: true)
    #[serde(default = "default_true")]
    pub cache_representation: bool,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            cache_hash_code: true,
            cache_representation: true,
        }
    }
}

impl IntrospectionConfig {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: IntrospectionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.proxy.class_name_prefix;
        if prefix.is_empty() {
            return Err(ConfigError::ValidationError(
                "proxy.class_name_prefix cannot be empty".to_string(),
            ));
        }
        if prefix.chars().any(|c| c.is_whitespace() || "()[],".contains(c)) {
            return Err(ConfigError::ValidationError(format!(
                "proxy.class_name_prefix '{}' contains characters not allowed in class names",
                prefix
            )));
        }
        Ok(())
    }

    /// Make this the process-wide configuration
    pub fn install(self) -> Result<(), ConfigError> {
        self.validate()?;
        INSTALLED
            .set(self)
            .map_err(|_| ConfigError::AlreadyInstalled)?;
        tracing::debug!("installed introspection configuration");
        Ok(())
    }

    /// Process-wide configuration; the default when none was installed
    pub fn current() -> &'static IntrospectionConfig {
        INSTALLED.get_or_init(IntrospectionConfig::default)
    }
}
