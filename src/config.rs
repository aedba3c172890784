//! Host configuration for `sdslc`, persisted as TOML.
//!
//! ```toml
//! [output]
//! pretty = true
//!
//! [provenance]
//! fixed_timestamp_ms = 1700000000000
//!
//! [context]
//! username = "sdslc"
//! is_admin = false
//! database_id = "default"
//! graph_name = "crm-facts"
//! ```

use std::path::Path;
use std::sync::Arc;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::compiler::Compiler;
use crate::ontology_image::{Clock, FixedClock, SystemClock};

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read compiler config: {path}")]
    #[diagnostic(
        code(sdsl::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse compiler config {path}: {message}")]
    #[diagnostic(
        code(sdsl::config::parse),
        help("Check the TOML syntax in the compiler config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write compiler config: {path}")]
    #[diagnostic(
        code(sdsl::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Pretty-print the bundle JSON.
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceConfig {
    /// Pin the ontology provenance timestamp. `None` uses the wall clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_timestamp_ms: Option<u64>,
}

/// Compilation context used when the host is given no compiler input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_database_id")]
    pub database_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_graph_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub provenance: ProvenanceConfig,
    #[serde(default)]
    pub context: ContextConfig,
}

fn default_pretty() -> bool {
    true
}
fn default_username() -> String {
    "sdslc".into()
}
fn default_database_id() -> String {
    "default".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: default_pretty(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            is_admin: false,
            database_id: default_database_id(),
            graph_name: None,
            output_graph_name: None,
        }
    }
}

impl CompilerConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// The `[context]` section as raw compiler input.
    ///
    /// Returned unvalidated so it goes through the same boundary check as an
    /// input file would.
    pub fn compiler_input(&self) -> Value {
        let ctx = &self.context;
        let mut input = Map::new();
        input.insert(
            "user".into(),
            serde_json::json!({"username": ctx.username, "isAdmin": ctx.is_admin}),
        );
        input.insert("databaseId".into(), Value::from(ctx.database_id.as_str()));
        if let Some(name) = &ctx.graph_name {
            input.insert("graphName".into(), Value::from(name.as_str()));
        }
        if let Some(name) = &ctx.output_graph_name {
            input.insert("outputGraphName".into(), Value::from(name.as_str()));
        }
        Value::Object(input)
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        match self.provenance.fixed_timestamp_ms {
            Some(ms) => Arc::new(FixedClock(ms)),
            None => Arc::new(SystemClock),
        }
    }

    /// A compiler wired to this configuration.
    pub fn compiler(&self) -> Compiler {
        Compiler::new().with_clock(self.clock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_compiler_input;

    #[test]
    fn default_context_is_a_valid_compiler_input() {
        let cfg = CompilerConfig::default();
        assert!(cfg.output.pretty);
        let input = validate_compiler_input(&cfg.compiler_input()).unwrap();
        assert_eq!(input.user.username, "sdslc");
        assert_eq!(input.database_id, "default");
        assert!(input.graph_name.is_none());
    }

    #[test]
    fn config_roundtrip_toml() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("sdslc.toml");

        let cfg = CompilerConfig {
            provenance: ProvenanceConfig {
                fixed_timestamp_ms: Some(1_700_000_000_000),
            },
            context: ContextConfig {
                graph_name: Some("crm-facts".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        cfg.save(&path).unwrap();

        let loaded = CompilerConfig::load(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.clock().now_unix_ms(), 1_700_000_000_000);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("sdslc.toml");
        std::fs::write(&path, "[context]\ndatabase_id = \"prod\"\n").unwrap();

        let loaded = CompilerConfig::load(&path).unwrap();
        assert_eq!(loaded.context.database_id, "prod");
        assert_eq!(loaded.context.username, "sdslc");
        assert!(loaded.output.pretty);
        assert!(loaded.provenance.fixed_timestamp_ms.is_none());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("sdslc.toml");
        std::fs::write(&path, "[output\npretty = yes").unwrap();
        assert!(matches!(
            CompilerConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            CompilerConfig::load(&tmp.path().join("absent.toml")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn empty_context_value_fails_input_validation() {
        let mut cfg = CompilerConfig::default();
        cfg.context.database_id.clear();
        let err = validate_compiler_input(&cfg.compiler_input()).unwrap_err();
        assert_eq!(err.path(), "$.databaseId");
    }
}
