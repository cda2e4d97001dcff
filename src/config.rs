//! Audit configuration: TOML file, then environment overrides, then checks.

use serde::{Serialize, Deserialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const ENV_FUND_ID: &str = "KEYGRAPH_FUND_ID";
pub const ENV_REPORT_CYCLES: &str = "KEYGRAPH_REPORT_CYCLES";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid TOML config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {msg}")]
    Invalid { field: &'static str, msg: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Emit `CyclicDependency` for references inside a cycle.
    pub report_cycles: bool,
    /// Violations whose dependency key contains any of these are hidden from
    /// rendering. They stay in the full violation list.
    pub suppressed_dependencies: Vec<String>,
    /// Restrict the run to one fund.
    pub fund_id: Option<String>,
    /// Audit each fund as its own run on the rayon pool.
    pub parallel: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            report_cycles: true,
            suppressed_dependencies: Vec::new(),
            fund_id: None,
            parallel: false,
        }
    }
}

impl AuditConfig {
    /// Loads `path` if given and present, applies environment overrides and
    /// validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let config = Self::load_from_file(path)?;
                info!("Configuration loaded from file: {:?}", path);
                config
            }
            Some(path) => {
                warn!("Configuration file not found: {:?}, using defaults", path);
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;

        debug!("Final configuration: {:?}", config);
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// `lookup` resolves an environment variable name to its value.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(fund) = lookup(ENV_FUND_ID) {
            debug!("Override fund id from environment");
            self.fund_id = Some(fund);
        }

        if let Some(flag) = lookup(ENV_REPORT_CYCLES) {
            self.report_cycles = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(ConfigError::Invalid {
                        field: ENV_REPORT_CYCLES,
                        msg: format!("expected a boolean, got '{}'", other),
                    })
                }
            };
            debug!("Override cycle reporting from environment");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.suppressed_dependencies.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "suppressed_dependencies",
                msg: "patterns must not be empty".into(),
            });
        }
        if matches!(&self.fund_id, Some(f) if f.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "fund_id",
                msg: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// True when a violation on `dependency_key` should be hidden.
    pub fn is_suppressed(&self, dependency_key: &str) -> bool {
        self.suppressed_dependencies
            .iter()
            .any(|pattern| dependency_key.contains(pattern.as_str()))
    }
}
