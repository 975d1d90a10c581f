//! Agent configuration structures.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::RunMode;
use crate::metric::{DataType, TransformMode};
use crate::scheduler::{IntervalRule, IntervalScheduler};

use super::params::Params;
use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Constants
// =============================================================================

/// Default sampling interval in seconds.
pub const DEFAULT_INTERVAL_SECS: f64 = 5.0;

/// Default priority of a conditional interval rule.
pub const DEFAULT_RULE_PRIORITY: i64 = 1;

/// Parameter key that links an input or output to a declared database.
pub const DATABASE_REF_KEY: &str = "database_ref";

fn default_interval() -> f64 {
    DEFAULT_INTERVAL_SECS
}

fn default_priority() -> i64 {
    DEFAULT_RULE_PRIORITY
}

// =============================================================================
// Databases
// =============================================================================

/// A relational backend that inputs and outputs refer to by `refname`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Backend type name (e.g. `Mysql`, `Pgsql`, `Sqlite`).
    #[serde(rename = "type")]
    pub type_name: String,
    /// Unique reference name.
    pub refname: String,
    /// Host, optionally with `:port`.
    #[serde(default)]
    pub host: String,
    /// Database name (file path for SQLite).
    pub name: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl DatabaseConfig {
    /// Copy with `${VAR}` references expanded in host and credentials.
    pub fn expanded(&self) -> Self {
        Self {
            host: expand_env_vars(&self.host),
            user: expand_env_vars(&self.user),
            password: expand_env_vars(&self.password),
            ..self.clone()
        }
    }
}

// =============================================================================
// Collector loop
// =============================================================================

/// A time-scoped override of the baseline interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CondIntervalConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Three-letter or full weekday name, case-insensitive.
    #[serde(default)]
    pub dayofweek: Option<String>,
    #[serde(default)]
    pub from_h: Option<u32>,
    #[serde(default)]
    pub until_h: Option<u32>,
    #[serde(default = "default_priority")]
    pub priority: i64,
    /// Interval in seconds while the rule is selected.
    pub interval: f64,
}

impl CondIntervalConfig {
    /// Validate and convert into a scheduler rule.
    pub fn to_rule(&self) -> Result<IntervalRule, ConfigError> {
        let label = self.name.as_deref().unwrap_or("<unnamed>");
        let invalid = |msg: String| {
            ConfigError::ValidationError(format!("cond_interval '{}': {}", label, msg))
        };

        let mut rule = IntervalRule::new(self.interval).with_priority(self.priority);
        if let Some(name) = &self.name {
            rule = rule.named(name);
        }
        if let Some(day) = &self.dayofweek {
            let day = day
                .trim()
                .parse::<chrono::Weekday>()
                .map_err(|_| invalid(format!("invalid dayofweek '{}'", day)))?;
            rule = rule.on(day);
        }
        if let Some(h) = self.from_h {
            if h > 23 {
                return Err(invalid(format!("from_h {} out of range 0..=23", h)));
            }
            rule = rule.from_hour(h);
        }
        if let Some(h) = self.until_h {
            if h > 23 {
                return Err(invalid(format!("until_h {} out of range 0..=23", h)));
            }
            rule = rule.until_hour(h);
        }
        if !is_sleepable(self.interval) {
            return Err(invalid(format!("invalid interval {}", self.interval)));
        }

        Ok(rule)
    }
}

/// Whether `secs` is a non-negative interval a timer can wait for.
fn is_sleepable(secs: f64) -> bool {
    Duration::try_from_secs_f64(secs).is_ok()
}

/// Sampling loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Baseline interval in seconds (default: 5).
    #[serde(default = "default_interval")]
    pub interval: f64,
    /// Run mode (default: once).
    #[serde(default)]
    pub runmode: RunMode,
    #[serde(default)]
    pub cond_intervals: Vec<CondIntervalConfig>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL_SECS,
            runmode: RunMode::default(),
            cond_intervals: Vec::new(),
        }
    }
}

impl CollectorConfig {
    /// Build the interval scheduler described by this section.
    pub fn scheduler(&self) -> Result<IntervalScheduler, ConfigError> {
        if !is_sleepable(self.interval) {
            return Err(ConfigError::ValidationError(format!(
                "collector interval must be a non-negative number of seconds, got {}",
                self.interval
            )));
        }

        let rules = self
            .cond_intervals
            .iter()
            .map(CondIntervalConfig::to_rule)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(IntervalScheduler::new(self.interval).with_rules(rules))
    }
}

// =============================================================================
// Inputs and outputs
// =============================================================================

/// Acquisition agent of an input: the source type plus its parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Source type name (e.g. `ReadFileData`).
    pub agentname: String,
    /// Remaining, type-specific keys.
    #[serde(flatten)]
    pub params: Params,
}

/// A metric source declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Display label.
    pub name: String,
    /// Key used by keyed sinks; empty excludes the source from them.
    #[serde(default)]
    pub shortname: String,
    /// Declared data type.
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Transform mode (default: passthrough).
    #[serde(default)]
    pub calcmode: TransformMode,
    pub agent: AgentSpec,
}

/// A publisher sink declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Sink type name (e.g. `Json`).
    #[serde(rename = "type")]
    pub type_name: String,
    /// Remaining, type-specific keys.
    #[serde(flatten)]
    pub params: Params,
}

// =============================================================================
// Application configuration
// =============================================================================

/// Everything under the `config` root key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub databases: Vec<DatabaseConfig>,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub inputs: Vec<InputConfig>,
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
    /// Directory searched for `plugin_<Name>.yaml` files (default: current directory).
    #[serde(default)]
    pub plugin_dir: Option<PathBuf>,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub config: AgentConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cfg = &self.config;

        let mut refnames = HashSet::new();
        for db in &cfg.databases {
            if db.refname.is_empty() {
                return Err(ConfigError::ValidationError(
                    "database refname cannot be empty".to_string(),
                ));
            }
            if !refnames.insert(db.refname.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate database refname: '{}'",
                    db.refname
                )));
            }
        }

        cfg.collector.scheduler()?;

        let check_ref = |owner: String, params: &Params| -> Result<(), ConfigError> {
            match params.get_str(DATABASE_REF_KEY) {
                Some(r) if !refnames.contains(r.as_str()) => Err(ConfigError::ValidationError(
                    format!("{}: unknown database_ref '{}'", owner, r),
                )),
                _ => Ok(()),
            }
        };

        for input in &cfg.inputs {
            if input.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "input name cannot be empty".to_string(),
                ));
            }
            if input.agent.agentname.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "input '{}': agentname cannot be empty",
                    input.name
                )));
            }
            check_ref(format!("input '{}'", input.name), &input.agent.params)?;
        }

        for output in &cfg.outputs {
            if output.type_name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "output type cannot be empty".to_string(),
                ));
            }
            check_ref(format!("output '{}'", output.type_name), &output.params)?;
        }

        Ok(())
    }
}
