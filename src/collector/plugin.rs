//! Source types declared in plugin files.
//!
//! A `Collector_<Name>` symbol describes where the value comes from:
//!
//! ```yaml
//! Collector_Entropy:
//!   kind: file
//!   path: "{procfs_root}/sys/kernel/random/entropy_avail"
//!   unit: bits
//! Collector_Uptime:
//!   kind: command
//!   command: "cut -d' ' -f1 /proc/uptime"
//!   scale: 60
//! ```
//!
//! `{key}` placeholders are filled from the input's agent parameters.

use std::path::Path;

use serde::Deserialize;

use crate::collector::command::run_shell;
use crate::collector::file::{read_file, whitespace_field};
use crate::collector::{Collector, CollectorError};
use crate::config::{Params, fill_placeholders};
use crate::metric::{DataType, Scalar, TransformMode};

/// Where a plugin source reads its raw value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PluginAcquisition {
    /// File content, optionally one whitespace-separated field of it.
    File {
        path: String,
        #[serde(default)]
        field: Option<usize>,
    },
    /// Standard output of a shell command.
    Command { command: String },
}

/// Body of a `Collector_<Name>` symbol.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CollectorDefinition {
    #[serde(flatten)]
    pub acquisition: PluginAcquisition,
    /// Divisor applied to the raw value.
    #[serde(default)]
    pub scale: Option<f64>,
    /// Transform mode forced on every input of this type.
    #[serde(default)]
    pub calcmode: Option<TransformMode>,
    /// Unit appended to the human-readable value.
    #[serde(default)]
    pub unit: Option<String>,
}

/// Collector built from a [`CollectorDefinition`].
#[derive(Debug, Clone)]
pub struct PluginCollector {
    kind: String,
    acquisition: PluginAcquisition,
    scale: Option<f64>,
    forced: Option<TransformMode>,
    unit: Option<String>,
}

impl PluginCollector {
    /// Instantiate a definition for one input, filling placeholders from `params`.
    pub fn new(
        kind: &str,
        definition: &CollectorDefinition,
        params: &Params,
    ) -> Result<Self, CollectorError> {
        let fill = |template: &str| {
            fill_placeholders(template, |key| params.get_str(key))
                .map_err(|e| CollectorError::Config(format!("{}: {}", kind, e)))
        };

        let acquisition = match &definition.acquisition {
            PluginAcquisition::File { path, field } => PluginAcquisition::File {
                path: fill(path)?,
                field: *field,
            },
            PluginAcquisition::Command { command } => PluginAcquisition::Command {
                command: fill(command)?,
            },
        };

        if definition.scale.is_some_and(|s| s == 0.0 || !s.is_finite()) {
            return Err(CollectorError::Config(format!(
                "{}: scale must be a finite non-zero number",
                kind
            )));
        }

        Ok(Self {
            kind: kind.to_string(),
            acquisition,
            scale: definition.scale,
            forced: definition.calcmode,
            unit: definition.unit.clone(),
        })
    }

    async fn read_raw(&self) -> Result<Scalar, CollectorError> {
        match &self.acquisition {
            PluginAcquisition::File { path, field } => {
                let content = read_file(Path::new(path)).await?;
                match field {
                    Some(index) => Ok(Scalar::raw_text(whitespace_field(&content, *index)?)),
                    None => Ok(Scalar::raw_text(&content)),
                }
            }
            PluginAcquisition::Command { command } => Ok(Scalar::raw_text(&run_shell(command).await?)),
        }
    }
}

#[async_trait::async_trait]
impl Collector for PluginCollector {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn forced_mode(&self) -> Option<TransformMode> {
        self.forced
    }

    async fn acquire(&self, _elapsed_secs: f64) -> Result<Scalar, CollectorError> {
        let raw = self.read_raw().await?;
        let Some(divisor) = self.scale else {
            return Ok(raw);
        };
        raw.as_f64()
            .map(|v| Scalar::Float(v / divisor))
            .ok_or_else(|| CollectorError::Parse(format!("{}: '{}' is not numeric", self.kind, raw)))
    }

    fn render(&self, derived: &Scalar, data_type: DataType) -> Option<String> {
        let unit = self.unit.as_deref()?;
        let value = derived.coerce(data_type).ok()?;
        Some(format!("{} {}", value, unit))
    }
}
