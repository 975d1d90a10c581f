//! Metric source: a collector plus the derived-value engine.

use crate::collector::Collector;
use crate::metric::{DataType, SampleState, Scalar, TransformMode};

/// Rendering of an undefined value.
pub const NOT_AVAILABLE: &str = "NA";

/// A named, typed producer of one measurement per sampling cycle.
pub struct MetricSource {
    name: String,
    shortname: String,
    data_type: DataType,
    mode: TransformMode,
    collector: Box<dyn Collector>,
    state: SampleState,
}

impl std::fmt::Debug for MetricSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricSource")
            .field("name", &self.name)
            .field("shortname", &self.shortname)
            .field("kind", &self.collector.kind())
            .field("data_type", &self.data_type)
            .field("mode", &self.mode)
            .field("state", &self.state)
            .finish()
    }
}

impl MetricSource {
    /// Create a source. A collector's forced mode replaces `mode`.
    pub fn new(
        name: impl Into<String>,
        shortname: impl Into<String>,
        data_type: DataType,
        mode: TransformMode,
        collector: Box<dyn Collector>,
    ) -> Self {
        let name = name.into();
        let mode = match collector.forced_mode() {
            Some(forced) if forced != mode => {
                tracing::debug!(source = %name, configured = %mode, forced = %forced, "Collector overrides calcmode");
                forced
            }
            _ => mode,
        };

        Self {
            name,
            shortname: shortname.into(),
            data_type,
            mode,
            collector,
            state: SampleState::default(),
        }
    }

    /// Display label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key for keyed sinks; empty when the source is excluded from them.
    pub fn shortname(&self) -> &str {
        &self.shortname
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Effective transform mode.
    pub fn mode(&self) -> TransformMode {
        self.mode
    }

    pub fn kind(&self) -> &str {
        self.collector.kind()
    }

    /// Take a fresh sample and derive the published value.
    ///
    /// Never fails: acquisition and derivation errors are logged and leave the
    /// value undefined for this cycle.
    pub async fn sample(&mut self, elapsed_secs: f64) -> Option<&Scalar> {
        let raw = match self.collector.acquire(elapsed_secs).await {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::warn!(source = %self.name, kind = %self.collector.kind(), error = %e, "Acquisition failed");
                None
            }
        };

        match self.state.advance(self.mode, raw, elapsed_secs) {
            Ok(derived) => {
                tracing::debug!(source = %self.name, elapsed_secs, value = ?derived, "Sampled");
                derived
            }
            Err(e) => {
                tracing::warn!(source = %self.name, mode = %self.mode, error = %e, "Cannot derive value");
                None
            }
        }
    }

    /// Latest raw sample.
    pub fn raw(&self) -> Option<&Scalar> {
        self.state.raw()
    }

    /// Current derived value, `None` when undefined.
    pub fn derived(&self) -> Option<&Scalar> {
        self.state.derived()
    }

    /// Derived value coerced to the declared data type.
    ///
    /// `None` when undefined or when the coercion fails.
    pub fn typed_value(&self) -> Option<Scalar> {
        let derived = self.state.derived()?;
        derived
            .coerce(self.data_type)
            .inspect_err(|e| tracing::warn!(source = %self.name, error = %e, "Cannot coerce value"))
            .ok()
    }

    /// Whether the source belongs in keyed outputs (JSON, table rows).
    pub fn is_keyed(&self) -> bool {
        !self.shortname.is_empty()
    }

    /// Keyed entry: shortname and typed value, if both exist.
    pub fn keyed_value(&self) -> Option<(&str, Scalar)> {
        if !self.is_keyed() {
            return None;
        }
        self.typed_value().map(|v| (self.shortname.as_str(), v))
    }

    /// Human-readable value, `NA` when undefined.
    pub fn nice_result(&self) -> String {
        let Some(derived) = self.state.derived() else {
            return NOT_AVAILABLE.to_string();
        };
        if let Some(text) = self.collector.render(derived, self.data_type) {
            return text;
        }
        self.typed_value()
            .map(|v| v.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}
