//! Metric values and the derived-value engine.
//!
//! - [`Scalar`]: a raw or derived measurement (integer, float or text)
//! - [`DataType`]: the type a source declares for its published value
//! - [`TransformMode`]: how a raw sample (and the previous one) becomes the published value
//! - [`SampleState`]: per-source memory of the last raw sample and the current derived value

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Divisor used by the `div_by_1024` family of modes.
const KIBI: f64 = 1024.0;

/// Divisor used by `div_by_1024_1024`.
const MEBI: f64 = 1_048_576.0;

/// Errors raised while deriving or coercing a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeriveError {
    /// An arithmetic mode received a value that is not a number.
    #[error("value '{0}' is not numeric")]
    NotNumeric(String),

    /// The value cannot be represented in the requested data type.
    #[error("cannot convert '{value}' to {target}")]
    Coerce { value: String, target: DataType },
}

/// A single measurement.
///
/// Serializes untagged, so JSON output carries plain numbers and strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Parse trimmed text, preferring integer, then float, then raw text.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Ok(v) = text.parse::<i64>() {
            Self::Int(v)
        } else if let Ok(v) = text.parse::<f64>() {
            Self::Float(v)
        } else {
            Self::Text(text.to_string())
        }
    }

    /// Acquired text, trimmed and kept verbatim.
    ///
    /// Numbers are parsed out of it only when a mode or a coercion needs them.
    pub fn raw_text(text: &str) -> Self {
        Self::Text(text.trim().to_string())
    }

    /// Numeric view of the value, parsing text if needed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    fn numeric(&self) -> Result<Self, DeriveError> {
        match self {
            Self::Int(_) | Self::Float(_) => Ok(self.clone()),
            Self::Text(s) => match Self::parse(s) {
                Self::Text(_) => Err(DeriveError::NotNumeric(s.clone())),
                parsed => Ok(parsed),
            },
        }
    }

    /// Convert to the declared data type without touching the stored value.
    ///
    /// Floats are truncated toward zero when converted to `int`.
    pub fn coerce(&self, target: DataType) -> Result<Self, DeriveError> {
        let fail = || DeriveError::Coerce {
            value: self.to_string(),
            target,
        };
        match target {
            DataType::String => Ok(Self::Text(self.to_string())),
            DataType::Float => self
                .as_f64()
                .filter(|v| v.is_finite())
                .map(Self::Float)
                .ok_or_else(fail),
            DataType::Int => match self.numeric().map_err(|_| fail())? {
                Self::Int(v) => Ok(Self::Int(v)),
                Self::Float(v) if v.is_finite() && v.abs() < i64::MAX as f64 => {
                    Ok(Self::Int(v.trunc() as i64))
                }
                _ => Err(fail()),
            },
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            // Debug keeps the trailing ".0" on integral floats.
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Scalar> for serde_json::Value {
    fn from(v: Scalar) -> Self {
        match v {
            Scalar::Int(i) => serde_json::Value::from(i),
            Scalar::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Scalar::Text(s) => serde_json::Value::String(s),
        }
    }
}

/// Declared type of a metric source's published value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DataType {
    Int,
    Float,
    #[serde(alias = "str")]
    String,
}

/// Function applied to raw samples to produce the published value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, AsRefStr,
)]
pub enum TransformMode {
    /// The raw value as is.
    #[default]
    #[serde(rename = "passthrough", alias = "passthroug")]
    #[strum(to_string = "passthrough")]
    Passthrough,
    /// raw / 1024
    #[serde(rename = "div_by_1024")]
    #[strum(to_string = "div_by_1024")]
    DivBy1024,
    /// raw / 1024²
    #[serde(rename = "div_by_1024_1024")]
    #[strum(to_string = "div_by_1024_1024")]
    DivBy1048576,
    /// raw - previous
    #[serde(rename = "increment")]
    #[strum(to_string = "increment")]
    Increment,
    /// (raw - previous) / elapsed seconds
    #[serde(rename = "increment_in_sec", alias = "increment_per_second")]
    #[strum(to_string = "increment_in_sec")]
    IncrementPerSecond,
    /// (raw - previous) * 60 / elapsed seconds
    #[serde(rename = "increment_in_minute", alias = "increment_per_minute")]
    #[strum(to_string = "increment_in_minute")]
    IncrementPerMinute,
}

impl TransformMode {
    /// Whether the mode divides by the elapsed time.
    pub fn is_rate(self) -> bool {
        matches!(self, Self::IncrementPerSecond | Self::IncrementPerMinute)
    }

    /// Derive the published value.
    ///
    /// Returns `Ok(None)` when the mode's precondition does not hold: no
    /// previous sample, or zero elapsed time for a rate.
    pub fn apply(
        self,
        raw: &Scalar,
        previous: Option<&Scalar>,
        elapsed_secs: f64,
    ) -> Result<Option<Scalar>, DeriveError> {
        let as_float = |s: &Scalar| {
            s.numeric()
                .map(|n| n.as_f64().unwrap_or_default())
        };

        match self {
            Self::Passthrough => Ok(Some(raw.clone())),
            Self::DivBy1024 => Ok(Some(Scalar::Float(as_float(raw)? / KIBI))),
            Self::DivBy1048576 => Ok(Some(Scalar::Float(as_float(raw)? / MEBI))),
            Self::Increment | Self::IncrementPerSecond | Self::IncrementPerMinute => {
                let current = raw.numeric()?;
                let Some(previous) = previous else {
                    return Ok(None);
                };
                let previous = previous.numeric()?;
                if self.is_rate() && elapsed_secs == 0.0 {
                    return Ok(None);
                }

                if self == Self::Increment {
                    if let (Scalar::Int(c), Scalar::Int(p)) = (&current, &previous) {
                        if let Some(delta) = c.checked_sub(*p) {
                            return Ok(Some(Scalar::Int(delta)));
                        }
                    }
                }

                let delta = as_float(&current)? - as_float(&previous)?;
                Ok(Some(Scalar::Float(match self {
                    Self::IncrementPerSecond => delta / elapsed_secs,
                    Self::IncrementPerMinute => delta * 60.0 / elapsed_secs,
                    _ => delta,
                })))
            }
        }
    }
}

/// Per-source sampling memory.
///
/// Holds only the single previous raw sample; there is no history.
#[derive(Debug, Clone, Default)]
pub struct SampleState {
    raw: Option<Scalar>,
    previous: Option<Scalar>,
    derived: Option<Scalar>,
}

impl SampleState {
    /// Record a fresh raw sample and recompute the derived value.
    ///
    /// `raw` is `None` when acquisition failed. The previous sample is replaced
    /// by `raw` on every call, whether or not a value could be derived.
    pub fn advance(
        &mut self,
        mode: TransformMode,
        raw: Option<Scalar>,
        elapsed_secs: f64,
    ) -> Result<Option<&Scalar>, DeriveError> {
        let previous = self.previous.take();
        let result = match &raw {
            Some(value) => mode.apply(value, previous.as_ref(), elapsed_secs),
            None => Ok(None),
        };

        self.previous = raw.clone();
        self.raw = raw;
        self.derived = result.as_ref().ok().cloned().flatten();

        result.map(|_| self.derived.as_ref())
    }

    /// Latest raw sample.
    pub fn raw(&self) -> Option<&Scalar> {
        self.raw.as_ref()
    }

    /// Raw sample the next call will compare against.
    pub fn previous_raw(&self) -> Option<&Scalar> {
        self.previous.as_ref()
    }

    /// Current derived value, `None` when undefined.
    pub fn derived(&self) -> Option<&Scalar> {
        self.derived.as_ref()
    }
}
