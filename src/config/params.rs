//! Free-form, type-specific parameters of inputs and outputs.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Type-specific parameter map (the `agent:` block of an input, or the
/// remaining keys of an output).
///
/// Each implementation deserializes its own typed view with [`Params::parse`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Mapping);

impl Params {
    /// Create an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(Value::String(key.to_string()), value.into());
        self
    }

    /// Deserialize the parameters into a typed structure.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_yaml::Error> {
        serde_yaml::from_value(Value::Mapping(self.0.clone()))
    }

    /// Whether a parameter is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Scalar parameter rendered as a string (numbers and booleans included).
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        interface: String,
        #[serde(default)]
        index: u8,
    }

    #[test]
    fn test_params_parse() {
        let params = Params::new().with("interface", "eth0").with("index", 2);
        let probe: Probe = params.parse().unwrap();
        assert_eq!(probe.interface, "eth0");
        assert_eq!(probe.index, 2);
    }

    #[test]
    fn test_params_get_str() {
        let params = Params::new().with("index", 1).with("file", "/tmp/x");
        assert_eq!(params.get_str("index").as_deref(), Some("1"));
        assert_eq!(params.get_str("file").as_deref(), Some("/tmp/x"));
        assert!(params.get_str("missing").is_none());
        assert!(params.contains("file"));
    }

    #[test]
    fn test_params_parse_missing_field() {
        assert!(Params::new().parse::<Probe>().is_err());
    }
}
