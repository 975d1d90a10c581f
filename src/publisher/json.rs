//! Structured JSON object keyed by shortname.

use serde_json::{Map, Value};

use crate::collector::MetricSource;
use crate::config::Params;
use crate::database::DatabaseSet;
use crate::publisher::{OutputTarget, PublishError, Publisher, Render, TextPublisher};

/// `{shortname: value}` for every keyed source with a defined value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Json {
    pub const KIND: &'static str = "Json";

    /// Registry constructor.
    pub fn from_params(params: &Params, _: &DatabaseSet) -> Result<Box<dyn Publisher>, PublishError> {
        let target = OutputTarget::from_params(Self::KIND, params)?;
        Ok(Box::new(TextPublisher::new(Self::KIND, Box::new(Self), target)))
    }
}

impl Render for Json {
    fn render(&self, sources: &[MetricSource]) -> Result<String, PublishError> {
        let object: Map<String, Value> = sources
            .iter()
            .filter_map(MetricSource::keyed_value)
            .map(|(key, value)| (key.to_string(), Value::from(value)))
            .collect();
        Ok(serde_json::to_string(&object)?)
    }
}
