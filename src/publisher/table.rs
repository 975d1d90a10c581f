//! Human-readable free-text block.

use chrono::Local;

use crate::collector::MetricSource;
use crate::config::Params;
use crate::database::DatabaseSet;
use crate::publisher::{OutputTarget, PublishError, Publisher, Render, TextPublisher};

const START_MARKER: &str = "---------- start ----------";
const END_MARKER: &str = "---------- end ----------";

/// One `name = value` line per source between start and end markers.
///
/// Every source is listed, undefined values as `NA`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NiceTable;

impl NiceTable {
    pub const KIND: &'static str = "NiceTable";

    /// Registry constructor.
    pub fn from_params(params: &Params, _: &DatabaseSet) -> Result<Box<dyn Publisher>, PublishError> {
        let target = OutputTarget::from_params(Self::KIND, params)?;
        Ok(Box::new(TextPublisher::new(Self::KIND, Box::new(Self), target)))
    }

    fn render_at(&self, sources: &[MetricSource], timestamp: &str) -> String {
        let mut out = format!("{}\n{}\n", START_MARKER, timestamp);
        for source in sources {
            out.push_str(&format!("{} = {}\n", source.name(), source.nice_result()));
        }
        out.push_str(END_MARKER);
        out.push('\n');
        out
    }
}

impl Render for NiceTable {
    fn render(&self, sources: &[MetricSource]) -> Result<String, PublishError> {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string();
        Ok(self.render_at(sources, &now))
    }
}
