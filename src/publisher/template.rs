//! Sink types declared in plugin files.
//!
//! A `Publisher_<Name>` symbol renders the metric set from text templates:
//!
//! ```yaml
//! Publisher_Csv:
//!   kind: template
//!   header: "# {timestamp}"
//!   line: "{shortname};{value}"
//! ```
//!
//! `header` and `footer` see `{timestamp}`; `line` also sees `{name}`,
//! `{shortname}` and `{value}` (the human-readable value, `NA` when undefined).

use chrono::Local;
use serde::Deserialize;

use crate::collector::MetricSource;
use crate::config::fill_placeholders;
use crate::publisher::{PublishError, Render};

/// Body of a `Publisher_<Name>` symbol.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PublisherDefinition {
    Template {
        #[serde(default)]
        header: Option<String>,
        line: String,
        #[serde(default)]
        footer: Option<String>,
    },
}

/// Renderer built from a [`PublisherDefinition`].
#[derive(Debug, Clone)]
pub struct TemplateRender {
    header: Option<String>,
    line: String,
    footer: Option<String>,
}

impl TemplateRender {
    pub fn new(definition: &PublisherDefinition) -> Self {
        let PublisherDefinition::Template {
            header,
            line,
            footer,
        } = definition;
        Self {
            header: header.clone(),
            line: line.clone(),
            footer: footer.clone(),
        }
    }

    fn render_at(&self, sources: &[MetricSource], timestamp: &str) -> Result<String, PublishError> {
        let fill = |template: &str, source: Option<&MetricSource>| {
            fill_placeholders(template, |key| match (key, source) {
                ("timestamp", _) => Some(timestamp.to_string()),
                ("name", Some(s)) => Some(s.name().to_string()),
                ("shortname", Some(s)) => Some(s.shortname().to_string()),
                ("value", Some(s)) => Some(s.nice_result()),
                _ => None,
            })
            .map_err(PublishError::Config)
        };

        let mut lines = Vec::with_capacity(sources.len() + 2);
        if let Some(header) = &self.header {
            lines.push(fill(header, None)?);
        }
        for source in sources {
            lines.push(fill(&self.line, Some(source))?);
        }
        if let Some(footer) = &self.footer {
            lines.push(fill(footer, None)?);
        }
        Ok(lines.join("\n"))
    }
}

impl Render for TemplateRender {
    fn render(&self, sources: &[MetricSource]) -> Result<String, PublishError> {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.render_at(sources, &now)
    }
}
