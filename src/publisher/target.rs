//! Destinations of text publishers.

use std::path::PathBuf;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use crate::collector::MetricSource;
use crate::config::Params;
use crate::publisher::traits::parse_params;
use crate::publisher::{PublishError, Publisher, Render};

#[derive(Debug, Default, Deserialize)]
struct TargetParams {
    #[serde(default)]
    outputfile: Option<PathBuf>,
    #[serde(default)]
    appendfile: Option<PathBuf>,
}

/// Where a rendered metric set goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    #[default]
    Stdout,
    /// Replace the file content on every publish.
    Overwrite(PathBuf),
    /// Append to the file on every publish.
    Append(PathBuf),
}

impl OutputTarget {
    /// Pick the target from `outputfile` / `appendfile`; `appendfile` wins.
    pub fn from_params(kind: &str, params: &Params) -> Result<Self, PublishError> {
        let p: TargetParams = parse_params(kind, params)?;
        Ok(match (p.appendfile, p.outputfile) {
            (Some(path), _) => Self::Append(path),
            (None, Some(path)) => Self::Overwrite(path),
            (None, None) => Self::Stdout,
        })
    }

    /// Write `text`, adding a trailing newline if missing.
    pub async fn write(&self, text: &str) -> std::io::Result<()> {
        let mut text = text.to_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }

        match self {
            Self::Stdout => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(text.as_bytes()).await?;
                stdout.flush().await
            }
            Self::Overwrite(path) => tokio::fs::write(path, text).await,
            Self::Append(path) => {
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await?;
                file.write_all(text.as_bytes()).await?;
                file.flush().await
            }
        }
    }
}

/// Publisher writing a [`Render`]ed metric set to an [`OutputTarget`].
pub struct TextPublisher {
    kind: String,
    renderer: Box<dyn Render>,
    target: OutputTarget,
}

impl TextPublisher {
    pub fn new(kind: impl Into<String>, renderer: Box<dyn Render>, target: OutputTarget) -> Self {
        Self {
            kind: kind.into(),
            renderer,
            target,
        }
    }
}

#[async_trait::async_trait]
impl Publisher for TextPublisher {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn publish(&self, sources: &[MetricSource]) -> Result<(), PublishError> {
        let text = self.renderer.render(sources)?;
        self.target.write(&text).await?;
        tracing::debug!(kind = %self.kind, destination = ?self.target, bytes = text.len(), "Published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_selection() {
        assert_eq!(
            OutputTarget::from_params("Json", &Params::new()).unwrap(),
            OutputTarget::Stdout
        );
        assert_eq!(
            OutputTarget::from_params("Json", &Params::new().with("outputfile", "/tmp/a")).unwrap(),
            OutputTarget::Overwrite(PathBuf::from("/tmp/a"))
        );

        let both = Params::new()
            .with("outputfile", "/tmp/a")
            .with("appendfile", "/tmp/b");
        assert_eq!(
            OutputTarget::from_params("Json", &both).unwrap(),
            OutputTarget::Append(PathBuf::from("/tmp/b"))
        );
    }

    #[tokio::test]
    async fn test_overwrite_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let overwrite = OutputTarget::Overwrite(path.clone());
        overwrite.write("first").await.unwrap();
        overwrite.write("second\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second\n");

        let append = OutputTarget::Append(path.clone());
        append.write("third").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second\nthird\n");
    }

    #[tokio::test]
    async fn test_write_to_missing_directory_fails() {
        let target = OutputTarget::Overwrite(PathBuf::from("/nonexistent/metering/out.json"));
        assert!(target.write("{}").await.is_err());
    }
}
