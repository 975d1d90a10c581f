//! File-backed collectors.
//!
//! [`ReadFileCollector`] reads a whole file as one value. The pseudo-filesystem
//! collectors in [`sys`](super::sys) and [`procfs`](super::procfs) build on
//! [`read_file`].

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::collector::traits::parse_params;
use crate::collector::{Collector, CollectorError};
use crate::config::Params;
use crate::database::DatabaseSet;
use crate::metric::Scalar;

/// Read a file into a string.
pub async fn read_file(path: &Path) -> Result<String, CollectorError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        CollectorError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}

/// Pick a whitespace-separated field from `content`.
pub fn whitespace_field(content: &str, index: usize) -> Result<&str, CollectorError> {
    content.split_whitespace().nth(index).ok_or_else(|| {
        CollectorError::Parse(format!("field {} not present in '{}'", index, content.trim()))
    })
}

/// Parameters of [`ReadFileCollector`].
#[derive(Debug, Clone, Deserialize)]
pub struct ReadFileParams {
    /// File whose trimmed content is the value.
    pub file: PathBuf,
}

/// Reads a file and parses its trimmed content as one value.
#[derive(Debug, Clone)]
pub struct ReadFileCollector {
    path: PathBuf,
}

impl ReadFileCollector {
    pub const KIND: &'static str = "ReadFileData";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Registry constructor.
    pub fn from_params(params: &Params, _: &DatabaseSet) -> Result<Box<dyn Collector>, CollectorError> {
        let p: ReadFileParams = parse_params(Self::KIND, params)?;
        Ok(Box::new(Self::new(p.file)))
    }
}

#[async_trait::async_trait]
impl Collector for ReadFileCollector {
    fn kind(&self) -> &str {
        Self::KIND
    }

    async fn acquire(&self, _elapsed_secs: f64) -> Result<Scalar, CollectorError> {
        Ok(Scalar::raw_text(&read_file(&self.path).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{MetricSource, NOT_AVAILABLE};
    use crate::metric::{DataType, TransformMode};
    use crate::publisher::{Json, Render};

    #[tokio::test]
    async fn test_read_file_collector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value");
        std::fs::write(&path, "42\n").unwrap();

        let params = Params::new().with("file", path.display().to_string());
        let collector = ReadFileCollector::from_params(&params, &DatabaseSet::new()).unwrap();
        assert_eq!(collector.kind(), "ReadFileData");
        assert_eq!(collector.acquire(0.0).await.unwrap(), Scalar::from("42"));

        std::fs::write(&path, "3.25").unwrap();
        assert_eq!(collector.acquire(0.0).await.unwrap(), Scalar::from("3.25"));
    }

    #[tokio::test]
    async fn test_read_file_missing() {
        let collector = ReadFileCollector::new("/nonexistent/metering/value");
        let err = collector.acquire(0.0).await.unwrap_err();
        assert!(matches!(err, CollectorError::Io(_)));
        assert!(err.to_string().contains("/nonexistent/metering/value"));
    }

    #[test]
    fn test_read_file_params_required() {
        assert!(ReadFileCollector::from_params(&Params::new(), &DatabaseSet::new()).is_err());
    }

    async fn sampled_file(content: &str, shortname: &str, data_type: DataType) -> MetricSource {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value");
        std::fs::write(&path, content).unwrap();

        let mut source = MetricSource::new(
            shortname,
            shortname,
            data_type,
            TransformMode::Passthrough,
            Box::new(ReadFileCollector::new(path)),
        );
        source.sample(0.0).await;
        source
    }

    #[tokio::test]
    async fn test_string_passthrough_keeps_text() {
        let serial = sampled_file("007\n", "serial", DataType::String).await;
        let version = sampled_file("1.10\n", "ver", DataType::String).await;
        assert_eq!(version.nice_result(), "1.10");

        let json = Json.render(&[serial, version]).unwrap();
        assert_eq!(json, r#"{"serial":"007","ver":"1.10"}"#);
    }

    #[tokio::test]
    async fn test_non_finite_float_is_not_available() {
        let source = sampled_file("inf\n", "x", DataType::Float).await;
        assert!(source.keyed_value().is_none());
        assert_eq!(source.nice_result(), NOT_AVAILABLE);
        assert_eq!(Json.render(&[source]).unwrap(), "{}");
    }

    #[test]
    fn test_whitespace_field() {
        let loadavg = "0.52 0.58 0.59 1/467 12345\n";
        assert_eq!(whitespace_field(loadavg, 0).unwrap(), "0.52");
        assert_eq!(whitespace_field(loadavg, 2).unwrap(), "0.59");
        assert!(whitespace_field(loadavg, 9).is_err());
    }
}
