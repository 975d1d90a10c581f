//! System load and memory from `/proc`.

use std::path::PathBuf;

use serde::Deserialize;
use strum_macros::{AsRefStr, Display};

use crate::collector::file::{read_file, whitespace_field};
use crate::collector::traits::parse_params;
use crate::collector::{Collector, CollectorError};
use crate::config::Params;
use crate::database::DatabaseSet;
use crate::metric::{DataType, Scalar};

/// Default procfs mount point.
pub const DEFAULT_PROCFS_ROOT: &str = "/proc";

fn default_procfs_root() -> PathBuf {
    PathBuf::from(DEFAULT_PROCFS_ROOT)
}

/// Parameters of [`LoadCollector`].
#[derive(Debug, Clone, Deserialize)]
pub struct LoadParams {
    /// 0 = 1 min, 1 = 5 min, 2 = 15 min average (default: 0).
    #[serde(default)]
    pub index: usize,
    #[serde(default = "default_procfs_root")]
    pub procfs_root: PathBuf,
}

/// Load average from `/proc/loadavg`.
#[derive(Debug, Clone)]
pub struct LoadCollector {
    path: PathBuf,
    index: usize,
}

impl LoadCollector {
    pub const KIND: &'static str = "SystemLoadByProc";

    pub fn new(params: &LoadParams) -> Result<Self, CollectorError> {
        if params.index > 2 {
            return Err(CollectorError::Config(format!(
                "{}: index {} out of range 0..=2",
                Self::KIND,
                params.index
            )));
        }
        Ok(Self {
            path: params.procfs_root.join("loadavg"),
            index: params.index,
        })
    }

    /// Registry constructor.
    pub fn from_params(params: &Params, _: &DatabaseSet) -> Result<Box<dyn Collector>, CollectorError> {
        let p: LoadParams = parse_params(Self::KIND, params)?;
        Ok(Box::new(Self::new(&p)?))
    }
}

#[async_trait::async_trait]
impl Collector for LoadCollector {
    fn kind(&self) -> &str {
        Self::KIND
    }

    async fn acquire(&self, _elapsed_secs: f64) -> Result<Scalar, CollectorError> {
        let content = read_file(&self.path).await?;
        Ok(Scalar::parse(whitespace_field(&content, self.index)?))
    }
}

/// `/proc/meminfo` fields the memory collector can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, AsRefStr)]
pub enum MemoryField {
    MemTotal,
    #[default]
    MemFree,
    MemAvailable,
    Active,
    Inactive,
}

/// Parameters of [`MemoryCollector`].
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryParams {
    /// Requested field (default: MemFree).
    #[serde(default)]
    pub reqdata: MemoryField,
    #[serde(default = "default_procfs_root")]
    pub procfs_root: PathBuf,
}

/// Memory figures from `/proc/meminfo`, in MB.
#[derive(Debug, Clone)]
pub struct MemoryCollector {
    path: PathBuf,
    field: MemoryField,
}

impl MemoryCollector {
    pub const KIND: &'static str = "SystemMemoryByProc";

    pub fn new(params: &MemoryParams) -> Self {
        Self {
            path: params.procfs_root.join("meminfo"),
            field: params.reqdata,
        }
    }

    /// Registry constructor.
    pub fn from_params(params: &Params, _: &DatabaseSet) -> Result<Box<dyn Collector>, CollectorError> {
        let p: MemoryParams = parse_params(Self::KIND, params)?;
        Ok(Box::new(Self::new(&p)))
    }

    fn extract_kb(&self, content: &str) -> Result<f64, CollectorError> {
        let key = self.field.as_ref();
        content
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim() == key)
            .and_then(|(_, value)| value.trim().trim_end_matches("kB").trim().parse::<f64>().ok())
            .ok_or_else(|| CollectorError::Parse(format!("{} not found in meminfo", key)))
    }
}

#[async_trait::async_trait]
impl Collector for MemoryCollector {
    fn kind(&self) -> &str {
        Self::KIND
    }

    async fn acquire(&self, _elapsed_secs: f64) -> Result<Scalar, CollectorError> {
        let content = read_file(&self.path).await?;
        Ok(Scalar::Float(self.extract_kb(&content)? / 1024.0))
    }

    fn render(&self, derived: &Scalar, _data_type: DataType) -> Option<String> {
        derived.as_f64().map(|v| format!("{:.2} MB", v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "\
MemTotal:       16318412 kB
MemFree:         2097152 kB
MemAvailable:    8388608 kB
Active:          5242880 kB
Inactive(anon):   102400 kB
Inactive:        3145728 kB
";

    fn fake_procfs() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("loadavg"), "0.52 0.58 0.59 1/467 12345\n").unwrap();
        std::fs::write(dir.path().join("meminfo"), MEMINFO).unwrap();
        dir
    }

    fn root_params(root: &tempfile::TempDir) -> Params {
        Params::new().with("procfs_root", root.path().display().to_string())
    }

    #[tokio::test]
    async fn test_load_collector_index() {
        let root = fake_procfs();
        let default = LoadCollector::from_params(&root_params(&root), &DatabaseSet::new()).unwrap();
        assert_eq!(default.acquire(0.0).await.unwrap(), Scalar::Float(0.52));

        let fifteen =
            LoadCollector::from_params(&root_params(&root).with("index", 2), &DatabaseSet::new())
                .unwrap();
        assert_eq!(fifteen.acquire(0.0).await.unwrap(), Scalar::Float(0.59));
    }

    #[test]
    fn test_load_collector_index_out_of_range() {
        let params = Params::new().with("index", 3);
        let err = LoadCollector::from_params(&params, &DatabaseSet::new()).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn test_memory_collector_fields() {
        let root = fake_procfs();

        let free = MemoryCollector::from_params(&root_params(&root), &DatabaseSet::new()).unwrap();
        assert_eq!(free.acquire(0.0).await.unwrap(), Scalar::Float(2048.0));

        let inactive = MemoryCollector::from_params(
            &root_params(&root).with("reqdata", "Inactive"),
            &DatabaseSet::new(),
        )
        .unwrap();
        // "Inactive(anon)" must not match "Inactive"
        assert_eq!(inactive.acquire(0.0).await.unwrap(), Scalar::Float(3072.0));
        assert_eq!(
            inactive.render(&Scalar::Float(3072.0), DataType::Float).unwrap(),
            "3072.00 MB"
        );
    }

    #[test]
    fn test_memory_collector_unknown_field() {
        let params = Params::new().with("reqdata", "SwapCached");
        assert!(MemoryCollector::from_params(&params, &DatabaseSet::new()).is_err());
    }
}
