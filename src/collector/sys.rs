//! Network interface counters from `/sys/class/net`.
//!
//! Both collectors report per-second rates: their transform mode is forced to
//! `increment_in_sec` whatever the configuration says.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use strum_macros::{AsRefStr, Display};

use crate::collector::file::read_file;
use crate::collector::traits::parse_params;
use crate::collector::{Collector, CollectorError};
use crate::config::Params;
use crate::database::DatabaseSet;
use crate::metric::{DataType, Scalar, TransformMode};

/// Default sysfs mount point.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

fn default_sysfs_root() -> PathBuf {
    PathBuf::from(DEFAULT_SYSFS_ROOT)
}

/// Traffic direction of an interface counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Rx,
    Tx,
}

/// Parameters shared by the interface counter collectors.
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceParams {
    pub interface: String,
    pub direction: Direction,
    /// Root of the sysfs tree (default: `/sys`).
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,
}

impl InterfaceParams {
    fn counter_path(&self, counter: &str) -> Result<PathBuf, CollectorError> {
        if self.interface.is_empty() || self.interface.contains('/') {
            return Err(CollectorError::Config(format!(
                "invalid interface name '{}'",
                self.interface
            )));
        }
        Ok(self
            .sysfs_root
            .join("class/net")
            .join(&self.interface)
            .join("statistics")
            .join(format!("{}_{}", self.direction, counter)))
    }
}

async fn read_counter(path: &Path) -> Result<f64, CollectorError> {
    let content = read_file(path).await?;
    content
        .trim()
        .parse::<f64>()
        .map_err(|e| CollectorError::Parse(format!("{}: {}", path.display(), e)))
}

/// Interface throughput in kB/s.
#[derive(Debug, Clone)]
pub struct BandwidthCollector {
    path: PathBuf,
}

impl BandwidthCollector {
    pub const KIND: &'static str = "BandwidthBySys";

    pub fn new(params: &InterfaceParams) -> Result<Self, CollectorError> {
        Ok(Self {
            path: params.counter_path("bytes")?,
        })
    }

    /// Registry constructor.
    pub fn from_params(params: &Params, _: &DatabaseSet) -> Result<Box<dyn Collector>, CollectorError> {
        let p: InterfaceParams = parse_params(Self::KIND, params)?;
        Ok(Box::new(Self::new(&p)?))
    }
}

#[async_trait::async_trait]
impl Collector for BandwidthCollector {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn forced_mode(&self) -> Option<TransformMode> {
        Some(TransformMode::IncrementPerSecond)
    }

    async fn acquire(&self, _elapsed_secs: f64) -> Result<Scalar, CollectorError> {
        Ok(Scalar::Float(read_counter(&self.path).await? / 1024.0))
    }

    fn render(&self, derived: &Scalar, _data_type: DataType) -> Option<String> {
        derived.as_f64().map(|v| format!("{:.2} kB/s", v))
    }
}

/// Interface packet rate in packets/s.
#[derive(Debug, Clone)]
pub struct PacketsCollector {
    path: PathBuf,
}

impl PacketsCollector {
    pub const KIND: &'static str = "NetworkPacketsBySys";

    pub fn new(params: &InterfaceParams) -> Result<Self, CollectorError> {
        Ok(Self {
            path: params.counter_path("packets")?,
        })
    }

    /// Registry constructor.
    pub fn from_params(params: &Params, _: &DatabaseSet) -> Result<Box<dyn Collector>, CollectorError> {
        let p: InterfaceParams = parse_params(Self::KIND, params)?;
        Ok(Box::new(Self::new(&p)?))
    }
}

#[async_trait::async_trait]
impl Collector for PacketsCollector {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn forced_mode(&self) -> Option<TransformMode> {
        Some(TransformMode::IncrementPerSecond)
    }

    async fn acquire(&self, _elapsed_secs: f64) -> Result<Scalar, CollectorError> {
        Ok(Scalar::Float(read_counter(&self.path).await?))
    }

    fn render(&self, derived: &Scalar, _data_type: DataType) -> Option<String> {
        Some(format!("{} packets/s", derived))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MetricSource;

    fn fake_sysfs(rx_bytes: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let stats = dir.path().join("class/net/eth0/statistics");
        std::fs::create_dir_all(&stats).unwrap();
        std::fs::write(stats.join("rx_bytes"), rx_bytes).unwrap();
        std::fs::write(stats.join("tx_packets"), "1000\n").unwrap();
        dir
    }

    fn params(root: &Path, direction: &str) -> Params {
        Params::new()
            .with("interface", "eth0")
            .with("direction", direction)
            .with("sysfs_root", root.display().to_string())
    }

    #[tokio::test]
    async fn test_bandwidth_rate() {
        let root = fake_sysfs("10240\n");
        let collector = BandwidthCollector::from_params(&params(root.path(), "rx"), &DatabaseSet::new())
            .unwrap();
        let mut source = MetricSource::new(
            "eth0 rx",
            "rx",
            DataType::Float,
            TransformMode::Passthrough,
            collector,
        );
        assert_eq!(source.mode(), TransformMode::IncrementPerSecond);

        assert!(source.sample(0.0).await.is_none());
        std::fs::write(
            root.path().join("class/net/eth0/statistics/rx_bytes"),
            "30720\n",
        )
        .unwrap();
        assert_eq!(source.sample(4.0).await, Some(&Scalar::Float(5.0)));
        assert_eq!(source.nice_result(), "5.00 kB/s");
    }

    #[tokio::test]
    async fn test_packets_reads_counter() {
        let root = fake_sysfs("0");
        let collector =
            PacketsCollector::from_params(&params(root.path(), "tx"), &DatabaseSet::new()).unwrap();
        assert_eq!(collector.acquire(0.0).await.unwrap(), Scalar::Float(1000.0));
        assert_eq!(
            collector.render(&Scalar::Float(12.5), DataType::Float).unwrap(),
            "12.5 packets/s"
        );
    }

    #[test]
    fn test_invalid_direction_rejected() {
        let params = Params::new().with("interface", "eth0").with("direction", "up");
        assert!(BandwidthCollector::from_params(&params, &DatabaseSet::new()).is_err());
    }

    #[test]
    fn test_interface_with_slash_rejected() {
        let params = Params::new()
            .with("interface", "../../etc")
            .with("direction", "rx");
        let err = PacketsCollector::from_params(&params, &DatabaseSet::new()).unwrap_err();
        assert!(err.to_string().contains("invalid interface name"));
    }

    #[test]
    fn test_counter_path() {
        let p = InterfaceParams {
            interface: "wlan0".to_string(),
            direction: Direction::Tx,
            sysfs_root: default_sysfs_root(),
        };
        assert_eq!(
            p.counter_path("bytes").unwrap(),
            PathBuf::from("/sys/class/net/wlan0/statistics/tx_bytes")
        );
    }
}
