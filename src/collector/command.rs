//! Values produced by shell commands.

use serde::Deserialize;
use tokio::process::Command;

use crate::collector::traits::parse_params;
use crate::collector::{Collector, CollectorError};
use crate::config::Params;
use crate::database::DatabaseSet;
use crate::metric::Scalar;

/// Run `command` through `sh -c` and return its trimmed standard output.
pub async fn run_shell(command: &str) -> Result<String, CollectorError> {
    let fail = |reason: String| CollectorError::Command {
        command: command.to_string(),
        reason,
    };

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| fail(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(fail(format!("{}: {}", output.status, stderr.trim())));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Parameters of [`CommandCollector`].
#[derive(Debug, Clone, Deserialize)]
pub struct CommandParams {
    pub command: String,
}

/// Runs a shell command and parses its output as one value.
#[derive(Debug, Clone)]
pub struct CommandCollector {
    command: String,
}

impl CommandCollector {
    pub const KIND: &'static str = "CallSystemCommand";

    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Registry constructor.
    pub fn from_params(params: &Params, _: &DatabaseSet) -> Result<Box<dyn Collector>, CollectorError> {
        let p: CommandParams = parse_params(Self::KIND, params)?;
        if p.command.trim().is_empty() {
            return Err(CollectorError::Config(format!(
                "{}: command cannot be empty",
                Self::KIND
            )));
        }
        Ok(Box::new(Self::new(p.command)))
    }
}

#[async_trait::async_trait]
impl Collector for CommandCollector {
    fn kind(&self) -> &str {
        Self::KIND
    }

    async fn acquire(&self, _elapsed_secs: f64) -> Result<Scalar, CollectorError> {
        let stdout = run_shell(&self.command).await?;
        tracing::trace!(command = %self.command, %stdout, "Command finished");
        Ok(Scalar::raw_text(&stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_command_output_trimmed() {
        let collector = CommandCollector::new("echo 42");
        assert_eq!(collector.acquire(0.0).await.unwrap(), Scalar::from("42"));

        let collector = CommandCollector::new("printf 'up\\n'");
        assert_eq!(collector.acquire(0.0).await.unwrap(), Scalar::from("up"));
    }

    #[tokio::test]
    async fn test_command_failure() {
        let collector = CommandCollector::new("echo broken >&2; exit 3");
        let err = collector.acquire(0.0).await.unwrap_err();
        assert!(matches!(err, CollectorError::Command { .. }));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_command_params() {
        let params = Params::new().with("command", "uptime");
        assert!(CommandCollector::from_params(&params, &DatabaseSet::new()).is_ok());

        let empty = Params::new().with("command", "  ");
        assert!(CommandCollector::from_params(&empty, &DatabaseSet::new()).is_err());
    }
}
