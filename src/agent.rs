//! Orchestrator: owns the sources and sinks and drives the run mode.
//!
//! Sampling, publishing and waiting run strictly one after the other on a
//! single task. Sources are sampled in declaration order, then every sink
//! publishes the whole set.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::collector::{CollectorError, MetricSource};
use crate::config::{AgentConfig, ConfigError};
use crate::database::{ConnectionParams, DatabaseError, DatabaseSet};
use crate::publisher::{PublishError, Publisher};
use crate::registry::{RegistryError, TypeRegistry};
use crate::scheduler::IntervalScheduler;

/// How many sampling passes the agent performs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunMode {
    /// Sample once with zero elapsed time, publish, exit.
    #[default]
    Once,
    /// Sample, wait one interval, sample again, publish the second pass, exit.
    Twice,
    /// Sample, publish and wait until the process is terminated.
    Loop,
}

/// Errors raised while assembling the agent. Nothing fails after startup.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("input '{name}': {source}")]
    Collector {
        name: String,
        #[source]
        source: CollectorError,
    },

    #[error("output '{kind}': {source}")]
    Publisher {
        kind: String,
        #[source]
        source: PublishError,
    },

    #[error("database '{refname}': {source}")]
    Database {
        refname: String,
        #[source]
        source: DatabaseError,
    },
}

/// The polling agent.
pub struct Agent {
    run_mode: RunMode,
    sources: Vec<MetricSource>,
    publishers: Vec<Box<dyn Publisher>>,
    scheduler: IntervalScheduler,
    /// Elapsed time handed to the next sampling pass.
    elapsed_secs: f64,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("run_mode", &self.run_mode)
            .field("sources", &self.sources)
            .field("publishers", &self.publishers)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Create an agent with no sources or sinks.
    pub fn new(run_mode: RunMode, scheduler: IntervalScheduler) -> Self {
        Self {
            run_mode,
            sources: Vec::new(),
            publishers: Vec::new(),
            scheduler,
            elapsed_secs: 0.0,
        }
    }

    /// Build the agent described by `config`, resolving every type name
    /// through `registry`.
    ///
    /// # Errors
    /// Fails on the first type that cannot be resolved or constructed.
    pub fn from_config(config: &AgentConfig, registry: &mut TypeRegistry) -> Result<Self, AgentError> {
        let mut databases = DatabaseSet::new();
        for db in &config.databases {
            let factory = registry.resolve_database(&db.type_name)?;
            let database_error = |source| AgentError::Database {
                refname: db.refname.clone(),
                source,
            };
            let backend = factory(ConnectionParams::from(db)).map_err(database_error)?;
            databases.insert(backend).map_err(database_error)?;
            tracing::debug!(refname = %db.refname, type_name = %db.type_name, "Database declared");
        }

        let mut agent = Self::new(config.collector.runmode, config.collector.scheduler()?);

        for input in &config.inputs {
            let factory = registry.resolve_collector(&input.agent.agentname)?;
            let collector =
                factory(&input.agent.params, &databases).map_err(|source| AgentError::Collector {
                    name: input.name.clone(),
                    source,
                })?;
            agent.add_source(MetricSource::new(
                &input.name,
                &input.shortname,
                input.data_type,
                input.calcmode,
                collector,
            ));
        }

        for output in &config.outputs {
            let factory = registry.resolve_publisher(&output.type_name)?;
            let publisher =
                factory(&output.params, &databases).map_err(|source| AgentError::Publisher {
                    kind: output.type_name.clone(),
                    source,
                })?;
            agent.add_publisher(publisher);
        }

        tracing::info!(
            run_mode = %agent.run_mode,
            sources = agent.sources.len(),
            publishers = agent.publishers.len(),
            databases = databases.len(),
            "Agent configured"
        );
        Ok(agent)
    }

    pub fn add_source(&mut self, source: MetricSource) {
        self.sources.push(source);
    }

    pub fn add_publisher(&mut self, publisher: Box<dyn Publisher>) {
        self.publishers.push(publisher);
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn sources(&self) -> &[MetricSource] {
        &self.sources
    }

    pub fn scheduler(&self) -> &IntervalScheduler {
        &self.scheduler
    }

    /// Sample every source once, in declaration order.
    pub async fn sample_all(&mut self, elapsed_secs: f64) {
        let mut defined = 0;
        for source in &mut self.sources {
            if source.sample(elapsed_secs).await.is_some() {
                defined += 1;
            }
        }
        tracing::debug!(elapsed_secs, defined, total = self.sources.len(), "Sampling pass complete");
    }

    /// Hand the current metric set to every sink. A failing sink is logged
    /// and does not stop the others.
    pub async fn publish_all(&self) {
        for publisher in &self.publishers {
            if let Err(e) = publisher.publish(&self.sources).await {
                tracing::error!(kind = %publisher.kind(), error = %e, "Publish failed");
            }
        }
    }

    /// One loop iteration: sample with the previous interval as elapsed time,
    /// publish, then wait for the next resolved interval.
    ///
    /// Returns the interval just waited.
    pub async fn cycle(&mut self) -> f64 {
        self.sample_all(self.elapsed_secs).await;
        self.publish_all().await;
        self.elapsed_secs = self.scheduler.wait_and_record().await;
        self.elapsed_secs
    }

    /// Run according to the configured run mode.
    ///
    /// In [`RunMode::Loop`] this never returns.
    pub async fn run(&mut self) {
        tracing::info!(run_mode = %self.run_mode, "Agent started");
        match self.run_mode {
            RunMode::Once => {
                self.sample_all(0.0).await;
                self.publish_all().await;
            }
            RunMode::Twice => {
                self.sample_all(0.0).await;
                let elapsed = self.scheduler.wait_and_record().await;
                self.sample_all(elapsed).await;
                self.publish_all().await;
            }
            RunMode::Loop => loop {
                self.cycle().await;
            },
        }
        tracing::info!("Agent finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ScriptedCollector;
    use crate::metric::{DataType, Scalar, TransformMode};
    use std::sync::{Arc, Mutex};

    /// Records the derived values of every publish.
    #[derive(Clone, Default)]
    struct Recorder {
        published: Arc<Mutex<Vec<Vec<Option<Scalar>>>>>,
    }

    #[async_trait::async_trait]
    impl Publisher for Recorder {
        fn kind(&self) -> &str {
            "Recorder"
        }

        async fn publish(&self, sources: &[MetricSource]) -> Result<(), PublishError> {
            let snapshot = sources.iter().map(|s| s.derived().cloned()).collect();
            self.published.lock().unwrap().push(snapshot);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl Publisher for Failing {
        fn kind(&self) -> &str {
            "Failing"
        }

        async fn publish(&self, _: &[MetricSource]) -> Result<(), PublishError> {
            Err(PublishError::Config("broken sink".to_string()))
        }
    }

    fn rate_source(values: &[i64]) -> MetricSource {
        MetricSource::new(
            "Counter",
            "counter",
            DataType::Float,
            TransformMode::IncrementPerSecond,
            Box::new(ScriptedCollector::ints(values)),
        )
    }

    fn agent_with(run_mode: RunMode, source: MetricSource) -> (Agent, Recorder) {
        let recorder = Recorder::default();
        let mut agent = Agent::new(run_mode, IntervalScheduler::new(5.0));
        agent.add_source(source);
        agent.add_publisher(Box::new(recorder.clone()));
        (agent, recorder)
    }

    #[test]
    fn test_run_mode_names() {
        let mode: RunMode = serde_yaml::from_str("twice").unwrap();
        assert_eq!(mode, RunMode::Twice);
        assert_eq!(RunMode::Loop.to_string(), "loop");
        assert_eq!(RunMode::default(), RunMode::Once);
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_rate_source_undefined() {
        let (mut agent, recorder) = agent_with(RunMode::Once, rate_source(&[100, 150]));
        agent.run().await;

        let published = recorder.published.lock().unwrap();
        assert_eq!(*published, vec![vec![None]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_twice_publishes_second_pass_only() {
        let (mut agent, recorder) = agent_with(RunMode::Twice, rate_source(&[100, 150]));
        let start = tokio::time::Instant::now();
        agent.run().await;

        assert_eq!(start.elapsed(), std::time::Duration::from_secs(5));
        let published = recorder.published.lock().unwrap();
        assert_eq!(*published, vec![vec![Some(Scalar::Float(10.0))]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_threads_interval_into_next_pass() {
        let (mut agent, recorder) = agent_with(RunMode::Loop, rate_source(&[0, 50, 150]));

        assert_eq!(agent.cycle().await, 5.0);
        assert_eq!(agent.cycle().await, 5.0);
        agent.cycle().await;

        let published = recorder.published.lock().unwrap();
        assert_eq!(
            *published,
            vec![
                vec![None],
                vec![Some(Scalar::Float(10.0))],
                vec![Some(Scalar::Float(20.0))],
            ]
        );
        assert_eq!(agent.scheduler().last_interval_secs(), 5.0);
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_stop_others() {
        let recorder = Recorder::default();
        let mut agent = Agent::new(RunMode::Once, IntervalScheduler::new(0.0));
        agent.add_source(MetricSource::new(
            "Answer",
            "answer",
            DataType::Int,
            TransformMode::Passthrough,
            Box::new(ScriptedCollector::ints(&[42])),
        ));
        agent.add_publisher(Box::new(Failing));
        agent.add_publisher(Box::new(recorder.clone()));

        agent.run().await;
        assert_eq!(
            *recorder.published.lock().unwrap(),
            vec![vec![Some(Scalar::Int(42))]]
        );
    }

    #[test]
    fn test_from_config_unknown_agentname() {
        let yaml = r#"
config:
  inputs:
    - name: Mystery
      shortname: m
      type: int
      agent:
        agentname: DoesNotExist
"#;
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::AppConfig::from_yaml(yaml).unwrap().config;
        let mut registry = TypeRegistry::new(dir.path());
        let err = Agent::from_config(&config, &mut registry).unwrap_err();
        assert!(matches!(
            err,
            AgentError::Registry(RegistryError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_from_config_bad_parameters() {
        let yaml = r#"
config:
  inputs:
    - name: Rx
      shortname: rx
      type: float
      agent:
        agentname: BandwidthBySys
        interface: eth0
        direction: sideways
"#;
        let config = crate::config::AppConfig::from_yaml(yaml).unwrap().config;
        let err = Agent::from_config(&config, &mut TypeRegistry::default()).unwrap_err();
        assert!(matches!(err, AgentError::Collector { ref name, .. } if name == "Rx"));
    }

    #[test]
    fn test_from_config_builds_everything() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            r#"
config:
  databases:
    - type: Sqlite
      refname: local
      name: {db}
  collector:
    runmode: twice
    interval: 2
  inputs:
    - name: Answer
      shortname: answer
      type: int
      agent:
        agentname: CallSystemCommand
        command: echo 42
    - name: Query
      shortname: query
      type: int
      agent:
        agentname: SqlDerivedData
        database_ref: local
        sql: SELECT 1
  outputs:
    - type: NiceTable
    - type: Json
      outputfile: {out}
"#,
            db = dir.path().join("m.db").display(),
            out = dir.path().join("out.json").display(),
        );
        let config = crate::config::AppConfig::from_yaml(&yaml).unwrap().config;
        let agent = Agent::from_config(&config, &mut TypeRegistry::new(dir.path())).unwrap();

        assert_eq!(agent.run_mode(), RunMode::Twice);
        assert_eq!(agent.scheduler().baseline_secs(), 2.0);
        assert_eq!(agent.sources().len(), 2);
        assert_eq!(agent.sources()[1].kind(), "SqlDerivedData");
        assert_eq!(agent.publishers.len(), 2);
    }
}
