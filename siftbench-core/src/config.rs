// Comparison configuration: which pipelines to run and how

use crate::compare::PipelineSpec;
use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use siftbench_scanner::StrategyKind;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEntry {
    pub name: String,
    /// Program followed by its arguments.
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub pipelines: Vec<PipelineEntry>,
}

impl ComparisonConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: ComparisonConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// The three built-in pipelines, each re-invoking `program` with its `pipeline` subcommand.
    pub fn builtin(program: &str, crawl_args: &[String]) -> Self {
        let pipelines = StrategyKind::ALL
            .iter()
            .map(|kind| {
                let mut command = vec![
                    program.to_string(),
                    "pipeline".to_string(),
                    "--strategy".to_string(),
                    kind.as_str().to_string(),
                    "--name".to_string(),
                    kind.pipeline_name().to_string(),
                ];
                command.extend(crawl_args.iter().cloned());
                PipelineEntry {
                    name: kind.pipeline_name().to_string(),
                    command,
                    timeout_secs: None,
                }
            })
            .collect();

        Self {
            parallel: false,
            pipelines,
        }
    }

    /// Apply a timeout to every entry that does not set its own.
    pub fn with_default_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        for entry in &mut self.pipelines {
            if entry.timeout_secs.is_none() {
                entry.timeout_secs = timeout_secs;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (index, entry) in self.pipelines.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(BenchError::Config(format!("pipeline #{} has no name", index + 1)));
            }
            if entry.command.first().is_none_or(|program| program.trim().is_empty()) {
                return Err(BenchError::Config(format!(
                    "pipeline '{}' has an empty command",
                    entry.name
                )));
            }
        }
        Ok(())
    }

    pub fn into_specs(self) -> Result<Vec<PipelineSpec>> {
        self.validate()?;
        Ok(self
            .pipelines
            .into_iter()
            .filter_map(|entry| {
                let mut command = entry.command.into_iter();
                let program = command.next()?;
                Some(
                    PipelineSpec::process(entry.name, program, command.collect())
                        .with_timeout(entry.timeout_secs.map(Duration::from_secs)),
                )
            })
            .collect())
    }
}
