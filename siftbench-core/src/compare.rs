// Comparison aggregator: run every pipeline in isolation, collect one row each

use crate::classify::{TOP_FAILURES_LIMIT, TopFailures, top_failures};
use crate::pipeline::{PipelineConfig, PipelineReport, PipelineRunner};
use futures::future::join_all;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("static regex"));

/// Called with `(index, pipeline name)` as each pipeline finishes.
pub type PipelineCallback = Arc<dyn Fn(usize, &str) + Send + Sync>;

/// How a pipeline is launched.
#[derive(Debug, Clone)]
pub enum Invocation {
    /// External executable printing a self-report on stdout.
    Process { program: String, args: Vec<String> },
    /// Spawned task in this process.
    InProcess(PipelineConfig),
}

#[derive(Debug, Clone)]
pub struct PipelineSpec {
    pub name: String,
    pub invocation: Invocation,
    pub timeout: Option<Duration>,
}

impl PipelineSpec {
    pub fn process(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            invocation: Invocation::Process {
                program: program.into(),
                args,
            },
            timeout: None,
        }
    }

    pub fn in_process(config: PipelineConfig) -> Self {
        Self {
            name: config.name.clone(),
            invocation: Invocation::InProcess(config),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Why a pipeline produced no report. Display gives the row's error text.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineFailure {
    /// The executable does not exist.
    NotFound { program: String },
    Exited { name: String, code: Option<i32>, stderr: String },
    /// Stdout was not a JSON object.
    InvalidOutput,
    /// The pipeline ran and reported its own error.
    Reported { message: String },
    TimedOut { name: String, after: Duration },
    Panicked { name: String },
    Launch { name: String, message: String },
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineFailure::NotFound { program } => write!(f, "{} not found", program),
            PipelineFailure::Exited { name, code, stderr } => match last_stderr_line(stderr) {
                Some(line) => f.write_str(&line),
                None => match code {
                    Some(code) => write!(f, "{} exited with status {}", name, code),
                    None => write!(f, "{} was terminated by a signal", name),
                },
            },
            PipelineFailure::InvalidOutput => f.write_str("invalid_json"),
            PipelineFailure::Reported { message } => f.write_str(message),
            PipelineFailure::TimedOut { name, after } => {
                write!(f, "{} timed out after {}s", name, after.as_secs())
            }
            PipelineFailure::Panicked { name } => write!(f, "{} panicked", name),
            PipelineFailure::Launch { name, message } => {
                write!(f, "{} failed to start: {}", name, message)
            }
        }
    }
}

/// Last non-empty line of a child's stderr, without terminal colour codes.
///
/// Earlier lines are usually log output; the final one carries the fatal error.
fn last_stderr_line(stderr: &str) -> Option<String> {
    let plain = ANSI_ESCAPE.replace_all(stderr, "");
    plain
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map(str::to_string)
}

/// Validate a pipeline's stdout into a report.
///
/// A JSON object carrying an `error` string is a well-formed failure; any other object is
/// read leniently.
pub fn parse_self_report(stdout: &str, fallback_name: &str) -> Result<PipelineReport, PipelineFailure> {
    let value: Value =
        serde_json::from_str(stdout.trim()).map_err(|_| PipelineFailure::InvalidOutput)?;
    if !value.is_object() {
        return Err(PipelineFailure::InvalidOutput);
    }
    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Err(PipelineFailure::Reported {
            message: message.to_string(),
        });
    }
    Ok(PipelineReport::from_value(&value, fallback_name))
}

/// The error payload a pipeline prints when it cannot run at all.
pub fn error_report(name: &str, message: &str) -> Value {
    serde_json::json!({ "pipeline": name, "error": message })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowMetrics {
    pub pages_total: usize,
    pub pages_ok: usize,
    pub tokens_total: usize,
    pub avg_noise_ratio: f64,
    pub throughput_pages_per_sec: f64,
    pub top_failures: TopFailures,
}

impl RowMetrics {
    /// Copy the reported metrics as-is; only failures get reclassified.
    pub fn from_report(report: &PipelineReport) -> Self {
        Self {
            pages_total: report.pages_total,
            pages_ok: report.pages_ok,
            tokens_total: report.tokens_total,
            avg_noise_ratio: report.avg_noise_ratio,
            throughput_pages_per_sec: report.throughput_pages_per_sec,
            top_failures: top_failures(&report.failures, TOP_FAILURES_LIMIT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowBody {
    Metrics(RowMetrics),
    Error { error: String },
}

/// One pipeline's entry in the comparison. Holds metrics or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub pipeline: String,
    #[serde(flatten)]
    pub body: RowBody,
}

impl ComparisonRow {
    pub fn from_outcome(name: &str, outcome: &Result<PipelineReport, PipelineFailure>) -> Self {
        match outcome {
            Ok(report) => Self {
                pipeline: report.pipeline_name.clone(),
                body: RowBody::Metrics(RowMetrics::from_report(report)),
            },
            Err(failure) => Self {
                pipeline: name.to_string(),
                body: RowBody::Error {
                    error: failure.to_string(),
                },
            },
        }
    }

    pub fn metrics(&self) -> Option<&RowMetrics> {
        match self.body {
            RowBody::Metrics(ref metrics) => Some(metrics),
            RowBody::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self.body {
            RowBody::Error { ref error } => Some(error),
            RowBody::Metrics(_) => None,
        }
    }
}

/// Rows in configuration order from `(configured name, outcome)` pairs.
pub fn build_rows(outcomes: &[(String, Result<PipelineReport, PipelineFailure>)]) -> Vec<ComparisonRow> {
    outcomes
        .iter()
        .map(|(name, outcome)| ComparisonRow::from_outcome(name, outcome))
        .collect()
}

/// Run one pipeline to completion. Never panics and never returns early for other pipelines.
pub async fn run_pipeline(spec: &PipelineSpec) -> Result<PipelineReport, PipelineFailure> {
    match spec.invocation {
        Invocation::Process {
            ref program,
            ref args,
        } => run_process(&spec.name, program, args, spec.timeout).await,
        Invocation::InProcess(ref config) => run_task(&spec.name, config.clone(), spec.timeout).await,
    }
}

async fn run_process(
    name: &str,
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<PipelineReport, PipelineFailure> {
    debug!("Launching {} {:?}", program, args);
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env("NO_COLOR", "1")
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => PipelineFailure::NotFound {
                program: program.to_string(),
            },
            _ => PipelineFailure::Launch {
                name: name.to_string(),
                message: e.to_string(),
            },
        })?;

    let waited = match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| PipelineFailure::TimedOut {
                name: name.to_string(),
                after: limit,
            })?,
        None => child.wait_with_output().await,
    };
    let output = waited.map_err(|e| PipelineFailure::Launch {
        name: name.to_string(),
        message: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(PipelineFailure::Exited {
            name: name.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    parse_self_report(&String::from_utf8_lossy(&output.stdout), name)
}

async fn run_task(
    name: &str,
    config: PipelineConfig,
    timeout: Option<Duration>,
) -> Result<PipelineReport, PipelineFailure> {
    let mut handle = tokio::spawn(async move { PipelineRunner::new(config).run().await });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                return Err(PipelineFailure::TimedOut {
                    name: name.to_string(),
                    after: limit,
                });
            }
        },
        None => handle.await,
    };

    match joined {
        Ok(Ok(report)) => Ok(report),
        Ok(Err(e)) => Err(PipelineFailure::Reported {
            message: e.to_string(),
        }),
        Err(e) if e.is_panic() => Err(PipelineFailure::Panicked {
            name: name.to_string(),
        }),
        Err(e) => Err(PipelineFailure::Launch {
            name: name.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Runs a fixed list of pipelines and turns their outcomes into rows.
pub struct Comparison {
    specs: Vec<PipelineSpec>,
    parallel: bool,
    callback: Option<PipelineCallback>,
}

impl Comparison {
    pub fn new(specs: Vec<PipelineSpec>) -> Self {
        Self {
            specs,
            parallel: false,
            callback: None,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_progress_callback(mut self, callback: PipelineCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// One row per spec, in spec order, whatever the execution order.
    pub async fn run(&self) -> Vec<ComparisonRow> {
        info!(
            "Comparing {} pipeline(s){}",
            self.specs.len(),
            if self.parallel { " in parallel" } else { "" }
        );

        let outcomes = if self.parallel {
            join_all(
                self.specs
                    .iter()
                    .enumerate()
                    .map(|(index, spec)| self.run_one(index, spec)),
            )
            .await
        } else {
            let mut outcomes = Vec::with_capacity(self.specs.len());
            for (index, spec) in self.specs.iter().enumerate() {
                outcomes.push(self.run_one(index, spec).await);
            }
            outcomes
        };

        build_rows(&outcomes)
    }

    async fn run_one(
        &self,
        index: usize,
        spec: &PipelineSpec,
    ) -> (String, Result<PipelineReport, PipelineFailure>) {
        let outcome = run_pipeline(spec).await;
        match outcome {
            Ok(ref report) => info!(
                "{}: {}/{} pages ok",
                spec.name, report.pages_ok, report.pages_total
            ),
            Err(ref failure) => warn!("{}: {}", spec.name, failure),
        }
        if let Some(ref callback) = self.callback {
            callback(index, &spec.name);
        }
        (spec.name.clone(), outcome)
    }
}
