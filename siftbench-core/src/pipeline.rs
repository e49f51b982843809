// One strategy + one crawler, reduced to a self-reported PipelineReport

use siftbench_scanner::metrics::{round2, round3};
use siftbench_scanner::sitemap::discover_seeds;
use siftbench_scanner::strategy::{
    ContentExtract, ExtractionStrategy, RenderedDom, StaticParse, StrategyKind, build_client,
};
use siftbench_scanner::{CrawlConfig, Crawler, PageResult, ProgressCallback, ScanError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Floor for elapsed time so throughput never divides by zero.
pub const MIN_ELAPSED_SECS: f64 = 1e-6;

/// Explicit configuration of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub name: String,
    pub strategy: StrategyKind,
    pub crawl: CrawlConfig,
    pub use_sitemaps: bool,
}

impl PipelineConfig {
    pub fn new(strategy: StrategyKind, crawl: CrawlConfig) -> Self {
        Self {
            name: strategy.pipeline_name().to_string(),
            strategy,
            crawl,
            use_sitemaps: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_sitemaps(mut self, use_sitemaps: bool) -> Self {
        self.use_sitemaps = use_sitemaps;
        self
    }
}

/// A pipeline's own summary of its crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    #[serde(rename = "pipeline")]
    pub pipeline_name: String,
    pub pages_total: usize,
    pub pages_ok: usize,
    pub tokens_total: usize,
    pub avg_noise_ratio: f64,
    pub throughput_pages_per_sec: f64,
    pub failures: Vec<PageResult>,
}

impl PipelineReport {
    /// Reduce one run's results. Pure: same results and elapsed, same report.
    pub fn from_results(name: &str, results: &[PageResult], elapsed: Duration) -> Self {
        let ok: Vec<&PageResult> = results.iter().filter(|r| r.is_ok()).collect();
        let tokens_total = ok.iter().map(|r| r.tokens).sum();
        let noise_sum: f64 = ok.iter().filter_map(|r| r.noise_ratio).sum();
        let avg_noise_ratio = if ok.is_empty() {
            0.0
        } else {
            round3(noise_sum / ok.len() as f64)
        };
        let throughput =
            results.len() as f64 / elapsed.as_secs_f64().max(MIN_ELAPSED_SECS);

        Self {
            pipeline_name: name.to_string(),
            pages_total: results.len(),
            pages_ok: ok.len(),
            tokens_total,
            avg_noise_ratio,
            throughput_pages_per_sec: round2(throughput),
            failures: results.iter().filter(|r| !r.is_ok()).cloned().collect(),
        }
    }

    /// Read a report tolerantly: missing or mistyped fields become zero/empty.
    pub fn from_value(value: &Value, fallback_name: &str) -> Self {
        let count = |key: &str| value.get(key).and_then(Value::as_u64).unwrap_or(0) as usize;
        let float = |key: &str| value.get(key).and_then(Value::as_f64).unwrap_or(0.0);

        let pipeline_name = value
            .get("pipeline")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback_name)
            .to_string();
        let failures = value
            .get("failures")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(page_result_from_value).collect())
            .unwrap_or_default();

        Self {
            pipeline_name,
            pages_total: count("pages_total"),
            pages_ok: count("pages_ok"),
            tokens_total: count("tokens_total"),
            avg_noise_ratio: float("avg_noise_ratio"),
            throughput_pages_per_sec: float("throughput_pages_per_sec"),
            failures,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn page_result_from_value(value: &Value) -> Option<PageResult> {
    let object = value.as_object()?;
    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Some(PageResult {
        url: text("url").unwrap_or_default(),
        status: object
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok()),
        error: text("error"),
        detail: text("detail"),
        tokens: object.get("tokens").and_then(Value::as_u64).unwrap_or(0) as usize,
        noise_ratio: object.get("noise_ratio").and_then(Value::as_f64),
    })
}

/// Drives one strategy over one crawl configuration.
pub struct PipelineRunner {
    config: PipelineConfig,
    progress_callback: Option<ProgressCallback>,
}

impl PipelineRunner {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the configured strategy and run it.
    ///
    /// Errors only when the strategy itself cannot start (bad config, no browser).
    pub async fn run(&self) -> Result<PipelineReport, ScanError> {
        self.config.crawl.validate()?;
        let crawl = &self.config.crawl;

        match self.config.strategy {
            StrategyKind::StaticParse => {
                let mut strategy = StaticParse::new(crawl.timeout, &crawl.user_agent)?;
                Ok(self.run_with(&mut strategy).await)
            }
            StrategyKind::ContentExtract => {
                let mut strategy = ContentExtract::new(crawl.timeout, &crawl.user_agent)?;
                Ok(self.run_with(&mut strategy).await)
            }
            StrategyKind::RenderedDom => {
                let timeout = crawl.timeout;
                let mut strategy =
                    tokio::task::spawn_blocking(move || RenderedDom::launch(timeout)).await??;
                Ok(self.run_with(&mut strategy).await)
            }
        }
    }

    /// Crawl with an already constructed strategy and reduce the results.
    pub async fn run_with<S: ExtractionStrategy>(&self, strategy: &mut S) -> PipelineReport {
        let mut crawler = Crawler::new(&self.config.crawl);
        if self.config.use_sitemaps {
            crawler = crawler.with_extra_seeds(self.sitemap_seeds().await);
        }
        if let Some(ref callback) = self.progress_callback {
            crawler = crawler.with_progress_callback(callback.clone());
        }

        let outcome = crawler.crawl(strategy).await;
        let report =
            PipelineReport::from_results(&self.config.name, &outcome.results, outcome.elapsed);
        info!(
            "Pipeline {}: {}/{} pages ok, {} tokens, {:.2} pages/s",
            report.pipeline_name,
            report.pages_ok,
            report.pages_total,
            report.tokens_total,
            report.throughput_pages_per_sec
        );
        report
    }

    async fn sitemap_seeds(&self) -> Vec<String> {
        let crawl = &self.config.crawl;
        let client = match build_client(crawl.timeout, &crawl.user_agent) {
            Ok(client) => client,
            Err(e) => {
                warn!("Skipping sitemap discovery: {}", e);
                return Vec::new();
            }
        };

        let mut discovered = Vec::new();
        for seed in &crawl.seeds {
            let remaining = crawl.max_pages.saturating_sub(discovered.len());
            if remaining == 0 {
                break;
            }
            discovered.extend(discover_seeds(&client, seed, remaining).await);
        }
        discovered
    }
}
