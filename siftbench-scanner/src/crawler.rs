use crate::config::CrawlConfig;
use crate::metrics::{noise_ratio_from_lengths, round3, token_count};
use crate::result::{CrawlTarget, Extraction, PageResult};
use crate::scope::{HostScope, normalize_url};
use crate::strategy::ExtractionStrategy;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Called with (pages visited so far, url) right before each fetch.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;
/// Called with every PageResult as soon as it is produced.
pub type ResultCallback = Arc<dyn Fn(&PageResult) + Send + Sync>;

/// Everything one crawl produced.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub results: Vec<PageResult>,
    pub elapsed: Duration,
}

/// Breadth-first crawler over a bounded frontier.
///
/// The loop is sequential: each fetch finishes (or fails) before the next
/// target is popped, and `seen`/`results` are owned by the loop alone.
pub struct Crawler {
    seeds: Vec<String>,
    scope: HostScope,
    max_pages: usize,
    max_depth: usize,
    progress_callback: Option<ProgressCallback>,
    result_callback: Option<ResultCallback>,
}

impl Crawler {
    pub fn new(config: &CrawlConfig) -> Self {
        Self {
            seeds: config.seeds.clone(),
            scope: config.scope(),
            max_pages: config.max_pages,
            max_depth: config.max_depth,
            progress_callback: None,
            result_callback: None,
        }
    }

    /// Append extra depth-0 seeds (e.g. from a sitemap) after the configured ones.
    pub fn with_extra_seeds(mut self, seeds: Vec<String>) -> Self {
        self.seeds.extend(seeds);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_result_callback(mut self, callback: ResultCallback) -> Self {
        self.result_callback = Some(callback);
        self
    }

    pub fn scope(&self) -> &HostScope {
        &self.scope
    }

    pub async fn crawl<S: ExtractionStrategy>(&self, strategy: &mut S) -> CrawlOutcome {
        info!(
            "Starting {} crawl of {} seed(s), max {} pages, depth {}",
            strategy.name(),
            self.seeds.len(),
            self.max_pages,
            self.max_depth
        );

        let mut frontier: VecDeque<CrawlTarget> =
            self.seeds.iter().map(CrawlTarget::seed).collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut results: Vec<PageResult> = Vec::new();
        let start = Instant::now();

        while results.len() < self.max_pages {
            let Some(target) = frontier.pop_front() else {
                break;
            };

            let Some(url) = normalize_url(&target.url) else {
                debug!("Discarding unparseable URL {}", target.url);
                continue;
            };
            if seen.contains(&url) || !self.scope.allows(&url) {
                continue;
            }
            seen.insert(url.clone());

            if let Some(ref callback) = self.progress_callback {
                callback(results.len(), url.clone());
            }
            debug!("Visiting {} (depth {})", url, target.depth);

            let result = match strategy.extract(&url).await {
                Extraction::Ok(page) => {
                    let tokens = token_count(&page.clean_text);
                    let ratio = noise_ratio_from_lengths(
                        page.raw_length,
                        page.clean_text.chars().count(),
                    );

                    if target.depth < self.max_depth {
                        for link in page.links {
                            if let Some(link) = normalize_url(&link)
                                && !seen.contains(&link)
                                && self.scope.allows(&link)
                            {
                                frontier.push_back(CrawlTarget {
                                    url: link,
                                    depth: target.depth + 1,
                                });
                            }
                        }
                    }

                    PageResult::extracted(url, page.status, tokens, round3(ratio))
                }
                Extraction::Fail(failure) => {
                    warn!(
                        "Extraction failed for {}: {}{}",
                        url,
                        failure.reason,
                        failure
                            .detail
                            .as_deref()
                            .map(|d| format!(" ({})", d))
                            .unwrap_or_default()
                    );
                    PageResult::failed(url, &failure)
                }
            };

            if let Some(ref callback) = self.result_callback {
                callback(&result);
            }
            results.push(result);
        }

        let elapsed = start.elapsed();
        info!(
            "Crawl complete. Visited {} pages in {:.2}s ({} left in frontier)",
            results.len(),
            elapsed.as_secs_f64(),
            frontier.len()
        );

        CrawlOutcome { results, elapsed }
    }
}
