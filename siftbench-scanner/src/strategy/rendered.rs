use super::ExtractionStrategy;
use crate::error::{Result, ScanError};
use crate::result::{ExtractedPage, Extraction, ExtractionFailure, ReasonCode};
use crate::scope::collect_links;
use anyhow::Context;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// Drop noise tags, then read what a user would see
const INNER_TEXT_SCRIPT: &str = r#"(() => {
    document.querySelectorAll('script,style,noscript,svg').forEach(el => el.remove());
    return document.body ? document.body.innerText : '';
})()"#;

const LINKS_SCRIPT: &str = r#"(() => Array.from(document.querySelectorAll('a[href]'))
    .map(a => a.getAttribute('href'))
    .filter(h => !!h))()"#;

const STATUS_SCRIPT: &str = r#"(() => {
    const nav = performance.getEntriesByType('navigation')[0];
    return nav && nav.responseStatus ? nav.responseStatus : null;
})()"#;

// Extra time given to the browser before the outer timer gives up on it
const TIMEOUT_GRACE: Duration = Duration::from_secs(2);

type RenderJob = JoinHandle<anyhow::Result<RenderedPage>>;

/// Headless Chrome with one tab reused for every URL of the run.
pub struct RenderedDom {
    _browser: Browser,
    tab: Arc<Tab>,
    timeout: Duration,
    /// A render abandoned by the outer timer; it must finish before the tab is reused.
    abandoned: Option<RenderJob>,
}

#[derive(Debug, Clone, Default)]
struct RenderedPage {
    status: Option<u16>,
    html: String,
    text: String,
    hrefs: Vec<String>,
}

#[derive(Debug, Error)]
#[error("render of {url} exceeded its {budget:?} budget")]
struct DeadlineExceeded {
    url: String,
    budget: Duration,
}

impl RenderedDom {
    /// Start a headless browser. Fails if no Chrome/Chromium binary can be found.
    pub fn launch(timeout: Duration) -> Result<Self> {
        let in_docker = std::env::var("IN_DOCKER").is_ok();
        let executable = headless_chrome::browser::default_executable()
            .map_err(ScanError::BrowserUnavailable)?;

        let options = LaunchOptions::default_builder()
            .path(Some(executable))
            .headless(true)
            .sandbox(!in_docker)
            .idle_browser_timeout(timeout.max(Duration::from_secs(30)) * 4)
            .build()
            .map_err(|e| ScanError::BrowserUnavailable(e.to_string()))?;

        let browser =
            Browser::new(options).map_err(|e| ScanError::BrowserUnavailable(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScanError::BrowserUnavailable(e.to_string()))?;
        tab.set_default_timeout(timeout);

        info!("Headless browser ready (timeout {:?})", timeout);
        Ok(Self {
            _browser: browser,
            tab,
            timeout,
            abandoned: None,
        })
    }
}

impl ExtractionStrategy for RenderedDom {
    fn name(&self) -> &'static str {
        "rendered-dom"
    }

    async fn extract(&mut self, url: &str) -> Extraction {
        // Never let two renders drive the tab at once
        if let Some(stale) = self.abandoned.take() {
            debug!("Waiting for an abandoned render before {}", url);
            let _ = stale.await;
        }

        let tab = self.tab.clone();
        let target = url.to_string();
        let budget = self.timeout;
        let mut job = tokio::task::spawn_blocking(move || render(&tab, &target, budget));

        let waited = tokio::time::timeout(self.timeout + TIMEOUT_GRACE, &mut job).await;
        let rendered = match waited {
            Err(_) => {
                warn!("Render of {} exceeded {:?}", url, self.timeout);
                self.abandoned = Some(job);
                return ExtractionFailure::new(ReasonCode::Timeout)
                    .with_detail(format!("no response within {:?}", self.timeout))
                    .into();
            }
            Ok(Err(join_error)) => {
                return ExtractionFailure::new(ReasonCode::Exception)
                    .with_detail(join_error.to_string())
                    .into();
            }
            Ok(Ok(Err(e))) => return failure_from_browser(&e).into(),
            Ok(Ok(Ok(page))) => page,
        };

        page_outcome(url, rendered)
    }
}

/// Map a rendered page to an outcome. An unobserved status stays unknown.
fn page_outcome(url: &str, rendered: RenderedPage) -> Extraction {
    match rendered.status {
        Some(status) if !(200..300).contains(&status) => {
            ExtractionFailure::new(ReasonCode::FetchFailed)
                .with_status(status)
                .with_detail(format!("HTTP {}", status))
                .into()
        }
        status => Extraction::Ok(ExtractedPage {
            status,
            raw_length: rendered.html.chars().count(),
            links: collect_links(url, rendered.hrefs.iter().map(String::as_str)),
            clean_text: rendered.text,
        }),
    }
}

/// Time left before `deadline`, or an error once it has passed.
fn remaining(deadline: Instant, url: &str, budget: Duration) -> anyhow::Result<Duration> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
        .ok_or_else(|| {
            DeadlineExceeded {
                url: url.to_string(),
                budget,
            }
            .into()
        })
}

/// Render `url` with every browser call sharing one overall deadline.
fn render(tab: &Tab, url: &str, budget: Duration) -> anyhow::Result<RenderedPage> {
    debug!("Rendering {}", url);
    let deadline = Instant::now() + budget;

    tab.set_default_timeout(remaining(deadline, url, budget)?);
    tab.navigate_to(url)
        .with_context(|| format!("navigation to {} failed", url))?;
    tab.set_default_timeout(remaining(deadline, url, budget)?);
    tab.wait_until_navigated()
        .with_context(|| format!("{} never finished loading", url))?;

    tab.set_default_timeout(remaining(deadline, url, budget)?);
    let status = tab
        .evaluate(STATUS_SCRIPT, false)?
        .value
        .and_then(|v| v.as_u64())
        .and_then(|s| u16::try_from(s).ok());
    tab.set_default_timeout(remaining(deadline, url, budget)?);
    let html = tab.get_content()?;
    tab.set_default_timeout(remaining(deadline, url, budget)?);
    let text = tab
        .evaluate(INNER_TEXT_SCRIPT, false)?
        .value
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    tab.set_default_timeout(remaining(deadline, url, budget)?);
    let hrefs = tab
        .evaluate(LINKS_SCRIPT, false)?
        .value
        .and_then(|v| v.as_array().cloned())
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    Ok(RenderedPage {
        status,
        html,
        text,
        hrefs,
    })
}

fn failure_from_browser(err: &anyhow::Error) -> ExtractionFailure {
    let timed_out = err.chain().any(|cause| {
        cause.is::<headless_chrome::util::Timeout>() || cause.is::<DeadlineExceeded>()
    });
    let reason = if timed_out {
        ReasonCode::Timeout
    } else {
        ReasonCode::FetchFailed
    };
    ExtractionFailure::new(reason).with_detail(format!("{:#}", err))
}
