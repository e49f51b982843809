// Extraction strategies: one capability, three backends

pub mod content;
pub mod fixture;
pub mod rendered;
pub mod static_parse;

use crate::error::{Result, ScanError};
use crate::result::{Extraction, ExtractionFailure, ReasonCode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub use content::ContentExtract;
pub use fixture::FixtureStrategy;
pub use rendered::RenderedDom;
pub use static_parse::StaticParse;

pub const DEFAULT_USER_AGENT: &str = "Siftbench/0.1 (https://github.com/trapdoorsec/siftbench)";

/// Given a URL, fetch it, clean it and report the links it exposes.
///
/// Implementations perform exactly one fetch per call, never retry, and must
/// surface an expired per-request timeout as [`ReasonCode::Timeout`].
pub trait ExtractionStrategy: Send {
    fn name(&self) -> &'static str;

    fn extract(&mut self, url: &str) -> impl Future<Output = Extraction> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    StaticParse,
    ContentExtract,
    RenderedDom,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::StaticParse,
        StrategyKind::ContentExtract,
        StrategyKind::RenderedDom,
    ];

    /// Short name used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::StaticParse => "static",
            StrategyKind::ContentExtract => "content",
            StrategyKind::RenderedDom => "rendered",
        }
    }

    /// Name a pipeline reports for itself unless overridden.
    pub fn pipeline_name(&self) -> &'static str {
        match self {
            StrategyKind::StaticParse => "static-parse",
            StrategyKind::ContentExtract => "content-extract",
            StrategyKind::RenderedDom => "rendered-dom",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StrategyKind::StaticParse => "plain HTTP fetch, all visible text minus script/style",
            StrategyKind::ContentExtract => "plain HTTP fetch, readability main-content scoring",
            StrategyKind::RenderedDom => "headless Chrome, innerText after scripts have run",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "static" | "static-parse" => Some(StrategyKind::StaticParse),
            "content" | "content-extract" | "readability" => Some(StrategyKind::ContentExtract),
            "rendered" | "rendered-dom" | "browser" => Some(StrategyKind::RenderedDom),
            _ => None,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP client shared by the fetch-based strategies.
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout / 2)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(ScanError::HttpError)
}

/// A successfully fetched HTML body.
pub(crate) struct FetchedHtml {
    pub status: u16,
    pub body: String,
}

/// Fetch `url` once and accept it only if it is a successful HTML response.
pub(crate) async fn fetch_html(
    client: &Client,
    url: &str,
) -> std::result::Result<FetchedHtml, ExtractionFailure> {
    debug!("Fetching {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| failure_from_reqwest(&e))?;

    let status = response.status().as_u16();
    if !response.status().is_success() {
        return Err(ExtractionFailure::new(ReasonCode::FetchFailed)
            .with_status(status)
            .with_detail(format!("HTTP {}", status)));
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.contains("text/html") {
        return Err(ExtractionFailure::new(ReasonCode::NonHtml)
            .with_status(status)
            .with_detail(content_type));
    }

    let body = response
        .text()
        .await
        .map_err(|e| failure_from_reqwest(&e).with_status(status))?;

    Ok(FetchedHtml { status, body })
}

fn failure_from_reqwest(err: &reqwest::Error) -> ExtractionFailure {
    let reason = if err.is_timeout() {
        ReasonCode::Timeout
    } else {
        ReasonCode::FetchFailed
    };
    ExtractionFailure::new(reason).with_detail(err.to_string())
}

/// Run a parsing closure, turning a panic inside a parser into `exception`.
pub(crate) fn guard_parse<T>(
    f: impl FnOnce() -> T,
) -> std::result::Result<T, ExtractionFailure> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)).map_err(|panic| {
        let detail = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "parser panicked".to_string());
        ExtractionFailure::new(ReasonCode::Exception).with_detail(detail)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_kind_from_str() {
        assert_eq!(StrategyKind::from_str("static"), Some(StrategyKind::StaticParse));
        assert_eq!(
            StrategyKind::from_str("Readability"),
            Some(StrategyKind::ContentExtract)
        );
        assert_eq!(
            StrategyKind::from_str("rendered-dom"),
            Some(StrategyKind::RenderedDom)
        );
        assert_eq!(StrategyKind::from_str("playwright"), None);
    }

    #[test]
    fn test_strategy_kind_names_round_trip() {
        for kind in StrategyKind::ALL {
            assert_eq!(StrategyKind::from_str(kind.as_str()), Some(kind));
            assert_eq!(StrategyKind::from_str(kind.pipeline_name()), Some(kind));
        }
    }

    #[test]
    fn test_guard_parse_catches_panic() {
        let failure = guard_parse(|| -> usize { panic!("boom") }).unwrap_err();
        assert_eq!(failure.reason, ReasonCode::Exception);
        assert_eq!(failure.detail.as_deref(), Some("boom"));
    }
}
