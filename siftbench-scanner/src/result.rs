use serde::{Deserialize, Serialize};
use std::fmt;

/// A URL waiting in the frontier together with its link distance from a seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: String,
    pub depth: usize,
}

impl CrawlTarget {
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
        }
    }
}

/// Closed set of reasons a strategy can give up on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    NonHtml,
    FetchFailed,
    NoMainContent,
    Timeout,
    Exception,
}

impl ReasonCode {
    pub const ALL: [ReasonCode; 5] = [
        ReasonCode::NonHtml,
        ReasonCode::FetchFailed,
        ReasonCode::NoMainContent,
        ReasonCode::Timeout,
        ReasonCode::Exception,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::NonHtml => "non_html",
            ReasonCode::FetchFailed => "fetch_failed",
            ReasonCode::NoMainContent => "no_main_content",
            ReasonCode::Timeout => "timeout",
            ReasonCode::Exception => "exception",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_str() == s)
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page a strategy managed to fetch and clean.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    /// None when the backend could not observe the HTTP status.
    pub status: Option<u16>,
    /// Length of the raw markup in characters.
    pub raw_length: usize,
    pub clean_text: String,
    /// Absolute, fragment-free links found on the page.
    pub links: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ExtractionFailure {
    pub status: Option<u16>,
    pub reason: ReasonCode,
    pub detail: Option<String>,
}

impl ExtractionFailure {
    pub fn new(reason: ReasonCode) -> Self {
        Self {
            status: None,
            reason,
            detail: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Outcome of a single `extract` call.
#[derive(Debug, Clone)]
pub enum Extraction {
    Ok(ExtractedPage),
    Fail(ExtractionFailure),
}

impl Extraction {
    pub fn fail(reason: ReasonCode) -> Self {
        Extraction::Fail(ExtractionFailure::new(reason))
    }
}

impl From<ExtractionFailure> for Extraction {
    fn from(failure: ExtractionFailure) -> Self {
        Extraction::Fail(failure)
    }
}

/// One visited URL. Serialized as an entry of a pipeline's `failures` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub tokens: usize,
    pub noise_ratio: Option<f64>,
}

impl PageResult {
    pub fn extracted(url: String, status: Option<u16>, tokens: usize, noise_ratio: f64) -> Self {
        Self {
            url,
            status,
            error: None,
            detail: None,
            tokens,
            noise_ratio: Some(noise_ratio),
        }
    }

    pub fn failed(url: String, failure: &ExtractionFailure) -> Self {
        Self {
            url,
            status: failure.status,
            error: Some(failure.reason.as_str().to_string()),
            detail: failure.detail.clone(),
            tokens: 0,
            noise_ratio: None,
        }
    }

    /// A page counts as ok only with a 2xx status and at least one token.
    pub fn is_ok(&self) -> bool {
        matches!(self.status, Some(200..=299)) && self.tokens > 0
    }
}
