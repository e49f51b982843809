use super::ExtractionStrategy;
use crate::result::{ExtractedPage, Extraction, ExtractionFailure, ReasonCode};
use std::collections::HashMap;

/// In-memory strategy serving canned outcomes, for driving the crawler without a network.
///
/// URLs without a registered outcome fail with `fetch_failed`.
#[derive(Debug, Default, Clone)]
pub struct FixtureStrategy {
    pages: HashMap<String, Extraction>,
    calls: Vec<String>,
}

impl FixtureStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page whose raw markup is `raw`, cleaned to `text`, linking to `links`.
    pub fn page(mut self, url: &str, raw: &str, text: &str, links: &[&str]) -> Self {
        self.pages.insert(
            url.to_string(),
            Extraction::Ok(ExtractedPage {
                status: Some(200),
                raw_length: raw.chars().count(),
                clean_text: text.to_string(),
                links: links.iter().map(|l| l.to_string()).collect(),
            }),
        );
        self
    }

    pub fn outcome(mut self, url: &str, outcome: Extraction) -> Self {
        self.pages.insert(url.to_string(), outcome);
        self
    }

    pub fn failure(self, url: &str, status: Option<u16>, reason: ReasonCode) -> Self {
        let mut failure = ExtractionFailure::new(reason);
        failure.status = status;
        self.outcome(url, Extraction::Fail(failure))
    }

    /// Every URL passed to `extract`, in call order.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }
}

impl ExtractionStrategy for FixtureStrategy {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn extract(&mut self, url: &str) -> Extraction {
        self.calls.push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| Extraction::fail(ReasonCode::FetchFailed))
    }
}
