use crate::error::{Result, ScanError};
use crate::scope::{HostMatch, HostScope};
use crate::strategy::DEFAULT_USER_AGENT;
use std::time::Duration;
use url::Url;

pub const DEFAULT_MAX_PAGES: usize = 200;
pub const DEFAULT_MAX_DEPTH: usize = 2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Everything a single crawl needs to know up front.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub seeds: Vec<String>,
    /// Empty means "the hosts of the seeds".
    pub allowed_hosts: Vec<String>,
    pub host_match: HostMatch,
    pub max_pages: usize,
    pub max_depth: usize,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            allowed_hosts: Vec::new(),
            host_match: HostMatch::Exact,
            max_pages: DEFAULT_MAX_PAGES,
            max_depth: DEFAULT_MAX_DEPTH,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CrawlConfig {
    pub fn new(seeds: Vec<String>) -> Self {
        Self {
            seeds,
            ..Self::default()
        }
    }

    pub fn with_allowed_hosts(mut self, hosts: Vec<String>) -> Self {
        self.allowed_hosts = hosts;
        self
    }

    pub fn with_host_match(mut self, host_match: HostMatch) -> Self {
        self.host_match = host_match;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn scope(&self) -> HostScope {
        if self.allowed_hosts.is_empty() {
            HostScope::from_seeds(&self.seeds, self.host_match)
        } else {
            HostScope::new(&self.allowed_hosts, self.host_match)
        }
    }

    /// Reject configurations that could never visit a page.
    pub fn validate(&self) -> Result<()> {
        if self.seeds.is_empty() {
            return Err(ScanError::Config("at least one seed URL is required".into()));
        }
        for seed in &self.seeds {
            Url::parse(seed).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", seed, e)))?;
        }
        if self.timeout.is_zero() {
            return Err(ScanError::Config("timeout must be positive".into()));
        }
        if self.scope().is_empty() {
            return Err(ScanError::Config("host allow-list is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CrawlConfig::new(vec!["https://a.test/".into()]);
        assert_eq!(config.max_pages, 200);
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.host_match, HostMatch::Exact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scope_falls_back_to_seed_hosts() {
        let config = CrawlConfig::new(vec!["https://a.test/x".into()]);
        assert!(config.scope().allows("https://a.test/y"));
        assert!(!config.scope().allows("https://b.test/"));

        let config = config.with_allowed_hosts(vec!["b.test".into()]);
        assert!(!config.scope().allows("https://a.test/y"));
        assert!(config.scope().allows("https://b.test/"));
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(CrawlConfig::new(vec![]).validate().is_err());
        assert!(CrawlConfig::new(vec!["nope".into()]).validate().is_err());
        assert!(
            CrawlConfig::new(vec!["https://a.test/".into()])
                .with_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }
}
