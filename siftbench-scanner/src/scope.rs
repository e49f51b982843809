// Host allow-listing and link normalization for frontier expansion

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use url::Url;

const SKIPPED_EXTENSIONS: &[&str] = &[
    ".pdf", ".apk", ".doc", ".docx", ".zip", ".xls", ".xlsx", ".ppt", ".pptx", ".jpg", ".jpeg",
    ".png", ".gif", ".svg", ".mp4",
];

/// How a URL's host is compared against the allow-list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostMatch {
    /// Case-insensitive exact host equality.
    #[default]
    Exact,
    /// Host equals an entry or is a subdomain of it.
    Suffix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostScope {
    hosts: BTreeSet<String>,
    mode: HostMatch,
}

impl HostScope {
    pub fn new<I, S>(hosts: I, mode: HostMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().trim_end_matches('.').to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        Self { hosts, mode }
    }

    /// Scope made of the hosts of the given seed URLs.
    pub fn from_seeds(seeds: &[String], mode: HostMatch) -> Self {
        let hosts: Vec<String> = seeds
            .iter()
            .filter_map(|s| Url::parse(s).ok())
            .filter_map(|u| u.host_str().map(str::to_string))
            .collect();
        Self::new(hosts, mode)
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    pub fn allows_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_lowercase();
        match self.mode {
            HostMatch::Exact => self.hosts.contains(&host),
            HostMatch::Suffix => self
                .hosts
                .iter()
                .any(|h| host == *h || host.ends_with(&format!(".{}", h))),
        }
    }

    pub fn allows(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| self.allows_host(h)))
            .unwrap_or(false)
    }
}

/// Strip the fragment so `page#a` and `page#b` are the same frontier entry.
pub fn normalize_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

/// Resolve `href` against `base`, dropping links that can never be crawled.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    // Skip empty, javascript:, mailto:, tel:, bare fragments
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    resolved.set_fragment(None);

    let path = resolved.path().to_lowercase();
    if SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return None;
    }

    Some(resolved.to_string())
}

/// Resolve every href against the page URL, de-duplicated in page order.
pub fn collect_links<'a, I>(page_url: &str, hrefs: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };

    let mut links: Vec<String> = Vec::new();
    for href in hrefs {
        if let Some(link) = resolve_link(&base, href)
            && !links.contains(&link)
        {
            links.push(link);
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let scope = HostScope::new(["www.Example.com"], HostMatch::Exact);
        assert!(scope.allows("https://WWW.example.com/page"));
        assert!(!scope.allows("https://example.com/page"));
        assert!(!scope.allows("https://sub.www.example.com/"));
    }

    #[test]
    fn test_suffix_match_allows_subdomains() {
        let scope = HostScope::new(["example.com"], HostMatch::Suffix);
        assert!(scope.allows("https://example.com/"));
        assert!(scope.allows("https://docs.example.com/a"));
        assert!(!scope.allows("https://badexample.com/"));
    }

    #[test]
    fn test_scope_from_seeds() {
        let seeds = vec![
            "https://a.test/x".to_string(),
            "http://B.test:8080/".to_string(),
            "not a url".to_string(),
        ];
        let scope = HostScope::from_seeds(&seeds, HostMatch::Exact);
        let hosts: Vec<&str> = scope.hosts().collect();
        assert_eq!(hosts, vec!["a.test", "b.test"]);
    }

    #[test]
    fn test_unparseable_url_is_out_of_scope() {
        let scope = HostScope::new(["a.test"], HostMatch::Exact);
        assert!(!scope.allows("::nope::"));
    }

    #[test]
    fn test_normalize_url_strips_fragment() {
        assert_eq!(
            normalize_url("https://a.test/page#section").as_deref(),
            Some("https://a.test/page")
        );
    }

    #[test]
    fn test_resolve_link_skips_non_crawlable() {
        let base = Url::parse("https://a.test/dir/").unwrap();
        assert_eq!(resolve_link(&base, "mailto:x@a.test"), None);
        assert_eq!(resolve_link(&base, "javascript:void(0)"), None);
        assert_eq!(resolve_link(&base, "tel:123"), None);
        assert_eq!(resolve_link(&base, "#top"), None);
        assert_eq!(resolve_link(&base, "ftp://a.test/file"), None);
        assert_eq!(resolve_link(&base, "/files/guide.PDF"), None);
        assert_eq!(
            resolve_link(&base, "next.html#part").as_deref(),
            Some("https://a.test/dir/next.html")
        );
    }

    #[test]
    fn test_collect_links_resolves_and_dedups() {
        let hrefs = vec!["/one", "/one#frag", "https://other.test/", "two", "mailto:a@b"];
        let links = collect_links("https://a.test/base/", hrefs);
        assert_eq!(
            links,
            vec![
                "https://a.test/one".to_string(),
                "https://other.test/".to_string(),
                "https://a.test/base/two".to_string()
            ]
        );
    }
}
