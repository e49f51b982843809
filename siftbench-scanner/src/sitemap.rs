// Seed discovery through robots.txt and XML sitemaps

use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

/// Parsed content of one sitemap document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Sitemap {
    /// `<sitemapindex>` rather than `<urlset>`.
    pub is_index: bool,
    pub locations: Vec<String>,
}

/// Pull every `<loc>` out of a sitemap or sitemap index.
pub fn parse_sitemap(xml: &str) -> Sitemap {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut sitemap = Sitemap::default();
    let mut in_loc = false;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sitemapindex" => sitemap.is_index = true,
                b"loc" => {
                    in_loc = true;
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_loc => {
                if let Ok(text) = t.decode() {
                    current.push_str(&text);
                }
            }
            Ok(Event::CData(c)) if in_loc => {
                current.push_str(&String::from_utf8_lossy(c.as_ref()));
            }
            Ok(Event::GeneralRef(r)) if in_loc => {
                if let Ok(Some(ch)) = r.resolve_char_ref() {
                    current.push(ch);
                } else if let Ok(name) = r.decode()
                    && let Some(resolved) = quick_xml::escape::resolve_predefined_entity(&name)
                {
                    current.push_str(resolved);
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"loc" => {
                in_loc = false;
                let loc = current.trim();
                if !loc.is_empty() {
                    sitemap.locations.push(loc.to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("Sitemap parse stopped at {}: {}", reader.buffer_position(), e);
                break;
            }
            _ => {}
        }
    }

    sitemap
}

/// `Sitemap:` entries of a robots.txt body.
pub fn sitemaps_from_robots(robots: &str) -> Vec<String> {
    robots
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case("sitemap")
                .then(|| value.trim().to_string())
        })
        .filter(|v| !v.is_empty())
        .collect()
}

async fn fetch_text(client: &Client, url: &str) -> Option<String> {
    let response = match client.get(url).send().await {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            debug!("{} returned {}", url, r.status());
            return None;
        }
        Err(e) => {
            debug!("{} unreachable: {}", url, e);
            return None;
        }
    };
    response.text().await.ok()
}

/// Page URLs advertised by the sitemaps of `seed`'s site, at most `limit` of them.
///
/// Sitemap indexes are followed one level deep. Any failure just yields fewer URLs.
pub async fn discover_seeds(client: &Client, seed: &str, limit: usize) -> Vec<String> {
    let Ok(base) = Url::parse(seed) else {
        warn!("Cannot discover sitemaps for invalid seed {}", seed);
        return Vec::new();
    };

    let mut sitemap_urls = match base.join("/robots.txt") {
        Ok(robots_url) => match fetch_text(client, robots_url.as_str()).await {
            Some(body) => sitemaps_from_robots(&body),
            None => Vec::new(),
        },
        Err(_) => Vec::new(),
    };
    if sitemap_urls.is_empty()
        && let Ok(default) = base.join("/sitemap.xml")
    {
        sitemap_urls.push(default.to_string());
    }

    let mut pages: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for sitemap_url in sitemap_urls {
        if pages.len() >= limit {
            break;
        }
        let Some(xml) = fetch_text(client, &sitemap_url).await else {
            continue;
        };
        let sitemap = parse_sitemap(&xml);

        let children = if sitemap.is_index {
            let mut collected = Vec::new();
            for child in sitemap.locations {
                if pages.len() + collected.len() >= limit {
                    break;
                }
                if let Some(child_xml) = fetch_text(client, &child).await {
                    let child_map = parse_sitemap(&child_xml);
                    if !child_map.is_index {
                        collected.extend(child_map.locations);
                    }
                }
            }
            collected
        } else {
            sitemap.locations
        };

        for page in children {
            if pages.len() >= limit {
                break;
            }
            if seen.insert(page.clone()) {
                pages.push(page);
            }
        }
    }

    info!("Sitemap discovery for {} found {} URLs", seed, pages.len());
    pages
}
