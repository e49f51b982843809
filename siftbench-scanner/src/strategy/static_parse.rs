use super::{ExtractionStrategy, build_client, fetch_html, guard_parse};
use crate::error::Result;
use crate::result::{ExtractedPage, Extraction};
use crate::scope::collect_links;
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;

const NOISE_TAGS: &[&str] = &["script", "style", "noscript", "svg"];

/// Fetch over plain HTTP and keep every visible text node.
pub struct StaticParse {
    client: Client,
}

impl StaticParse {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout, user_agent)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl ExtractionStrategy for StaticParse {
    fn name(&self) -> &'static str {
        "static-parse"
    }

    async fn extract(&mut self, url: &str) -> Extraction {
        let fetched = match fetch_html(&self.client, url).await {
            Ok(fetched) => fetched,
            Err(failure) => return failure.into(),
        };

        match guard_parse(|| parse_page(url, &fetched.body)) {
            Ok((clean_text, links)) => Extraction::Ok(ExtractedPage {
                status: Some(fetched.status),
                raw_length: fetched.body.chars().count(),
                clean_text,
                links,
            }),
            Err(failure) => failure.with_status(fetched.status).into(),
        }
    }
}

/// Clean text and links of a page. The parsed DOM never outlives this call.
pub fn parse_page(url: &str, html: &str) -> (String, Vec<String>) {
    let document = Html::parse_document(html);
    let text = visible_text(&document);
    let links = page_links(url, &document);
    (text, links)
}

/// Text nodes outside script/style/noscript/svg, trimmed, one per line.
pub fn visible_text(document: &Html) -> String {
    let mut lines = Vec::new();
    collect_text(document.root_element(), &mut lines);
    lines.join("\n")
}

fn collect_text(element: ElementRef<'_>, lines: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed.to_string());
                }
            }
            Node::Element(el) if NOISE_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, lines);
                }
            }
            _ => {}
        }
    }
}

pub(crate) fn page_links(url: &str, document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let hrefs = document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"));
    collect_links(url, hrefs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ReasonCode;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[test]
    fn test_visible_text_drops_noise_tags() {
        let html = r#"<html><head><title>T</title><style>p{}</style></head>
            <body><script>var x = 1;</script><p>Hello <b>there</b></p>
            <noscript>enable js</noscript><svg><text>icon</text></svg></body></html>"#;
        let document = Html::parse_document(html);
        assert_eq!(visible_text(&document), "T\nHello\nthere");
    }

    #[test]
    fn test_parse_page_links() {
        let html = r#"<a href="/a">A</a><a href="b#x">B</a><a href="mailto:x@y">M</a>"#;
        let (_, links) = parse_page("https://site.test/dir/", html);
        assert_eq!(
            links,
            vec![
                "https://site.test/a".to_string(),
                "https://site.test/dir/b".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_extract_html_page() {
        let mock_server = MockServer::start().await;
        let body = format!(
            r#"<html><body><p>Main text here</p><a href="{}/next">n</a></body></html>"#,
            mock_server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string(body.clone()),
            )
            .mount(&mock_server)
            .await;

        let mut strategy = StaticParse::new(Duration::from_secs(5), "test").unwrap();
        match strategy.extract(&format!("{}/", mock_server.uri())).await {
            Extraction::Ok(page) => {
                assert_eq!(page.status, Some(200));
                assert_eq!(page.clean_text, "Main text here\nn");
                assert_eq!(page.raw_length, body.chars().count());
                assert_eq!(page.links, vec![format!("{}/next", mock_server.uri())]);
            }
            Extraction::Fail(f) => panic!("unexpected failure: {:?}", f),
        }
    }

    #[tokio::test]
    async fn test_extract_non_html_fails() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_string("{}"),
            )
            .mount(&mock_server)
            .await;

        let mut strategy = StaticParse::new(Duration::from_secs(5), "test").unwrap();
        match strategy
            .extract(&format!("{}/data.json", mock_server.uri()))
            .await
        {
            Extraction::Fail(f) => {
                assert_eq!(f.reason, ReasonCode::NonHtml);
                assert_eq!(f.status, Some(200));
            }
            Extraction::Ok(_) => panic!("JSON must not be extracted"),
        }
    }

    #[tokio::test]
    async fn test_extract_http_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let mut strategy = StaticParse::new(Duration::from_secs(5), "test").unwrap();
        match strategy
            .extract(&format!("{}/missing", mock_server.uri()))
            .await
        {
            Extraction::Fail(f) => {
                assert_eq!(f.reason, ReasonCode::FetchFailed);
                assert_eq!(f.status, Some(404));
            }
            Extraction::Ok(_) => panic!("404 must fail"),
        }
    }

    #[tokio::test]
    async fn test_extract_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<p>late</p>")
                    .set_delay(Duration::from_millis(1500)),
            )
            .mount(&mock_server)
            .await;

        let mut strategy = StaticParse::new(Duration::from_millis(300), "test").unwrap();
        match strategy.extract(&format!("{}/slow", mock_server.uri())).await {
            Extraction::Fail(f) => assert_eq!(f.reason, ReasonCode::Timeout),
            Extraction::Ok(_) => panic!("slow response must time out"),
        }
    }

    #[tokio::test]
    async fn test_extract_unreachable_host() {
        let mut strategy = StaticParse::new(Duration::from_secs(2), "test").unwrap();
        match strategy.extract("http://127.0.0.1:9/").await {
            Extraction::Fail(f) => {
                assert!(matches!(f.reason, ReasonCode::FetchFailed | ReasonCode::Timeout));
                assert_eq!(f.status, None);
            }
            Extraction::Ok(_) => panic!("nothing listens on the discard port"),
        }
    }
}
