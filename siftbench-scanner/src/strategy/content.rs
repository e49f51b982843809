use super::static_parse::page_links;
use super::{ExtractionStrategy, build_client, fetch_html, guard_parse};
use crate::error::Result;
use crate::result::{ExtractedPage, Extraction, ExtractionFailure, ReasonCode};
use reqwest::Client;
use scraper::Html;
use std::time::Duration;
use url::Url;

/// Fetch over plain HTTP and keep only what readability scores as the main content.
pub struct ContentExtract {
    client: Client,
}

impl ContentExtract {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout, user_agent)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl ExtractionStrategy for ContentExtract {
    fn name(&self) -> &'static str {
        "content-extract"
    }

    async fn extract(&mut self, url: &str) -> Extraction {
        let fetched = match fetch_html(&self.client, url).await {
            Ok(fetched) => fetched,
            Err(failure) => return failure.into(),
        };

        let parsed = guard_parse(|| main_content(url, &fetched.body))
            .and_then(|inner| inner);
        match parsed {
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

/// Readability main text plus the page's links.
pub fn main_content(
    url: &str,
    html: &str,
) -> std::result::Result<(String, Vec<String>), ExtractionFailure> {
    let page_url = Url::parse(url).map_err(|e| {
        ExtractionFailure::new(ReasonCode::Exception).with_detail(format!("bad url: {}", e))
    })?;

    let product = readability::extractor::extract(&mut html.as_bytes(), &page_url).map_err(
        |e| ExtractionFailure::new(ReasonCode::NoMainContent).with_detail(e.to_string()),
    )?;

    let text = product
        .text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        return Err(ExtractionFailure::new(ReasonCode::NoMainContent));
    }

    let document = Html::parse_document(html);
    let links = page_links(url, &document);
    Ok((text, links))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const ARTICLE: &str = r#"<html><head><title>Guide</title></head><body>
        <nav><a href="/home">Home</a> <a href="/about">About</a></nav>
        <article>
          <h1>Setting up payments</h1>
          <p>To accept payments you first create a merchant account. The account
          needs a verified business address, a settlement bank account and a
          contact email address that your customers can reach.</p>
          <p>Once the account is approved you can generate API keys from the
          dashboard and start sending test transactions against the sandbox
          environment before switching to production traffic.</p>
          <p>Refunds are processed within five working days and appear on the
          settlement report that is emailed every morning.</p>
        </article>
        <footer>Copyright</footer>
        <script>track();</script>
    </body></html>"#;

    #[test]
    fn test_main_content_finds_article_text() {
        let (text, links) = main_content("https://docs.test/guide", ARTICLE).unwrap();
        assert!(text.contains("merchant account"));
        assert!(!text.contains("track()"));
        assert!(links.contains(&"https://docs.test/home".to_string()));
        assert!(links.contains(&"https://docs.test/about".to_string()));
    }

    #[test]
    fn test_main_content_empty_page() {
        let failure = main_content("https://docs.test/", "<html><body></body></html>").unwrap_err();
        assert_eq!(failure.reason, ReasonCode::NoMainContent);
    }

    #[tokio::test]
    async fn test_extract_reports_noise_against_raw_markup() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guide"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(ARTICLE),
            )
            .mount(&mock_server)
            .await;

        let mut strategy = ContentExtract::new(Duration::from_secs(5), "test").unwrap();
        match strategy
            .extract(&format!("{}/guide", mock_server.uri()))
            .await
        {
            Extraction::Ok(page) => {
                assert_eq!(page.status, Some(200));
                assert_eq!(page.raw_length, ARTICLE.chars().count());
                assert!(page.clean_text.chars().count() < page.raw_length);
            }
            Extraction::Fail(f) => panic!("unexpected failure: {:?}", f),
        }
    }
}
