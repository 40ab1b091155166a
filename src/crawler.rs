use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::{debug, info};

use crate::config::FetcherKind;
use crate::error::{CrawlError, Result};
use crate::extract::{CompiledSchema, Record};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 5;

/// Turns a URL into page HTML. Failures come back as `FetchFailure`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Build the fetcher selected in settings.
pub fn build_fetcher(kind: FetcherKind) -> Result<Box<dyn PageFetcher>> {
    match kind {
        FetcherKind::Http => Ok(Box::new(HttpFetcher::new()?)),
        FetcherKind::Spider => Ok(Box::new(SpiderFetcher::from_env()?)),
    }
}

/// Fetch one page and run the schema over it.
pub async fn fetch_and_extract(
    fetcher: &dyn PageFetcher,
    url: &str,
    schema: &CompiledSchema,
) -> Result<Vec<Record>> {
    let start = Instant::now();
    let html = fetcher.fetch(url).await?;
    let records = schema.extract(&html);
    info!(
        "Extracted {} rows from {} in {:.1}s",
        records.len(),
        url,
        start.elapsed().as_secs_f64()
    );
    Ok(records)
}

/// Plain HTTP GET. Good enough for server-rendered listing tables.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-IN,en;q=0.8"));

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| CrawlError::fetch("<client>", e))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CrawlError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::fetch(url, format!("HTTP {}", status)));
        }

        response.text().await.map_err(|e| CrawlError::fetch(url, e))
    }
}

/// Rendered HTML through spider.cloud, for pages that build their tables in
/// the browser.
pub struct SpiderFetcher {
    spider: Spider,
}

impl SpiderFetcher {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("SPIDER_API_KEY")
            .map_err(|_| CrawlError::ConfigurationMissing("SPIDER_API_KEY"))?;
        let spider = Spider::new(Some(api_key))
            .map_err(|e| CrawlError::fetch("<spider>", format!("failed to create client: {}", e)))?;
        Ok(Self { spider })
    }
}

#[async_trait]
impl PageFetcher for SpiderFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
            ..Default::default()
        };

        let response = self
            .spider
            .scrape_url(url, Some(params), "application/json")
            .await
            .map_err(|e| CrawlError::fetch(url, e))?;

        let parsed: serde_json::Value = match response.as_str() {
            Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
            None => response,
        };
        let first = parsed.as_array().and_then(|arr| arr.first());

        if let Some(status) = first.and_then(|obj| obj.get("status")).and_then(|s| s.as_i64()) {
            if !(200..300).contains(&status) {
                return Err(CrawlError::fetch(url, format!("HTTP {}", status)));
            }
        }

        first
            .and_then(|obj| obj.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| CrawlError::fetch(url, "no content in spider response"))
    }
}
