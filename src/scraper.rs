use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::{debug, warn};

use crate::settings::Settings;

const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Anything that can turn a URL into page Markdown.
pub trait PageSource: Send + Sync {
    fn fetch_page_content(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// spider.cloud scraper returning Markdown.
pub struct SpiderSource {
    spider: Spider,
    max_retries: u32,
    base_backoff_ms: u64,
}

impl SpiderSource {
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = settings
            .spider_api_key
            .clone()
            .ok_or_else(|| anyhow!("SPIDER_API_KEY environment variable must be set"))?;
        let spider = Spider::new(Some(api_key))
            .map_err(|e| anyhow!("Failed to create Spider client: {}", e))?;
        Ok(SpiderSource {
            spider,
            max_retries: settings.max_retries,
            base_backoff_ms: settings.base_backoff_ms,
        })
    }

    async fn scrape_one(&self, url: &str) -> Result<String> {
        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Markdown)),
            ..Default::default()
        };

        let start = Instant::now();
        let response = self
            .spider
            .scrape_url(url, Some(params), "application/json")
            .await
            .map_err(|e| anyhow!("Spider scrape failed: {}", e))?;
        debug!("Scraped {} in {}ms", url, start.elapsed().as_millis());

        let parsed: serde_json::Value = match response.as_str() {
            Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
            None => response,
        };
        content_from_response(&parsed)
    }
}

impl PageSource for SpiderSource {
    async fn fetch_page_content(&self, url: &str) -> Result<String> {
        with_retry(url, self.max_retries, self.base_backoff_ms, || self.scrape_one(url)).await
    }
}

/// Call `fetch` until it succeeds, fails for good, or `max_retries` retries are used up.
async fn with_retry<F, Fut>(
    url: &str,
    max_retries: u32,
    base_backoff_ms: u64,
    mut fetch: F,
) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    for attempt in 0..max_retries {
        match fetch().await {
            Ok(content) => return Ok(content),
            Err(e) if is_retryable(&e.to_string()) => {
                let backoff = backoff_delay(base_backoff_ms, attempt);
                warn!(
                    "Rate limited on {} (attempt {}/{}), backing off {:.1}s",
                    url,
                    attempt + 1,
                    max_retries,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }

    fetch().await
}

/// `base * 2^attempt`, capped at `MAX_BACKOFF`.
fn backoff_delay(base_backoff_ms: u64, attempt: u32) -> Duration {
    2u64.checked_pow(attempt)
        .and_then(|m| base_backoff_ms.checked_mul(m))
        .map_or(MAX_BACKOFF, Duration::from_millis)
        .min(MAX_BACKOFF)
}

fn is_retryable(error: &str) -> bool {
    ["429", "rate", "500", "502", "503"]
        .iter()
        .any(|marker| error.contains(marker))
}

/// Pull the first page's Markdown out of a spider response.
fn content_from_response(parsed: &serde_json::Value) -> Result<String> {
    let first = parsed.as_array().and_then(|arr| arr.first());

    if let Some(status) = first.and_then(|obj| obj.get("status")).and_then(|s| s.as_i64()) {
        if status >= 400 {
            bail!("Spider returned status {}", status);
        }
    }

    first
        .and_then(|obj| obj.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("No content in spider response"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_is_taken_from_first_entry() {
        let v = json!([
            { "content": "# Page\n\n![logo](https://a.dev/l.png)", "status": 200 },
            { "content": "ignored", "status": 200 }
        ]);
        let md = content_from_response(&v).unwrap();
        assert!(md.starts_with("# Page"));
        assert!(md.contains("![logo]"));
    }

    #[test]
    fn missing_content_is_an_error() {
        assert!(content_from_response(&json!([])).is_err());
        assert!(content_from_response(&json!({ "content": "x" })).is_err());
        assert!(content_from_response(&json!([{ "status": 200 }])).is_err());
    }

    #[test]
    fn error_status_is_reported() {
        let err = content_from_response(&json!([{ "content": "", "status": 503 }])).unwrap_err();
        assert!(err.to_string().contains("503"));
        assert!(is_retryable(&err.to_string()));
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_delay(2000, 0), Duration::from_secs(2));
        assert_eq!(backoff_delay(2000, 3), Duration::from_secs(16));
        assert_eq!(backoff_delay(2000, 10), MAX_BACKOFF);
        assert_eq!(backoff_delay(2000, 63), MAX_BACKOFF);
        assert_eq!(backoff_delay(2000, 64), MAX_BACKOFF);
        assert_eq!(backoff_delay(u64::MAX, 1), MAX_BACKOFF);
        assert_eq!(backoff_delay(0, 200), Duration::ZERO);
    }

    #[tokio::test]
    async fn retries_until_exhausted() {
        let mut calls = 0;
        let result = with_retry("https://a.dev", 3, 1, || {
            calls += 1;
            async { Err::<String, _>(anyhow!("503 Service Unavailable")) }
        })
        .await;
        assert!(result.unwrap_err().to_string().contains("503"));
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn recovers_after_rate_limit() {
        let mut calls = 0;
        let result = with_retry("https://a.dev", 3, 1, || {
            calls += 1;
            let n = calls;
            async move {
                if n < 3 {
                    Err(anyhow!("429 Too Many Requests"))
                } else {
                    Ok("# Page".to_string())
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "# Page");
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let mut calls = 0;
        let result = with_retry("https://a.dev", 3, 1, || {
            calls += 1;
            async { Err::<String, _>(anyhow!("No content in spider response")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn zero_retries_means_one_attempt() {
        let mut calls = 0;
        let result = with_retry("https://a.dev", 0, 1, || {
            calls += 1;
            async { Err::<String, _>(anyhow!("502 Bad Gateway")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn retry_markers() {
        assert!(is_retryable("HTTP 429 Too Many Requests"));
        assert!(is_retryable("rate limit exceeded"));
        assert!(is_retryable("502 Bad Gateway"));
        assert!(!is_retryable("404 Not Found"));
        assert!(!is_retryable("No content in spider response"));
    }
}
