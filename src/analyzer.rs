use std::sync::Arc;

use anyhow::Result;
use reqwest::Url;
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::score::{compute_de_score, DeScoreResult, ScoreError};
use crate::scraper::PageSource;

/// Result of scoring one URL in a batch.
pub struct ScoreOutcome {
    pub url: String,
    pub result: Result<DeScoreResult, String>,
}

/// Accept only absolute http(s) URLs with a host.
pub fn validate_domain(input: &str) -> Result<Url, ScoreError> {
    let invalid = |reason: &str| ScoreError::InvalidDomain {
        input: input.to_string(),
        reason: reason.to_string(),
    };
    let url = Url::parse(input.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

/// Host without `www.`; projects are keyed on it.
pub fn project_domain(url: &Url) -> String {
    url.host_str()
        .unwrap_or_default()
        .trim_start_matches("www.")
        .to_lowercase()
}

pub struct Analyzer<S> {
    source: Arc<S>,
    concurrency: usize,
}

impl<S: PageSource + 'static> Analyzer<S> {
    pub fn new(source: S, concurrency: usize) -> Self {
        Analyzer {
            source: Arc::new(source),
            concurrency: concurrency.max(1),
        }
    }

    /// Validate, fetch and score a single site. The trimmed input, not its
    /// parsed form, is fetched and kept as `breakdown.url`.
    pub async fn analyze(&self, domain: &str) -> Result<DeScoreResult> {
        validate_domain(domain)?;
        score_url(self.source.as_ref(), domain.trim()).await
    }

    /// Score many URLs with bounded concurrency; outcomes arrive as they finish.
    pub fn analyze_many(&self, urls: Vec<String>) -> mpsc::Receiver<ScoreOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, rx) = mpsc::channel::<ScoreOutcome>(self.concurrency * 2);

        info!("Scoring {} URLs, {} at a time", urls.len(), self.concurrency);
        for url in urls {
            let source = Arc::clone(&self.source);
            let sem = Arc::clone(&semaphore);
            let tx = tx.clone();

            tokio::spawn(async move {
                let result = match sem.acquire_owned().await {
                    Ok(_permit) => match validate_domain(&url) {
                        Ok(_) => score_url(source.as_ref(), url.trim()).await,
                        Err(e) => Err(e.into()),
                    },
                    Err(e) => Err(e.into()),
                };
                let result = result.map_err(|e| {
                    warn!("Scoring failed for {}: {:#}", url, e);
                    format!("{:#}", e)
                });
                let _ = tx.send(ScoreOutcome { url, result }).await;
            });
        }

        rx
    }
}

async fn score_url<S: PageSource>(source: &S, url: &str) -> Result<DeScoreResult> {
    let content = source.fetch_page_content(url).await?;
    let result = compute_de_score(&content, url)?;
    info!("Scored {}: total {}", url, result.total_score);
    Ok(result)
}
