pub mod features;
pub mod seo;
pub mod technical;
pub mod wallflower;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use features::{extract_features, ContentFeatures};
use seo::{score_seo, SeoAnalysis};
use technical::{score_technical, TechnicalAudit};
use wallflower::{score_wallflower, WallflowerAnalysis};

pub const MAX_SCORE: u32 = 100;

/// Shortest page, in characters, that is worth scoring.
pub const MIN_CONTENT_LEN: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoreError {
    #[error("insufficient content: {length} characters, need at least {minimum}")]
    InsufficientContent { length: usize, minimum: usize },
    #[error("invalid domain {input:?}: {reason}")]
    InvalidDomain { input: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeScoreResult {
    pub brand_score: u32,
    pub operations_score: u32,
    pub paid_score: u32,
    pub total_score: u32,
    pub breakdown: Breakdown,
}

/// Every intermediate result behind the four headline numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub url: String,
    pub features: ContentFeatures,
    pub seo: SeoAnalysis,
    pub technical: TechnicalAudit,
    pub wallflower: WallflowerAnalysis,
}

/// Score a page from its scraped Markdown.
pub fn compute_de_score(content: &str, url: &str) -> Result<DeScoreResult, ScoreError> {
    let features = extract_features(content);
    if features.content_length < MIN_CONTENT_LEN {
        return Err(ScoreError::InsufficientContent {
            length: features.content_length,
            minimum: MIN_CONTENT_LEN,
        });
    }

    let seo = score_seo(&features);
    let technical = score_technical(&features, url);
    let wallflower = score_wallflower(&features);

    let operations_score = cap(
        50 + (if seo.overall_score > 70 { 15 } else { 0 })
            + (if technical.overall_score > 70 { 15 } else { 0 })
            + (if wallflower.overall_score > 70 { 20 } else { 0 }),
    );

    let paid_score = cap(
        40 + (if seo.overall_score > 60 { 20 } else { 0 })
            + (if technical.performance_score > 70 { 20 } else { 0 })
            + (if wallflower.brand_presence_score > 60 { 20 } else { 0 }),
    );

    let brand_score = average(&[
        wallflower.overall_score,
        seo.overall_score,
        technical.overall_score,
    ]);
    let total_score = average(&[brand_score, operations_score, paid_score]);

    Ok(DeScoreResult {
        brand_score,
        operations_score,
        paid_score,
        total_score,
        breakdown: Breakdown {
            url: url.to_string(),
            features,
            seo,
            technical,
            wallflower,
        },
    })
}

/// Mean rounded half up; 0 for no values.
pub fn average(values: &[u32]) -> u32 {
    if values.is_empty() {
        return 0;
    }
    let sum: u64 = values.iter().map(|&v| u64::from(v)).sum();
    let n = values.len() as u64;
    ((2 * sum + n) / (2 * n)) as u32
}

/// `n / d` rounded half up.
pub(crate) fn div_round(n: usize, d: usize) -> usize {
    n.saturating_mul(2).saturating_add(d) / (2 * d)
}

pub(crate) fn cap(v: usize) -> u32 {
    v.min(MAX_SCORE as usize) as u32
}
