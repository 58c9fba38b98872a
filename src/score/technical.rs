use serde::{Deserialize, Serialize};

use super::features::ContentFeatures;
use super::{average, cap, div_round, MAX_SCORE};

/// Pages above this many characters lose the lightweight-page bonus.
const LIGHT_PAGE_MAX_LEN: usize = 50_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalAudit {
    pub performance_score: u32,
    pub accessibility_score: u32,
    pub mobile_optimization_score: u32,
    pub security_score: u32,
    pub code_quality_score: u32,
    pub overall_score: u32,
}

pub fn score_technical(f: &ContentFeatures, url: &str) -> TechnicalAudit {
    let performance_score = performance(f);

    let accessibility_score = cap(
        (if f.headers > 0 { 25 } else { 0 })
            + (if f.has_title { 25 } else { 0 })
            + (if f.images > 0 { 15 } else { 0 })
            + 35,
    );

    let mobile_optimization_score = cap(
        (if f.paragraphs > 3 { 20 } else { 40 }) + (if f.word_count < 2000 { 30 } else { 20 }) + 30,
    );

    let security_score = if url.starts_with("https://") {
        cap(80 + if url.contains("www.") { 20 } else { 0 })
    } else {
        40
    };

    let code_quality_score = cap(
        (if f.headers > 0 { 20 } else { 0 })
            + (if f.links > 0 { 15 } else { 0 })
            + (if f.has_title { 15 } else { 0 })
            + 50,
    );

    let overall_score = average(&[
        performance_score,
        accessibility_score,
        mobile_optimization_score,
        security_score,
        code_quality_score,
    ]);

    TechnicalAudit {
        performance_score,
        accessibility_score,
        mobile_optimization_score,
        security_score,
        code_quality_score,
        overall_score,
    }
}

/// Image weight, very long copy and raw page size; clamped on both ends.
fn performance(f: &ContentFeatures) -> u32 {
    let image_penalty = i64::try_from(div_round(f.images, 5)).unwrap_or(i64::MAX);
    let mut score = 70i64.saturating_sub(image_penalty);
    if f.word_count > 5000 {
        score -= 10;
    }
    if f.content_length < LIGHT_PAGE_MAX_LEN {
        score += 20;
    }
    score.clamp(0, i64::from(MAX_SCORE)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> ContentFeatures {
        ContentFeatures::default()
    }

    #[test]
    fn light_page_performance() {
        let t = score_technical(&features(), "https://example.com");
        assert_eq!(t.performance_score, 90);
    }

    #[test]
    fn performance_penalties() {
        let f = ContentFeatures { images: 12, word_count: 6000, content_length: 60_000, ..features() };
        // 70 - round(2.4) - 10
        assert_eq!(score_technical(&f, "").performance_score, 58);
        let f = ContentFeatures { images: 1_000, ..features() };
        assert_eq!(score_technical(&f, "").performance_score, 0);
    }

    #[test]
    fn security_by_scheme_and_host() {
        let f = features();
        assert_eq!(score_technical(&f, "https://example.com").security_score, 80);
        assert_eq!(score_technical(&f, "https://www.example.com").security_score, 100);
        assert_eq!(score_technical(&f, "http://www.example.com").security_score, 40);
        assert_eq!(score_technical(&f, "example.com").security_score, 40);
    }

    #[test]
    fn structure_driven_scores() {
        let bare = score_technical(&features(), "http://x.io");
        assert_eq!(bare.accessibility_score, 35);
        assert_eq!(bare.mobile_optimization_score, 100);
        assert_eq!(bare.code_quality_score, 50);

        let rich = ContentFeatures {
            headers: 4,
            has_title: true,
            images: 2,
            links: 9,
            paragraphs: 12,
            word_count: 2500,
            ..features()
        };
        let t = score_technical(&rich, "http://x.io");
        assert_eq!(t.accessibility_score, 100);
        assert_eq!(t.mobile_optimization_score, 70);
        assert_eq!(t.code_quality_score, 100);
    }

    #[test]
    fn overall_is_rounded_mean() {
        let t = score_technical(&features(), "https://example.com");
        // (90 + 35 + 100 + 80 + 50) / 5
        assert_eq!(t.overall_score, 71);
    }

    #[test]
    fn huge_counts_stay_in_range() {
        let f = ContentFeatures {
            word_count: 10_000_000,
            paragraphs: usize::MAX,
            headers: usize::MAX,
            links: usize::MAX,
            images: usize::MAX,
            has_title: true,
            has_meta_description: true,
            content_length: usize::MAX,
        };
        let t = score_technical(&f, "https://www.example.com");
        assert_eq!(t.performance_score, 0);
        assert!(t.overall_score <= 100);
    }
}
