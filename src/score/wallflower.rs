//! Content richness and visual presence, the "wallflower" view of a page:
//! how much there is to look at and engage with once a visitor lands.

use serde::{Deserialize, Serialize};

use super::features::ContentFeatures;
use super::{average, cap, div_round};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallflowerAnalysis {
    pub content_richness_score: u32,
    pub visual_elements_score: u32,
    pub user_engagement_score: u32,
    pub brand_presence_score: u32,
    pub overall_score: u32,
}

pub fn score_wallflower(f: &ContentFeatures) -> WallflowerAnalysis {
    let content_richness_score = cap(
        div_round(f.word_count, 50)
            .saturating_add(f.paragraphs.saturating_mul(5))
            .saturating_add(f.headers.saturating_mul(3)),
    );

    let visual_elements_score = cap(
        f.images
            .saturating_mul(15)
            .saturating_add(if f.headers > 0 { 20 } else { 0 })
            .saturating_add(30),
    );

    let user_engagement_score = cap(
        f.links
            .saturating_mul(10)
            .saturating_add(if f.word_count > 500 { 25 } else { 10 })
            .saturating_add(if f.paragraphs > 5 { 15 } else { 5 })
            .saturating_add(20),
    );

    let brand_presence_score = cap(
        (if f.has_title { 30 } else { 0 })
            + (if f.has_meta_description { 20 } else { 0 })
            + (if f.word_count > 300 { 30 } else { 10 })
            + (if f.images > 0 { 20 } else { 0 }),
    );

    let overall_score = average(&[
        content_richness_score,
        visual_elements_score,
        user_engagement_score,
        brand_presence_score,
    ]);

    WallflowerAnalysis {
        content_richness_score,
        visual_elements_score,
        user_engagement_score,
        brand_presence_score,
        overall_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_page() {
        let w = score_wallflower(&ContentFeatures::default());
        assert_eq!(w.content_richness_score, 0);
        assert_eq!(w.visual_elements_score, 30);
        assert_eq!(w.user_engagement_score, 35);
        assert_eq!(w.brand_presence_score, 10);
        // 75 / 4 = 18.75
        assert_eq!(w.overall_score, 19);
    }

    #[test]
    fn richness_is_clamped() {
        let f = ContentFeatures { word_count: 10_000_000, paragraphs: 400, headers: 90, ..Default::default() };
        assert_eq!(score_wallflower(&f).content_richness_score, 100);
    }

    #[test]
    fn richness_mixes_words_paragraphs_and_headers() {
        let f = ContentFeatures { word_count: 475, paragraphs: 6, headers: 3, ..Default::default() };
        // round(9.5) + 30 + 9
        assert_eq!(score_wallflower(&f).content_richness_score, 49);
    }

    #[test]
    fn engaged_branded_page() {
        let f = ContentFeatures {
            word_count: 800,
            paragraphs: 8,
            headers: 5,
            links: 4,
            images: 3,
            has_title: true,
            has_meta_description: true,
            content_length: 4_800,
        };
        let w = score_wallflower(&f);
        assert_eq!(w.visual_elements_score, 95);
        assert_eq!(w.user_engagement_score, 100);
        assert_eq!(w.brand_presence_score, 100);
    }

    #[test]
    fn huge_counts_stay_in_range() {
        let f = ContentFeatures {
            word_count: usize::MAX,
            paragraphs: usize::MAX,
            headers: usize::MAX,
            links: usize::MAX,
            images: usize::MAX,
            has_title: true,
            has_meta_description: true,
            content_length: usize::MAX,
        };
        let w = score_wallflower(&f);
        assert_eq!(w.overall_score, 100);
    }
}
