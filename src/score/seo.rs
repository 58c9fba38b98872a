use serde::{Deserialize, Serialize};

use super::features::ContentFeatures;
use super::{average, cap, div_round};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoAnalysis {
    pub title_score: u32,
    pub meta_description_score: u32,
    pub heading_structure_score: u32,
    pub content_length_score: u32,
    pub keyword_density_score: u32,
    pub internal_links_score: u32,
    pub image_optimization_score: u32,
    pub overall_score: u32,
}

pub fn score_seo(f: &ContentFeatures) -> SeoAnalysis {
    let title_score = if f.has_title {
        cap(60 + if f.headers > 0 { 40 } else { 0 })
    } else {
        20
    };

    // A description that fits a search snippet earns the bonus.
    let meta_description_score = if f.has_meta_description {
        let snippet_sized = f.content_length > 160 && f.content_length < 320;
        cap(70 + if snippet_sized { 30 } else { 0 })
    } else {
        10
    };

    let heading_structure_score = cap(f.headers.saturating_mul(15));

    let content_length_score = if f.word_count < 300 {
        cap(div_round(f.word_count, 3))
    } else {
        cap(60usize.saturating_add(div_round(f.word_count - 300, 50)))
    };

    let keyword_density_score = if f.word_count > 100 {
        cap(50usize.saturating_add(div_round(f.word_count, 100)))
    } else {
        30
    };

    let internal_links_score = cap(f.links.saturating_mul(20));

    let image_optimization_score = if f.images > 0 {
        cap(40usize.saturating_add(f.images.saturating_mul(10)))
    } else {
        20
    };

    let overall_score = average(&[
        title_score,
        meta_description_score,
        heading_structure_score,
        content_length_score,
        keyword_density_score,
        internal_links_score,
        image_optimization_score,
    ]);

    SeoAnalysis {
        title_score,
        meta_description_score,
        heading_structure_score,
        content_length_score,
        keyword_density_score,
        internal_links_score,
        image_optimization_score,
        overall_score,
    }
}
