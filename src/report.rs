use serde::Serialize;

use crate::db::{HistoryRow, Stats};
use crate::score::DeScoreResult;

/// JSON envelope the scoring endpoint has always answered with.
#[derive(Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn success_json<T: Serialize>(data: &T) -> String {
    let env = Envelope { success: true, data: Some(data), error: None };
    serde_json::to_string_pretty(&env).unwrap_or_default()
}

pub fn error_json(error: &anyhow::Error) -> String {
    let env: Envelope<'_, ()> = Envelope {
        success: false,
        data: None,
        error: Some(format!("{:#}", error)),
    };
    serde_json::to_string_pretty(&env).unwrap_or_default()
}

/// Counts from one batch or crawl run.
#[derive(Debug, Default, Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

pub fn score_output(r: &DeScoreResult, json: bool) -> String {
    if json {
        success_json(r)
    } else {
        render_score(r)
    }
}

/// `empty_note` is printed instead of the counts when nothing was scored.
pub fn batch_output(stats: &BatchStats, empty_note: &str, json: bool) -> String {
    if json {
        success_json(stats)
    } else if stats.total == 0 {
        empty_note.to_string()
    } else {
        format!(
            "Done: {} scored ({} ok, {} errors).",
            stats.total, stats.ok, stats.errors
        )
    }
}

pub fn history_output(rows: &[HistoryRow], json: bool) -> String {
    if json {
        success_json(&rows)
    } else if rows.is_empty() {
        "No scores stored.".to_string()
    } else {
        format!("{}\n\n{} scores", render_history(rows), rows.len())
    }
}

pub fn stats_output(s: &Stats, json: bool) -> String {
    if json {
        success_json(s)
    } else {
        render_stats(s)
    }
}

pub fn render_score(r: &DeScoreResult) -> String {
    let b = &r.breakdown;
    let f = &b.features;
    let mut out = Vec::new();

    out.push(format!("DE Score for {}", b.url));
    out.push("=".repeat(40));
    out.push(format!("Total:       {:>3}", r.total_score));
    out.push(format!("Brand:       {:>3}", r.brand_score));
    out.push(format!("Operations:  {:>3}", r.operations_score));
    out.push(format!("Paid:        {:>3}", r.paid_score));

    out.push(String::new());
    out.push(format!("SEO ({})", b.seo.overall_score));
    for (label, v) in [
        ("title", b.seo.title_score),
        ("meta description", b.seo.meta_description_score),
        ("heading structure", b.seo.heading_structure_score),
        ("content length", b.seo.content_length_score),
        ("keyword density", b.seo.keyword_density_score),
        ("internal links", b.seo.internal_links_score),
        ("image optimization", b.seo.image_optimization_score),
    ] {
        out.push(line(label, v));
    }

    out.push(format!("Technical ({})", b.technical.overall_score));
    for (label, v) in [
        ("performance", b.technical.performance_score),
        ("accessibility", b.technical.accessibility_score),
        ("mobile", b.technical.mobile_optimization_score),
        ("security", b.technical.security_score),
        ("code quality", b.technical.code_quality_score),
    ] {
        out.push(line(label, v));
    }

    out.push(format!("Wallflower ({})", b.wallflower.overall_score));
    for (label, v) in [
        ("content richness", b.wallflower.content_richness_score),
        ("visual elements", b.wallflower.visual_elements_score),
        ("user engagement", b.wallflower.user_engagement_score),
        ("brand presence", b.wallflower.brand_presence_score),
    ] {
        out.push(line(label, v));
    }

    out.push(String::new());
    out.push(format!(
        "{} words, {} paragraphs, {} headings, {} links, {} images, {} chars",
        f.word_count, f.paragraphs, f.headers, f.links, f.images, f.content_length
    ));
    out.join("\n")
}

fn line(label: &str, v: u32) -> String {
    format!("  {:<20} {:>3}", label, v)
}

pub fn render_history(rows: &[HistoryRow]) -> String {
    let mut out = Vec::new();
    out.push(format!(
        "{:>3} | {:<24} | {:<32} | {:>5} | {:>5} | {:>4} | {:>5} | {:<16}",
        "#", "Domain", "URL", "Brand", "Ops", "Paid", "Total", "Scored"
    ));
    out.push("-".repeat(110));
    for (i, r) in rows.iter().enumerate() {
        out.push(format!(
            "{:>3} | {:<24} | {:<32} | {:>5} | {:>5} | {:>4} | {:>5} | {:<16}",
            i + 1,
            truncate(&r.domain, 24),
            truncate(&r.url, 32),
            r.brand_score,
            r.operations_score,
            r.paid_score,
            r.total_score,
            r.scored_at.format("%Y-%m-%d %H:%M"),
        ));
    }
    out.join("\n")
}

pub fn render_stats(s: &Stats) -> String {
    let avg = s
        .average_total
        .map(|a| format!("{:.1}", a))
        .unwrap_or_else(|| "-".into());
    format!(
        "Projects:  {}\nScores:    {}\nFailures:  {}\nAvg total: {}",
        s.projects, s.scores, s.failures, avg
    )
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

pub fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
