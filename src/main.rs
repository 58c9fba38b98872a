mod analyzer;
mod db;
mod report;
mod score;
mod scraper;
mod settings;
mod sitemap;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use analyzer::{project_domain, validate_domain, Analyzer};
use report::BatchStats;
use scraper::{PageSource, SpiderSource};
use settings::Settings;

#[derive(Parser)]
#[command(name = "de_score", version, about = "Digital Existence Score for websites")]
struct Cli {
    /// Print {"success", "data" | "error"} JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a site and score it
    Score { url: String },
    /// Score a local Markdown file
    File {
        path: PathBuf,
        /// URL the content was taken from
        #[arg(long)]
        url: String,
        /// Do not store the result
        #[arg(long)]
        no_save: bool,
    },
    /// Score every URL listed in a file (one per line, # comments allowed)
    Batch { path: PathBuf },
    /// Score the pages listed in a site's sitemap.xml
    Crawl {
        site: String,
        /// Max pages to score (default from config)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Stored scores, newest first
    History {
        #[arg(short, long)]
        domain: Option<String>,
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Latest stored result for a domain
    Show { domain: String },
    /// Store statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let json = cli.json;

    let result = run(cli.command, json).await;

    if let Err(e) = &result {
        if json {
            println!("{}", report::error_json(e));
            std::process::exit(1);
        }
    }

    let elapsed = t0.elapsed();
    if !json && elapsed.as_secs() >= 1 {
        println!("\nDone in {}", report::format_duration(elapsed));
    }

    result
}

async fn run(command: Commands, json: bool) -> Result<()> {
    let settings = Settings::load()?;
    info!(db = ?settings.db_path, concurrency = settings.concurrency, "Loaded settings");

    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;

    match command {
        Commands::Score { url } => {
            let analyzer = Analyzer::new(SpiderSource::new(&settings)?, settings.concurrency);
            let result = match analyzer.analyze(&url).await {
                Ok(r) => r,
                Err(e) => {
                    db::save_failure(&conn, &url, &format!("{:#}", e))?;
                    return Err(e);
                }
            };
            let domain = project_domain(&validate_domain(&url)?);
            db::save_score(&conn, &domain, &result)?;
            println!("{}", report::score_output(&result, json));
            Ok(())
        }
        Commands::File { path, url, no_save } => {
            let valid = validate_domain(&url)?;
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            let result = score::compute_de_score(&content, url.trim())?;
            if !no_save {
                db::save_score(&conn, &project_domain(&valid), &result)?;
            }
            println!("{}", report::score_output(&result, json));
            Ok(())
        }
        Commands::Batch { path } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            let urls = parse_url_list(&text);
            let stats = if urls.is_empty() {
                BatchStats::default()
            } else {
                let analyzer = Analyzer::new(SpiderSource::new(&settings)?, settings.concurrency);
                score_and_save(&conn, &analyzer, urls).await?
            };
            let note = format!("No URLs in {:?}.", path);
            println!("{}", report::batch_output(&stats, &note, json));
            Ok(())
        }
        Commands::Crawl { site, limit } => {
            let site = validate_domain(&site)?;
            let limit = limit.unwrap_or(settings.crawl_limit);
            let urls = sitemap::fetch_site_urls(&site, limit).await?;
            let stats = if urls.is_empty() {
                BatchStats::default()
            } else {
                let analyzer = Analyzer::new(SpiderSource::new(&settings)?, settings.concurrency);
                score_and_save(&conn, &analyzer, urls).await?
            };
            let note = format!("No pages for {} in its sitemap.", site);
            println!("{}", report::batch_output(&stats, &note, json));
            Ok(())
        }
        Commands::History { domain, limit } => {
            let rows = db::fetch_history(&conn, domain.as_deref(), limit)?;
            println!("{}", report::history_output(&rows, json));
            Ok(())
        }
        Commands::Show { domain } => {
            let domain = domain.trim_start_matches("www.").to_lowercase();
            match db::fetch_latest(&conn, &domain)? {
                Some(result) => println!("{}", report::score_output(&result, json)),
                None => anyhow::bail!("No score stored for {}", domain),
            }
            Ok(())
        }
        Commands::Stats => {
            let s = db::get_stats(&conn)?;
            println!("{}", report::stats_output(&s, json));
            Ok(())
        }
    }
}

/// URLs one per line; blank lines and `#` comments skipped, duplicates dropped.
fn parse_url_list(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter(|l| seen.insert(l.to_string()))
        .map(str::to_string)
        .collect()
}

/// Run a batch and save each outcome as it arrives.
async fn score_and_save<S: PageSource + 'static>(
    conn: &rusqlite::Connection,
    analyzer: &Analyzer<S>,
    urls: Vec<String>,
) -> Result<BatchStats> {
    let total = urls.len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut rx = analyzer.analyze_many(urls);
    let mut ok = 0usize;
    let mut errors = 0usize;

    while let Some(outcome) = rx.recv().await {
        match &outcome.result {
            Ok(result) => {
                let domain = project_domain(&validate_domain(&outcome.url)?);
                db::save_score(conn, &domain, result)?;
                ok += 1;
            }
            Err(e) => {
                db::save_failure(conn, &outcome.url, e)?;
                errors += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Scored {} pages ({} ok, {} errors)", total, ok, errors);
    Ok(BatchStats { total, ok, errors })
}
