use std::collections::HashSet;

use anyhow::{Context, Result};
use reqwest::Url;
use tracing::info;

/// Fetch `<site>/sitemap.xml` and return up to `limit` page URLs on the same host.
pub async fn fetch_site_urls(site: &Url, limit: usize) -> Result<Vec<String>> {
    let sitemap_url = site.join("/sitemap.xml")?;

    info!("Fetching sitemap: {}", sitemap_url);
    let xml = fetch_text(&sitemap_url)
        .await
        .with_context(|| format!("Failed to fetch {}", sitemap_url))?;

    let all_urls = parse_urlset(&xml)?;
    info!("Total URLs in sitemap: {}", all_urls.len());

    let filtered = same_host_urls(site, all_urls, limit);
    info!("Pages on {} after filtering: {}", site.host_str().unwrap_or(""), filtered.len());
    Ok(filtered)
}

async fn fetch_text(url: &Url) -> reqwest::Result<String> {
    reqwest::Client::new()
        .get(url.clone())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
}

fn same_host_urls(site: &Url, urls: Vec<String>, limit: usize) -> Vec<String> {
    let host = site.host_str().map(strip_www);
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|raw| {
            Url::parse(raw)
                .ok()
                .is_some_and(|u| u.host_str().map(strip_www) == host)
        })
        .filter(|raw| seen.insert(raw.clone()))
        .take(limit)
        .collect()
}

fn strip_www(host: &str) -> &str {
    host.trim_start_matches("www.")
}

/// Parse a urlset XML and return all <loc> URLs.
fn parse_urlset(xml: &str) -> Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut urls = Vec::new();
    let mut in_url = false;
    let mut in_loc = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.name().as_ref() {
                b"url" => in_url = true,
                b"loc" if in_url => in_loc = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(e)) if in_loc => {
                let loc = e.unescape()?.trim().to_string();
                if !loc.is_empty() {
                    urls.push(loc);
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.name().as_ref() {
                b"loc" => in_loc = false,
                b"url" => in_url = false,
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(urls)
}
