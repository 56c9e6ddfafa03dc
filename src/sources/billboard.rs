use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};

use crate::core::text::normalize_artist;
use crate::models::SongRecord;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Billboard chart scraper.
/// No authentication; the chart page HTML is parsed directly.
pub struct BillboardClient {
    client: reqwest::blocking::Client,
    url: String,
}

impl BillboardClient {
    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build chart HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the top `limit` songs. Any failure yields an empty list.
    pub fn fetch(&self, limit: usize) -> Vec<SongRecord> {
        match self.fetch_html() {
            Ok(html) => {
                let songs = parse_chart(&html, limit);
                tracing::info!("fetched {} chart entries from {}", songs.len(), self.url);
                songs
            }
            Err(e) => {
                tracing::warn!("chart fetch failed: {:#}", e);
                Vec::new()
            }
        }
    }

    fn fetch_html(&self) -> Result<String> {
        self.client
            .get(&self.url)
            .send()
            .context("chart request failed")?
            .error_for_status()
            .context("chart request returned an error status")?
            .text()
            .context("failed to read chart response")
    }
}

/// Parse chart entries in document order, keeping the first `limit`.
///
/// Entries missing a name or artist are skipped; ranks are numbered over the
/// entries that were kept.
pub fn parse_chart(html: &str, limit: usize) -> Vec<SongRecord> {
    let document = Html::parse_document(html);

    let entry_sel = Selector::parse("li.chart-list__element").unwrap();
    let name_sel = Selector::parse("span.chart-element__information__song").unwrap();
    let artist_sel = Selector::parse("span.chart-element__information__artist").unwrap();

    document
        .select(&entry_sel)
        .take(limit)
        .filter_map(|entry| {
            let name = first_text(entry, &name_sel)?;
            let artist = first_text(entry, &artist_sel)?;
            Some((name, normalize_artist(&artist)))
        })
        .zip(1..)
        .map(|((name, artist), rank)| SongRecord::new(rank, name, artist))
        .collect()
}

fn first_text(entry: ElementRef<'_>, sel: &Selector) -> Option<String> {
    let text = entry
        .select(sel)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Link to one entry on the chart page.
pub fn chart_entry_url(chart_url: &str, rank: u32) -> String {
    format!("{}?rank={}", chart_url.trim_end_matches('/'), rank)
}
