use anyhow::{Context, Result};
use serde_json::Value;

use crate::sources::VideoSearch;

const RESULTS_URL: &str = "https://www.youtube.com/results";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// YouTube search without an API key: the results page embeds its data as
/// `ytInitialData` JSON, which is read for the first video.
pub struct YoutubeClient {
    client: reqwest::blocking::Client,
    results_url: String,
}

impl YoutubeClient {
    pub fn new() -> Result<Self> {
        Self::with_results_url(RESULTS_URL)
    }

    pub fn with_results_url(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build YouTube HTTP client")?;

        Ok(Self {
            client,
            results_url: url.into(),
        })
    }
}

impl VideoSearch for YoutubeClient {
    fn search_video(&self, query: &str) -> Result<Option<String>> {
        tracing::debug!("youtube search: {}", query);

        let html = self
            .client
            .get(&self.results_url)
            .query(&[("search_query", query)])
            .send()
            .context("YouTube search failed")?
            .error_for_status()
            .context("YouTube search request failed")?
            .text()
            .context("failed to read YouTube search response")?;

        Ok(first_video_id(&html))
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Extract the first `videoRenderer.videoId` from a results page.
pub fn first_video_id(html: &str) -> Option<String> {
    let data = initial_data(html)?;
    find_video_renderer(&data)
}

fn initial_data(html: &str) -> Option<Value> {
    let marker = "ytInitialData";
    let start = html.find(marker)?;
    let rest = &html[start + marker.len()..];
    let open = rest.find('{')?;
    let json = &rest[open..];
    let end = json.find(";</script>").unwrap_or(json.len());

    // Stream-parse so trailing script text after the object is ignored.
    let mut stream = serde_json::Deserializer::from_str(&json[..end]).into_iter::<Value>();
    stream.next()?.ok()
}

fn find_video_renderer(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(id) = map
                .get("videoRenderer")
                .and_then(|r| r.get("videoId"))
                .and_then(Value::as_str)
            {
                return Some(id.to_string());
            }
            map.values().find_map(find_video_renderer)
        }
        Value::Array(items) => items.iter().find_map(find_video_renderer),
        _ => None,
    }
}
