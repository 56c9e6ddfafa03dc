use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use base64::Engine;
use serde::Deserialize;

use crate::config::SpotifyConfig;
use crate::models::{Device, TrackMatch};
use crate::sources::{PlaybackService, TrackSearch};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";
pub const WEB_PLAYER_URL: &str = "https://open.spotify.com";

pub struct SpotifyClient {
    client: reqwest::blocking::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    /// App token from the client-credentials flow, fetched on first search.
    app_token: Mutex<Option<String>>,
    user_token: Option<String>,
    api_base: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: TracksResult,
}

#[derive(Deserialize)]
struct TracksResult {
    items: Vec<SpotifyTrack>,
}

#[derive(Deserialize)]
struct SpotifyTrack {
    uri: String,
    artists: Vec<SpotifyArtist>,
}

#[derive(Deserialize)]
struct SpotifyArtist {
    uri: String,
}

#[derive(Deserialize)]
struct DevicesResponse {
    devices: Vec<Device>,
}

impl SpotifyClient {
    pub fn new(config: &SpotifyConfig) -> Self {
        Self::with_api_base(config, API_BASE)
    }

    pub fn with_api_base(config: &SpotifyConfig, api_base: impl Into<String>) -> Self {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        Self {
            client: reqwest::blocking::Client::new(),
            client_id: non_empty(&config.client_id),
            client_secret: non_empty(&config.client_secret),
            app_token: Mutex::new(None),
            user_token: non_empty(&config.access_token),
            api_base: api_base.into(),
        }
    }

    fn authenticate(&self) -> Result<String> {
        let client_id = self
            .client_id
            .as_ref()
            .context("Spotify client_id is not set; run `topsongs config`")?;
        let client_secret = self
            .client_secret
            .as_ref()
            .context("Spotify client_secret is not set; run `topsongs config`")?;

        let credentials = format!("{}:{}", client_id, client_secret);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);

        let resp: TokenResponse = self
            .client
            .post(TOKEN_URL)
            .header("Authorization", format!("Basic {}", encoded))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .context("failed to connect to Spotify")?
            .error_for_status()
            .context("Spotify authentication failed; check client_id and client_secret")?
            .json()
            .context("failed to parse Spotify token response")?;

        tracing::debug!("obtained Spotify app token");
        Ok(resp.access_token)
    }

    /// Token for catalogue search: the user token if present, else an app token.
    fn search_token(&self) -> Result<String> {
        if let Some(token) = &self.user_token {
            return Ok(token.clone());
        }
        let mut cached = self
            .app_token
            .lock()
            .map_err(|_| anyhow!("Spotify token cache poisoned"))?;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let token = self.authenticate()?;
        *cached = Some(token.clone());
        Ok(token)
    }

    fn user_token(&self) -> Result<&str> {
        self.user_token
            .as_deref()
            .context("no Spotify user access token configured")
    }
}

impl TrackSearch for SpotifyClient {
    fn search_track(&self, query: &str) -> Result<Option<TrackMatch>> {
        let token = self.search_token()?;
        tracing::debug!("spotify search: {}", query);

        let resp: SearchResponse = self
            .client
            .get(format!("{}/search", self.api_base))
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", "1")])
            .send()
            .context("Spotify search failed")?
            .error_for_status()
            .context("Spotify search request failed")?
            .json()
            .context("failed to parse Spotify search response")?;

        Ok(resp.tracks.items.into_iter().next().and_then(|track| {
            let artist_uri = track.artists.into_iter().next()?.uri;
            Some(TrackMatch {
                track_uri: track.uri,
                artist_uri,
            })
        }))
    }
}

impl PlaybackService for SpotifyClient {
    fn has_session(&self) -> bool {
        self.user_token.is_some()
    }

    fn devices(&self) -> Result<Vec<Device>> {
        let resp: DevicesResponse = self
            .client
            .get(format!("{}/me/player/devices", self.api_base))
            .bearer_auth(self.user_token()?)
            .send()
            .context("Spotify device listing failed")?
            .error_for_status()
            .context("Spotify device listing request failed")?
            .json()
            .context("failed to parse Spotify device list")?;

        Ok(resp.devices)
    }

    fn start_playback(&self, device_id: Option<&str>, track_uri: &str) -> Result<()> {
        let mut req = self
            .client
            .put(format!("{}/me/player/play", self.api_base))
            .bearer_auth(self.user_token()?)
            .json(&serde_json::json!({ "uris": [track_uri] }));
        if let Some(id) = device_id {
            req = req.query(&[("device_id", id)]);
        }

        let resp = req.send().context("Spotify playback request failed")?;
        if !resp.status().is_success() {
            bail!("Spotify refused playback: HTTP {}", resp.status());
        }
        Ok(())
    }
}

/// Web player link for a `spotify:<type>:<id>` URI.
pub fn web_url(uri: &str) -> Option<String> {
    let mut parts = uri.split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("spotify"), Some(kind), Some(id), None) if !kind.is_empty() && !id.is_empty() => {
            Some(format!("{}/{}/{}", WEB_PLAYER_URL, kind, id))
        }
        _ => None,
    }
}
