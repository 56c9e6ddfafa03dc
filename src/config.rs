use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::LaunchMode;

pub const DEFAULT_CHART_URL: &str = "https://www.billboard.com/charts/hot-100";
pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_chart_url")]
    pub url: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            url: default_chart_url(),
            limit: DEFAULT_LIMIT,
        }
    }
}

fn default_chart_url() -> String {
    DEFAULT_CHART_URL.to_string()
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// User token with `user-read-playback-state` and `user-modify-playback-state`.
    pub access_token: Option<String>,
    #[serde(default)]
    pub launcher: LaunchMode,
}

impl SpotifyConfig {
    pub fn is_configured(&self) -> bool {
        self.client_id.as_ref().is_some_and(|s| !s.is_empty())
            && self.client_secret.as_ref().is_some_and(|s| !s.is_empty())
    }

    pub fn has_user_token(&self) -> bool {
        self.access_token.as_ref().is_some_and(|s| !s.is_empty())
    }
}

impl Config {
    /// Overrides file values with `SPOTIFY_*` variables from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = Some(v);
        }
        if let Some(v) = non_empty("SPOTIFY_CLIENT_SECRET") {
            self.spotify.client_secret = Some(v);
        }
        if let Some(v) = non_empty("SPOTIFY_ACCESS_TOKEN") {
            self.spotify.access_token = Some(v);
        }
    }
}

fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".config")
        .join("topsongs")
        .join("config.toml")
}

/// Reads the config file (defaults when missing or invalid) and applies env overrides.
pub fn load_config() -> Config {
    let mut config = load_config_file();
    config.apply_env(|key| std::env::var(key).ok());
    config
}

/// Reads the config file alone, without env overrides.
pub fn load_config_file() -> Config {
    let path = config_path();
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("ignoring invalid config {}: {}", path.display(), e);
            Config::default()
        }),
        Err(e) => {
            tracing::warn!("cannot read config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

pub fn save_config(config: &Config) -> Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.chart.url, DEFAULT_CHART_URL);
        assert_eq!(cfg.chart.limit, DEFAULT_LIMIT);
        assert_eq!(cfg.spotify.launcher, LaunchMode::App);
        assert!(!cfg.spotify.is_configured());
    }

    #[test]
    fn test_parse_full_file() {
        let cfg: Config = toml::from_str(
            r#"
            [chart]
            limit = 25

            [spotify]
            client_id = "id"
            client_secret = "secret"
            launcher = "website"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.chart.limit, 25);
        assert_eq!(cfg.chart.url, DEFAULT_CHART_URL);
        assert!(cfg.spotify.is_configured());
        assert!(!cfg.spotify.has_user_token());
        assert_eq!(cfg.spotify.launcher, LaunchMode::Website);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut cfg = Config::default();
        cfg.spotify.client_id = Some("from-file".to_string());
        cfg.apply_env(|key| match key {
            "SPOTIFY_CLIENT_ID" => Some("from-env".to_string()),
            "SPOTIFY_ACCESS_TOKEN" => Some("token".to_string()),
            "SPOTIFY_CLIENT_SECRET" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(cfg.spotify.client_id.as_deref(), Some("from-env"));
        assert_eq!(cfg.spotify.client_secret, None);
        assert!(cfg.spotify.has_user_token());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut cfg = Config::default();
        cfg.spotify.launcher = LaunchMode::Website;
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.spotify.launcher, LaunchMode::Website);
    }
}
