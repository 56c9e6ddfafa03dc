pub mod billboard;
pub mod spotify;
pub mod youtube;

use anyhow::Result;

use crate::models::{Device, TrackMatch};

/// Streaming catalogue search.
pub trait TrackSearch: Send + Sync {
    /// Returns the single best match for `query`, if any.
    fn search_track(&self, query: &str) -> Result<Option<TrackMatch>>;
}

/// Music video search.
pub trait VideoSearch: Send + Sync {
    /// Returns the id of the single best match for `query`, if any.
    fn search_video(&self, query: &str) -> Result<Option<String>>;
}

/// Remote control of a user's streaming players.
pub trait PlaybackService: Send + Sync {
    /// Whether a user session is available for device and playback calls.
    fn has_session(&self) -> bool;
    fn devices(&self) -> Result<Vec<Device>>;
    fn start_playback(&self, device_id: Option<&str>, track_uri: &str) -> Result<()>;
}
