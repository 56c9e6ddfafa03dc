use std::fmt;

use serde::{Deserialize, Serialize};

/// One chart entry plus whatever service references have been resolved for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongRecord {
    pub rank: u32,
    pub title: String,
    pub artist: String,
    pub track_ref: Option<String>,
    pub artist_ref: Option<String>,
    pub video_ref: Option<String>,
}

impl SongRecord {
    pub fn new(rank: u32, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            rank,
            title: title.into(),
            artist: artist.into(),
            ..Default::default()
        }
    }

    pub fn reference(&self, kind: RefKind) -> Option<&str> {
        match kind {
            RefKind::Track => self.track_ref.as_deref(),
            RefKind::Artist => self.artist_ref.as_deref(),
            RefKind::Video => self.video_ref.as_deref(),
        }
    }

    pub fn has_reference(&self, kind: RefKind) -> bool {
        self.reference(kind).is_some()
    }

    /// Caches a resolution. Fields that are already set are left untouched.
    pub fn apply(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::Track {
                track_uri,
                artist_uri,
            } => {
                self.track_ref.get_or_insert_with(|| track_uri.clone());
                self.artist_ref.get_or_insert_with(|| artist_uri.clone());
            }
            Resolution::Video { video_id } => {
                self.video_ref.get_or_insert_with(|| video_id.clone());
            }
        }
    }

    pub fn summary(&self) -> String {
        format!("{:>3}. {} - {}", self.rank, self.title, self.artist)
    }
}

/// Which identifier an action needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Track,
    Artist,
    Video,
}

impl RefKind {
    /// Track and artist references come out of the same streaming search.
    pub fn source(self) -> RefSource {
        match self {
            RefKind::Track | RefKind::Artist => RefSource::Streaming,
            RefKind::Video => RefSource::Video,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefSource {
    Streaming,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Track {
        track_uri: String,
        artist_uri: String,
    },
    Video {
        video_id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    OpenChart,
    PlayTrack,
    OpenArtist,
    OpenVideo,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::PlayTrack,
        ActionKind::OpenArtist,
        ActionKind::OpenVideo,
        ActionKind::OpenChart,
    ];

    pub fn required_ref(self) -> Option<RefKind> {
        match self {
            ActionKind::OpenChart => None,
            ActionKind::PlayTrack => Some(RefKind::Track),
            ActionKind::OpenArtist => Some(RefKind::Artist),
            ActionKind::OpenVideo => Some(RefKind::Video),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActionKind::OpenChart => "Open chart entry",
            ActionKind::PlayTrack => "Play on Spotify",
            ActionKind::OpenArtist => "Open artist",
            ActionKind::OpenVideo => "Watch music video",
        }
    }
}

/// Event payload produced by a click: what to do, and to which row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SongAction {
    pub kind: ActionKind,
    pub index: usize,
}

impl SongAction {
    pub fn new(kind: ActionKind, index: usize) -> Self {
        Self { kind, index }
    }
}

/// A place a Spotify URI can be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Desktop,
    Web,
}

/// Preferred surface when no playback session can tell us what is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    #[default]
    App,
    Website,
}

impl LaunchMode {
    pub fn toggled(self) -> Self {
        match self {
            LaunchMode::App => LaunchMode::Website,
            LaunchMode::Website => LaunchMode::App,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LaunchMode::App => "Spotify App",
            LaunchMode::Website => "Spotify Website",
        }
    }

    pub fn surface(self) -> Surface {
        match self {
            LaunchMode::App => Surface::Desktop,
            LaunchMode::Website => Surface::Web,
        }
    }
}

/// What a performed action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Opened(String),
    Playing { device: String },
    NoPlayer,
    ArtistOpened { surfaces: Vec<Surface> },
    PlayerStarted(Surface),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Opened(url) => write!(f, "Opened {}", url),
            Outcome::Playing { device } => write!(f, "Playing on {}", device),
            Outcome::NoPlayer => write!(
                f,
                "No active Spotify player found; start one with the App or Web button and try again"
            ),
            Outcome::ArtistOpened { surfaces } if surfaces.is_empty() => {
                write!(f, "No running Spotify app or web player to open the artist in")
            }
            Outcome::ArtistOpened { surfaces } => {
                let names: Vec<&str> = surfaces
                    .iter()
                    .map(|s| match s {
                        Surface::Desktop => "Spotify app",
                        Surface::Web => "web player",
                    })
                    .collect();
                write!(f, "Opened artist in {}", names.join(" and "))
            }
            Outcome::PlayerStarted(Surface::Desktop) => write!(f, "Started the Spotify app"),
            Outcome::PlayerStarted(Surface::Web) => write!(f, "Opened the Spotify web player"),
        }
    }
}

/// A playback device as reported by the streaming service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Device {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
}

/// Best streaming match for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMatch {
    pub track_uri: String,
    pub artist_uri: String,
}
