use std::collections::HashSet;

use crate::config::DEFAULT_LIMIT;
use crate::core::text::shorten;
use crate::models::{ActionKind, LaunchMode, RefSource, Resolution, SongAction, SongRecord};

pub const MAX_LABEL_CHARS: usize = 20;

/// State behind the song list window.
///
/// The list is only ever replaced wholesale. Each replacement bumps the
/// generation so lookups started against the old list are dropped on arrival.
#[derive(Debug)]
pub struct ChartView {
    songs: Vec<SongRecord>,
    generation: u64,
    pending: HashSet<(usize, RefSource)>,
    limit: usize,
    launch_mode: LaunchMode,
    hover: String,
    fetch_seq: u64,
    fetching: bool,
}

impl Default for ChartView {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, LaunchMode::default())
    }
}

impl ChartView {
    pub fn new(limit: usize, launch_mode: LaunchMode) -> Self {
        Self {
            songs: Vec::new(),
            generation: 0,
            pending: HashSet::new(),
            limit: limit.max(1),
            launch_mode,
            hover: String::new(),
            fetch_seq: 0,
            fetching: false,
        }
    }

    pub fn songs(&self) -> &[SongRecord] {
        &self.songs
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn launch_mode(&self) -> LaunchMode {
        self.launch_mode
    }

    pub fn toggle_launch_mode(&mut self) -> LaunchMode {
        self.launch_mode = self.launch_mode.toggled();
        self.launch_mode
    }

    /// Parse the song-count entry. Invalid input keeps the previous limit.
    /// Returns the limit now in effect so the entry can be reset to it.
    pub fn apply_limit_input(&mut self, input: &str) -> usize {
        match input.trim().parse::<usize>() {
            Ok(n) if n > 0 => self.limit = n,
            _ => tracing::debug!("ignoring song count {:?}", input),
        }
        self.limit
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    /// Claim the chart fetch slot. Returns the ticket to hand back with the
    /// result, or `None` while another fetch is still running.
    pub fn begin_fetch(&mut self) -> Option<u64> {
        if self.fetching {
            return None;
        }
        self.fetching = true;
        self.fetch_seq += 1;
        Some(self.fetch_seq)
    }

    /// Finish the fetch holding `ticket`. `songs` replaces the list when given.
    /// Returns false for a ticket that is not the current one.
    pub fn finish_fetch(&mut self, ticket: u64, songs: Option<Vec<SongRecord>>) -> bool {
        if !self.fetching || ticket != self.fetch_seq {
            tracing::debug!("dropping chart result for fetch {}", ticket);
            return false;
        }
        self.fetching = false;
        if let Some(songs) = songs {
            self.replace(songs);
        }
        true
    }

    /// Replace the whole list, discarding every cached reference and pending lookup.
    pub fn replace(&mut self, songs: Vec<SongRecord>) {
        self.songs = songs;
        self.generation += 1;
        self.pending.clear();
    }

    pub fn is_pending(&self, index: usize, source: RefSource) -> bool {
        self.pending.contains(&(index, source))
    }

    /// Start work for `action`, returning a snapshot of the song to hand off.
    ///
    /// Returns `None` if the row does not exist or if the reference the action
    /// needs is missing and already being looked up.
    pub fn begin(&mut self, action: SongAction) -> Option<SongRecord> {
        let song = self.songs.get(action.index)?;
        if let Some(kind) = action.kind.required_ref() {
            if !song.has_reference(kind) {
                let key = (action.index, kind.source());
                if !self.pending.insert(key) {
                    return None;
                }
            }
        }
        Some(song.clone())
    }

    /// Finish work started by [`begin`](Self::begin).
    ///
    /// Results from an older generation are ignored.
    pub fn complete(
        &mut self,
        generation: u64,
        action: SongAction,
        resolution: Option<&Resolution>,
    ) {
        if generation != self.generation {
            tracing::debug!("dropping result for stale list generation {}", generation);
            return;
        }
        if let Some(kind) = action.kind.required_ref() {
            self.pending.remove(&(action.index, kind.source()));
        }
        if let (Some(resolution), Some(song)) = (resolution, self.songs.get_mut(action.index)) {
            song.apply(resolution);
        }
    }

    pub fn set_hover(&mut self, text: impl Into<String>) {
        self.hover = text.into();
    }

    pub fn clear_hover(&mut self) {
        self.hover.clear();
    }

    pub fn hover(&self) -> &str {
        &self.hover
    }
}

/// Shortened cell labels and the full text shown on hover.
pub fn row_labels(song: &SongRecord) -> RowLabels {
    RowLabels {
        title: shorten(&song.title, MAX_LABEL_CHARS),
        artist: shorten(&song.artist, MAX_LABEL_CHARS),
    }
}

pub struct RowLabels {
    pub title: String,
    pub artist: String,
}

/// Hover text for one of a row's buttons.
pub fn hover_text(song: &SongRecord, kind: ActionKind) -> String {
    match kind {
        ActionKind::OpenChart => format!("#{} on the chart", song.rank),
        ActionKind::PlayTrack => song.title.clone(),
        ActionKind::OpenArtist => song.artist.clone(),
        ActionKind::OpenVideo => format!("{} Music Video", song.title),
    }
}
