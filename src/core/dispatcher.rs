use std::sync::Arc;

use anyhow::Result as AnyResult;

use crate::config::Config;
use crate::core::error::DispatchError;
use crate::core::launcher::{Launcher, SystemLauncher};
use crate::core::text::build_search_query;
use crate::models::{
    ActionKind, Device, LaunchMode, Outcome, RefKind, RefSource, Resolution, SongAction,
    SongRecord, Surface,
};
use crate::sources::billboard::chart_entry_url;
use crate::sources::spotify::{self, SpotifyClient};
use crate::sources::youtube::{self, YoutubeClient};
use crate::sources::{PlaybackService, TrackSearch, VideoSearch};

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Turns a [`SongAction`] into lookups and one side effect.
///
/// Cheap to clone; the GUI hands clones to worker threads.
#[derive(Clone)]
pub struct Dispatcher {
    tracks: Arc<dyn TrackSearch>,
    videos: Arc<dyn VideoSearch>,
    player: Arc<dyn PlaybackService>,
    launcher: Arc<dyn Launcher>,
    chart_url: String,
    mode: LaunchMode,
}

impl Dispatcher {
    pub fn new(
        tracks: Arc<dyn TrackSearch>,
        videos: Arc<dyn VideoSearch>,
        player: Arc<dyn PlaybackService>,
        launcher: Arc<dyn Launcher>,
        chart_url: impl Into<String>,
    ) -> Self {
        Self {
            tracks,
            videos,
            player,
            launcher,
            chart_url: chart_url.into(),
            mode: LaunchMode::default(),
        }
    }

    /// Real Spotify, YouTube and OS launcher wired from config.
    pub fn from_config(cfg: &Config) -> AnyResult<Self> {
        let spotify = Arc::new(SpotifyClient::new(&cfg.spotify));
        let youtube = Arc::new(YoutubeClient::new()?);
        if !cfg.spotify.is_configured() && !cfg.spotify.has_user_token() {
            tracing::warn!("Spotify credentials missing; play and artist lookups will fail");
        }

        let mut dispatcher = Self::new(
            spotify.clone(),
            youtube,
            spotify,
            Arc::new(SystemLauncher::new()),
            cfg.chart.url.clone(),
        );
        dispatcher.set_mode(cfg.spotify.launcher);
        Ok(dispatcher)
    }

    pub fn mode(&self) -> LaunchMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: LaunchMode) {
        self.mode = mode;
    }

    /// Resolve what `action` needs, cache it on the song, then perform it.
    pub fn dispatch(&self, songs: &mut [SongRecord], action: SongAction) -> Result<Outcome> {
        let song = songs
            .get_mut(action.index)
            .ok_or(DispatchError::NoSuchSong(action.index))?;

        if let Some(resolution) = self.resolve_missing(song, action.kind)? {
            song.apply(&resolution);
        }
        self.perform(action.kind, song)
    }

    /// Look up the reference `kind` needs, unless the song already has it.
    /// Issues at most one external query and never mutates the song.
    pub fn resolve_missing(&self, song: &SongRecord, kind: ActionKind) -> Result<Option<Resolution>> {
        match kind.required_ref() {
            Some(ref_kind) if !song.has_reference(ref_kind) => {
                self.resolve(song, ref_kind.source()).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn resolve(&self, song: &SongRecord, source: RefSource) -> Result<Resolution> {
        let query = build_search_query(song);
        tracing::info!("resolving {:?} reference for #{}: {}", source, song.rank, query);

        match source {
            RefSource::Streaming => {
                let found = self
                    .tracks
                    .search_track(&query)?
                    .ok_or_else(|| DispatchError::NoTrackMatch(query.clone()))?;
                Ok(Resolution::Track {
                    track_uri: found.track_uri,
                    artist_uri: found.artist_uri,
                })
            }
            RefSource::Video => {
                let video_id = self
                    .videos
                    .search_video(&query)?
                    .ok_or_else(|| DispatchError::NoVideoMatch(query.clone()))?;
                Ok(Resolution::Video { video_id })
            }
        }
    }

    /// Perform the side effect for `kind`. Needed references must already be cached.
    pub fn perform(&self, kind: ActionKind, song: &SongRecord) -> Result<Outcome> {
        match kind {
            ActionKind::OpenChart => {
                let url = chart_entry_url(&self.chart_url, song.rank);
                self.open_url(&url)?;
                Ok(Outcome::Opened(url))
            }
            ActionKind::PlayTrack => self.play(required(song, RefKind::Track)?),
            ActionKind::OpenArtist => self.open_artist(required(song, RefKind::Artist)?),
            ActionKind::OpenVideo => {
                let url = youtube::watch_url(required(song, RefKind::Video)?);
                self.open_url(&url)?;
                Ok(Outcome::Opened(url))
            }
        }
    }

    fn play(&self, track_uri: &str) -> Result<Outcome> {
        if !self.player.has_session() {
            return Ok(Outcome::NoPlayer);
        }
        let devices = self.player.devices()?;
        let Some(device) = devices.first() else {
            return Ok(Outcome::NoPlayer);
        };
        tracing::debug!("playing on {} (active: {})", device.name, device.is_active);

        self.player.start_playback(device.id.as_deref(), track_uri)?;
        Ok(Outcome::Playing {
            device: device.name.clone(),
        })
    }

    fn open_artist(&self, artist_uri: &str) -> Result<Outcome> {
        let surfaces = self.detect_surfaces()?;
        for surface in &surfaces {
            match surface {
                Surface::Desktop => self
                    .launcher
                    .launch_desktop(Some(artist_uri))
                    .map_err(DispatchError::launch("Spotify"))?,
                Surface::Web => {
                    let url = spotify::web_url(artist_uri)
                        .ok_or_else(|| DispatchError::MalformedUri(artist_uri.to_string()))?;
                    self.open_url(&url)?;
                }
            }
        }
        Ok(Outcome::ArtistOpened { surfaces })
    }

    /// Start a Spotify player so later play requests have a device to target.
    pub fn open_player(&self, surface: Surface) -> Result<Outcome> {
        match surface {
            Surface::Desktop => self
                .launcher
                .launch_desktop(None)
                .map_err(DispatchError::launch("Spotify"))?,
            Surface::Web => self.open_url(spotify::WEB_PLAYER_URL)?,
        }
        Ok(Outcome::PlayerStarted(surface))
    }

    /// Which Spotify surfaces look like they are running.
    ///
    /// With a user session this compares device names against the local hostname
    /// and looks for "Web Player"; that is a guess, not reported state. Without a
    /// session the launch mode decides.
    fn detect_surfaces(&self) -> Result<Vec<Surface>> {
        if !self.player.has_session() {
            return Ok(vec![self.mode.surface()]);
        }
        let devices = self.player.devices()?;
        Ok(active_surfaces(&devices, self.launcher.hostname().as_deref()))
    }

    fn open_url(&self, url: &str) -> Result<()> {
        self.launcher
            .open_url(url)
            .map_err(DispatchError::launch("browser"))
    }
}

fn required(song: &SongRecord, kind: RefKind) -> Result<&str> {
    song.reference(kind).ok_or(DispatchError::Unresolved(kind))
}

/// Best-effort guess at running surfaces from a device list.
pub fn active_surfaces(devices: &[Device], hostname: Option<&str>) -> Vec<Surface> {
    let mut surfaces = Vec::new();
    let desktop = hostname.is_some_and(|host| {
        devices
            .iter()
            .any(|d| d.name.eq_ignore_ascii_case(host))
    });
    if desktop {
        surfaces.push(Surface::Desktop);
    }
    if devices.iter().any(|d| d.name.contains("Web Player")) {
        surfaces.push(Surface::Web);
    }
    surfaces
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::models::TrackMatch;

    #[derive(Default)]
    struct FakeSpotify {
        searches: AtomicUsize,
        queries: Mutex<Vec<String>>,
        no_match: bool,
        session: bool,
        devices: Vec<Device>,
        played: Mutex<Vec<(Option<String>, String)>>,
    }

    impl TrackSearch for FakeSpotify {
        fn search_track(&self, query: &str) -> AnyResult<Option<TrackMatch>> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.to_string());
            if self.no_match {
                return Ok(None);
            }
            Ok(Some(TrackMatch {
                track_uri: "spotify:track:t1".to_string(),
                artist_uri: "spotify:artist:a1".to_string(),
            }))
        }
    }

    impl PlaybackService for FakeSpotify {
        fn has_session(&self) -> bool {
            self.session
        }

        fn devices(&self) -> AnyResult<Vec<Device>> {
            Ok(self.devices.clone())
        }

        fn start_playback(&self, device_id: Option<&str>, track_uri: &str) -> AnyResult<()> {
            self.played
                .lock()
                .unwrap()
                .push((device_id.map(str::to_string), track_uri.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeYoutube {
        searches: AtomicUsize,
    }

    impl VideoSearch for FakeYoutube {
        fn search_video(&self, _query: &str) -> AnyResult<Option<String>> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            Ok(Some("vid123".to_string()))
        }
    }

    #[derive(Default)]
    struct FakeLauncher {
        urls: Mutex<Vec<String>>,
        desktop: Mutex<Vec<String>>,
        host: Option<String>,
        broken_desktop: bool,
    }

    impl Launcher for FakeLauncher {
        fn open_url(&self, url: &str) -> io::Result<()> {
            self.urls.lock().unwrap().push(url.to_string());
            Ok(())
        }

        fn launch_desktop(&self, uri: Option<&str>) -> io::Result<()> {
            if self.broken_desktop {
                return Err(io::Error::new(io::ErrorKind::NotFound, "spotify not installed"));
            }
            self.desktop.lock().unwrap().push(uri.unwrap_or_default().to_string());
            Ok(())
        }

        fn hostname(&self) -> Option<String> {
            self.host.clone()
        }
    }

    struct Harness {
        spotify: Arc<FakeSpotify>,
        youtube: Arc<FakeYoutube>,
        launcher: Arc<FakeLauncher>,
        dispatcher: Dispatcher,
    }

    fn harness(spotify: FakeSpotify, launcher: FakeLauncher) -> Harness {
        let spotify = Arc::new(spotify);
        let youtube = Arc::new(FakeYoutube::default());
        let launcher = Arc::new(launcher);
        let dispatcher = Dispatcher::new(
            spotify.clone(),
            youtube.clone(),
            spotify.clone(),
            launcher.clone(),
            "https://charts.test/hot-100",
        );
        Harness {
            spotify,
            youtube,
            launcher,
            dispatcher,
        }
    }

    fn device(name: &str) -> Device {
        Device {
            id: Some(format!("id-{}", name)),
            name: name.to_string(),
            is_active: false,
        }
    }

    fn songs() -> Vec<SongRecord> {
        vec![
            SongRecord::new(1, "Peaches", "Justin Bieber ft. Daniel Caesar, Giveon"),
            SongRecord::new(2, "Levitating", "Dua Lipa ft. DaBaby"),
        ]
    }

    #[test]
    fn test_open_chart_needs_no_lookup() {
        let h = harness(FakeSpotify::default(), FakeLauncher::default());
        let mut list = songs();
        let outcome = h
            .dispatcher
            .dispatch(&mut list, SongAction::new(ActionKind::OpenChart, 1))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Opened("https://charts.test/hot-100?rank=2".to_string())
        );
        assert_eq!(h.spotify.searches.load(Ordering::SeqCst), 0);
        assert_eq!(h.youtube.searches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolution_is_cached() {
        let h = harness(FakeSpotify::default(), FakeLauncher::default());
        let mut list = songs();
        let action = SongAction::new(ActionKind::OpenVideo, 0);

        h.dispatcher.dispatch(&mut list, action).unwrap();
        h.dispatcher.dispatch(&mut list, action).unwrap();

        assert_eq!(h.youtube.searches.load(Ordering::SeqCst), 1);
        assert_eq!(list[0].video_ref.as_deref(), Some("vid123"));
        assert_eq!(
            *h.launcher.urls.lock().unwrap(),
            vec![
                "https://www.youtube.com/watch?v=vid123".to_string(),
                "https://www.youtube.com/watch?v=vid123".to_string(),
            ]
        );
    }

    #[test]
    fn test_query_drops_featured_artists() {
        let h = harness(FakeSpotify::default(), FakeLauncher::default());
        let mut list = songs();
        h.dispatcher
            .dispatch(&mut list, SongAction::new(ActionKind::OpenArtist, 1))
            .unwrap();
        assert_eq!(*h.spotify.queries.lock().unwrap(), vec!["Levitating Dua Lipa"]);
    }

    #[test]
    fn test_track_search_also_caches_artist() {
        let h = harness(
            FakeSpotify {
                session: true,
                devices: vec![device("Living Room")],
                ..Default::default()
            },
            FakeLauncher::default(),
        );
        let mut list = songs();
        h.dispatcher
            .dispatch(&mut list, SongAction::new(ActionKind::PlayTrack, 0))
            .unwrap();
        h.dispatcher
            .dispatch(&mut list, SongAction::new(ActionKind::OpenArtist, 0))
            .unwrap();

        assert_eq!(h.spotify.searches.load(Ordering::SeqCst), 1);
        assert_eq!(list[0].artist_ref.as_deref(), Some("spotify:artist:a1"));
        assert!(list[1].track_ref.is_none());
    }

    #[test]
    fn test_play_on_first_device() {
        let h = harness(
            FakeSpotify {
                session: true,
                devices: vec![device("Kitchen"), device("Desk")],
                ..Default::default()
            },
            FakeLauncher::default(),
        );
        let mut list = songs();
        let outcome = h
            .dispatcher
            .dispatch(&mut list, SongAction::new(ActionKind::PlayTrack, 0))
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Playing {
                device: "Kitchen".to_string()
            }
        );
        assert_eq!(
            *h.spotify.played.lock().unwrap(),
            vec![(Some("id-Kitchen".to_string()), "spotify:track:t1".to_string())]
        );
    }

    #[test]
    fn test_play_uses_first_listed_device() {
        let mut desk = device("Desk");
        desk.is_active = true;
        let h = harness(
            FakeSpotify {
                session: true,
                devices: vec![device("Kitchen"), desk],
                ..Default::default()
            },
            FakeLauncher::default(),
        );
        let mut list = songs();
        let outcome = h
            .dispatcher
            .dispatch(&mut list, SongAction::new(ActionKind::PlayTrack, 0))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Playing {
                device: "Kitchen".to_string()
            }
        );
        assert_eq!(
            *h.spotify.played.lock().unwrap(),
            vec![(Some("id-Kitchen".to_string()), "spotify:track:t1".to_string())]
        );
    }

    #[test]
    fn test_play_without_device_is_notice() {
        let h = harness(
            FakeSpotify {
                session: true,
                ..Default::default()
            },
            FakeLauncher::default(),
        );
        let mut list = songs();
        let outcome = h
            .dispatcher
            .dispatch(&mut list, SongAction::new(ActionKind::PlayTrack, 0))
            .unwrap();
        assert_eq!(outcome, Outcome::NoPlayer);
        // The reference stays cached even though nothing played.
        assert_eq!(list[0].track_ref.as_deref(), Some("spotify:track:t1"));
    }

    #[test]
    fn test_play_without_session_is_notice() {
        let h = harness(FakeSpotify::default(), FakeLauncher::default());
        let mut list = songs();
        let outcome = h
            .dispatcher
            .dispatch(&mut list, SongAction::new(ActionKind::PlayTrack, 0))
            .unwrap();
        assert_eq!(outcome, Outcome::NoPlayer);
        assert!(h.spotify.played.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_match_is_an_error() {
        let h = harness(
            FakeSpotify {
                no_match: true,
                ..Default::default()
            },
            FakeLauncher::default(),
        );
        let mut list = songs();
        let err = h
            .dispatcher
            .dispatch(&mut list, SongAction::new(ActionKind::PlayTrack, 1))
            .unwrap_err();
        assert!(matches!(err, DispatchError::NoTrackMatch(ref q) if q == "Levitating Dua Lipa"));
        assert!(list[1].track_ref.is_none());
    }

    #[test]
    fn test_index_out_of_range() {
        let h = harness(FakeSpotify::default(), FakeLauncher::default());
        let mut list = songs();
        let err = h
            .dispatcher
            .dispatch(&mut list, SongAction::new(ActionKind::OpenChart, 5))
            .unwrap_err();
        assert!(matches!(err, DispatchError::NoSuchSong(5)));
    }

    #[test]
    fn test_artist_opens_on_detected_surfaces() {
        let h = harness(
            FakeSpotify {
                session: true,
                devices: vec![device("MY-LAPTOP"), device("Web Player (Firefox)")],
                ..Default::default()
            },
            FakeLauncher {
                host: Some("my-laptop".to_string()),
                ..Default::default()
            },
        );
        let mut list = songs();
        let outcome = h
            .dispatcher
            .dispatch(&mut list, SongAction::new(ActionKind::OpenArtist, 0))
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::ArtistOpened {
                surfaces: vec![Surface::Desktop, Surface::Web]
            }
        );
        assert_eq!(*h.launcher.desktop.lock().unwrap(), vec!["spotify:artist:a1"]);
        assert_eq!(
            *h.launcher.urls.lock().unwrap(),
            vec!["https://open.spotify.com/artist/a1"]
        );
    }

    #[test]
    fn test_artist_with_nothing_running() {
        let h = harness(
            FakeSpotify {
                session: true,
                devices: vec![device("Kitchen Speaker")],
                ..Default::default()
            },
            FakeLauncher {
                host: Some("laptop".to_string()),
                ..Default::default()
            },
        );
        let mut list = songs();
        let outcome = h
            .dispatcher
            .dispatch(&mut list, SongAction::new(ActionKind::OpenArtist, 0))
            .unwrap();
        assert_eq!(outcome, Outcome::ArtistOpened { surfaces: vec![] });
        assert!(h.launcher.urls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_artist_without_session_follows_launch_mode() {
        let mut h = harness(FakeSpotify::default(), FakeLauncher::default());
        h.dispatcher.set_mode(LaunchMode::Website);
        let mut list = songs();
        h.dispatcher
            .dispatch(&mut list, SongAction::new(ActionKind::OpenArtist, 0))
            .unwrap();
        assert_eq!(
            *h.launcher.urls.lock().unwrap(),
            vec!["https://open.spotify.com/artist/a1"]
        );
        assert!(h.launcher.desktop.lock().unwrap().is_empty());
    }

    #[test]
    fn test_desktop_launch_failure_is_reported() {
        let h = harness(
            FakeSpotify::default(),
            FakeLauncher {
                broken_desktop: true,
                ..Default::default()
            },
        );
        let mut list = songs();
        let err = h
            .dispatcher
            .dispatch(&mut list, SongAction::new(ActionKind::OpenArtist, 0))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Launch { program: "Spotify", .. }));
    }

    #[test]
    fn test_open_player_app() {
        let h = harness(FakeSpotify::default(), FakeLauncher::default());
        let outcome = h.dispatcher.open_player(Surface::Desktop).unwrap();
        assert_eq!(outcome, Outcome::PlayerStarted(Surface::Desktop));
        assert_eq!(*h.launcher.desktop.lock().unwrap(), vec![""]);
        assert!(h.launcher.urls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_open_player_web() {
        let h = harness(FakeSpotify::default(), FakeLauncher::default());
        let outcome = h.dispatcher.open_player(Surface::Web).unwrap();
        assert_eq!(outcome, Outcome::PlayerStarted(Surface::Web));
        assert_eq!(*h.launcher.urls.lock().unwrap(), vec!["https://open.spotify.com"]);
        assert!(h.launcher.desktop.lock().unwrap().is_empty());
    }

    #[test]
    fn test_open_player_app_failure_is_reported() {
        let h = harness(
            FakeSpotify::default(),
            FakeLauncher {
                broken_desktop: true,
                ..Default::default()
            },
        );
        let err = h.dispatcher.open_player(Surface::Desktop).unwrap_err();
        assert!(matches!(err, DispatchError::Launch { program: "Spotify", .. }));
    }

    #[test]
    fn test_perform_requires_resolution() {
        let h = harness(FakeSpotify::default(), FakeLauncher::default());
        let song = SongRecord::new(1, "Peaches", "Justin Bieber");
        let err = h.dispatcher.perform(ActionKind::OpenVideo, &song).unwrap_err();
        assert!(matches!(err, DispatchError::Unresolved(RefKind::Video)));
    }

    #[test]
    fn test_resolve_missing_skips_cached() {
        let h = harness(FakeSpotify::default(), FakeLauncher::default());
        let mut song = SongRecord::new(1, "Peaches", "Justin Bieber");
        song.track_ref = Some("spotify:track:x".to_string());
        song.artist_ref = Some("spotify:artist:x".to_string());

        assert_eq!(h.dispatcher.resolve_missing(&song, ActionKind::PlayTrack).unwrap(), None);
        assert_eq!(h.dispatcher.resolve_missing(&song, ActionKind::OpenChart).unwrap(), None);
        assert_eq!(h.spotify.searches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_active_surfaces() {
        let devices = vec![device("Desk"), device("Spotify Web Player")];
        assert_eq!(active_surfaces(&devices, None), vec![Surface::Web]);
        assert_eq!(
            active_surfaces(&devices, Some("desk")),
            vec![Surface::Desktop, Surface::Web]
        );
        assert!(active_surfaces(&[], Some("desk")).is_empty());
    }
}
