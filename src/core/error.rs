use crate::models::RefKind;

/// Errors from resolving references or performing a song action.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no song at position {0} in the current list")]
    NoSuchSong(usize),

    #[error("{0:?} reference has not been resolved")]
    Unresolved(RefKind),

    #[error("no Spotify match for \"{0}\"")]
    NoTrackMatch(String),

    #[error("no music video found for \"{0}\"")]
    NoVideoMatch(String),

    #[error("unrecognized Spotify URI: {0}")]
    MalformedUri(String),

    #[error("failed to launch {program}: {source}")]
    Launch {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Service(#[from] anyhow::Error),
}

impl DispatchError {
    pub(crate) fn launch(program: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Launch { program, source }
    }
}
