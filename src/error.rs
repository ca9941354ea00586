/// Why a single probe failed.
///
/// The `Display` text of each variant is the error string shown to the
/// reporter, so keep it short and stable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("Empty URL")]
    EmptyUrl,

    #[error("Invalid URL - {reason}")]
    InvalidUrl { reason: String },

    #[error("Unsupported protocol: {url}")]
    UnsupportedProtocolScheme { url: String },

    #[error("Timeout")]
    Timeout,

    #[error("TLS error: {reason}")]
    Tls { reason: String },

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("Connection error: {reason}")]
    Connection { reason: String },

    #[error("Error {action}: {reason}")]
    Io {
        action: &'static str,
        reason: String,
    },

    #[error("Not a valid ICY stream")]
    NotIcyStream,

    #[error("Playlist download error. {reason}")]
    PlaylistDownload { reason: String },

    #[error("Error parsing playlist: {reason}")]
    PlaylistParse { reason: String },

    #[error("Empty playlist")]
    EmptyPlaylist,

    #[error("Unsupported playlist format")]
    UnsupportedPlaylistFormat,

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("probe cancelled")]
    Cancelled,

    #[error("{message}")]
    Other { bucket: String, message: String },
}

impl ProbeError {
    pub fn tls(reason: impl Into<String>) -> Self {
        Self::Tls {
            reason: reason.into(),
        }
    }

    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection {
            reason: reason.into(),
        }
    }

    pub fn playlist_download(reason: impl Into<String>) -> Self {
        Self::PlaylistDownload {
            reason: reason.into(),
        }
    }

    /// TLS failures are the only ones another TLS profile can fix.
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls { .. })
    }

    /// Whether repeating the same request may give a different answer.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection { .. } | Self::Io { .. } | Self::Other { .. } => true,
            Self::HttpStatus(code) => *code >= 500 || *code == 429,
            Self::EmptyUrl
            | Self::InvalidUrl { .. }
            | Self::UnsupportedProtocolScheme { .. }
            | Self::Tls { .. }
            | Self::NotIcyStream
            | Self::PlaylistDownload { .. }
            | Self::PlaylistParse { .. }
            | Self::EmptyPlaylist
            | Self::UnsupportedPlaylistFormat
            | Self::TooManyRedirects
            | Self::Cancelled => false,
        }
    }
}
