//! Playlist download, format detection and expansion into stream URLs.

pub mod parser;
pub mod resolver;

pub use resolver::{Expansion, resolve_playlist};

/// Playlist grammars understood by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistFormat {
    M3u,
    Pls,
}

/// Note attached to HLS results, which are accepted without probing segments.
pub const HLS_NOTE: &str = "HLS Playlist (Needs Proper Handling)";
