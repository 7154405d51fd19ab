//! Shared data models: the per-poll session snapshot and the presence payload

use chrono::Utc;

/// Media categories TMDB can be queried for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    /// The `media_type` string TMDB uses for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A matched TMDB entry, reduced to the fields the presence payload needs
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataMatch {
    pub id: i64,
    pub kind: MediaKind,
    pub poster_path: Option<String>,
}

/// Fields common to every session kind
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub duration_ms: i64,
    pub view_offset_ms: i64,
    pub paused: bool,
    /// Username the session belongs to
    pub user: String,
    /// Raw Plex GUIDs of the item (e.g. `tmdb://603`)
    pub guids: Vec<String>,
}

impl SessionInfo {
    /// Seconds of playback remaining
    pub fn remaining_secs(&self) -> i64 {
        ((self.duration_ms - self.view_offset_ms) / 1000).max(0)
    }
}

/// The active playback session, re-fetched each poll and discarded.
///
/// Equality against the previous poll's snapshot decides whether the
/// presence needs to be re-sent.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSession {
    Movie {
        title: String,
        year: Option<i32>,
        genres: Vec<String>,
        directors: Vec<String>,
        info: SessionInfo,
    },
    Episode {
        show_title: String,
        show_year: Option<i32>,
        title: String,
        season: Option<i64>,
        episode: Option<i64>,
        info: SessionInfo,
    },
    Track {
        title: String,
        artist: Option<String>,
        album: Option<String>,
        info: SessionInfo,
    },
}

impl MediaSession {
    pub fn info(&self) -> &SessionInfo {
        match self {
            MediaSession::Movie { info, .. }
            | MediaSession::Episode { info, .. }
            | MediaSession::Track { info, .. } => info,
        }
    }

    /// Short label for logging
    pub fn kind_name(&self) -> &'static str {
        match self {
            MediaSession::Movie { .. } => "movie",
            MediaSession::Episode { .. } => "episode",
            MediaSession::Track { .. } => "track",
        }
    }
}

/// How Discord should categorize the activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Watching,
    Listening,
}

/// A single link button on the presence
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceButton {
    pub label: String,
    pub url: String,
}

/// Everything pushed to the Discord client for one update
#[derive(Debug, Clone, PartialEq)]
pub struct PresencePayload {
    pub kind: ActivityKind,
    /// First line of the status
    pub primary: String,
    /// Second line, suppressed in minimal mode
    pub secondary: Option<String>,
    /// Poster URL, or the name of an asset uploaded to the Discord app
    pub large_image: String,
    pub large_text: String,
    /// Unix timestamp at which playback will finish; absent while paused
    pub end: Option<i64>,
    pub button: Option<PresenceButton>,
}

impl PresencePayload {
    /// End timestamp for a session, omitted while paused
    pub fn end_timestamp(info: &SessionInfo) -> Option<i64> {
        if info.paused {
            None
        } else {
            Some(Utc::now().timestamp() + info.remaining_secs())
        }
    }
}
