//! Outbound client traits and implementations
//!
//! The polling loop only sees these traits, so its branching can be tested
//! against mocks without a Plex server, a TMDB key, or a running Discord
//! client.

pub mod plex;
pub mod tmdb;

use crate::models::{MediaKind, MediaSession, MetadataMatch, PresencePayload};
use crate::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// Source of the current playback session
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Fetch the active session for the configured users, if any
    async fn current_session(&mut self) -> Result<Option<MediaSession>>;
}

/// Metadata lookup used to enrich the presence payload
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Look up a title, preferring a direct GUID match when the Plex item
    /// carries one. `Ok(None)` means no convincing match was found.
    async fn lookup(
        &self,
        title: &str,
        year: Option<i32>,
        kind: MediaKind,
        guids: &[String],
    ) -> Result<Option<MetadataMatch>>;
}

/// Destination the presence payload is pushed to
#[cfg_attr(test, automock)]
pub trait PresenceSink {
    fn set(&mut self, payload: &PresencePayload) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

pub use plex::{PlexAccount, PlexMonitor};
pub use tmdb::TmdbClient;
