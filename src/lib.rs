//! plexcord - mirror your Plex playback session into Discord Rich Presence
pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod presence;
pub mod providers;

pub use app::App;
pub use config::Config;
pub use error::{Error, Result};
pub use models::{MediaSession, PresencePayload};
pub use presence::discord::DiscordPresence;
pub use providers::{
    MetadataSource, PlexAccount, PlexMonitor, PresenceSink, SessionSource, TmdbClient,
};
