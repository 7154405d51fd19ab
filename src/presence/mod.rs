//! Mapping a playback session onto a Discord presence payload

pub mod discord;

use crate::models::{
    ActivityKind, MediaKind, MediaSession, MetadataMatch, PresenceButton, PresencePayload,
};
use crate::providers::MetadataSource;
use tracing::warn;

const POSTER_BASE: &str = "https://image.tmdb.org/t/p/original";

/// Build the presence payload for a session, enriching it from `metadata`
/// when a source is configured. Lookup failures degrade to the default
/// assets rather than surfacing an error.
pub async fn build_payload<M>(
    session: &MediaSession,
    minimal: bool,
    metadata: Option<&M>,
) -> PresencePayload
where
    M: MetadataSource + ?Sized,
{
    match session {
        MediaSession::Movie {
            title,
            year,
            genres,
            directors,
            info,
        } => {
            let lookup = enrich(metadata, title, *year, MediaKind::Movie, &info.guids).await;

            let primary = match year {
                Some(year) if !minimal => format!("{} ({})", title, year),
                _ => title.clone(),
            };
            // Only worth a second line when both genre and director are known
            let secondary = if minimal {
                None
            } else {
                match (genres.first(), directors.first()) {
                    (Some(genre), Some(director)) => {
                        Some(format!("{}, Dir. {}", genre, director))
                    }
                    _ => None,
                }
            };
            let (large_image, button) = image_and_button(lookup.as_ref(), "movie", minimal);

            PresencePayload {
                kind: ActivityKind::Watching,
                primary,
                secondary,
                large_image,
                large_text: title.clone(),
                end: PresencePayload::end_timestamp(info),
                button,
            }
        }
        MediaSession::Episode {
            show_title,
            show_year,
            title,
            season,
            episode,
            info,
        } => {
            let lookup = enrich(metadata, show_title, *show_year, MediaKind::Tv, &info.guids).await;

            let secondary = if minimal {
                None
            } else {
                let mut line = title.clone();
                if let (Some(season), Some(episode)) = (season, episode) {
                    line.push_str(&format!(" (S{}:E{})", season, episode));
                }
                Some(line)
            };
            let (large_image, button) = image_and_button(lookup.as_ref(), "tv", minimal);

            PresencePayload {
                kind: ActivityKind::Watching,
                primary: show_title.clone(),
                secondary,
                large_image,
                large_text: show_title.clone(),
                end: PresencePayload::end_timestamp(info),
                button,
            }
        }
        MediaSession::Track {
            title,
            artist,
            album,
            info,
        } => PresencePayload {
            kind: ActivityKind::Listening,
            primary: title.clone(),
            secondary: if minimal {
                None
            } else {
                artist.as_ref().map(|artist| format!("by {}", artist))
            },
            large_image: "music".to_string(),
            large_text: album.clone().unwrap_or_else(|| title.clone()),
            end: PresencePayload::end_timestamp(info),
            button: None,
        },
    }
}

async fn enrich<M>(
    metadata: Option<&M>,
    title: &str,
    year: Option<i32>,
    kind: MediaKind,
    guids: &[String],
) -> Option<MetadataMatch>
where
    M: MetadataSource + ?Sized,
{
    let source = metadata?;
    match source.lookup(title, year, kind, guids).await {
        Ok(found) => found,
        Err(e) => {
            warn!("Metadata lookup failed for {}: {}", title, e);
            None
        }
    }
}

fn image_and_button(
    lookup: Option<&MetadataMatch>,
    default_asset: &str,
    minimal: bool,
) -> (String, Option<PresenceButton>) {
    match lookup {
        Some(found) => {
            let image = found
                .poster_path
                .as_ref()
                .map(|path| format!("{}{}", POSTER_BASE, path))
                .unwrap_or_else(|| default_asset.to_string());
            let button = if minimal {
                None
            } else {
                Some(PresenceButton {
                    label: "TMDB".to_string(),
                    url: format!("https://www.themoviedb.org/{}/{}", found.kind, found.id),
                })
            };
            (image, button)
        }
        None => (default_asset.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionInfo;
    use crate::providers::MockMetadataSource;
    use crate::Error;

    fn info() -> SessionInfo {
        SessionInfo {
            duration_ms: 7_200_000,
            view_offset_ms: 1_200_000,
            paused: false,
            user: "alice".to_string(),
            guids: vec!["tmdb://949".to_string()],
        }
    }

    fn movie() -> MediaSession {
        MediaSession::Movie {
            title: "Heat".to_string(),
            year: Some(1995),
            genres: vec!["Crime".to_string()],
            directors: vec!["Michael Mann".to_string()],
            info: info(),
        }
    }

    fn episode() -> MediaSession {
        MediaSession::Episode {
            show_title: "The Sopranos".to_string(),
            show_year: None,
            title: "Pine Barrens".to_string(),
            season: Some(3),
            episode: Some(11),
            info: info(),
        }
    }

    fn found(id: i64, kind: MediaKind, poster: Option<&str>) -> MetadataMatch {
        MetadataMatch {
            id,
            kind,
            poster_path: poster.map(str::to_string),
        }
    }

    /// TMDB disabled: raw Plex metadata only, default asset, no button
    #[tokio::test]
    async fn unenriched_movie_payload() {
        let payload = build_payload::<MockMetadataSource>(&movie(), false, None).await;

        assert_eq!(payload.primary, "Heat (1995)");
        assert_eq!(payload.secondary.as_deref(), Some("Crime, Dir. Michael Mann"));
        assert_eq!(payload.large_image, "movie");
        assert_eq!(payload.large_text, "Heat");
        assert_eq!(payload.kind, ActivityKind::Watching);
        assert!(payload.button.is_none());
        assert!(payload.end.is_some());
    }

    /// TMDB enabled and matched: poster URL and link button
    #[tokio::test]
    async fn enriched_movie_payload() {
        let mut metadata = MockMetadataSource::new();
        metadata
            .expect_lookup()
            .times(1)
            .returning(|_, _, _, _| Ok(Some(found(949, MediaKind::Movie, Some("/p.jpg")))));

        let payload = build_payload(&movie(), false, Some(&metadata)).await;

        assert_eq!(payload.large_image, "https://image.tmdb.org/t/p/original/p.jpg");
        let button = payload.button.expect("button");
        assert_eq!(button.label, "TMDB");
        assert_eq!(button.url, "https://www.themoviedb.org/movie/949");
    }

    /// Lookup failure falls back to the unenriched payload without surfacing
    #[tokio::test]
    async fn lookup_error_falls_back() {
        let mut metadata = MockMetadataSource::new();
        metadata
            .expect_lookup()
            .returning(|_, _, _, _| Err(Error::Config("boom".to_string())));

        let payload = build_payload(&movie(), false, Some(&metadata)).await;

        assert_eq!(payload.large_image, "movie");
        assert!(payload.button.is_none());
        assert_eq!(payload.primary, "Heat (1995)");
    }

    #[tokio::test]
    async fn unmatched_lookup_falls_back() {
        let mut metadata = MockMetadataSource::new();
        metadata.expect_lookup().returning(|_, _, _, _| Ok(None));

        let payload = build_payload(&movie(), false, Some(&metadata)).await;

        assert_eq!(payload.large_image, "movie");
        assert!(payload.button.is_none());
    }

    /// Matched but posterless entries keep the default asset and the button
    #[tokio::test]
    async fn match_without_poster_keeps_default_asset() {
        let mut metadata = MockMetadataSource::new();
        metadata
            .expect_lookup()
            .returning(|_, _, _, _| Ok(Some(found(1398, MediaKind::Tv, None))));

        let payload = build_payload(&episode(), false, Some(&metadata)).await;

        assert_eq!(payload.large_image, "tv");
        assert_eq!(
            payload.button.expect("button").url,
            "https://www.themoviedb.org/tv/1398"
        );
    }

    /// Minimal mode: primary line only, no year, no secondary, no button
    #[tokio::test]
    async fn minimal_mode_suppresses_granular_fields() {
        let mut metadata = MockMetadataSource::new();
        metadata
            .expect_lookup()
            .returning(|_, _, _, _| Ok(Some(found(949, MediaKind::Movie, Some("/p.jpg")))));

        let payload = build_payload(&movie(), true, Some(&metadata)).await;

        assert_eq!(payload.primary, "Heat");
        assert!(payload.secondary.is_none());
        assert!(payload.button.is_none());
        // The poster itself is not a granular field
        assert_eq!(payload.large_image, "https://image.tmdb.org/t/p/original/p.jpg");
    }

    #[tokio::test]
    async fn episode_payload_formats_season_and_episode() {
        let payload = build_payload::<MockMetadataSource>(&episode(), false, None).await;

        assert_eq!(payload.primary, "The Sopranos");
        assert_eq!(payload.secondary.as_deref(), Some("Pine Barrens (S3:E11)"));
        assert_eq!(payload.large_image, "tv");
    }

    #[tokio::test]
    async fn movie_secondary_needs_genre_and_director() {
        let session = MediaSession::Movie {
            title: "Heat".to_string(),
            year: Some(1995),
            genres: vec!["Crime".to_string()],
            directors: Vec::new(),
            info: info(),
        };
        let payload = build_payload::<MockMetadataSource>(&session, false, None).await;
        assert!(payload.secondary.is_none());
    }

    /// Tracks never hit the metadata source
    #[tokio::test]
    async fn track_payload_skips_lookup() {
        let metadata = MockMetadataSource::new();
        let session = MediaSession::Track {
            title: "Paranoid Android".to_string(),
            artist: Some("Radiohead".to_string()),
            album: Some("OK Computer".to_string()),
            info: info(),
        };

        let payload = build_payload(&session, false, Some(&metadata)).await;

        assert_eq!(payload.primary, "Paranoid Android");
        assert_eq!(payload.secondary.as_deref(), Some("by Radiohead"));
        assert_eq!(payload.large_image, "music");
        assert_eq!(payload.large_text, "OK Computer");
        assert_eq!(payload.kind, ActivityKind::Listening);
        assert!(payload.button.is_none());
    }

    #[tokio::test]
    async fn paused_session_has_no_end_timestamp() {
        let mut session_info = info();
        session_info.paused = true;
        let session = MediaSession::Track {
            title: "Paranoid Android".to_string(),
            artist: None,
            album: None,
            info: session_info,
        };

        let payload = build_payload::<MockMetadataSource>(&session, false, None).await;

        assert!(payload.end.is_none());
        assert!(payload.secondary.is_none());
        assert_eq!(payload.large_text, "Paranoid Android");
    }
}
