//! Plex web API client
//!
//! Two pieces: [`PlexAccount`] handles plex.tv authentication (cached token
//! first, then credential sign-in with an optional verification code) and
//! resource discovery; [`PlexMonitor`] holds the resolved server connection
//! and answers the per-poll "what is playing" question.

use super::SessionSource;
use crate::config::PlexSettings;
use crate::models::{MediaSession, SessionInfo};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

const PLEX_TV: &str = "https://plex.tv";

/// Timeout for probing a server connection candidate
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// An authenticated plex.tv account
#[derive(Clone)]
pub struct PlexAccount {
    http: reqwest::Client,
    client_id: String,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    auth_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Resource {
    name: String,
    #[serde(default)]
    provides: String,
    #[serde(default)]
    connections: Vec<Connection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection {
    uri: String,
    #[serde(default)]
    relay: bool,
}

impl PlexAccount {
    /// Authenticate with Plex, preferring a token cached from a previous
    /// run over the configured credentials. A fresh token is written back
    /// to `token_path` for future logins.
    pub async fn login(
        http: reqwest::Client,
        settings: &PlexSettings,
        token_path: &Path,
    ) -> Result<Self> {
        let client_id = Uuid::new_v4().to_string();

        if let Ok(cached) = std::fs::read_to_string(token_path) {
            let cached = cached.trim().to_string();
            if !cached.is_empty() {
                let account = Self {
                    http: http.clone(),
                    client_id: client_id.clone(),
                    token: cached,
                };
                match account.token_valid().await {
                    Ok(true) => {
                        info!("Authenticated with Plex using cached token");
                        return Ok(account);
                    }
                    Ok(false) => warn!("Cached Plex token rejected, signing in with credentials"),
                    Err(e) => warn!("Failed to validate cached Plex token: {}", e),
                }
            }
        }

        let code = if settings.two_factor {
            let code = prompt_verification_code();
            if code.is_none() {
                warn!("Two-factor authentication is enabled but no code was supplied");
            }
            code
        } else {
            None
        };

        let account = Self::sign_in(http, client_id, settings, code.as_deref()).await?;
        info!("Authenticated with Plex");

        if let Err(e) = std::fs::write(token_path, &account.token) {
            warn!("Failed to save Plex token for future logins: {}", e);
        }

        Ok(account)
    }

    async fn sign_in(
        http: reqwest::Client,
        client_id: String,
        settings: &PlexSettings,
        code: Option<&str>,
    ) -> Result<Self> {
        let mut params = vec![
            ("login", settings.username.as_str()),
            ("password", settings.password.as_str()),
        ];
        if let Some(code) = code {
            params.push(("verificationCode", code));
        }

        let response = http
            .post(format!("{}/api/v2/users/signin", PLEX_TV))
            .header("Accept", "application/json")
            .header("X-Plex-Product", "plexcord")
            .header("X-Plex-Version", env!("CARGO_PKG_VERSION"))
            .header("X-Plex-Client-Identifier", &client_id)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::PlexAuth(format!(
                "sign-in returned HTTP {}",
                response.status()
            )));
        }

        let body: SignInResponse = response.json().await?;
        Ok(Self {
            http,
            client_id,
            token: body.auth_token,
        })
    }

    async fn token_valid(&self) -> Result<bool> {
        let response = self
            .get(&format!("{}/api/v2/user", PLEX_TV))
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    /// Server resources available to the account
    async fn resources(&self) -> Result<Vec<Resource>> {
        let response = self
            .get(&format!(
                "{}/api/v2/resources?includeHttps=1&includeRelay=1",
                PLEX_TV
            ))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("Accept", "application/json")
            .header("X-Plex-Product", "plexcord")
            .header("X-Plex-Version", env!("CARGO_PKG_VERSION"))
            .header("X-Plex-Client-Identifier", &self.client_id)
            .header("X-Plex-Token", &self.token)
    }
}

fn prompt_verification_code() -> Option<String> {
    print!("Enter verification code: ");
    std::io::stdout().flush().ok()?;

    let mut code = String::new();
    std::io::stdin().read_line(&mut code).ok()?;
    let code = code.trim();

    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

/// Session poller bound to one resolved Plex Media Server
pub struct PlexMonitor {
    account: PlexAccount,
    settings: PlexSettings,
    /// Resolved server base URL; dropped on fetch failure so the next poll
    /// rediscovers the server
    base_url: Option<Url>,
}

impl PlexMonitor {
    /// Resolve the configured server list against the account's resources.
    /// Failing to locate any configured server at startup is fatal.
    pub async fn connect(account: PlexAccount, settings: PlexSettings) -> Result<Self> {
        let mut monitor = Self {
            account,
            settings,
            base_url: None,
        };
        let base = monitor.locate_server().await?;
        info!("Connected to Plex Media Server at {}", base);
        monitor.base_url = Some(base);
        Ok(monitor)
    }

    /// Walk the configured server names in priority order and return the
    /// first reachable connection, preferring direct over relay.
    async fn locate_server(&self) -> Result<Url> {
        let resources = self.account.resources().await?;

        for wanted in &self.settings.servers {
            let Some(resource) = resources.iter().find(|r| {
                r.provides.contains("server") && r.name.eq_ignore_ascii_case(wanted)
            }) else {
                continue;
            };

            let mut candidates: Vec<&Connection> =
                resource.connections.iter().filter(|c| !c.relay).collect();
            candidates.extend(resource.connections.iter().filter(|c| c.relay));

            for connection in candidates {
                match self.probe(&connection.uri).await {
                    Ok(url) => return Ok(url),
                    Err(e) => debug!("Connection {} unreachable: {}", connection.uri, e),
                }
            }

            warn!("No reachable connection for Plex server {}", resource.name);
        }

        Err(Error::ServerNotFound(format!(
            "none of [{}] matched a reachable server resource",
            self.settings.servers.join(", ")
        )))
    }

    /// Check that a connection candidate answers the identity endpoint
    async fn probe(&self, uri: &str) -> Result<Url> {
        let base = Url::parse(uri)?;
        self.account
            .get(base.join("/identity")?.as_str())
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        Ok(base)
    }

    async fn fetch_sessions(&self, base: &Url) -> Result<Vec<SessionMetadata>> {
        let response = self
            .account
            .get(base.join("/status/sessions")?.as_str())
            .send()
            .await?
            .error_for_status()?;
        let body: SessionsResponse = response.json().await?;
        Ok(body.media_container.metadata)
    }
}

#[async_trait]
impl SessionSource for PlexMonitor {
    async fn current_session(&mut self) -> Result<Option<MediaSession>> {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => {
                let base = self.locate_server().await?;
                info!("Reconnected to Plex Media Server at {}", base);
                self.base_url = Some(base.clone());
                base
            }
        };

        let sessions = match self.fetch_sessions(&base).await {
            Ok(sessions) => sessions,
            Err(e) => {
                // Force rediscovery next poll; the server may have moved
                self.base_url = None;
                return Err(e);
            }
        };

        Ok(select_session(sessions, &self.settings.users))
    }
}

#[derive(Debug, Deserialize)]
struct SessionsResponse {
    #[serde(rename = "MediaContainer", default)]
    media_container: MediaContainer,
}

#[derive(Debug, Default, Deserialize)]
struct MediaContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<SessionMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionMetadata {
    #[serde(rename = "type")]
    kind: String,
    title: String,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    duration: Option<i64>,
    #[serde(default)]
    view_offset: Option<i64>,
    /// Show title for episodes, artist for tracks
    #[serde(default)]
    grandparent_title: Option<String>,
    /// Season title for episodes, album for tracks
    #[serde(default)]
    parent_title: Option<String>,
    /// Episode number
    #[serde(default)]
    index: Option<i64>,
    /// Season number
    #[serde(default)]
    parent_index: Option<i64>,
    #[serde(rename = "User")]
    user: Option<SessionUser>,
    #[serde(rename = "Player")]
    player: Option<SessionPlayer>,
    #[serde(rename = "Genre", default)]
    genres: Vec<Tag>,
    #[serde(rename = "Director", default)]
    directors: Vec<Tag>,
    #[serde(rename = "Guid", default)]
    guids: Vec<Guid>,
}

#[derive(Debug, Deserialize)]
struct SessionUser {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SessionPlayer {
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct Tag {
    tag: String,
}

#[derive(Debug, Deserialize)]
struct Guid {
    id: String,
}

/// Pick the session to mirror: first hit walking the configured user list
/// in priority order, matched case-insensitively against the session owner.
fn select_session(mut sessions: Vec<SessionMetadata>, users: &[String]) -> Option<MediaSession> {
    for wanted in users {
        let found = sessions.iter().position(|s| {
            s.user
                .as_ref()
                .is_some_and(|u| u.title.eq_ignore_ascii_case(wanted))
        });
        if let Some(index) = found {
            return media_session_from(sessions.swap_remove(index));
        }
    }

    if !sessions.is_empty() {
        debug!("No active sessions belong to a configured user");
    }
    None
}

fn media_session_from(meta: SessionMetadata) -> Option<MediaSession> {
    let info = SessionInfo {
        duration_ms: meta.duration.unwrap_or(0),
        view_offset_ms: meta.view_offset.unwrap_or(0),
        paused: meta
            .player
            .as_ref()
            .is_some_and(|p| p.state.eq_ignore_ascii_case("paused")),
        user: meta.user.map(|u| u.title).unwrap_or_default(),
        guids: meta.guids.into_iter().map(|g| g.id).collect(),
    };

    match meta.kind.as_str() {
        "movie" => Some(MediaSession::Movie {
            title: meta.title,
            year: meta.year,
            genres: meta.genres.into_iter().map(|t| t.tag).collect(),
            directors: meta.directors.into_iter().map(|t| t.tag).collect(),
            info,
        }),
        "episode" => Some(MediaSession::Episode {
            show_title: meta.grandparent_title.unwrap_or_else(|| meta.title.clone()),
            // The sessions payload carries the episode year, not the
            // show's; TMDB matching treats a missing year as a wildcard
            show_year: None,
            title: meta.title,
            season: meta.parent_index,
            episode: meta.index,
            info,
        }),
        "track" => Some(MediaSession::Track {
            title: meta.title,
            artist: meta.grandparent_title,
            album: meta.parent_title,
            info,
        }),
        other => {
            warn!("Active session has unsupported media type: {}", other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie_json(user: &str) -> serde_json::Value {
        serde_json::json!({
            "type": "movie",
            "title": "Heat",
            "year": 1995,
            "duration": 10_200_000,
            "viewOffset": 600_000,
            "User": { "title": user },
            "Player": { "state": "playing" },
            "Genre": [ { "tag": "Crime" }, { "tag": "Drama" } ],
            "Director": [ { "tag": "Michael Mann" } ],
            "Guid": [ { "id": "tmdb://949" }, { "id": "imdb://tt0113277" } ]
        })
    }

    fn sessions(values: Vec<serde_json::Value>) -> Vec<SessionMetadata> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }

    #[test]
    fn maps_movie_session() {
        let session = select_session(sessions(vec![movie_json("alice")]), &["alice".to_string()])
            .expect("session");
        match session {
            MediaSession::Movie {
                title,
                year,
                genres,
                directors,
                info,
            } => {
                assert_eq!(title, "Heat");
                assert_eq!(year, Some(1995));
                assert_eq!(genres, vec!["Crime", "Drama"]);
                assert_eq!(directors, vec!["Michael Mann"]);
                assert!(!info.paused);
                assert_eq!(info.remaining_secs(), 9600);
                assert_eq!(info.guids, vec!["tmdb://949", "imdb://tt0113277"]);
            }
            other => panic!("expected movie, got {:?}", other),
        }
    }

    #[test]
    fn maps_episode_session() {
        let session = select_session(
            sessions(vec![serde_json::json!({
                "type": "episode",
                "title": "Pine Barrens",
                "grandparentTitle": "The Sopranos",
                "parentTitle": "Season 3",
                "index": 11,
                "parentIndex": 3,
                "duration": 3_300_000,
                "viewOffset": 60_000,
                "User": { "title": "alice" },
                "Player": { "state": "paused" }
            })]),
            &["alice".to_string()],
        )
        .expect("session");
        match session {
            MediaSession::Episode {
                show_title,
                title,
                season,
                episode,
                info,
                ..
            } => {
                assert_eq!(show_title, "The Sopranos");
                assert_eq!(title, "Pine Barrens");
                assert_eq!(season, Some(3));
                assert_eq!(episode, Some(11));
                assert!(info.paused);
            }
            other => panic!("expected episode, got {:?}", other),
        }
    }

    #[test]
    fn maps_track_session() {
        let session = select_session(
            sessions(vec![serde_json::json!({
                "type": "track",
                "title": "Paranoid Android",
                "grandparentTitle": "Radiohead",
                "parentTitle": "OK Computer",
                "duration": 387_000,
                "viewOffset": 10_000,
                "User": { "title": "alice" }
            })]),
            &["alice".to_string()],
        )
        .expect("session");
        match session {
            MediaSession::Track {
                title,
                artist,
                album,
                ..
            } => {
                assert_eq!(title, "Paranoid Android");
                assert_eq!(artist.as_deref(), Some("Radiohead"));
                assert_eq!(album.as_deref(), Some("OK Computer"));
            }
            other => panic!("expected track, got {:?}", other),
        }
    }

    #[test]
    fn user_priority_order_wins() {
        let selected = select_session(
            sessions(vec![movie_json("bob"), movie_json("alice")]),
            &["alice".to_string(), "bob".to_string()],
        )
        .expect("session");
        assert_eq!(selected.info().user, "alice");
    }

    #[test]
    fn user_match_is_case_insensitive() {
        let selected = select_session(sessions(vec![movie_json("Alice")]), &["alice".to_string()]);
        assert!(selected.is_some());
    }

    #[test]
    fn unrelated_sessions_ignored() {
        let selected = select_session(sessions(vec![movie_json("mallory")]), &["alice".to_string()]);
        assert!(selected.is_none());
    }

    #[test]
    fn unsupported_media_type_is_no_session() {
        let selected = select_session(
            sessions(vec![serde_json::json!({
                "type": "photo",
                "title": "Holiday",
                "User": { "title": "alice" }
            })]),
            &["alice".to_string()],
        );
        assert!(selected.is_none());
    }
}
