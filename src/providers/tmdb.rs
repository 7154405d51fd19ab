//! TMDB metadata lookup
//!
//! One endpoint: multi-search keyed by title. A `tmdb://` GUID carried by
//! the Plex item short-circuits the fuzzy matching; otherwise results are
//! filtered by media type, case-insensitive title, and year prefix of the
//! release or first-air date.

use super::MetadataSource;
use crate::models::{MediaKind, MetadataMatch};
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

const API_BASE: &str = "https://api.themoviedb.org/3";

pub struct TmdbClient {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResult {
    id: i64,
    #[serde(default)]
    media_type: Option<String>,
    /// Movie results carry `title`/`release_date`
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    /// TV results carry `name`/`first_air_date`
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    first_air_date: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
}

impl TmdbClient {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }

    async fn search(&self, title: &str) -> Result<Vec<SearchResult>> {
        let response = self
            .http
            .get(format!("{}/search/multi", API_BASE))
            .query(&[("api_key", self.api_key.as_str()), ("query", title)])
            .send()
            .await?
            .error_for_status()?;

        debug!("(HTTP 200) TMDB multi-search for {:?}", title);
        let body: SearchResponse = response.json().await?;
        Ok(body.results)
    }
}

#[async_trait]
impl MetadataSource for TmdbClient {
    async fn lookup(
        &self,
        title: &str,
        year: Option<i32>,
        kind: MediaKind,
        guids: &[String],
    ) -> Result<Option<MetadataMatch>> {
        let results = self.search(title).await?;
        let selected = select_match(&results, title, year, kind, tmdb_guid(guids));

        if selected.is_none() {
            warn!("Could not locate TMDB metadata for {} ({:?})", title, year);
        }
        Ok(selected)
    }
}

/// Extract the numeric id from a `tmdb://<id>` GUID, if present
fn tmdb_guid(guids: &[String]) -> Option<i64> {
    guids
        .iter()
        .find_map(|g| g.strip_prefix("tmdb://"))
        .and_then(|id| id.parse().ok())
}

fn select_match(
    results: &[SearchResult],
    title: &str,
    year: Option<i32>,
    kind: MediaKind,
    guid: Option<i64>,
) -> Option<MetadataMatch> {
    // A GUID carried by the Plex item is authoritative
    if let Some(id) = guid {
        if let Some(result) = results.iter().find(|r| r.id == id) {
            return Some(to_match(result, kind));
        }
    }

    results
        .iter()
        .find(|result| {
            if result.media_type.as_deref() != Some(kind.as_str()) {
                return false;
            }
            let (candidate, date) = match kind {
                MediaKind::Movie => (&result.title, &result.release_date),
                MediaKind::Tv => (&result.name, &result.first_air_date),
            };
            if !candidate
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(title))
            {
                return false;
            }
            match year {
                Some(year) => date
                    .as_deref()
                    .is_some_and(|d| d.starts_with(&year.to_string())),
                None => true,
            }
        })
        .map(|result| to_match(result, kind))
}

fn to_match(result: &SearchResult, kind: MediaKind) -> MetadataMatch {
    MetadataMatch {
        id: result.id,
        kind,
        poster_path: result.poster_path.clone(),
    }
}
