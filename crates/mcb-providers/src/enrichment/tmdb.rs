//! TMDB enrichment client.
//!
//! `GET {base_url}/{movie|tv}/{id}?append_to_response=credits,keywords,alternative_titles`,
//! normalized into `aka`/`keywords`/`actors`/`directors`/`plot`/`genre` the
//! way the sync worker's auto-enrich pass did it.

use async_trait::async_trait;
use serde_json::{json, Value};

use mcb_domain::error::{Error, Result};
use mcb_domain::ports::providers::enrichment::{EnrichmentClient, EnrichmentQuery, EnrichmentRecord, EnrichmentStatus};

use crate::retry::with_bounded_retry;
use crate::utils::JsonExt;

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

fn tmdb_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "movie" => Some("movie"),
        "tv_show" | "tv" => Some("tv"),
        _ => None,
    }
}

/// Field-count limits applied when flattening cast/crew/alt-title lists.
#[derive(Debug, Clone, Copy)]
pub struct TmdbLimits {
    /// Max billed cast members kept in `actors`.
    pub actors: usize,
    /// Max directors kept in `directors`.
    pub directors: usize,
    /// Max alternative titles kept in `aka`.
    pub aka: usize,
}

impl Default for TmdbLimits {
    fn default() -> Self {
        Self { actors: 10, directors: 5, aka: 10 }
    }
}

/// TMDB HTTP enrichment client.
pub struct TmdbEnrichmentClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
    limits: TmdbLimits,
}

impl TmdbEnrichmentClient {
    /// `api_key` is TMDB's v3 query-string key (not the v4 bearer token).
    pub fn new(api_key: impl Into<String>, language: impl Into<String>, limits: TmdbLimits) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            language: language.into(),
            limits,
        }
    }

    /// Override the base URL, for testing against a stub server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn normalize(payload: &Value, limits: TmdbLimits) -> Value {
        let genres = payload
            .get("genres")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|g| g.opt_str("name"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        let keywords = payload
            .get("keywords")
            .and_then(|kw| kw.get("keywords").or_else(|| kw.get("results")))
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|k| k.opt_str("name"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        let credits = payload.get("credits");
        let actors = credits
            .and_then(|c| c.get("cast"))
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .take(limits.actors)
                    .filter_map(|c| c.opt_str("name"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        let directors = credits
            .and_then(|c| c.get("crew"))
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter(|c| c.opt_str("job") == Some("Director"))
                    .take(limits.directors)
                    .filter_map(|c| c.opt_str("name"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        let aka = payload
            .get("alternative_titles")
            .and_then(|a| a.get("titles").or_else(|| a.get("results")))
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .take(limits.aka)
                    .filter_map(|t| t.opt_str("title"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        json!({
            "aka": aka,
            "keywords": keywords,
            "actors": actors,
            "directors": directors,
            "plot": payload.string_or("overview", ""),
            "genre": genres,
        })
    }
}

#[async_trait]
impl EnrichmentClient for TmdbEnrichmentClient {
    async fn fetch(&self, query: &EnrichmentQuery) -> Result<EnrichmentRecord> {
        let content_type = query.params.opt_str("content_type").unwrap_or_default();
        let tmdb_id = query.params.opt_str("tmdb_id").unwrap_or_default();
        let Some(kind) = tmdb_type(content_type) else {
            return Ok(EnrichmentRecord {
                status: EnrichmentStatus::Error,
                fields: Value::Null,
                raw: Value::Null,
                message: Some(format!("unsupported tmdb content_type: {content_type}")),
            });
        };

        let url = format!("{}/{}/{}", self.base_url, kind, tmdb_id);
        let result = with_bounded_retry(|| async {
            let resp = self
                .http
                .get(&url)
                .query(&[
                    ("api_key", self.api_key.as_str()),
                    ("language", self.language.as_str()),
                    ("append_to_response", "credits,keywords,alternative_titles"),
                ])
                .send()
                .await
                .map_err(|e| (None, Error::enrichment(format!("request to {url} failed: {e}"))))?;

            let status = resp.status();
            if status.as_u16() == 404 {
                return Ok(None);
            }
            if !status.is_success() {
                let code = status.as_u16();
                return Err((Some(code), Error::enrichment(format!("{url} returned {code}"))));
            }
            let body: Value = resp
                .json()
                .await
                .map_err(|e| (None, Error::enrichment(format!("decoding tmdb response: {e}"))))?;
            Ok(Some(body))
        })
        .await;

        match result {
            Ok(Some(raw)) => Ok(EnrichmentRecord {
                status: EnrichmentStatus::Ok,
                fields: Self::normalize(&raw, self.limits),
                raw,
                message: None,
            }),
            Ok(None) => Ok(EnrichmentRecord {
                status: EnrichmentStatus::NotFound,
                fields: Value::Null,
                raw: Value::Null,
                message: None,
            }),
            Err(e) => Ok(EnrichmentRecord {
                status: EnrichmentStatus::Error,
                fields: Value::Null,
                raw: Value::Null,
                message: Some(e.to_string()),
            }),
        }
    }

    fn name(&self) -> &str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmdb_type_maps_aliases() {
        assert_eq!(tmdb_type("movie"), Some("movie"));
        assert_eq!(tmdb_type("tv_show"), Some("tv"));
        assert_eq!(tmdb_type("tv"), Some("tv"));
        assert_eq!(tmdb_type("unknown"), None);
    }

    #[test]
    fn normalize_flattens_nested_payload() {
        let payload = json!({
            "overview": "A plot.",
            "genres": [{"name": "Drama"}, {"name": "Action"}],
            "keywords": {"keywords": [{"name": "heist"}]},
            "credits": {
                "cast": [{"name": "Alice"}, {"name": "Bob"}],
                "crew": [{"name": "Carol", "job": "Director"}, {"name": "Dave", "job": "Editor"}],
            },
            "alternative_titles": {"titles": [{"title": "Alt Name"}]},
        });
        let fields = TmdbEnrichmentClient::normalize(&payload, TmdbLimits::default());
        assert_eq!(fields["plot"], "A plot.");
        assert_eq!(fields["genre"], "Drama, Action");
        assert_eq!(fields["actors"], "Alice, Bob");
        assert_eq!(fields["directors"], "Carol");
        assert_eq!(fields["aka"], "Alt Name");
        assert_eq!(fields["keywords"], "heist");
    }
}
