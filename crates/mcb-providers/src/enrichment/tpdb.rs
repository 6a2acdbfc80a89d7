//! TPDB (ThePornDB) GraphQL enrichment client.
//!
//! Unlike TMDB, TPDB has no stable numeric id to look up directly: every
//! reference is resolved by a GraphQL search query, and the best match
//! among the returned candidates is picked by extracted release-code
//! match, then title match, then first result.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

use mcb_domain::error::{Error, Result};
use mcb_domain::ports::providers::enrichment::{EnrichmentClient, EnrichmentQuery, EnrichmentRecord, EnrichmentStatus};

use crate::retry::with_bounded_retry;
use crate::utils::JsonExt;

const DEFAULT_ENDPOINT: &str = "https://theporndb.net/graphql?type=JAV";

fn code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b([A-Z]{2,6})[-_ ]?(\d{2,5})\b").expect("static regex"))
}

fn extract_code(text: &str) -> Option<String> {
    let caps = code_regex().captures(text)?;
    Some(format!("{}-{}", caps[1].to_uppercase(), &caps[2]))
}

fn extract_names(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(_) => item
                    .get("performer")
                    .and_then(|p| p.opt_str("name").or_else(|| p.opt_str("title")))
                    .or_else(|| item.opt_str("name"))
                    .or_else(|| item.opt_str("title"))
                    .or_else(|| item.opt_str("label"))
                    .map(str::to_string),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value
            .get("performer")
            .and_then(|p| p.opt_str("name").or_else(|| p.opt_str("title")))
            .or_else(|| value.opt_str("name"))
            .or_else(|| value.opt_str("title"))
            .or_else(|| value.opt_str("label"))
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn extract_items(payload: &Value, result_path: Option<&str>) -> Vec<Value> {
    let mut data = payload.clone();
    if let Some(path) = result_path {
        for part in path.split('.').filter(|p| !p.is_empty()) {
            data = data.get(part).cloned().unwrap_or(Value::Null);
        }
    }
    match data {
        Value::Array(items) => items.into_iter().filter(Value::is_object).collect(),
        Value::Object(_) => {
            for key in ["items", "results", "scenes", "movies", "javs"] {
                if let Some(Value::Array(items)) = data.get(key) {
                    return items.iter().filter(|v| v.is_object()).cloned().collect();
                }
            }
            vec![data]
        }
        _ => Vec::new(),
    }
}

fn pick_best_item<'a>(items: &'a [Value], code: Option<&str>, title: Option<&str>) -> Option<&'a Value> {
    if let Some(code) = code {
        for item in items {
            let item_code = item
                .opt_str("code")
                .map(str::to_string)
                .or_else(|| item.opt_str("title").and_then(extract_code));
            if item_code.as_deref().map(|c| c.eq_ignore_ascii_case(code)) == Some(true) {
                return Some(item);
            }
        }
    }
    if let Some(title) = title {
        let norm_title = title.trim().to_lowercase();
        for item in items {
            if let Some(item_title) = item.opt_str("title").or_else(|| item.opt_str("name")) {
                if item_title.trim().to_lowercase() == norm_title {
                    return Some(item);
                }
            }
        }
        for item in items {
            if let Some(item_title) = item.opt_str("title").or_else(|| item.opt_str("name")) {
                let norm_item = item_title.trim().to_lowercase();
                if norm_item.contains(&norm_title) || norm_title.contains(&norm_item) {
                    return Some(item);
                }
            }
        }
    }
    items.first()
}

fn normalize_item(item: &Value) -> Value {
    let title = item.opt_str("title").or_else(|| item.opt_str("name")).unwrap_or_default();
    let mut aka = item
        .get("aka")
        .or_else(|| item.get("alternateTitles"))
        .map(extract_names)
        .unwrap_or_default();
    if aka.is_empty() {
        if let Some(code) = item.opt_str("code") {
            aka = code.to_string();
        }
    }
    let actors = item
        .get("performers")
        .or_else(|| item.get("actors"))
        .map(extract_names)
        .unwrap_or_default();
    let tags = item.get("tags").map(extract_names).unwrap_or_default();
    let studio = item.get("studio").map(extract_names).unwrap_or_default();
    let site = item.get("site").map(extract_names).unwrap_or_default();
    let plot = item
        .opt_str("description")
        .or_else(|| item.opt_str("overview"))
        .or_else(|| item.opt_str("plot"))
        .or_else(|| item.opt_str("details"))
        .unwrap_or_default();

    json!({
        "tpdb_id": item.get("id").or_else(|| item.get("uuid")).cloned().unwrap_or(Value::Null),
        "title": title,
        "aka": aka,
        "actors": actors,
        "tags": tags,
        "studio": studio,
        "site": site,
        "plot": plot,
    })
}

/// TPDB GraphQL enrichment client. `query`/`endpoint`/`result_path` are
/// operator-configured since TPDB has no single stable schema across
/// content types.
pub struct TpdbEnrichmentClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    auth_header: String,
    auth_prefix: Option<String>,
    query: String,
    result_path: Option<String>,
}

impl TpdbEnrichmentClient {
    /// `query` is the full GraphQL document to send; `result_path` is a
    /// dotted path into the response body locating the candidate list.
    pub fn new(token: impl Into<String>, query: impl Into<String>, result_path: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: token.into(),
            auth_header: "ApiKey".to_string(),
            auth_prefix: None,
            query: query.into(),
            result_path,
        }
    }

    /// Override the GraphQL endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the auth header name/prefix (e.g. `"Authorization"` / `"Bearer"`).
    pub fn with_auth(mut self, header: impl Into<String>, prefix: Option<String>) -> Self {
        self.auth_header = header.into();
        self.auth_prefix = prefix;
        self
    }
}

#[async_trait]
impl EnrichmentClient for TpdbEnrichmentClient {
    async fn fetch(&self, query: &EnrichmentQuery) -> Result<EnrichmentRecord> {
        let title = query.params.opt_str("title").or_else(|| query.params.opt_str("raw_title"));
        let code = title.and_then(extract_code);
        let variables = json!({
            "term": code.clone().or_else(|| title.map(str::to_string)).unwrap_or_default(),
            "title": title,
            "code": code,
        });

        let auth_value = match &self.auth_prefix {
            Some(prefix) => format!("{prefix} {}", self.token),
            None => self.token.clone(),
        };

        let result: std::result::Result<Value, Error> = with_bounded_retry(|| async {
            let resp = self
                .http
                .post(&self.endpoint)
                .header(self.auth_header.as_str(), auth_value.as_str())
                .json(&json!({"query": self.query, "variables": variables}))
                .send()
                .await
                .map_err(|e| (None, Error::enrichment(format!("request to tpdb failed: {e}"))))?;

            let status = resp.status();
            if !status.is_success() {
                let code = status.as_u16();
                return Err((Some(code), Error::enrichment(format!("tpdb returned {code}"))));
            }
            let body: Value = resp
                .json()
                .await
                .map_err(|e| (None, Error::enrichment(format!("decoding tpdb response: {e}"))))?;
            if body.get("errors").is_some_and(|e| !e.is_null()) {
                return Err((None, Error::enrichment(format!("tpdb graphql errors: {}", body["errors"]))));
            }
            Ok(body)
        })
        .await;

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                return Ok(EnrichmentRecord {
                    status: EnrichmentStatus::Error,
                    fields: Value::Null,
                    raw: Value::Null,
                    message: Some(e.to_string()),
                });
            }
        };

        let items = extract_items(&payload, self.result_path.as_deref());
        let Some(best) = pick_best_item(&items, code.as_deref(), title) else {
            return Ok(EnrichmentRecord {
                status: EnrichmentStatus::NotFound,
                fields: Value::Null,
                raw: payload,
                message: None,
            });
        };

        Ok(EnrichmentRecord {
            status: EnrichmentStatus::Ok,
            fields: normalize_item(best),
            raw: best.clone(),
            message: None,
        })
    }

    fn name(&self) -> &str {
        "tpdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_code_matches_common_jav_formats() {
        assert_eq!(extract_code("ABC-123 Some Title"), Some("ABC-123".to_string()));
        assert_eq!(extract_code("no code here"), None);
    }

    #[test]
    fn pick_best_item_prefers_code_match() {
        let items = vec![json!({"code": "XYZ-001", "title": "A"}), json!({"code": "ABC-123", "title": "B"})];
        let picked = pick_best_item(&items, Some("ABC-123"), None).unwrap();
        assert_eq!(picked["title"], "B");
    }

    #[test]
    fn pick_best_item_falls_back_to_first() {
        let items = vec![json!({"title": "Only"})];
        let picked = pick_best_item(&items, None, None).unwrap();
        assert_eq!(picked["title"], "Only");
    }

    #[test]
    fn normalize_item_flattens_performer_names() {
        let item = json!({
            "title": "Scene",
            "performers": [{"performer": {"name": "Jane"}}, {"name": "Doe"}],
        });
        let fields = normalize_item(&item);
        assert_eq!(fields["actors"], "Jane, Doe");
    }
}
