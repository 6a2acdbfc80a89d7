//! Bitmagnet GraphQL keyword search.
//!
//! `POST {endpoint}` with a `SearchTorrents` query. HTTP 422 (GraphQL
//! validation failure) is treated as a schema mismatch rather than a
//! transient failure: this adapter tries each entry of [`QUERY_VARIANTS`]
//! in turn and only gives up once every variant has failed, so upstream
//! schema drift (a renamed or removed field) doesn't take the keyword
//! search path down entirely. {502, 503, 504} are retried within each
//! variant attempt via [`with_bounded_retry`].

use async_trait::async_trait;
use serde_json::{json, Value};

use mcb_domain::error::{Error, Result};
use mcb_domain::ports::providers::keyword_search::{KeywordHit, KeywordSearch};

use crate::retry::with_bounded_retry;
use crate::utils::JsonExt;

/// Query shapes tried in order against the bitmagnet GraphQL endpoint.
/// Newest/richest first; each older variant drops fields that have been
/// seen to disappear across bitmagnet schema versions.
const QUERY_VARIANTS: &[&str] = &[
    r#"query SearchTorrents($query: String!, $limit: Int!) {
  torrents(query: { queryString: $query }, limit: $limit) {
    totalCount
    edges {
      node {
        infoHash
        name
        size
        filesCount
        seeders
        leechers
        publishedAt
        content {
          type
          title
          releaseYear
          collections { name type }
          attributes { key value }
        }
      }
    }
  }
}"#,
    r#"query SearchTorrents($query: String!, $limit: Int!) {
  torrents(query: { queryString: $query }, limit: $limit) {
    totalCount
    edges {
      node {
        infoHash
        name
        size
        seeders
        leechers
        content { type title releaseYear }
      }
    }
  }
}"#,
];

/// Bitmagnet GraphQL-backed [`KeywordSearch`].
pub struct BitmagnetKeywordSearch {
    http: reqwest::Client,
    endpoint: String,
}

impl BitmagnetKeywordSearch {
    /// `endpoint` is the full GraphQL URL (e.g. `http://bitmagnet:3333/graphql`).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), endpoint: endpoint.into() }
    }

    async fn run_variant(&self, variant: &str, query: &str, limit: usize) -> Result<Value> {
        with_bounded_retry(|| async {
            let resp = self
                .http
                .post(&self.endpoint)
                .json(&json!({
                    "query": variant,
                    "variables": {"query": query, "limit": limit},
                }))
                .send()
                .await
                .map_err(|e| (None, Error::network(format!("request to bitmagnet failed: {e}"))))?;

            let status = resp.status();
            if status.as_u16() == 422 {
                return Err((None, Error::network("bitmagnet rejected query (422, schema mismatch)")));
            }
            if !status.is_success() {
                let code = status.as_u16();
                return Err((Some(code), Error::network(format!("bitmagnet returned {code}"))));
            }
            let body: Value = resp
                .json()
                .await
                .map_err(|e| (None, Error::network(format!("decoding bitmagnet response: {e}"))))?;
            if let Some(errors) = body.get("errors") {
                if !errors.is_null() {
                    return Err((None, Error::network(format!("bitmagnet graphql errors: {errors}"))));
                }
            }
            Ok(body)
        })
        .await
    }
}

#[async_trait]
impl KeywordSearch for BitmagnetKeywordSearch {
    async fn search(&self, query: &str, sources: &[String], limit: usize) -> Result<Vec<KeywordHit>> {
        let mut last_err = None;
        for variant in QUERY_VARIANTS {
            match self.run_variant(variant, query, limit).await {
                Ok(body) => return Ok(extract_hits(&body, sources)),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| Error::network("bitmagnet keyword search: no query variants configured")))
    }
}

fn extract_hits(body: &Value, sources: &[String]) -> Vec<KeywordHit> {
    let edges = body
        .pointer("/data/torrents/edges")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    edges
        .into_iter()
        .filter_map(|edge| {
            let node = edge.get("node")?.clone();
            let info_hash = node.opt_str("infoHash")?.to_string();
            let content_type = node.get("content").and_then(|c| c.opt_str("type"));
            let source = match content_type {
                Some(t) if sources.iter().any(|s| s == t) => t.to_string(),
                Some(t) => t.to_string(),
                None => sources.first().cloned().unwrap_or_default(),
            };
            let title = node
                .get("content")
                .and_then(|c| c.opt_str("title"))
                .or_else(|| node.opt_str("name"))
                .unwrap_or_default()
                .to_string();
            Some(KeywordHit { source, pg_id: info_hash, title, fields: node })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_hits_reads_nested_edges() {
        let body = json!({
            "data": {
                "torrents": {
                    "totalCount": 1,
                    "edges": [{
                        "node": {
                            "infoHash": "abc123",
                            "name": "Fallback Name",
                            "content": {"type": "movie", "title": "Real Title"}
                        }
                    }]
                }
            }
        });
        let hits = extract_hits(&body, &["movie".to_string()]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].pg_id, "abc123");
        assert_eq!(hits[0].title, "Real Title");
        assert_eq!(hits[0].source, "movie");
    }

    #[test]
    fn extract_hits_handles_missing_edges() {
        let body = json!({"data": {"torrents": {"totalCount": 0}}});
        assert!(extract_hits(&body, &[]).is_empty());
    }
}
