//! Search Service
//!
//! Drives the read path: rewrite the query, run the vector search, hydrate
//! the survivors against the catalog, and shape the final page. Mirrors the
//! `/search` endpoint's pipeline; the keyword-only variant (`/search_keyword`)
//! shares the keyword scorer but skips vector search entirely.

use super::dictionaries::SIZE_FIELDS;
use super::keyword_scoring;
use super::query_rewriter::{self, RewrittenQuery};
use mcb_domain::constants::MAX_FETCH_K;
use mcb_domain::error::Result;
use mcb_domain::ports::providers::{CatalogReader, EmbeddingClient, KeywordSearch, VectorStore};
use mcb_domain::value_objects::{ScoredHit, SearchResponse, SearchResult, SizeSort};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-source behavior the search service needs beyond what `CatalogReader`
/// already encapsulates: whether the SQL keyword path is enabled for this
/// source's configured fields.
#[derive(Debug, Clone)]
pub struct SourceSearchConfig {
    /// Source name, as passed to every `CatalogReader` call.
    pub name: String,
    /// Whether `search_by_keyword` should be consulted and merged in.
    pub keyword_search_enabled: bool,
}

/// TMDB-backed query expansion settings (disabled when `None`).
#[derive(Debug, Clone)]
pub struct TmdbExpansionConfig {
    /// Catalog schema key passed to `search_tmdb_expansions`.
    pub schema: String,
    /// Maximum expansion tokens fetched per query.
    pub limit: usize,
}

/// Parameters for a single `/search` call.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Raw user query text.
    pub q: String,
    /// Requested result count (bounded by [`MAX_FETCH_K`]).
    pub topk: usize,
    /// Drop hits classified NSFW.
    pub exclude_nsfw: bool,
    /// Restrict to records with a TMDB reference attached.
    pub tmdb_only: bool,
    /// Minimum size in gigabytes, converted to bytes for the filter.
    pub size_min_gb: Option<f64>,
    /// Optional post-hydration re-sort by size.
    pub size_sort: Option<SizeSort>,
    /// Page size echoed back and used to size the ANN fetch.
    pub page_size: usize,
    /// Pagination offset passed through to the vector store.
    pub cursor: usize,
}

/// Orchestrates the search read path across the query rewriter, vector
/// store, and catalog.
pub struct SearchService {
    catalog: Arc<dyn CatalogReader>,
    embedder: Arc<dyn EmbeddingClient>,
    vector_store: Arc<dyn VectorStore>,
    keyword_search: Option<Arc<dyn KeywordSearch>>,
    tmdb_expansion: Option<TmdbExpansionConfig>,
    sources: Vec<SourceSearchConfig>,
}

impl SearchService {
    /// Construct a search service. `keyword_search` and `tmdb_expansion` are
    /// both optional: omit either when the deployment has no GraphQL
    /// keyword backend or no TMDB-derived expansion configured.
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        embedder: Arc<dyn EmbeddingClient>,
        vector_store: Arc<dyn VectorStore>,
        keyword_search: Option<Arc<dyn KeywordSearch>>,
        tmdb_expansion: Option<TmdbExpansionConfig>,
        sources: Vec<SourceSearchConfig>,
    ) -> Self {
        Self {
            catalog,
            embedder,
            vector_store,
            keyword_search,
            tmdb_expansion,
            sources,
        }
    }

    fn source_cfg(&self, name: &str) -> Option<&SourceSearchConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Run the hybrid semantic + keyword search pipeline and return one
    /// fully paginated page.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let (pre_expansion, extracted_filter) = query_rewriter::extract_filters(&query.q);

        let expansions = self.fetch_expansions(&pre_expansion).await?;
        let rewritten: RewrittenQuery = query_rewriter::finish(
            &query.q,
            &pre_expansion,
            extracted_filter,
            self.embedder.model_version(),
            &expansions,
        );
        let mut filter = rewritten.filter.clone();

        if query.tmdb_only {
            filter.has_tmdb = Some(true);
        }
        if let Some(gb) = query.size_min_gb {
            filter.size_min = Some((gb.max(0.0) * 1024f64.powi(3)) as i64);
        }

        let fetch_k = MAX_FETCH_K.min(query.topk.max(query.page_size)).max(1);
        let vector = self.embedder.embed(&[rewritten.embedding_text.clone()]).await?;
        let query_vector = vector.into_iter().next().unwrap_or_default();

        let hits = self
            .vector_store
            .query(&query_vector, fetch_k, &filter, query.cursor)
            .await?;
        let raw_count = hits.len();

        let mut seen_keys = std::collections::HashSet::new();
        let deduped_hits: Vec<ScoredHit> = hits
            .into_iter()
            .filter(|hit| seen_keys.insert(hit.payload.dedup_key()))
            .filter(|hit| !(query.exclude_nsfw && hit.payload.nsfw))
            .collect();

        let next_cursor = if raw_count == fetch_k {
            Some(query.cursor + raw_count)
        } else {
            None
        };

        let mut by_source: HashMap<String, Vec<ScoredHit>> = HashMap::new();
        for hit in deduped_hits {
            by_source.entry(hit.payload.id.source.clone()).or_default().push(hit);
        }

        let mut results = Vec::new();
        for (source, source_hits) in by_source {
            let ids: Vec<String> = source_hits.iter().map(|h| h.payload.id.pg_id.clone()).collect();
            let mut rows: HashMap<String, (String, Map<String, Value>)> = self
                .catalog
                .fetch_by_ids(&source, &ids)
                .await?
                .into_iter()
                .map(|row| {
                    let fields: Map<String, Value> = row.fields.into_iter().collect();
                    (row.pg_id, (row.title, fields))
                })
                .collect();

            let keyword_enabled = self
                .source_cfg(&source)
                .map(|cfg| cfg.keyword_search_enabled)
                .unwrap_or(false);
            if keyword_enabled && !rewritten.keyword_query.is_empty() {
                let keyword_hits = self
                    .catalog
                    .search_by_keyword(&source, &rewritten.keyword_query, query.page_size * 3)
                    .await?;
                for hit in keyword_hits {
                    rows.entry(hit.pg_id).or_insert_with(|| (hit.title, Map::new()));
                }
            }

            for hit in source_hits {
                let Some((title, metadata)) = rows.get(&hit.payload.id.pg_id) else {
                    continue;
                };
                results.push(SearchResult {
                    score: hit.score,
                    source: source.clone(),
                    pg_id: hit.payload.id.pg_id.clone(),
                    title: title.clone(),
                    nsfw: hit.payload.nsfw,
                    nsfw_score: hit.payload.nsfw_score,
                    metadata: Value::Object(metadata.clone()),
                });
            }
        }

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let mut seen_titles = std::collections::HashSet::new();
        results.retain(|r| seen_titles.insert(r.dedup_title_key()));

        if let Some(size_sort) = query.size_sort {
            sort_by_size(&mut results, size_sort);
        }

        Ok(SearchResponse {
            count: results.len(),
            next_cursor,
            page_size: query.page_size,
            results,
        })
    }

    async fn fetch_expansions(&self, pre_expansion: &str) -> Result<HashMap<String, u32>> {
        let Some(cfg) = self.tmdb_expansion.as_ref() else {
            return Ok(HashMap::new());
        };
        if pre_expansion.is_empty() {
            return Ok(HashMap::new());
        }
        let tokens = self
            .catalog
            .search_tmdb_expansions(&cfg.schema, pre_expansion, cfg.limit)
            .await?;
        Ok(tokens.into_iter().map(|t| (t.token, t.weight as u32)).collect())
    }

    /// Keyword-only search (`/search_keyword`): prefers the configured
    /// GraphQL backend, falling back to each source's SQL keyword path.
    pub async fn search_keyword(
        &self,
        query: &str,
        source_names: &[String],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let mut results = if let Some(backend) = self.keyword_search.as_ref() {
            backend
                .search(query, source_names, limit)
                .await?
                .into_iter()
                .map(|hit| SearchResult {
                    score: keyword_scoring::score(query, &hit.title),
                    source: hit.source,
                    pg_id: hit.pg_id,
                    title: hit.title,
                    nsfw: false,
                    nsfw_score: 0.0,
                    metadata: hit.fields,
                })
                .collect()
        } else {
            let mut collected = Vec::new();
            for source in source_names {
                let hits = self.catalog.search_by_keyword(source, query, limit).await?;
                collected.extend(hits.into_iter().map(|row| SearchResult {
                    score: keyword_scoring::score(query, &row.title),
                    source: source.clone(),
                    pg_id: row.pg_id,
                    title: row.title,
                    nsfw: false,
                    nsfw_score: 0.0,
                    metadata: Value::Object(row.fields.into_iter().collect()),
                }));
            }
            collected
        };

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        let mut seen = std::collections::HashSet::new();
        results.retain(|r| seen.insert(r.dedup_title_key()));
        results.truncate(limit);
        Ok(results)
    }
}

/// Pull a size in bytes out of a result's hydrated metadata by scanning
/// [`SIZE_FIELDS`] in priority order.
fn meta_size(metadata: &Value) -> Option<i64> {
    let obj = metadata.as_object()?;
    for field in SIZE_FIELDS {
        if let Some(value) = obj.get(*field) {
            if let Some(n) = value.as_i64() {
                return Some(n);
            }
            if let Some(s) = value.as_str() {
                if let Ok(n) = s.parse::<i64>() {
                    return Some(n);
                }
            }
        }
    }
    None
}

/// Re-sort by size with missing sizes always last, regardless of direction.
fn sort_by_size(results: &mut [SearchResult], direction: SizeSort) {
    results.sort_by(|a, b| {
        let a_size = meta_size(&a.metadata);
        let b_size = meta_size(&b.metadata);
        let key = |size: Option<i64>, score: f32| -> (u8, i64, std::cmp::Reverse<i64>) {
            match size {
                None => (1, 0, std::cmp::Reverse((-score * 1_000_000.0) as i64)),
                Some(s) => {
                    let signed = match direction {
                        SizeSort::Asc => s,
                        SizeSort::Desc => -s,
                    };
                    (0, signed, std::cmp::Reverse((-score * 1_000_000.0) as i64))
                }
            }
        };
        key(a_size, a.score).cmp(&key(b_size, b.score))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcb_domain::value_objects::RecordId;

    fn result(title: &str, score: f32, size: Option<i64>) -> SearchResult {
        let mut meta = Map::new();
        if let Some(s) = size {
            meta.insert("size".to_string(), Value::from(s));
        }
        SearchResult {
            score,
            source: "movies".to_string(),
            pg_id: title.to_string(),
            title: title.to_string(),
            nsfw: false,
            nsfw_score: 0.0,
            metadata: Value::Object(meta),
        }
    }

    #[test]
    fn size_sort_puts_missing_sizes_last_both_directions() {
        let mut asc = vec![result("a", 1.0, Some(100)), result("b", 0.9, None), result("c", 0.8, Some(50))];
        sort_by_size(&mut asc, SizeSort::Asc);
        assert_eq!(asc[2].title, "b");
        assert_eq!(asc[0].title, "c");

        let mut desc = vec![result("a", 1.0, Some(100)), result("b", 0.9, None), result("c", 0.8, Some(50))];
        sort_by_size(&mut desc, SizeSort::Desc);
        assert_eq!(desc[2].title, "b");
        assert_eq!(desc[0].title, "a");
    }

    #[test]
    fn meta_size_reads_known_fields_in_priority_order() {
        let mut meta = Map::new();
        meta.insert("total_size".to_string(), Value::from(42));
        assert_eq!(meta_size(&Value::Object(meta)), Some(42));
    }

    #[test]
    fn record_id_groups_hits_by_source() {
        let id = RecordId::new("movies", "1");
        assert_eq!(id.source, "movies");
    }
}
