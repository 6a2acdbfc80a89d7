//! Query Rewriter
//!
//! Turns a raw user query into the text handed to the embedder, a
//! [`MetadataFilter`] derived from the prose, and a cleaned query retained
//! for keyword search. Pure logic — no catalog or embedding I/O; callers
//! supply catalog-derived expansion tokens separately (see
//! [`RewrittenQuery::expand_with`]).

use super::dictionaries::{
    BGE_QUERY_PREFIX, FILE_TYPE_PHRASES, STRUCTURAL_FILLER_WORDS, SUBTITLE_MARKER_TOKENS,
    SYNONYM_EXPANSIONS,
};
use super::text_normalizer::{detect_genres, detect_languages, normalize_title_text};
use mcb_domain::value_objects::{FileType, MetadataFilter};
use std::collections::HashMap;
use std::str::FromStr;

/// Output of rewriting a raw search query.
#[derive(Debug, Clone)]
pub struct RewrittenQuery {
    /// Text to pass to the embedder, after expansion and normalization.
    pub embedding_text: String,
    /// Filter derived from file-type/language/genre phrases found in the query.
    pub filter: MetadataFilter,
    /// The query with structural phrases stripped but otherwise unexpanded,
    /// retained for the SQL/GraphQL keyword search path.
    pub keyword_query: String,
}

/// Extract a `MetadataFilter` from prose and return the query with only the
/// matched file-type phrase removed (mirrors `extract_query_filters`: the
/// basis for both the embedding-side expansion and, after a further strip
/// pass, the keyword query).
///
/// Exposed separately from [`rewrite`] so callers that need catalog-derived
/// expansion tokens (see [`finish`]) can fetch them using the cleaned query
/// before running expansion.
pub fn extract_filters(query: &str) -> (String, MetadataFilter) {
    let mut filter = MetadataFilter::default();

    // Longest matching file-type phrase wins; remove its first occurrence.
    let mut remaining = query.to_string();
    if let Some(&(phrase, file_type)) = FILE_TYPE_PHRASES
        .iter()
        .filter(|(p, _)| query.contains(p))
        .max_by_key(|(p, _)| p.chars().count())
    {
        filter.file_type = FileType::from_str(file_type).ok();
        remaining = remaining.replacen(phrase, "", 1);
    }

    let languages = detect_languages(&remaining);
    filter.audio_langs = languages.audio;
    filter.subtitle_langs = languages.subtitle;
    filter.genres = detect_genres(&remaining).into_iter().collect();

    let trimmed = remaining.trim();
    let cleaned = if trimmed.is_empty() {
        query.trim().to_string()
    } else {
        trimmed.to_string()
    };
    (cleaned, filter)
}

/// Strip subtitle-marker tokens and generic media-type filler words
/// ("电影", "中字") for the keyword-search path, supplementing the
/// reference: a keyword query still carrying pure classification noise
/// ranks worse than one with just the distinctive content terms. Genre
/// words are kept — they are still useful title content, not noise.
fn strip_keyword_noise(text: &str, original: &str) -> String {
    let mut cleaned = text.to_string();
    for marker in SUBTITLE_MARKER_TOKENS {
        cleaned = cleaned.replace(marker, " ");
    }
    for filler in STRUCTURAL_FILLER_WORDS {
        cleaned = cleaned.replace(filler, " ");
    }
    let cleaned: String = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        original.trim().to_string()
    } else {
        cleaned
    }
}

/// Append fixed synonym expansions for recognized domain words, then merge
/// catalog-derived `extra_terms` (token -> weight in `1..=3`, duplicated that
/// many times to bias the embedding toward catalog-observed vocabulary).
/// Order-preserving dedup, matching the reference's token-list semantics.
fn expand(query: &str, extra_terms: &HashMap<String, u32>) -> String {
    if query.is_empty() {
        return query.to_string();
    }
    let mut tokens = vec![query.to_string()];
    for &(needle, extras) in SYNONYM_EXPANSIONS {
        if query.contains(needle) {
            tokens.extend(extras.iter().map(|s| (*s).to_string()));
        }
    }
    for (term, weight) in extra_terms {
        let count = (*weight).clamp(1, 3);
        for _ in 0..count {
            tokens.push(term.clone());
        }
    }

    let mut seen = std::collections::HashSet::new();
    tokens.retain(|t| seen.insert(t.clone()));
    tokens.join(" ")
}

/// Run the full rewrite pipeline. `model_version` selects the BGE retrieval
/// prefix when the configured embedding model is BGE-family.
pub fn rewrite(query: &str, model_version: &str) -> RewrittenQuery {
    rewrite_with_expansions(query, model_version, &HashMap::new())
}

/// Same as [`rewrite`], but also merges catalog-derived expansion tokens
/// (e.g. matched `aka`/`keywords` from TMDB enrichment) gathered by the
/// caller before expansion.
pub fn rewrite_with_expansions(
    query: &str,
    model_version: &str,
    catalog_expansions: &HashMap<String, u32>,
) -> RewrittenQuery {
    let (pre_expansion, filter) = extract_filters(query);
    finish(query, &pre_expansion, filter, model_version, catalog_expansions)
}

/// Second phase of the rewrite pipeline, split out from [`rewrite_with_expansions`]
/// so a caller can run catalog-backed expansion lookup (e.g.
/// `CatalogReader::search_tmdb_expansions`) against `pre_expansion` between
/// calling [`extract_filters`] and calling this function.
pub fn finish(
    original_query: &str,
    pre_expansion: &str,
    filter: MetadataFilter,
    model_version: &str,
    catalog_expansions: &HashMap<String, u32>,
) -> RewrittenQuery {
    let expanded = expand(pre_expansion, catalog_expansions);
    let normalized = normalize_title_text(&expanded);
    let final_text = if normalized.is_empty() {
        expanded
    } else {
        normalized
    };

    let embedding_text = if model_version.to_lowercase().contains("bge") {
        format!("{BGE_QUERY_PREFIX}{final_text}")
    } else {
        final_text
    };

    RewrittenQuery {
        embedding_text,
        filter,
        keyword_query: strip_keyword_noise(pre_expansion, original_query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_extracts_file_type_language_and_genre() {
        let rewritten = rewrite("恐怖 电影 视频 中字", "bge-m3");
        assert_eq!(rewritten.filter.file_type, Some(FileType::Video));
        assert!(rewritten.filter.subtitle_langs.contains("zh"));
        assert!(rewritten.filter.genres.contains("恐怖"));
        assert!(rewritten.filter.genres.contains("Horror"));
        assert_eq!(rewritten.keyword_query, "恐怖");
        assert!(rewritten.embedding_text.starts_with(BGE_QUERY_PREFIX));
    }

    #[test]
    fn catalog_expansions_duplicate_by_weight() {
        let mut extra = HashMap::new();
        extra.insert("Xenomorph".to_string(), 3);
        let rewritten = rewrite_with_expansions("alien", "text-embedding-3", &extra);
        assert_eq!(
            rewritten.embedding_text.matches("Xenomorph").count(),
            3
        );
    }

    #[test]
    fn non_bge_model_gets_no_prefix() {
        let rewritten = rewrite("电影", "text-embedding-3");
        assert!(!rewritten.embedding_text.starts_with(BGE_QUERY_PREFIX));
    }
}
