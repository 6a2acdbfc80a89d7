//! Search-related value objects: filters, raw hits, hydrated results.

use crate::value_objects::payload::{FileType, VectorPayload};
use crate::value_objects::record::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Conjunctive filter applied to a vector-store query. All populated fields
/// must hold for a hit to survive; an empty filter matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// Restrict to records with a TMDB reference attached.
    pub has_tmdb: Option<bool>,
    /// Restrict to records tagged with any of these genres.
    pub genres: BTreeSet<String>,
    /// Restrict to a single file type.
    pub file_type: Option<FileType>,
    /// Restrict to records carrying any of these audio languages.
    pub audio_langs: BTreeSet<String>,
    /// Restrict to records carrying any of these subtitle languages.
    pub subtitle_langs: BTreeSet<String>,
    /// Restrict to records at or above this size in bytes.
    pub size_min: Option<i64>,
}

impl MetadataFilter {
    /// True when the filter has no active conjuncts.
    pub fn is_empty(&self) -> bool {
        self.has_tmdb.is_none()
            && self.genres.is_empty()
            && self.file_type.is_none()
            && self.audio_langs.is_empty()
            && self.subtitle_langs.is_empty()
            && self.size_min.is_none()
    }

    /// Evaluate the filter against a payload. Used by backends that cannot
    /// push filtering down to the store itself, and by tests.
    pub fn matches(&self, payload: &VectorPayload) -> bool {
        if let Some(want) = self.has_tmdb {
            if payload.has_tmdb != want {
                return false;
            }
        }
        if !self.genres.is_empty() && self.genres.is_disjoint(&payload.genre_tags) {
            return false;
        }
        if let Some(ft) = self.file_type {
            if payload.file_type != ft {
                return false;
            }
        }
        if !self.audio_langs.is_empty() && self.audio_langs.is_disjoint(&payload.audio_langs) {
            return false;
        }
        if !self.subtitle_langs.is_empty()
            && self.subtitle_langs.is_disjoint(&payload.subtitle_langs)
        {
            return false;
        }
        if let Some(min) = self.size_min {
            match payload.size {
                Some(size) if size >= min => {}
                _ => return false,
            }
        }
        true
    }
}

/// A single raw hit returned by a vector store query, before catalog hydration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredHit {
    /// Similarity score; larger is better regardless of underlying metric.
    pub score: f32,
    /// Payload attached to the matched vector.
    pub payload: VectorPayload,
}

/// Requested direction for size-based re-sorting of search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeSort {
    /// Smallest known size first; unknown sizes last.
    Asc,
    /// Largest known size first; unknown sizes last.
    Desc,
}

/// A hydrated, display-ready search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Final rank score.
    pub score: f32,
    /// Source tag the record came from.
    pub source: String,
    /// Catalog primary key as text.
    pub pg_id: String,
    /// Display title.
    pub title: String,
    /// NSFW flag.
    pub nsfw: bool,
    /// NSFW score.
    pub nsfw_score: f32,
    /// Free-form hydrated catalog fields (joined side tables, size, etc.).
    pub metadata: Value,
}

impl SearchResult {
    /// Identity used for cross-request pagination and logging.
    pub fn record_id(&self) -> RecordId {
        RecordId::new(self.source.clone(), self.pg_id.clone())
    }

    /// Normalized title used as the final-stage dedup key: lowercase, trimmed,
    /// falling back to the record's composite key when the title is empty.
    pub fn dedup_title_key(&self) -> String {
        let normalized = self.title.trim().to_lowercase();
        if normalized.is_empty() {
            self.record_id().composite_key()
        } else {
            normalized
        }
    }
}

/// Paginated response envelope returned by the search endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Number of results in this page.
    pub count: usize,
    /// Offset to pass as `cursor` for the next page; `None` at the end.
    pub next_cursor: Option<usize>,
    /// Page size that was honored.
    pub page_size: usize,
    /// The results themselves, already sorted and deduped.
    pub results: Vec<SearchResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(file_type: FileType, genres: &[&str], audio: &[&str]) -> VectorPayload {
        VectorPayload {
            id: RecordId::new("movies", "1"),
            text_hash: "h".into(),
            embedding_version: "v1".into(),
            nsfw: false,
            nsfw_score: 0.0,
            has_tmdb: true,
            tmdb_id: Some(1),
            has_tpdb: false,
            tpdb_id: None,
            genre_tags: genres.iter().map(|s| s.to_string()).collect(),
            file_type,
            audio_langs: audio.iter().map(|s| s.to_string()).collect(),
            subtitle_langs: BTreeSet::new(),
            size: Some(100),
            title: "T".into(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let f = MetadataFilter::default();
        assert!(f.is_empty());
        assert!(f.matches(&payload(FileType::Video, &[], &[])));
    }

    #[test]
    fn filter_honors_file_type_and_audio_lang() {
        let mut f = MetadataFilter::default();
        f.file_type = Some(FileType::Video);
        f.audio_langs.insert("zh".into());
        assert!(!f.matches(&payload(FileType::Audio, &[], &["zh"])));
        assert!(!f.matches(&payload(FileType::Video, &[], &["en"])));
        assert!(f.matches(&payload(FileType::Video, &[], &["zh"])));
    }

    #[test]
    fn dedup_title_key_falls_back_to_composite_key() {
        let result = SearchResult {
            score: 1.0,
            source: "movies".into(),
            pg_id: "1".into(),
            title: "   ".into(),
            nsfw: false,
            nsfw_score: 0.0,
            metadata: Value::Null,
        };
        assert_eq!(result.dedup_title_key(), "movies:1");
    }
}
