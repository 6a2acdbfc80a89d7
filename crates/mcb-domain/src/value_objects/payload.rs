//! Value Object: VectorPayload
//!
//! The non-embedding metadata stored alongside every vector. This is the
//! unit the vector store filters on and the unit the search service
//! reconstructs a [`super::SearchResult`] from.

use crate::value_objects::record::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Coarse file-type classification derived from a record's file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// Video container/codec extensions (mp4, mkv, avi, ...)
    Video,
    /// Audio extensions (mp3, flac, aac, ...)
    Audio,
    /// Still-image extensions (jpg, png, webp, ...)
    Image,
    /// Subtitle extensions (srt, ass, vtt, ...)
    Subtitle,
    /// Archive extensions (zip, rar, 7z, ...)
    Archive,
    /// Anything not recognized above.
    #[default]
    Other,
}

impl FileType {
    /// Parse from a file extension (without the leading dot), case-insensitive.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "mkv" | "avi" | "mov" | "wmv" | "flv" | "webm" | "m4v" | "ts" | "mpg"
            | "mpeg" => Self::Video,
            "mp3" | "flac" | "aac" | "wav" | "ogg" | "m4a" | "wma" | "opus" => Self::Audio,
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "tiff" => Self::Image,
            "srt" | "ass" | "ssa" | "vtt" | "sub" | "idx" => Self::Subtitle,
            "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" => Self::Archive,
            _ => Self::Other,
        }
    }

    /// Wire representation used in filters and payload serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Subtitle => "subtitle",
            Self::Archive => "archive",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for FileType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "video" => Self::Video,
            "audio" => Self::Audio,
            "image" => Self::Image,
            "subtitle" => Self::Subtitle,
            "archive" => Self::Archive,
            _ => Self::Other,
        })
    }
}

/// Metadata attached to every vector in the index.
///
/// ## Business Rules
/// - `nsfw` is derived, never set directly by callers: `nsfw_score >= threshold`.
/// - `text_hash` drives change detection and raw-hit dedup; it must always be
///   `md5(indexed_text)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPayload {
    /// Stable catalog identity.
    pub id: RecordId,
    /// md5 hex digest of the text that was embedded.
    pub text_hash: String,
    /// Tag of the embedding model version that produced the vector.
    pub embedding_version: String,
    /// Whether the record is tagged not-safe-for-work.
    pub nsfw: bool,
    /// Raw NSFW classifier score in `[0, 1]`.
    pub nsfw_score: f32,
    /// Whether a TMDB reference is attached.
    pub has_tmdb: bool,
    /// TMDB numeric id, when present.
    pub tmdb_id: Option<i64>,
    /// Whether a TPDB reference is attached.
    pub has_tpdb: bool,
    /// TPDB identifier, when present.
    pub tpdb_id: Option<String>,
    /// Canonicalized genre tags (Chinese and English forms both included).
    pub genre_tags: BTreeSet<String>,
    /// Coarse file-type classification.
    pub file_type: FileType,
    /// Audio language codes present in the record.
    pub audio_langs: BTreeSet<String>,
    /// Subtitle language codes present in the record.
    pub subtitle_langs: BTreeSet<String>,
    /// Size in bytes, when known.
    pub size: Option<i64>,
    /// Human-readable title, used for display and de-duplication.
    pub title: String,
}

impl VectorPayload {
    /// Recompute the derived `nsfw` flag from `nsfw_score` against a threshold.
    pub fn apply_nsfw_threshold(&mut self, threshold: f32) {
        self.nsfw = self.nsfw_score >= threshold;
    }

    /// Dedup key used to collapse raw ANN hits before hydration: prefers the
    /// content hash and falls back to the record's composite key.
    pub fn dedup_key(&self) -> String {
        if self.text_hash.is_empty() {
            self.id.composite_key()
        } else {
            self.text_hash.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_type_from_extension_is_case_insensitive() {
        assert_eq!(FileType::from_extension("MKV"), FileType::Video);
        assert_eq!(FileType::from_extension("Srt"), FileType::Subtitle);
        assert_eq!(FileType::from_extension("xyz"), FileType::Other);
    }

    #[test]
    fn nsfw_threshold_is_derived_not_stored_directly() {
        let mut payload = VectorPayload {
            id: RecordId::new("movies", "1"),
            text_hash: "abc".into(),
            embedding_version: "v1".into(),
            nsfw: false,
            nsfw_score: 0.8,
            has_tmdb: false,
            tmdb_id: None,
            has_tpdb: false,
            tpdb_id: None,
            genre_tags: BTreeSet::new(),
            file_type: FileType::Video,
            audio_langs: BTreeSet::new(),
            subtitle_langs: BTreeSet::new(),
            size: None,
            title: "Example".into(),
        };
        payload.apply_nsfw_threshold(0.7);
        assert!(payload.nsfw);
        payload.apply_nsfw_threshold(0.9);
        assert!(!payload.nsfw);
    }
}
