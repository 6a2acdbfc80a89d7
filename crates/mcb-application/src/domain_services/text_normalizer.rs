//! Text Normalizer & Feature Extractor
//!
//! Pure, dependency-free text processing shared by the sync-side feature
//! extractor (deriving tags from raw catalog text) and the query rewriter
//! (cleaning a user query before embedding). No I/O, no config.

use super::dictionaries::{LANGUAGE_KEYWORDS, RELEASE_NOISE_TOKENS, SIZE_FIELDS, SUBTITLE_MARKER_TOKENS};
use mcb_domain::value_objects::FileType;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static BRACKET_PUNCT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\[\]{}()._-]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static NOISE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = RELEASE_NOISE_TOKENS.join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).unwrap()
});

/// Detected languages for a piece of text, split by audio vs. subtitle track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectedLanguages {
    /// Audio track language codes.
    pub audio: BTreeSet<String>,
    /// Subtitle track language codes.
    pub subtitle: BTreeSet<String>,
}

/// Replace release-noise punctuation and jargon with spaces, collapse
/// whitespace. Safe to call on already-normalized text (idempotent).
pub fn normalize_title_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let cleaned = BRACKET_PUNCT.replace_all(text, " ");
    let cleaned = NOISE_PATTERN.replace_all(&cleaned, " ");
    WHITESPACE.replace_all(cleaned.trim(), " ").into_owned()
}

/// Derive a coarse file type from the last extension found in raw text
/// (e.g. a filename or a release title ending in `.mkv`).
pub fn detect_file_type(raw_text: &str) -> FileType {
    raw_text
        .rsplit('.')
        .next()
        .filter(|ext| *ext != raw_text)
        .map(FileType::from_extension)
        .unwrap_or_default()
}

/// Scan `text` against the multilingual keyword dictionary, splitting hits
/// into audio vs. subtitle language sets. When any subtitle-marker token is
/// present, every detected language lands in `subtitle` only; otherwise it
/// lands in both `audio` and `subtitle` (matching the reference behavior,
/// where an unqualified language mention implies both tracks carry it).
pub fn detect_languages(text: &str) -> DetectedLanguages {
    if text.is_empty() {
        return DetectedLanguages::default();
    }
    let lower = text.to_lowercase();
    let is_subtitle = SUBTITLE_MARKER_TOKENS.iter().any(|k| lower.contains(k));

    let mut out = DetectedLanguages::default();
    for &(code, keywords) in LANGUAGE_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(&k.to_lowercase())) {
            if is_subtitle {
                out.subtitle.insert(code.to_string());
            } else {
                out.audio.insert(code.to_string());
                out.subtitle.insert(code.to_string());
            }
        }
    }
    out
}

/// Scan `text` for Chinese genre keywords, returning both Chinese and
/// English canonical tags for every hit, in dictionary order, deduplicated.
pub fn detect_genres(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut tags = Vec::new();
    for &(needle, zh, en) in super::dictionaries::GENRE_WORDS {
        if text.contains(needle) {
            for tag in [zh, en] {
                if seen.insert(tag.to_string()) {
                    tags.push(tag.to_string());
                }
            }
        }
    }
    tags
}

/// First positive numeric value found among the known size-field keys of a
/// loosely-typed metadata map (as surfaced by catalog hydration or a
/// vector payload reconstructed from JSON).
pub fn extract_size(fields: &serde_json::Map<String, serde_json::Value>) -> Option<i64> {
    for key in SIZE_FIELDS {
        let Some(value) = fields.get(*key) else {
            continue;
        };
        let num = match value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        };
        if let Some(n) = num {
            if n > 0.0 {
                return Some(n as i64);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_release_noise_and_punctuation() {
        let out = normalize_title_text("Alien.1979.1080p.BluRay.x264-GROUP");
        assert_eq!(out, "Alien 1979 GROUP");
    }

    #[test]
    fn detect_languages_splits_subtitle_from_audio() {
        let subtitle_only = detect_languages("电影 中字 国语");
        assert!(subtitle_only.audio.is_empty());
        assert!(subtitle_only.subtitle.contains("zh"));

        let both = detect_languages("国语配音 高清");
        assert!(both.audio.contains("zh"));
        assert!(both.subtitle.contains("zh"));
    }

    #[test]
    fn detect_genres_returns_zh_and_en_tags() {
        let tags = detect_genres("恐怖 电影");
        assert_eq!(tags, vec!["恐怖".to_string(), "Horror".to_string()]);
    }

    #[test]
    fn extract_size_skips_non_positive_and_unparseable_fields() {
        let mut fields = serde_json::Map::new();
        fields.insert("size".into(), serde_json::json!(-1));
        fields.insert("total_size".into(), serde_json::json!("not-a-number"));
        fields.insert("torrent_size".into(), serde_json::json!(4096));
        assert_eq!(extract_size(&fields), Some(4096));
    }
}
