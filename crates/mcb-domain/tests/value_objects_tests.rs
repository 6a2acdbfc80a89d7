use mcb_domain::value_objects::{FileType, MetadataFilter, RecordId, VectorPayload};
use std::collections::BTreeSet;

fn payload(source: &str, pg_id: &str, file_type: FileType, audio: &[&str]) -> VectorPayload {
    VectorPayload {
        id: RecordId::new(source, pg_id),
        text_hash: format!("hash-{pg_id}"),
        embedding_version: "v1".into(),
        nsfw: false,
        nsfw_score: 0.1,
        has_tmdb: false,
        tmdb_id: None,
        has_tpdb: false,
        tpdb_id: None,
        genre_tags: BTreeSet::new(),
        file_type,
        audio_langs: audio.iter().map(|s| s.to_string()).collect(),
        subtitle_langs: BTreeSet::new(),
        size: Some(1_000_000),
        title: format!("Title {pg_id}"),
    }
}

#[test]
fn filter_honoring_scenario() {
    let video_zh = payload("movies", "1", FileType::Video, &["zh"]);
    let audio_only = payload("movies", "2", FileType::Audio, &[]);
    let video_en = payload("movies", "3", FileType::Video, &["en"]);

    let mut filter = MetadataFilter::default();
    filter.file_type = Some(FileType::Video);
    filter.audio_langs.insert("zh".into());

    let survivors: Vec<_> = [&video_zh, &audio_only, &video_en]
        .into_iter()
        .filter(|p| filter.matches(p))
        .collect();

    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].id.pg_id, "1");
}

#[test]
fn vector_id_is_stable_across_reinsertion() {
    let first = RecordId::new("movies", "7");
    let second = RecordId::new("movies", "7");
    assert_eq!(first.vector_id(), second.vector_id());
}
