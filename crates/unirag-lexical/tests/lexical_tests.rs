use std::fs;

use tempfile::TempDir;

use unirag_core::error::RetrievalError;
use unirag_core::traits::Retriever;
use unirag_core::types::{Document, Meta};
use unirag_lexical::LexicalIndexManager;

fn campus_corpus() -> Vec<Document> {
    let mut fees_meta = Meta::new();
    fees_meta.insert("source".to_string(), "https://example.edu/tuition".to_string());
    fees_meta.insert("school".to_string(), "sict".to_string());
    vec![
        Document::with_metadata("Tuition fee is 10 million VND for Computer Science", fees_meta),
        Document::new("Exam schedule is published each semester"),
        Document::new("The library opens at 8am on weekdays"),
    ]
}

#[test]
fn exact_lexical_matches_rank_first() {
    let tmp = TempDir::new().expect("tempdir");
    let manager = LexicalIndexManager::new(tmp.path().join("idx"));
    let retriever = manager.load_or_build(&campus_corpus(), false).expect("build");

    let results = retriever.search("tuition fee computer science", 10).expect("search");
    assert!(!results.is_empty());
    assert!(
        results[0].content.starts_with("Tuition fee"),
        "highest term overlap must rank first, got: {}",
        results[0].content
    );
}

#[test]
fn metadata_survives_the_index_round_trip() {
    let tmp = TempDir::new().expect("tempdir");
    let manager = LexicalIndexManager::new(tmp.path().join("idx"));
    let retriever = manager.load_or_build(&campus_corpus(), false).expect("build");

    let results = retriever.search("tuition fee", 5).expect("search");
    let hit = &results[0];
    assert_eq!(hit.metadata.get("school").map(String::as_str), Some("sict"));
    assert_eq!(
        hit.metadata.get("source").map(String::as_str),
        Some("https://example.edu/tuition")
    );
}

#[test]
fn persisted_index_reload_matches_fresh_build() {
    let tmp = TempDir::new().expect("tempdir");
    let index_path = tmp.path().join("idx");
    let corpus = campus_corpus();

    let fresh = LexicalIndexManager::new(&index_path)
        .load_or_build(&corpus, false)
        .expect("fresh build");
    let fresh_results = fresh.search("exam schedule", 10).expect("search fresh");

    // Reuse path: no documents supplied, the persisted artifact must carry it.
    let reloaded = LexicalIndexManager::new(&index_path)
        .load_or_build(&[], false)
        .expect("reload");
    let reloaded_results = reloaded.search("exam schedule", 10).expect("search reloaded");

    assert_eq!(fresh_results, reloaded_results);
}

#[test]
fn missing_corpus_without_persisted_index_is_a_configuration_error() {
    let tmp = TempDir::new().expect("tempdir");
    let manager = LexicalIndexManager::new(tmp.path().join("idx"));

    let err = manager.load_or_build(&[], false).err().expect("must fail");
    assert!(matches!(err, RetrievalError::Configuration(_)), "got: {err}");
}

#[test]
fn corrupted_index_falls_back_to_rebuild() {
    let tmp = TempDir::new().expect("tempdir");
    let index_path = tmp.path().join("idx");
    fs::create_dir_all(&index_path).expect("mkdir");
    fs::write(index_path.join("meta.json"), "not a tantivy index").expect("corrupt");

    let manager = LexicalIndexManager::new(&index_path);
    let retriever = manager
        .load_or_build(&campus_corpus(), false)
        .expect("rebuild instead of raising");
    let results = retriever.search("library", 5).expect("search");
    assert_eq!(results.len(), 1);
}

#[test]
fn force_rebuild_ignores_the_persisted_index() {
    let tmp = TempDir::new().expect("tempdir");
    let index_path = tmp.path().join("idx");
    let manager = LexicalIndexManager::new(&index_path);
    manager.load_or_build(&campus_corpus(), false).expect("initial build");

    // Rebuild from a different snapshot; the old artifact must not win.
    let replacement = vec![Document::new("Dormitory registration closes in August")];
    let retriever = manager.load_or_build(&replacement, true).expect("forced rebuild");
    let results = retriever.search("dormitory registration", 5).expect("search");
    assert_eq!(results.len(), 1);
    assert!(retriever.search("tuition", 5).expect("search").is_empty());
}

#[test]
fn uncommitted_index_remnant_triggers_rebuild() {
    let tmp = TempDir::new().expect("tempdir");
    let index_path = tmp.path().join("idx");
    fs::create_dir_all(&index_path).expect("mkdir");
    // A crash between index creation and commit leaves a structurally
    // valid directory with zero committed documents.
    tantivy::Index::create_in_dir(&index_path, unirag_lexical::tantivy_utils::build_schema())
        .expect("remnant");

    let manager = LexicalIndexManager::new(&index_path);
    let retriever = manager
        .load_or_build(&campus_corpus(), false)
        .expect("rebuild instead of serving the remnant");
    let results = retriever.search("tuition fee", 10).expect("search");
    assert!(!results.is_empty(), "remnant must be replaced, not served empty");
}

#[test]
fn uncommitted_index_remnant_is_not_served_without_a_snapshot() {
    let tmp = TempDir::new().expect("tempdir");
    let index_path = tmp.path().join("idx");
    fs::create_dir_all(&index_path).expect("mkdir");
    tantivy::Index::create_in_dir(&index_path, unirag_lexical::tantivy_utils::build_schema())
        .expect("remnant");

    let manager = LexicalIndexManager::new(&index_path);
    let err = manager.load_or_build(&[], false).err().expect("must fail");
    assert!(matches!(err, RetrievalError::Configuration(_)), "got: {err}");
}

#[test]
fn failed_rebuild_keeps_the_previous_index() {
    let tmp = TempDir::new().expect("tempdir");
    let index_path = tmp.path().join("idx");
    let manager = LexicalIndexManager::new(&index_path);
    manager.load_or_build(&campus_corpus(), false).expect("initial build");

    // A rebuild that never gets off the ground must not destroy the
    // artifact already on disk.
    let err = manager.load_or_build(&[], true).err().expect("must fail");
    assert!(matches!(err, RetrievalError::Configuration(_)), "got: {err}");

    let retriever = manager.load_or_build(&[], false).expect("previous index still loads");
    assert!(!retriever.search("tuition fee", 10).expect("search").is_empty());
}

#[test]
fn unwritable_index_path_degrades_to_in_memory() {
    let tmp = TempDir::new().expect("tempdir");
    // A regular file where the index directory should go: create_dir_all fails.
    let blocker = tmp.path().join("blocker");
    fs::write(&blocker, "occupied").expect("write blocker");

    let manager = LexicalIndexManager::new(blocker.join("idx"));
    let retriever = manager
        .load_or_build(&campus_corpus(), false)
        .expect("in-memory fallback");
    let results = retriever.search("tuition fee", 5).expect("search");
    assert!(!results.is_empty());
}
