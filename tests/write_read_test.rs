mod helpers;

use std::time::Duration;

use recollect::memory::types::{MemoryPatch, NewMemory};
use recollect::MemoryError;
use serde_json::json;

use helpers::*;

#[test]
fn add_and_get_round_trip() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    provider.script("Cache stores embeddings", axis(1));

    let new = NewMemory::new("Cache stores embeddings", "infra")
        .subsection("cache")
        .tags(["perf", " storage ", "perf", ""])
        .importance(8)
        .metadata(json!({"source": "design review"}));
    let id = engine.add(&new).unwrap();

    let memory = engine.get(&id).unwrap();
    assert_eq!(memory.content, "Cache stores embeddings");
    assert_eq!(memory.section, "infra");
    assert_eq!(memory.subsection.as_deref(), Some("cache"));
    assert_eq!(
        memory.tags.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["perf", "storage"]
    );
    assert_eq!(memory.importance, 8);
    assert_eq!(memory.metadata, Some(json!({"source": "design review"})));
    assert_eq!(memory.embedding, Some(axis(1)));
    assert_eq!(memory.access_count, 0);
    assert_eq!(memory.link_count, 0);
    assert!(memory.last_accessed.is_none());
    assert_eq!(memory.created_at, memory.updated_at);
}

#[test]
fn add_registers_section_once() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);

    add_with_vector(&mut engine, &provider, "first", "notes", axis(1));
    add_with_vector(&mut engine, &provider, "second", "notes", axis(2));
    add_with_vector(&mut engine, &provider, "third", "work", axis(3));

    let names: Vec<String> = engine
        .list_sections()
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["notes", "work"]);
}

#[test]
fn ensure_section_is_idempotent_and_keeps_first_description() {
    let provider = ScriptedProvider::new();
    let engine = test_engine(&provider);

    assert!(engine.ensure_section("projects", Some("active work"), None).unwrap());
    assert!(!engine.ensure_section("projects", Some("other"), None).unwrap());

    let sections = engine.list_sections().unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].description.as_deref(), Some("active work"));
}

#[test]
fn validation_names_the_offending_field() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);

    let field_of = |result: recollect::Result<String>| match result {
        Err(MemoryError::Validation { field, .. }) => field,
        other => panic!("expected validation error, got {other:?}"),
    };

    assert_eq!(field_of(engine.add(&NewMemory::new("   ", "infra"))), "content");
    assert_eq!(field_of(engine.add(&NewMemory::new("text", ""))), "section");
    assert_eq!(
        field_of(engine.add(&NewMemory::new("text", "infra").importance(0))),
        "importance"
    );
    assert_eq!(
        field_of(engine.add(&NewMemory::new("text", "infra").importance(11))),
        "importance"
    );

    // Nothing was written and the provider was never consulted
    assert_eq!(engine.get_stats(None).unwrap().total_memories, 0);
    assert_eq!(provider.calls(), 0);
}

#[test]
fn embedding_failure_stores_memory_without_vector() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    add_with_vector(&mut engine, &provider, "neighbour", "infra", axis(1));

    // No vector scripted for this content
    let id = engine.add(&NewMemory::new("unscripted text", "infra")).unwrap();

    let memory = engine.get(&id).unwrap();
    assert!(memory.embedding.is_none());
    assert_eq!(memory.link_count, 0);
}

#[test]
fn get_unknown_id_is_not_found() {
    let provider = ScriptedProvider::new();
    let engine = test_engine(&provider);
    assert!(matches!(engine.get("missing"), Err(MemoryError::NotFound(_))));
}

#[test]
fn update_content_recomputes_embedding() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    let id = add_with_vector(&mut engine, &provider, "old wording", "infra", axis(1));
    provider.script("new wording", axis(2));

    let patch = MemoryPatch {
        content: Some("new wording".into()),
        importance: Some(9),
        tags: Some(vec!["edited".into()]),
        ..MemoryPatch::default()
    };
    engine.update(&id, &patch).unwrap();

    let memory = engine.get(&id).unwrap();
    assert_eq!(memory.content, "new wording");
    assert_eq!(memory.embedding, Some(axis(2)));
    assert_eq!(memory.importance, 9);
    assert!(memory.tags.contains("edited"));
}

#[test]
fn empty_update_still_refreshes_updated_at() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    let id = add_with_vector(&mut engine, &provider, "stable", "infra", axis(1));
    let before = engine.get(&id).unwrap();

    std::thread::sleep(Duration::from_millis(2));
    engine.update(&id, &MemoryPatch::default()).unwrap();

    let after = engine.get(&id).unwrap();
    assert!(after.updated_at > before.updated_at);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.content, before.content);
}

#[test]
fn update_validates_and_reports_missing_ids() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    let id = add_with_vector(&mut engine, &provider, "text", "infra", axis(1));

    let bad = MemoryPatch {
        importance: Some(42),
        ..MemoryPatch::default()
    };
    assert!(matches!(
        engine.update(&id, &bad),
        Err(MemoryError::Validation { field: "importance", .. })
    ));
    assert!(matches!(
        engine.update("missing", &MemoryPatch::default()),
        Err(MemoryError::NotFound(_))
    ));
}

#[test]
fn delete_removes_row_and_unknown_id_is_not_found() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    let id = add_with_vector(&mut engine, &provider, "short-lived", "infra", axis(1));

    assert_eq!(engine.delete(&id).unwrap(), 0);
    assert!(matches!(engine.get(&id), Err(MemoryError::NotFound(_))));
    assert!(matches!(engine.delete(&id), Err(MemoryError::NotFound(_))));
}
