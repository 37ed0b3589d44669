mod helpers;

use std::sync::Arc;

use recollect::config::RecollectConfig;
use recollect::embedding::{EmbeddingCache, HashEmbeddingProvider};
use recollect::memory::search::SearchFilter;
use recollect::memory::types::NewMemory;
use recollect::MemoryEngine;

use helpers::*;

fn access_count(engine: &MemoryEngine, id: &str) -> u32 {
    engine.get(id).unwrap().access_count
}

#[test]
fn stored_memory_is_found_by_keyword_and_embedding() {
    let provider = HashEmbeddingProvider::new(64).unwrap();
    let cache = Arc::new(EmbeddingCache::new(Arc::new(provider), 100));
    let mut engine = MemoryEngine::in_memory(cache, RecollectConfig::default()).unwrap();

    let id = engine
        .add(&NewMemory::new("Cache stores embeddings", "infra").importance(5))
        .unwrap();

    let results = engine
        .search("embeddings", &SearchFilter::section("infra"), None)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].memory.id, id);
    assert!(results[0].score > 0.0);
    assert_eq!(results[0].keyword_score, 1.0);
}

#[test]
fn results_are_sorted_by_score() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    provider.script("query", axis(0));

    for i in 1..=12 {
        provider.script(&format!("memory {i}"), toward(i, 0.05 * i as f32));
        engine
            .add(
                &NewMemory::new(format!("memory {i}"), "s")
                    .importance((i % 10 + 1) as i64)
                    .auto_link(false),
            )
            .unwrap();
    }

    let results = engine.search("query", &SearchFilter::default(), Some(8)).unwrap();
    assert_eq!(results.len(), 8);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn default_top_k_is_ten() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    for i in 1..=12 {
        add_with_vector(&mut engine, &provider, &format!("item {i}"), "s", axis(i));
    }
    assert_eq!(engine.search("item", &SearchFilter::default(), None).unwrap().len(), 10);
}

#[test]
fn only_returned_results_are_marked_accessed() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    provider.script("target", axis(0));

    let best = add_with_vector(&mut engine, &provider, "best", "s", axis(0));
    let second = add_with_vector(&mut engine, &provider, "second", "s", toward(1, 0.6));
    let others: Vec<String> = (2..6)
        .map(|i| add_with_vector(&mut engine, &provider, &format!("other {i}"), "s", axis(i + 10)))
        .collect();

    let results = engine.search("target", &SearchFilter::default(), Some(2)).unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.memory.id.as_str()).collect();
    assert_eq!(ids, vec![best.as_str(), second.as_str()]);

    // Returned structs reflect the bookkeeping they caused
    assert!(results.iter().all(|r| r.memory.access_count == 1));
    assert!(results.iter().all(|r| r.memory.last_accessed.is_some()));

    assert_eq!(access_count(&engine, &best), 1);
    assert_eq!(access_count(&engine, &second), 1);
    for id in &others {
        assert_eq!(access_count(&engine, id), 0);
        assert!(engine.get(id).unwrap().last_accessed.is_none());
    }
}

#[test]
fn higher_importance_wins_when_scores_tie() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    provider.script("same words", axis(3));

    let low = engine
        .add(&NewMemory::new("same words", "s").importance(3))
        .unwrap();
    let high = engine
        .add(&NewMemory::new("same words", "s").importance(8))
        .unwrap();

    let results = engine.search("same words", &SearchFilter::default(), Some(2)).unwrap();
    assert_eq!(results[0].memory.id, high);
    assert_eq!(results[1].memory.id, low);
    assert_eq!(results[0].semantic_score, results[1].semantic_score);
    assert!(results[0].score > results[1].score);
}

#[test]
fn opposite_vectors_do_not_invert_the_importance_boost() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    let opposite: Vec<f32> = axis(0).into_iter().map(|x| -x).collect();
    provider.script("probe", axis(0));
    provider.script("alpha", opposite.clone());
    provider.script("beta", opposite);

    engine
        .add(&NewMemory::new("alpha", "s").importance(2).auto_link(false))
        .unwrap();
    let high = engine
        .add(&NewMemory::new("beta", "s").importance(9).auto_link(false))
        .unwrap();

    let results = engine.search("probe", &SearchFilter::default(), Some(2)).unwrap();
    assert_eq!(results[0].memory.id, high);
    assert!(results.iter().all(|r| r.semantic_score == 0.0 && r.score >= 0.0));
}

#[test]
fn section_and_tag_filters_narrow_candidates() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    for (content, section, tags) in [
        ("rust borrow checker", "lang", vec!["rust", "compiler"]),
        ("rust async runtimes", "lang", vec!["rust"]),
        ("rust belt on the car", "garage", vec!["rust", "compiler"]),
        ("go compiler speed", "lang", vec!["go", "compiler"]),
    ] {
        provider.script(content, axis(content.len() % DIMS));
        engine
            .add(&NewMemory::new(content, section).tags(tags).auto_link(false))
            .unwrap();
    }

    let filter = SearchFilter {
        section: Some("lang".into()),
        tags: vec!["rust".into(), "compiler".into()],
    };
    let results = engine.search("rust", &filter, Some(10)).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].memory.content, "rust borrow checker");

    let results = engine.search("rust", &SearchFilter::section("garage"), Some(10)).unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn blank_query_ranks_by_importance_then_recency() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    let older = add_with_vector(&mut engine, &provider, "older", "s", axis(1));
    provider.script("important", axis(2));
    let important = engine
        .add(&NewMemory::new("important", "s").importance(9))
        .unwrap();
    let newer = add_with_vector(&mut engine, &provider, "newer", "s", axis(3));

    let results = engine.search("   ", &SearchFilter::default(), Some(3)).unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.memory.id.as_str()).collect();
    assert_eq!(ids, vec![important.as_str(), newer.as_str(), older.as_str()]);
    assert!(results.iter().all(|r| r.semantic_score == 0.0 && r.keyword_score == 0.0));
}

#[test]
fn prefilter_window_bounds_recall() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    provider.script("rare gem", axis(0));
    let gem = engine
        .add(&NewMemory::new("rare gem", "s").importance(1).auto_link(false))
        .unwrap();
    for i in 1..=11 {
        provider.script(&format!("filler {i}"), axis(i));
        engine
            .add(&NewMemory::new(format!("filler {i}"), "s").importance(10).auto_link(false))
            .unwrap();
    }

    // top_k = 1 pre-filters 10 rows, all of them importance 10
    let results = engine.search("gem", &SearchFilter::default(), Some(1)).unwrap();
    assert_eq!(results.len(), 1);
    assert_ne!(results[0].memory.id, gem);

    // top_k = 2 widens the window to 20 rows
    let results = engine.search("gem", &SearchFilter::default(), Some(2)).unwrap();
    assert_eq!(results[0].memory.id, gem);
}

#[test]
fn zero_top_k_returns_nothing_and_touches_nothing() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    let id = add_with_vector(&mut engine, &provider, "anything", "s", axis(1));

    assert!(engine.search("anything", &SearchFilter::default(), Some(0)).unwrap().is_empty());
    assert_eq!(access_count(&engine, &id), 0);
}

#[test]
fn unembeddable_query_falls_back_to_keywords() {
    let provider = ScriptedProvider::new();
    let mut engine = test_engine(&provider);
    let hit = add_with_vector(&mut engine, &provider, "tokio runtime notes", "s", axis(1));
    add_with_vector(&mut engine, &provider, "unrelated", "s", axis(2));

    let results = engine.search("tokio", &SearchFilter::default(), Some(2)).unwrap();
    assert_eq!(results[0].memory.id, hit);
    assert!(results.iter().all(|r| r.semantic_score == 0.0));
    assert!(results[0].keyword_score > 0.0);
}
