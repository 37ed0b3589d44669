use anyhow::Result;

use recollect::config::RecollectConfig;
use recollect::memory::search::SearchFilter;
use recollect::memory::truncate_preview;

/// Run a search from the terminal.
pub fn search(
    config: RecollectConfig,
    query: &str,
    filter: &SearchFilter,
    top_k: Option<usize>,
) -> Result<()> {
    let engine = super::open_engine(config)?;
    let results = engine.search(query, filter, top_k)?;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", results.len());
    for (i, hit) in results.iter().enumerate() {
        println!(
            "  {}. [{}] {} (importance: {}, score: {:.4}, semantic: {:.3}, keyword: {:.3})",
            i + 1,
            hit.memory.section,
            hit.memory.id,
            hit.memory.importance,
            hit.score,
            hit.semantic_score,
            hit.keyword_score,
        );
        println!("     {}", truncate_preview(&hit.memory.content, 120));
        println!();
    }

    Ok(())
}

/// List the neighbours of one memory, strongest link first.
pub fn related(config: RecollectConfig, memory_id: &str) -> Result<()> {
    let engine = super::open_engine(config)?;
    let related = engine.get_related(memory_id)?;

    if related.is_empty() {
        println!("No related memories.");
        return Ok(());
    }

    for r in &related {
        println!(
            "  {:.3}  {:<11} {}  {}",
            r.strength,
            r.relationship,
            r.memory.id,
            truncate_preview(&r.memory.content, 80)
        );
    }
    Ok(())
}
