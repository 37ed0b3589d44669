//! CLI `duplicates` command: report near-duplicate pairs and optionally merge them.

use anyhow::Result;

use recollect::config::RecollectConfig;
use recollect::memory::types::MergeStrategy;

/// List duplicate pairs; with `merge`, delete the older memory of each pair.
pub fn duplicates(config: RecollectConfig, threshold: Option<f32>, merge: bool) -> Result<()> {
    let mut engine = super::open_engine(config)?;
    let pairs = engine.find_duplicates(threshold)?;

    if pairs.is_empty() {
        println!("No duplicates found.");
        return Ok(());
    }

    println!("{:<38} {:<38} {}", "First", "Second", "Similarity");
    println!("{}", "-".repeat(90));
    for pair in &pairs {
        println!(
            "{:<38} {:<38} {:.4}",
            pair.first_id, pair.second_id, pair.similarity
        );
    }

    if merge {
        let result = engine.merge_duplicates(&pairs, MergeStrategy::KeepNewer)?;
        println!();
        println!(
            "Deleted {} memories ({} pair(s) skipped).",
            result.deleted.len(),
            result.skipped
        );
    } else {
        println!();
        println!("Dry run; pass --merge to delete the older memory of each pair.");
    }

    Ok(())
}
