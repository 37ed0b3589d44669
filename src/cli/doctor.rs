//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use recollect::config::RecollectConfig;
use recollect::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: RecollectConfig, repair: bool) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `recollect add` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;

    if repair {
        let fixed = recollect::memory::linker::repair_link_counts(&conn)?;
        println!("Repaired link counts on {fixed} memories.");
        println!();
    }

    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Recollect Health Report");
    println!("=======================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Embedding dimensions:");
    match report.embedding_dimensions {
        Some(stored) => println!("  Stored:          {stored}"),
        None => println!("  Stored:          (not set)"),
    }
    println!("  Configured:      {}", config.embedding.dimensions);
    if let Some(stored) = report.embedding_dimensions {
        if stored != config.embedding.dimensions {
            println!("  WARNING: dimension mismatch! The store cannot be opened with this provider.");
        } else {
            println!("  Status:          OK (match)");
        }
    }
    println!();
    println!("Row counts:");
    println!("  Memories:        {}", report.memory_count);
    println!("  Links:           {}", report.link_count);
    println!("  Sections:        {}", report.section_count);
    println!();
    if report.link_count_drift > 0 {
        println!(
            "Link counts:       {} memories out of sync (run `recollect doctor --repair`)",
            report.link_count_drift
        );
    } else {
        println!("Link counts:       OK");
    }
    if report.orphan_sections > 0 {
        println!(
            "Sections:          {} memories reference an unregistered section",
            report.orphan_sections
        );
    }
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db ~/.recollect/memory.db");
        println!("  2. Or export the graph from a good copy: recollect graph > backup.json");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
