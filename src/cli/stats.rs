use anyhow::Result;

use recollect::config::RecollectConfig;

/// Display memory statistics in the terminal.
pub fn stats(config: RecollectConfig, section: Option<&str>) -> Result<()> {
    let engine = super::open_engine(config)?;
    let response = engine.get_stats(section)?;

    match section {
        Some(name) => println!("Memory Statistics ({name})"),
        None => println!("Memory Statistics"),
    }
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {}", response.total_memories);
    println!("  Average importance:  {:.2}", response.average_importance);
    println!("  Total accesses:      {}", response.total_access_count);
    println!("  Average links:       {:.2}", response.average_link_count);
    println!("  Links:               {}", response.total_links);
    println!("  Sections (all):      {}", response.total_sections);

    Ok(())
}
