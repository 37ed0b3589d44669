use anyhow::Result;

use recollect::config::RecollectConfig;
use recollect::memory::types::NewMemory;

/// Store a memory and print its id.
pub fn add(config: RecollectConfig, new: &NewMemory) -> Result<()> {
    let mut engine = super::open_engine(config)?;
    let id = engine.add(new)?;
    let memory = engine.get(&id)?;

    println!("{id}");
    eprintln!(
        "Stored in section '{}' with {} link(s).",
        memory.section, memory.link_count
    );
    Ok(())
}

pub fn delete(config: RecollectConfig, memory_id: &str) -> Result<()> {
    let mut engine = super::open_engine(config)?;
    let links_removed = engine.delete(memory_id)?;
    println!("Deleted {memory_id} ({links_removed} link(s) removed).");
    Ok(())
}
