use anyhow::Result;

use recollect::config::RecollectConfig;

/// Export the memory graph (optionally one section) as JSON to stdout.
pub fn graph(config: RecollectConfig, section: Option<&str>) -> Result<()> {
    let engine = super::open_engine(config)?;
    let graph = engine.get_graph(section)?;

    let json = serde_json::to_string_pretty(&graph)?;
    println!("{json}");

    eprintln!(
        "Exported {} memories and {} links.",
        graph.nodes.len(),
        graph.edges.len()
    );

    Ok(())
}
