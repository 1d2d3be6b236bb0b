//! `shiksha index`: Seed a vector collection from a JSONL file.
//!
//! Each non-empty line is a `{"content": ..., "metadata": {...}}` record.

use super::{CliResult, load_config, open_vector_store};
use shiksha_core::vector::ChunkRecord;
use std::path::Path;
use tracing::info;

const BATCH_SIZE: usize = 64;

/// Parse JSONL records, reporting the first bad line.
pub fn parse_records(text: &str) -> Result<Vec<ChunkRecord>, String> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<ChunkRecord>(line).map_err(|e| format!("line {}: {e}", i + 1))
        })
        .collect()
}

pub async fn run(collection: &str, file: &Path) -> CliResult {
    let config = load_config()?;
    let text = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let records = parse_records(&text)?;

    if records.is_empty() {
        println!("⚠️  {} contains no records", file.display());
        return Ok(());
    }

    let store = open_vector_store(&config).await?;
    let total = records.len();
    let mut inserted = 0;

    let mut pending = records.into_iter().peekable();
    while pending.peek().is_some() {
        let batch: Vec<ChunkRecord> = pending.by_ref().take(BATCH_SIZE).collect();
        inserted += store.insert(collection, batch).await?;
        eprint!("\r  Indexed {inserted}/{total}");
    }
    eprintln!();

    info!(collection, inserted, backend = store.name(), "Collection indexed");
    println!("✅ Indexed {inserted} records into '{collection}'");

    Ok(())
}
