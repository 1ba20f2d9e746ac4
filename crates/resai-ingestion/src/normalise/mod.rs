//! Record normaliser: heterogeneous source tables → one canonical table.
//!
//! Rows are concatenated in input order and never dropped or merged;
//! cross-source duplicates are kept for provenance.

pub mod mapping;

use std::path::Path;

use anyhow::anyhow;
use resai_common::{CanonicalTable, ResaiError};
use serde_json::Value;
use tracing::{debug, info};

use crate::models::SourceTable;

pub use mapping::{canonical_name, map_article, map_object, map_row, FIELD_MAPPING};

/// Concatenates `tables` and maps every row onto the canonical field set.
pub fn harmonize(tables: &[SourceTable]) -> CanonicalTable {
    let rows: Vec<_> = tables
        .iter()
        .inspect(|t| debug!(table = %t.name, rows = t.len(), "Harmonizing table"))
        .flat_map(|t| t.rows.iter().map(map_row))
        .collect();
    info!(tables = tables.len(), rows = rows.len(), "Harmonized source tables");
    CanonicalTable::from_rows(rows)
}

/// Loads an exported table: a JSON array of objects.
pub fn load_json_table(path: &Path) -> Result<SourceTable, ResaiError> {
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)?;
    let Value::Array(items) = value else {
        return Err(anyhow!("{} is not a JSON array", path.display()).into());
    };

    let mut objects = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(object) => objects.push(object),
            other => {
                return Err(anyhow!("{} row {} is not an object: {}", path.display(), i + 1, other).into());
            }
        }
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceTable::from_objects(name, objects))
}

/// Writes the harmonized table as a pretty JSON array.
pub fn write_table_json(table: &CanonicalTable, path: &Path) -> Result<(), ResaiError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(table)?)?;
    Ok(())
}
