//! The manual override edit path.
//!
//! A curator sets the three locally-known fields for one record. The edit
//! is recorded in the override table (so every future reconciliation run
//! picks it up) and patched into the latest unified snapshot in place, so
//! the current dataset reflects it without re-running the whole merge.

use std::path::PathBuf;

use anyhow::Result;
use serde_json::json;

use crate::error::ReconcileError;
use crate::normalize::comparison_title;
use crate::overrides::OverridePatch;
use crate::records::{is_unknown, UNKNOWN};
use crate::runlog::EventType;
use crate::snapshot::{read_table, write_table, Category};
use crate::workspace::Workspace;

/// Applies a manual override. Fails with
/// [`ReconcileError::UnifiedSnapshotMissing`] before touching anything when
/// there is no unified snapshot to patch. Returns the patched snapshot path.
pub fn apply_override(workspace: &Workspace, patch: &OverridePatch) -> Result<PathBuf> {
    let path = workspace
        .snapshot_store()
        .latest_path(Category::Unified)?
        .ok_or(ReconcileError::UnifiedSnapshotMissing)?;

    workspace.override_store().upsert(patch)?;

    let mut table = read_table(&path)?;
    let matched = patch_matching_row(&mut table.rows, patch);
    if !matched {
        // No matching row: append one restricted to the snapshot's columns,
        // defaulting everything the patch does not carry.
        let mut row = std::collections::HashMap::new();
        for column in &table.columns {
            let value = match column.as_str() {
                "id" => patch.id.clone(),
                "title" => patch.title.clone(),
                "funder" => patch.fields.funder.clone(),
                "repository_link" => patch.fields.repository_link.clone(),
                "publication_support" => patch.fields.publication_support.clone(),
                _ => UNKNOWN.to_string(),
            };
            row.insert(column.clone(), value);
        }
        table.rows.push(row);
    }
    write_table(&path, &table)?;

    workspace.run_log().append(
        EventType::OverrideSaved,
        json!({
            "id": patch.id,
            "snapshot": path.display().to_string(),
            "matched_existing_row": matched,
        }),
    )?;
    Ok(path)
}

/// Patches the first row matching the override's identifier, falling back
/// to a comparison-title match. Only curated (non-sentinel) values replace
/// snapshot data.
fn patch_matching_row(
    rows: &mut [std::collections::HashMap<String, String>],
    patch: &OverridePatch,
) -> bool {
    let id_key = patch.id.trim().to_lowercase();
    let title_key = comparison_title(&patch.title);
    let position = rows
        .iter()
        .position(|row| {
            !id_key.is_empty()
                && row.get("id").map(|id| id.trim().to_lowercase()) == Some(id_key.clone())
        })
        .or_else(|| {
            if title_key.is_empty() {
                return None;
            }
            rows.iter().position(|row| {
                row.get("title")
                    .map(|title| comparison_title(title) == title_key)
                    .unwrap_or(false)
            })
        });
    let Some(index) = position else {
        return false;
    };
    let row = &mut rows[index];
    for (column, value) in [
        ("funder", &patch.fields.funder),
        ("repository_link", &patch.fields.repository_link),
        ("publication_support", &patch.fields.publication_support),
    ] {
        if !is_unknown(value) {
            row.insert(column.to_string(), value.clone());
        }
    }
    true
}
