//! The batch reconciliation run and the unified-snapshot read paths.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use serde_json::json;

use crate::error::ReconcileError;
use crate::merge::unify;
use crate::normalize::{normalize, parse_published};
use crate::records::{Article, Source};
use crate::runlog::EventType;
use crate::snapshot::{snapshot_date, Category, Table};
use crate::workspace::Workspace;

/// Result of one reconciliation run.
#[derive(Debug)]
pub struct UnifyOutcome {
    pub articles: Vec<Article>,
    pub snapshot_path: PathBuf,
    pub scopus_count: usize,
    pub wos_count: usize,
}

/// Runs the full reconciliation batch: loads the latest per-source
/// snapshots and the override table, merges, and writes exactly one new
/// unified snapshot. Idempotent over frozen inputs: re-running against the
/// same snapshots produces the same record set under a new dated file.
///
/// A missing per-source snapshot degrades to an empty collection. Both
/// missing, or a merge that leaves no records (all reviews), aborts with
/// [`ReconcileError::NoRecordsToUnify`] and writes nothing, leaving prior
/// snapshots untouched.
pub fn run_reconciliation(workspace: &mut Workspace) -> Result<UnifyOutcome> {
    let log = workspace.run_log();
    log.append(EventType::RunStarted, json!({}))?;

    let store = workspace.snapshot_store();
    let scopus_table = store.read_latest(Category::Scopus)?;
    let wos_table = store.read_latest(Category::Wos)?;
    for (category, table) in [("scopus", &scopus_table), ("wos", &wos_table)] {
        if table.is_empty() {
            log.append(EventType::SnapshotMissing, json!({ "category": category }))?;
        } else {
            log.append(
                EventType::SourceLoaded,
                json!({ "category": category, "rows": table.rows.len() }),
            )?;
        }
    }
    if scopus_table.is_empty() && wos_table.is_empty() {
        return Err(ReconcileError::NoRecordsToUnify.into());
    }

    let (overrides, report) = workspace.override_store().load()?;
    if report.padded > 0 || report.skipped > 0 {
        log.append(
            EventType::OverrideRowsMalformed,
            json!({ "padded": report.padded, "skipped": report.skipped }),
        )?;
    }

    let scopus: Vec<Article> = scopus_table
        .rows
        .iter()
        .map(|row| normalize(row, Source::Scopus))
        .collect();
    let wos: Vec<Article> = wos_table
        .rows
        .iter()
        .map(|row| normalize(row, Source::Wos))
        .collect();
    let scopus_count = scopus.len();
    let wos_count = wos.len();

    let articles = unify(scopus, wos, &overrides);
    if articles.is_empty() {
        // Everything classified as a review: refuse to write a header-only
        // unified snapshot.
        return Err(ReconcileError::NoRecordsToUnify.into());
    }
    let snapshot_path = store.write_articles(Category::Unified, &articles)?;
    workspace.record_run()?;
    log.append(
        EventType::RunCompleted,
        json!({
            "unified": articles.len(),
            "snapshot": snapshot_path.display().to_string(),
        }),
    )?;

    Ok(UnifyOutcome {
        articles,
        snapshot_path,
        scopus_count,
        wos_count,
    })
}

/// Rows of the newest unified snapshot; empty when none exists. Display
/// paths use this, so absence is not an error here.
pub fn latest_unified(workspace: &Workspace) -> Result<Table> {
    workspace.snapshot_store().read_latest(Category::Unified)
}

/// Date embedded in the newest unified snapshot's filename. Download-style
/// callers need a hard not-found when nothing was ever unified.
pub fn latest_unified_date(workspace: &Workspace) -> Result<NaiveDate> {
    let path = workspace
        .snapshot_store()
        .latest_path(Category::Unified)?
        .ok_or(ReconcileError::UnifiedSnapshotMissing)?;
    snapshot_date(&path).ok_or_else(|| ReconcileError::UnifiedSnapshotMissing.into())
}

/// Number of unified records published in the inclusive date range.
/// Records whose dates do not parse are excluded from the count.
pub fn unified_between(workspace: &Workspace, from: NaiveDate, to: NaiveDate) -> Result<usize> {
    let table = latest_unified(workspace)?;
    let count = table
        .rows
        .iter()
        .filter_map(|row| row.get("published"))
        .filter_map(|value| parse_published(value))
        .filter(|date| (from..=to).contains(date))
        .count();
    Ok(count)
}
