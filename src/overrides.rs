//! Manually-curated field overrides applied during merging.
//!
//! A small CSV table keyed by record identifier (with the comparison title
//! as a secondary lookup key derived at read time). It carries the three
//! locally-curated fields the upstream databases do not know about: the
//! funder, the institutional repository link, and publication support.
//! Rows are only ever created or updated through the manual edit path;
//! merging treats the table as read-only.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::normalize::comparison_title;
use crate::records::{is_unknown, Article, UNKNOWN};

/// Columns of the override table. `upsert` unions new column names in, so
/// an older table file may carry fewer.
pub const OVERRIDE_COLUMNS: &[&str] = &[
    "id",
    "title",
    "funder",
    "repository_link",
    "publication_support",
];

/// The three override-able field values for one record.
#[derive(Debug, Clone, Default)]
pub struct OverrideFields {
    pub funder: String,
    pub repository_link: String,
    pub publication_support: String,
}

/// A manual edit to be recorded in the table (and patched into the latest
/// unified snapshot by the edit path).
#[derive(Debug, Clone)]
pub struct OverridePatch {
    pub id: String,
    pub title: String,
    pub fields: OverrideFields,
}

/// In-memory override table, dual-indexed so a record can be found by its
/// identifier or by its comparison title.
#[derive(Debug, Default)]
pub struct OverrideTable {
    by_id: HashMap<String, OverrideFields>,
    by_title: HashMap<String, OverrideFields>,
}

/// Counts of defensively handled rows from one table load, for the run log.
#[derive(Debug, Default, Clone, Copy)]
pub struct OverrideLoadReport {
    pub rows: usize,
    pub padded: usize,
    pub skipped: usize,
}

impl OverrideTable {
    pub fn insert(&mut self, id: &str, title: &str, fields: OverrideFields) {
        let id_key = id.trim().to_lowercase();
        if !id_key.is_empty() {
            self.by_id.insert(id_key, fields.clone());
        }
        let title_key = comparison_title(title);
        if !title_key.is_empty() {
            self.by_title.insert(title_key, fields);
        }
    }

    /// Lookup by identifier first, comparison title second.
    pub fn lookup(&self, id: &str, comparison_title: &str) -> Option<&OverrideFields> {
        let id_key = id.trim().to_lowercase();
        if !id_key.is_empty() {
            if let Some(fields) = self.by_id.get(&id_key) {
                return Some(fields);
            }
        }
        self.by_title.get(comparison_title)
    }

    /// Patches the three override-able fields on a record. Only values the
    /// curator actually set replace fetched data; sentinel entries in the
    /// table leave the record untouched.
    pub fn apply(&self, article: &mut Article) {
        let title_key = comparison_title(&article.title);
        if let Some(fields) = self.lookup(&article.id, &title_key) {
            if !is_unknown(&fields.funder) {
                article.funder = fields.funder.clone();
            }
            if !is_unknown(&fields.repository_link) {
                article.repository_link = fields.repository_link.clone();
            }
            if !is_unknown(&fields.publication_support) {
                article.publication_support = fields.publication_support.clone();
            }
        }
    }
}

/// Persistent CSV store behind [`OverrideTable`].
pub struct OverrideStore {
    path: PathBuf,
}

impl OverrideStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads the table. A missing file is an empty table. Rows shorter than
    /// the header are padded with the sentinel; rows longer than the header
    /// are skipped; neither aborts the load.
    pub fn load(&self) -> Result<(OverrideTable, OverrideLoadReport)> {
        let mut table = OverrideTable::default();
        let mut report = OverrideLoadReport::default();
        if !self.path.exists() {
            return Ok((table, report));
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open override table {:?}", self.path))?;
        let header: Vec<String> = reader
            .headers()
            .with_context(|| format!("Failed to read override header {:?}", self.path))?
            .iter()
            .map(|column| column.trim().to_string())
            .collect();
        for record in reader.records() {
            let record =
                record.with_context(|| format!("Failed to read override row {:?}", self.path))?;
            if record.len() > header.len() {
                report.skipped += 1;
                continue;
            }
            if record.len() < header.len() {
                report.padded += 1;
            }
            let mut row = HashMap::new();
            for (index, column) in header.iter().enumerate() {
                let value = record.get(index).unwrap_or(UNKNOWN);
                row.insert(column.clone(), value.to_string());
            }
            let get = |column: &str| row.get(column).cloned().unwrap_or_else(|| UNKNOWN.into());
            table.insert(
                &get("id"),
                &get("title"),
                OverrideFields {
                    funder: get("funder"),
                    repository_link: get("repository_link"),
                    publication_support: get("publication_support"),
                },
            );
            report.rows += 1;
        }
        Ok((table, report))
    }

    /// Creates or updates the row for the patched record, rewriting the
    /// whole table. The column set is the union of the existing header and
    /// the canonical override columns; rows missing a column get the
    /// sentinel. Matching is by identifier, case-insensitive.
    ///
    /// The rewrite is not locked: the table belongs to a single curator and
    /// concurrent edits are unsupported.
    pub fn upsert(&self, patch: &OverridePatch) -> Result<()> {
        let (mut header, mut rows) = self.read_raw()?;
        for column in OVERRIDE_COLUMNS {
            if !header.iter().any(|existing| existing == column) {
                header.push(column.to_string());
            }
        }

        let patch_row = patch_as_row(patch);
        let id_key = patch.id.trim().to_lowercase();
        let existing = rows
            .iter_mut()
            .find(|row| row.get("id").map(|id| id.trim().to_lowercase()) == Some(id_key.clone()));
        match existing {
            Some(row) => {
                for (column, value) in patch_row {
                    row.insert(column, value);
                }
            }
            None => rows.push(patch_row),
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("Failed to write override table {:?}", self.path))?;
        writer.write_record(&header)?;
        for row in &rows {
            let record: Vec<&str> = header
                .iter()
                .map(|column| row.get(column).map(String::as_str).unwrap_or(UNKNOWN))
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Full rows as stored, for rewriting. Short rows are padded here too so
    /// an edit never loses a row a previous load tolerated.
    fn read_raw(&self) -> Result<(Vec<String>, Vec<HashMap<String, String>>)> {
        if !self.path.exists() {
            return Ok((Vec::new(), Vec::new()));
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open override table {:?}", self.path))?;
        let header: Vec<String> = reader
            .headers()?
            .iter()
            .map(|column| column.trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row = HashMap::new();
            for (index, column) in header.iter().enumerate() {
                let value = record.get(index).unwrap_or(UNKNOWN);
                row.insert(column.clone(), value.to_string());
            }
            rows.push(row);
        }
        Ok((header, rows))
    }
}

fn patch_as_row(patch: &OverridePatch) -> HashMap<String, String> {
    let mut row = HashMap::new();
    row.insert("id".to_string(), patch.id.clone());
    row.insert("title".to_string(), patch.title.clone());
    row.insert("funder".to_string(), patch.fields.funder.clone());
    row.insert(
        "repository_link".to_string(),
        patch.fields.repository_link.clone(),
    );
    row.insert(
        "publication_support".to_string(),
        patch.fields.publication_support.clone(),
    );
    row
}
