//! Dated flat-file snapshots of record collections.
//!
//! Each category (per-source raw, unified) accumulates one CSV per run in
//! its own directory, `articles-<category>-YYYY-MM-DD.csv`. Files are never
//! mutated in place except by the override-edit path, which rewrites the
//! latest unified snapshot wholesale. Readers always resolve the most
//! recently dated file; a failed run therefore never corrupts the last good
//! snapshot.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};

use crate::records::{Article, CANONICAL_COLUMNS, UNKNOWN};

/// Snapshot categories, one directory each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Scopus,
    Wos,
    Unified,
}

impl Category {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Scopus => "scopus",
            Category::Wos => "wos",
            Category::Unified => "unified",
        }
    }

    fn file_stem(&self) -> String {
        format!("articles-{}", self.dir_name())
    }
}

/// A parsed flat file: header order plus one map per row.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads and writes snapshots under the workspace's articles directory.
pub struct SnapshotStore {
    articles_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(articles_dir: PathBuf) -> Self {
        Self { articles_dir }
    }

    fn category_dir(&self, category: Category) -> PathBuf {
        self.articles_dir.join(category.dir_name())
    }

    /// Path of the most recent snapshot for a category, by the date embedded
    /// in the filename (same-day re-runs tie-break on their numeric suffix).
    /// `None` when the directory is absent or holds no dated files.
    pub fn latest_path(&self, category: Category) -> Result<Option<PathBuf>> {
        let dir = self.category_dir(category);
        if !dir.exists() {
            return Ok(None);
        }
        let mut newest: Option<((NaiveDate, u32), PathBuf)> = None;
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(ordinal) = snapshot_ordinal(&name) {
                if newest.as_ref().map(|(best, _)| ordinal > *best).unwrap_or(true) {
                    newest = Some((ordinal, entry.path()));
                }
            }
        }
        Ok(newest.map(|(_, path)| path))
    }

    /// Most recent collection for a category; empty when none exists.
    pub fn read_latest(&self, category: Category) -> Result<Table> {
        match self.latest_path(category)? {
            Some(path) => read_table(&path),
            None => Ok(Table::default()),
        }
    }

    /// Writes a new dated snapshot. Never overwrites: a re-run on the same
    /// day gets a numeric suffix so the previous file stays intact.
    pub fn write(&self, category: Category, table: &Table) -> Result<PathBuf> {
        let path = self.next_path(category)?;
        write_table(&path, table)?;
        Ok(path)
    }

    /// Writes unified articles with the column union post-pass: canonical
    /// columns first, then every extra column any record carries, in first
    /// appearance order. Absent cells default to the sentinel.
    pub fn write_articles(&self, category: Category, articles: &[Article]) -> Result<PathBuf> {
        let mut columns: Vec<String> =
            CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect();
        for article in articles {
            for column in article.extra.keys() {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let path = self.next_path(category)?;
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create snapshot {:?}", path))?;
        writer.write_record(&columns)?;
        for article in articles {
            let record: Vec<String> = columns
                .iter()
                .map(|column| article.field(column).unwrap_or_else(|| UNKNOWN.into()))
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(path)
    }

    fn next_path(&self, category: Category) -> Result<PathBuf> {
        let dir = self.category_dir(category);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot directory {:?}", dir))?;
        let stem = category.file_stem();
        let date = Local::now().date_naive();
        let mut path = dir.join(format!("{stem}-{date}.csv"));
        let mut counter = 2;
        while path.exists() {
            path = dir.join(format!("{stem}-{date}-{counter}.csv"));
            counter += 1;
        }
        Ok(path)
    }
}

/// Parses a snapshot into header order plus rows. Rows shorter than the
/// header are padded with the sentinel rather than dropped.
pub fn read_table(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open snapshot {:?}", path))?;
    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read snapshot header {:?}", path))?
        .iter()
        .map(|column| column.trim().to_string())
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read snapshot row {:?}", path))?;
        let mut row = HashMap::new();
        for (index, column) in columns.iter().enumerate() {
            let value = record.get(index).unwrap_or(UNKNOWN);
            row.insert(column.clone(), value.to_string());
        }
        rows.push(row);
    }
    Ok(Table { columns, rows })
}

/// Rewrites a table to an exact path, preserving its header order. Used by
/// the override-edit path, the one caller allowed to touch an existing file.
/// Not locked: edits come from a single curator, never concurrently.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to write snapshot {:?}", path))?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        let record: Vec<&str> = table
            .columns
            .iter()
            .map(|column| row.get(column).map(String::as_str).unwrap_or(UNKNOWN))
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Date embedded in a snapshot filename, `YYYY-MM-DD`.
pub fn snapshot_date(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_string_lossy();
    snapshot_ordinal(&name).map(|(date, _)| date)
}

/// Recency ordinal for a snapshot filename: the embedded date plus the
/// same-day re-run suffix (1 when absent).
fn snapshot_ordinal(name: &str) -> Option<(NaiveDate, u32)> {
    let bytes = name.as_bytes();
    for start in 0..bytes.len() {
        if start + 10 > name.len() {
            break;
        }
        if !bytes[start].is_ascii_digit() {
            continue;
        }
        let Some(candidate) = name.get(start..start + 10) else {
            continue;
        };
        if let Ok(date) = NaiveDate::parse_from_str(candidate, "%Y-%m-%d") {
            let rest = &name[start + 10..];
            let suffix = rest
                .strip_prefix('-')
                .and_then(|tail| tail.strip_suffix(".csv"))
                .and_then(|digits| digits.parse::<u32>().ok())
                .unwrap_or(1);
            return Some((date, suffix));
        }
    }
    None
}
