//! Normalization of raw per-source rows into the canonical schema.
//!
//! Covers three concerns: coercing every canonical field to a string with
//! the `N/A` sentinel for absences, collapsing the free-text publication
//! type descriptor into one of four buckets, and computing the comparison
//! title used for equality and hashing (never shown to users).

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::records::{Article, Source, CANONICAL_COLUMNS, UNKNOWN};

/// Canonical publication-type buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleKind {
    JournalArticle,
    BookChapter,
    ConferencePaper,
    Other,
    /// Reviews are dropped from the unified output entirely.
    Ignore,
}

impl ArticleKind {
    /// Collapses a raw type descriptor using case-insensitive substring
    /// rules. Precedence matters: "review" wins over everything, and the
    /// book-chapter rule excludes book series.
    pub fn classify(raw: &str) -> ArticleKind {
        let descriptor = raw.trim().to_lowercase();
        if descriptor.contains("review") {
            return ArticleKind::Ignore;
        }
        if descriptor.contains("journal") || descriptor.contains("article") {
            return ArticleKind::JournalArticle;
        }
        if descriptor.contains("book")
            && descriptor.contains("chapter")
            && !descriptor.contains("series")
        {
            return ArticleKind::BookChapter;
        }
        if descriptor.contains("book series")
            || descriptor.contains("proceedings")
            || descriptor.contains("conference")
            || descriptor.contains("meetings")
        {
            return ArticleKind::ConferencePaper;
        }
        ArticleKind::Other
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArticleKind::JournalArticle => "Journal article",
            ArticleKind::BookChapter => "Book chapter",
            ArticleKind::ConferencePaper => "Conference paper",
            ArticleKind::Other => "Other",
            ArticleKind::Ignore => "Ignore (review)",
        }
    }
}

/// Maps a raw snapshot row to the canonical record. Pure: malformed values
/// pass through unmodified, absences become the sentinel.
pub fn normalize(row: &HashMap<String, String>, source: Source) -> Article {
    let take = |column: &str| -> String {
        match row.get(column) {
            Some(value) if !value.trim().is_empty() => value.clone(),
            _ => UNKNOWN.to_string(),
        }
    };

    let mut extra = BTreeMap::new();
    for (column, value) in row {
        if CANONICAL_COLUMNS.contains(&column.as_str()) {
            continue;
        }
        let value = if value.trim().is_empty() {
            UNKNOWN.to_string()
        } else {
            value.clone()
        };
        extra.insert(column.clone(), value);
    }

    let kind = ArticleKind::classify(row.get("kind").map(String::as_str).unwrap_or(""));

    Article {
        id: take("id"),
        title: take("title"),
        authors: take("authors"),
        orcids: take("orcids"),
        kind: kind.label().to_string(),
        published: take("published"),
        doi: take("doi"),
        issn: take("issn"),
        isbn: take("isbn"),
        funder: take("funder"),
        repository_link: take("repository_link"),
        publication_support: take("publication_support"),
        department: take("department"),
        affiliations: take("affiliations"),
        description: take("description"),
        keywords: take("keywords"),
        origin: source,
        extra,
    }
}

/// Comparison form of a title: diacritics folded to base Latin characters,
/// lower-cased, all whitespace/commas/colons removed.
pub fn comparison_title(title: &str) -> String {
    let mut result = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        if c.is_whitespace() || c == ',' || c == ':' {
            continue;
        }
        if c.is_ascii() {
            result.push(c);
            continue;
        }
        result.push_str(fold_diacritic(c));
    }
    result
}

/// Transliterates common Latin diacritics; unmapped non-ASCII is dropped,
/// mirroring the old pipeline's `//TRANSLIT//IGNORE` conversion.
fn fold_diacritic(c: char) -> &'static str {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'ĉ' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'ĝ' | 'ğ' | 'ģ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => "i",
        'ĺ' | 'ļ' | 'ľ' | 'ł' => "l",
        'ñ' | 'ń' | 'ņ' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => "o",
        'œ' => "oe",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'ś' | 'ş' | 'š' | 'ș' => "s",
        'ß' => "ss",
        'ţ' | 'ť' | 'ț' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        _ => "",
    }
}

/// Lenient publication-date parse: accepts `YYYY-MM-DD`, `YYYY-MM` and
/// `YYYY`, defaulting missing parts to 1.
pub fn parse_published(value: &str) -> Option<NaiveDate> {
    let mut parts = value.trim().splitn(3, '-');
    let year: i32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = match parts.next() {
        Some(month) => month.trim().parse().ok()?,
        None => 1,
    };
    let day: u32 = match parts.next() {
        Some(day) => day.trim().parse().ok()?,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}
