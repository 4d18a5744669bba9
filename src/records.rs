//! Canonical publication record shared by both citation sources.
//!
//! Upstream fetchers persist one flat CSV row per publication. The columns
//! below are the contract: a per-source snapshot must carry at least `id`,
//! `title`, `authors`, `orcids`, `doi`, `issn`, `isbn`, `published` and
//! `kind` (the raw type descriptor). Anything else the source exposes
//! (volume, pages, citation counts, ...) rides along in `extra` and is
//! preserved through unification.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel written for any missing or unusable field value.
pub const UNKNOWN: &str = "N/A";

/// True when a field value carries no usable content: empty after trimming,
/// the `N/A` sentinel, or the literal `undefined` some feeds emit.
pub fn is_unknown(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("n/a")
        || trimmed.eq_ignore_ascii_case("undefined")
}

/// Which citation database(s) contributed a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    Scopus,
    Wos,
    Both,
}

impl Source {
    pub fn label(&self) -> &'static str {
        match self {
            Source::Scopus => "Scopus",
            Source::Wos => "WOS",
            Source::Both => "WOS/Scopus",
        }
    }
}

/// Column order for the canonical fields in every snapshot we write.
pub const CANONICAL_COLUMNS: &[&str] = &[
    "id",
    "title",
    "authors",
    "orcids",
    "kind",
    "published",
    "doi",
    "issn",
    "isbn",
    "funder",
    "repository_link",
    "publication_support",
    "department",
    "affiliations",
    "description",
    "keywords",
    "origin",
];

/// One publication in the canonical schema.
///
/// All fields are plain strings on purpose: the sources disagree about
/// shapes and the old pipeline's loose coercions are replaced here by the
/// single explicit [`is_unknown`] check instead of per-field typing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Source-native identifier (Scopus `dc:identifier`, WOS `uid`).
    pub id: String,
    pub title: String,
    /// Display author list, `; `-joined.
    pub authors: String,
    /// Author ORCIDs, `; `-joined; treated as a set during merging.
    pub orcids: String,
    /// Canonical type bucket label (see `normalize::ArticleKind`).
    pub kind: String,
    /// Publication date as delivered; partial dates tolerated.
    pub published: String,
    pub doi: String,
    pub issn: String,
    pub isbn: String,
    pub funder: String,
    pub repository_link: String,
    pub publication_support: String,
    pub department: String,
    pub affiliations: String,
    pub description: String,
    pub keywords: String,
    pub origin: Source,
    /// Source-specific columns not in the canonical schema.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Article {
    /// Value for a named output column; canonical fields first, then extras.
    pub fn field(&self, column: &str) -> Option<String> {
        let value = match column {
            "id" => &self.id,
            "title" => &self.title,
            "authors" => &self.authors,
            "orcids" => &self.orcids,
            "kind" => &self.kind,
            "published" => &self.published,
            "doi" => &self.doi,
            "issn" => &self.issn,
            "isbn" => &self.isbn,
            "funder" => &self.funder,
            "repository_link" => &self.repository_link,
            "publication_support" => &self.publication_support,
            "department" => &self.department,
            "affiliations" => &self.affiliations,
            "description" => &self.description,
            "keywords" => &self.keywords,
            "origin" => return Some(self.origin.label().to_string()),
            _ => return self.extra.get(column).cloned(),
        };
        Some(value.clone())
    }
}
