//! The reconciliation engine: merges the two per-source collections into one
//! deduplicated collection with provenance tags.
//!
//! Order matters throughout. Scopus is processed first because it is the
//! structurally richer source and seeds identity; WOS records then either
//! fold into an existing entry (native-id collision or `same_article` match)
//! or append. Ties in the field-merge policy resolve toward whichever value
//! arrived first, so reordering a phase changes output. Do not parallelize.

use crate::identity::{same_article, unification_key};
use crate::normalize::ArticleKind;
use crate::overrides::OverrideTable;
use crate::records::{is_unknown, Article, Source};

/// Ordered arena of unification slots built once per run.
///
/// Linear scans are deliberate: the per-run scale is thousands of records,
/// and the previous pipeline's semantics depend on first-match-wins order.
/// If scale grows, add a key index and a comparison-title index instead of
/// reordering anything here.
#[derive(Debug, Default)]
pub struct UnifiedArena {
    slots: Vec<(String, Article)>,
}

impl UnifiedArena {
    /// Finds the slot holding a record with the given native identifier.
    /// Empty identifiers never match; same-source duplicate fetches rely on
    /// this short-circuit to avoid re-splitting into separate entries.
    fn position_by_id(&self, id: &str) -> Option<usize> {
        let id = id.trim();
        if id.is_empty() || is_unknown(id) {
            return None;
        }
        self.slots
            .iter()
            .position(|(_, article)| article.id.trim() == id)
    }

    fn position_matching(&self, candidate: &Article) -> Option<usize> {
        self.slots
            .iter()
            .position(|(_, article)| same_article(article, candidate))
    }

    fn contains_key(&self, key: &str) -> bool {
        self.slots.iter().any(|(slot_key, _)| slot_key == key)
    }

    /// Appends a numeric suffix until the key is free. Slot-uniqueness only;
    /// dedup decisions are made by the id and `same_article` checks above.
    fn vacant_key(&self, base: &str) -> String {
        if !self.contains_key(base) {
            return base.to_string();
        }
        let mut counter = 1;
        loop {
            let key = format!("{base}-{counter}");
            if !self.contains_key(&key) {
                return key;
            }
            counter += 1;
        }
    }

    fn merge_into(&mut self, index: usize, incoming: &Article) {
        merge_fields(&mut self.slots[index].1, incoming);
    }

    fn insert(&mut self, key: String, article: Article) {
        self.slots.push((key, article));
    }

    pub fn into_articles(self) -> Vec<Article> {
        self.slots.into_iter().map(|(_, article)| article).collect()
    }
}

/// Runs the two-phase unification over already-normalized records.
pub fn unify(
    scopus: Vec<Article>,
    wos: Vec<Article>,
    overrides: &OverrideTable,
) -> Vec<Article> {
    let mut arena = UnifiedArena::default();
    let ignore = ArticleKind::Ignore.label();

    for mut article in scopus {
        if article.kind == ignore {
            continue;
        }
        if let Some(index) = arena.position_by_id(&article.id) {
            arena.merge_into(index, &article);
            continue;
        }
        overrides.apply(&mut article);
        let key = arena.vacant_key(&unification_key(&article));
        article.origin = Source::Scopus;
        arena.insert(key, article);
    }

    for mut article in wos {
        if article.kind == ignore {
            continue;
        }
        if let Some(index) = arena.position_by_id(&article.id) {
            arena.merge_into(index, &article);
            continue;
        }
        overrides.apply(&mut article);
        if let Some(index) = arena.position_matching(&article) {
            // Cross-source reconciliation: fold into the Scopus-seeded entry
            // and record the combined provenance.
            arena.merge_into(index, &article);
            arena.slots[index].1.origin = Source::Both;
            continue;
        }
        let key = arena.vacant_key(&unification_key(&article));
        article.origin = Source::Wos;
        arena.insert(key, article);
    }

    arena.into_articles()
}

/// Field-merge policy: the existing value wins unless it is unknown, in
/// which case the incoming value replaces it. ORCIDs are an exception and
/// are unioned as a set.
fn merge_fields(existing: &mut Article, incoming: &Article) {
    existing.orcids = union_identifiers(&existing.orcids, &incoming.orcids);
    keep_or_replace(&mut existing.id, &incoming.id);
    keep_or_replace(&mut existing.title, &incoming.title);
    keep_or_replace(&mut existing.authors, &incoming.authors);
    keep_or_replace(&mut existing.kind, &incoming.kind);
    keep_or_replace(&mut existing.published, &incoming.published);
    keep_or_replace(&mut existing.doi, &incoming.doi);
    keep_or_replace(&mut existing.issn, &incoming.issn);
    keep_or_replace(&mut existing.isbn, &incoming.isbn);
    keep_or_replace(&mut existing.funder, &incoming.funder);
    keep_or_replace(&mut existing.repository_link, &incoming.repository_link);
    keep_or_replace(
        &mut existing.publication_support,
        &incoming.publication_support,
    );
    keep_or_replace(&mut existing.department, &incoming.department);
    keep_or_replace(&mut existing.affiliations, &incoming.affiliations);
    keep_or_replace(&mut existing.description, &incoming.description);
    keep_or_replace(&mut existing.keywords, &incoming.keywords);
    for (column, value) in &incoming.extra {
        match existing.extra.get_mut(column) {
            Some(slot) => keep_or_replace(slot, value),
            None => {
                existing.extra.insert(column.clone(), value.clone());
            }
        }
    }
}

fn keep_or_replace(existing: &mut String, incoming: &str) {
    if is_unknown(existing) {
        *existing = incoming.to_string();
    }
}

/// Union of two `; `-delimited identifier lists, trimmed, deduplicated
/// case-sensitively, first appearance order preserved.
fn union_identifiers(existing: &str, incoming: &str) -> String {
    let mut seen: Vec<String> = Vec::new();
    for part in existing.split(';').chain(incoming.split(';')) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if !seen.iter().any(|known| known == part) {
            seen.push(part.to_string());
        }
    }
    seen.join("; ")
}
