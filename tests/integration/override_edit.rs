use crate::{table, IntegrationHarness};
use anyhow::Result;
use citebase::overrides::{OverrideFields, OverridePatch};
use citebase::services::{apply_override, run_reconciliation};
use citebase::snapshot::Category;
use citebase::ReconcileError;
use std::fs;

fn seed_and_run(harness: &IntegrationHarness) {
    let workspace = harness.workspace();
    workspace
        .snapshot_store()
        .write(
            Category::Scopus,
            &table(
                &["id", "title", "orcids", "kind", "published", "doi"],
                &[
                    &["S1", "Foo Bar", "0001", "Journal Article", "2021-05-01", "10.1/X"],
                    &["S2", "Métodos de Avaliação", "0002", "article", "2019-03-01", ""],
                ],
            ),
        )
        .expect("failed to seed scopus snapshot");
    let mut workspace = harness.workspace();
    run_reconciliation(&mut workspace).expect("reconciliation run failed");
}

fn patch(id: &str, title: &str, fields: OverrideFields) -> OverridePatch {
    OverridePatch {
        id: id.into(),
        title: title.into(),
        fields,
    }
}

#[test]
fn edit_patches_the_latest_unified_snapshot_in_place() -> Result<()> {
    let harness = IntegrationHarness::new();
    seed_and_run(&harness);
    let workspace = harness.workspace();

    let before = workspace
        .snapshot_store()
        .latest_path(Category::Unified)?
        .expect("unified snapshot must exist");

    let patched = apply_override(
        &workspace,
        &patch(
            "S1",
            "Foo Bar",
            OverrideFields {
                funder: "Grant-99".into(),
                repository_link: "N/A".into(),
                publication_support: "N/A".into(),
            },
        ),
    )?;
    assert_eq!(patched, before, "edit must rewrite the same file");

    let unified = workspace.snapshot_store().read_latest(Category::Unified)?;
    let row = unified
        .rows
        .iter()
        .find(|row| row.get("id").map(String::as_str) == Some("S1"))
        .expect("S1 row must exist");
    assert_eq!(row.get("funder").map(String::as_str), Some("Grant-99"));

    // The edit is durable: the override table now carries it for future runs.
    let (overrides, _) = workspace.override_store().load()?;
    assert_eq!(overrides.lookup("s1", "").unwrap().funder, "Grant-99");
    Ok(())
}

#[test]
fn edit_fails_with_not_found_when_nothing_was_unified() {
    let harness = IntegrationHarness::new();
    let workspace = harness.workspace();

    let error = apply_override(
        &workspace,
        &patch("S1", "Foo Bar", OverrideFields::default()),
    )
    .unwrap_err();
    assert_eq!(
        error.downcast_ref::<ReconcileError>(),
        Some(&ReconcileError::UnifiedSnapshotMissing)
    );
    // Nothing may be recorded when the edit is rejected.
    assert!(!workspace.override_store().path().exists());
}

#[test]
fn edit_falls_back_to_comparison_title_match() -> Result<()> {
    let harness = IntegrationHarness::new();
    seed_and_run(&harness);
    let workspace = harness.workspace();

    // Curator knows the title (with diacritic drift), not the native id.
    apply_override(
        &workspace,
        &patch(
            "CURATED-7",
            "Metodos de Avaliacao",
            OverrideFields {
                funder: "N/A".into(),
                repository_link: "https://repository.example/42".into(),
                publication_support: "N/A".into(),
            },
        ),
    )?;

    let unified = workspace.snapshot_store().read_latest(Category::Unified)?;
    let row = unified
        .rows
        .iter()
        .find(|row| row.get("id").map(String::as_str) == Some("S2"))
        .expect("S2 row must exist");
    assert_eq!(
        row.get("repository_link").map(String::as_str),
        Some("https://repository.example/42")
    );
    // Only the curated field changed; the sentinel entries left data alone.
    assert_eq!(row.get("funder").map(String::as_str), Some("N/A"));
    Ok(())
}

#[test]
fn edit_for_unknown_record_appends_a_row() -> Result<()> {
    let harness = IntegrationHarness::new();
    seed_and_run(&harness);
    let workspace = harness.workspace();

    apply_override(
        &workspace,
        &patch(
            "EXT-1",
            "Record Curated By Hand",
            OverrideFields {
                funder: "Grant-1".into(),
                repository_link: "N/A".into(),
                publication_support: "N/A".into(),
            },
        ),
    )?;

    let unified = workspace.snapshot_store().read_latest(Category::Unified)?;
    assert_eq!(unified.rows.len(), 3);
    let appended = unified.rows.last().unwrap();
    assert_eq!(appended.get("id").map(String::as_str), Some("EXT-1"));
    assert_eq!(appended.get("funder").map(String::as_str), Some("Grant-1"));
    // Columns the patch does not carry default to the sentinel.
    assert_eq!(appended.get("doi").map(String::as_str), Some("N/A"));
    Ok(())
}

#[test]
fn unified_file_count_is_unchanged_by_edits() -> Result<()> {
    let harness = IntegrationHarness::new();
    seed_and_run(&harness);
    let workspace = harness.workspace();

    let unified_dir = harness.workspace_path().join("articles").join("unified");
    let count_files = || -> usize { fs::read_dir(&unified_dir).unwrap().count() };
    let before = count_files();
    apply_override(
        &workspace,
        &patch(
            "S1",
            "Foo Bar",
            OverrideFields {
                funder: "Grant-5".into(),
                repository_link: "N/A".into(),
                publication_support: "N/A".into(),
            },
        ),
    )?;
    assert_eq!(count_files(), before);
    Ok(())
}
