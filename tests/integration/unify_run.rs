use crate::{table, IntegrationHarness};
use anyhow::Result;
use citebase::overrides::{OverrideFields, OverridePatch};
use citebase::services::run_reconciliation;
use citebase::snapshot::Category;
use citebase::{ReconcileError, Source};

const SOURCE_COLUMNS: &[&str] = &[
    "id", "title", "authors", "orcids", "kind", "published", "doi",
];

fn seed_sources(harness: &IntegrationHarness) {
    let workspace = harness.workspace();
    let store = workspace.snapshot_store();
    store
        .write(
            Category::Scopus,
            &table(
                SOURCE_COLUMNS,
                &[
                    &[
                        "S1",
                        "Foo Bar",
                        "A. Author",
                        "0001",
                        "Journal Article",
                        "2021-05-01",
                        "10.1/X",
                    ],
                    &[
                        "S9",
                        "A Survey of Surveys",
                        "B. Author",
                        "0004",
                        "Review",
                        "2021-01-01",
                        "10.1/REV",
                    ],
                ],
            ),
        )
        .expect("failed to seed scopus snapshot");
    store
        .write(
            Category::Wos,
            &table(
                SOURCE_COLUMNS,
                &[
                    &[
                        "W1",
                        "Foo Bar: A Study",
                        "A. Author; C. Author",
                        "0002",
                        "article",
                        "2021-05-01",
                        "10.1/X",
                    ],
                    &[
                        "W2",
                        "Independent Result",
                        "D. Author",
                        "0003",
                        "article",
                        "2020-11-01",
                        "",
                    ],
                ],
            ),
        )
        .expect("failed to seed wos snapshot");
}

#[test]
fn cross_source_run_unifies_and_writes_snapshot() -> Result<()> {
    let harness = IntegrationHarness::new();
    seed_sources(&harness);
    let mut workspace = harness.workspace();

    let outcome = run_reconciliation(&mut workspace)?;
    assert_eq!(outcome.scopus_count, 2);
    assert_eq!(outcome.wos_count, 2);
    // S1+W1 share a DOI and collapse; the review never appears.
    assert_eq!(outcome.articles.len(), 2);

    let merged = &outcome.articles[0];
    assert_eq!(merged.id, "S1");
    assert_eq!(merged.origin, Source::Both);
    assert_eq!(merged.orcids, "0001; 0002");
    assert_eq!(merged.doi, "10.1/X");
    assert_eq!(merged.title, "Foo Bar");

    let solo = &outcome.articles[1];
    assert_eq!(solo.id, "W2");
    assert_eq!(solo.origin, Source::Wos);

    assert!(outcome.snapshot_path.exists());
    let written = workspace.snapshot_store().read_latest(Category::Unified)?;
    assert_eq!(written.rows.len(), 2);
    assert_eq!(
        written.rows[0].get("origin").map(String::as_str),
        Some("WOS/Scopus")
    );
    assert_eq!(
        written.rows[1].get("origin").map(String::as_str),
        Some("WOS")
    );
    Ok(())
}

#[test]
fn rerun_over_frozen_inputs_is_content_idempotent() -> Result<()> {
    let harness = IntegrationHarness::new();
    seed_sources(&harness);
    let mut workspace = harness.workspace();

    let first = run_reconciliation(&mut workspace)?;
    let second = run_reconciliation(&mut workspace)?;
    assert_ne!(first.snapshot_path, second.snapshot_path);
    assert!(first.snapshot_path.exists(), "prior snapshot must survive");

    let ids = |articles: &[citebase::Article]| -> Vec<(String, String, String)> {
        articles
            .iter()
            .map(|a| (a.id.clone(), a.orcids.clone(), a.origin.label().to_string()))
            .collect()
    };
    assert_eq!(ids(&first.articles), ids(&second.articles));

    // The freshest snapshot is the re-run's file.
    let latest = workspace
        .snapshot_store()
        .latest_path(Category::Unified)?
        .expect("unified snapshot must exist");
    assert_eq!(latest, second.snapshot_path);
    Ok(())
}

#[test]
fn run_fails_outright_when_both_sources_are_empty() {
    let harness = IntegrationHarness::new();
    let mut workspace = harness.workspace();

    let error = run_reconciliation(&mut workspace).unwrap_err();
    assert_eq!(
        error.downcast_ref::<ReconcileError>(),
        Some(&ReconcileError::NoRecordsToUnify)
    );
    // Nothing may be written by a failed run.
    let latest = workspace
        .snapshot_store()
        .latest_path(Category::Unified)
        .unwrap();
    assert!(latest.is_none());
}

#[test]
fn run_fails_when_every_record_is_a_review() -> Result<()> {
    let harness = IntegrationHarness::new();
    let workspace = harness.workspace();
    workspace.snapshot_store().write(
        Category::Scopus,
        &table(
            SOURCE_COLUMNS,
            &[&[
                "S9",
                "A Survey of Surveys",
                "B. Author",
                "0004",
                "Review",
                "2021-01-01",
                "10.1/REV",
            ]],
        ),
    )?;

    let mut workspace = harness.workspace();
    let error = run_reconciliation(&mut workspace).unwrap_err();
    assert_eq!(
        error.downcast_ref::<ReconcileError>(),
        Some(&ReconcileError::NoRecordsToUnify)
    );
    // No header-only snapshot may be left behind.
    let latest = workspace
        .snapshot_store()
        .latest_path(Category::Unified)
        .unwrap();
    assert!(latest.is_none());
    Ok(())
}

#[test]
fn single_source_degrades_to_empty_collection() -> Result<()> {
    let harness = IntegrationHarness::new();
    let workspace = harness.workspace();
    workspace.snapshot_store().write(
        Category::Wos,
        &table(
            SOURCE_COLUMNS,
            &[&["W1", "Only WOS", "A", "0001", "article", "2022", ""]],
        ),
    )?;

    let mut workspace = harness.workspace();
    let outcome = run_reconciliation(&mut workspace)?;
    assert_eq!(outcome.scopus_count, 0);
    assert_eq!(outcome.articles.len(), 1);
    assert_eq!(outcome.articles[0].origin, Source::Wos);
    Ok(())
}

#[test]
fn stored_override_is_applied_during_the_run() -> Result<()> {
    let harness = IntegrationHarness::new();
    seed_sources(&harness);
    let workspace = harness.workspace();
    workspace.override_store().upsert(&OverridePatch {
        id: "S1".into(),
        title: "Foo Bar".into(),
        fields: OverrideFields {
            funder: "Grant-42".into(),
            repository_link: "N/A".into(),
            publication_support: "N/A".into(),
        },
    })?;

    let mut workspace = harness.workspace();
    let outcome = run_reconciliation(&mut workspace)?;
    let merged = outcome
        .articles
        .iter()
        .find(|article| article.id == "S1")
        .expect("S1 must be unified");
    assert_eq!(merged.funder, "Grant-42");
    Ok(())
}
