//! Batch entry point: run one reconciliation over the latest per-source
//! snapshots and report what was written.

use anyhow::Result;
use citebase::services::run_reconciliation;
use citebase::Workspace;

fn main() -> Result<()> {
    let mut workspace = Workspace::new()?;
    let outcome = run_reconciliation(&mut workspace)?;
    println!(
        "Unified {} articles ({} from Scopus, {} from WOS)",
        outcome.articles.len(),
        outcome.scopus_count,
        outcome.wos_count
    );
    println!("Snapshot written to {}", outcome.snapshot_path.display());
    Ok(())
}
