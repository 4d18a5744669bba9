//! Domain error kinds callers need to tell apart. Everything else travels
//! as `anyhow` context chains.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// Both source collections resolved empty. Failing here instead of
    /// writing an empty unified snapshot guards against silent data loss
    /// when an upstream fetch returned nothing.
    #[error("no source records available to unify")]
    NoRecordsToUnify,

    /// The unified snapshot directory is absent or empty on a path that
    /// needs the latest unified file (download or manual edit).
    #[error("no unified snapshot found")]
    UnifiedSnapshotMissing,
}
