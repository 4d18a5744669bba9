pub mod error;
pub mod identity;
pub mod merge;
pub mod normalize;
pub mod overrides;
pub mod records;
pub mod runlog;
pub mod services;
pub mod snapshot;
pub mod workspace;

// Re-export commonly used types for convenience.
pub use error::ReconcileError;
pub use records::{is_unknown, Article, Source, UNKNOWN};
pub use workspace::{AppConfig, Workspace};
