pub mod edit;
pub mod unify;

pub use edit::apply_override;
pub use unify::{
    latest_unified, latest_unified_date, run_reconciliation, unified_between, UnifyOutcome,
};
