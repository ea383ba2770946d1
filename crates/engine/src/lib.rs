//! Matching engine for reconciling an internal ledger against a bank
//! statement: vendor similarity, amount bucketing and greedy assignment.

pub mod bucket;
pub mod engine;
pub mod params;
pub mod similarity;
pub mod summary;

pub use bucket::{bucket_key, AmountBucketIndex, BUCKET_WIDTH};
pub use engine::{reconcile, ReconcileEngine, Reconciliation};
pub use params::{MatchParams, ParamsError};
pub use similarity::similarity;
pub use summary::{DailyTotal, ReconciliationSummary, VendorCount};
pub use tally_core::{normalize_text, normalize_vendor};
