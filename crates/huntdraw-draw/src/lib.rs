//! Huntdraw Draw
//!
//! The draw allocation engine. A draw awards hunt codes (permit categories)
//! to applicants who rank up to four of them:
//!
//! 1. Sanitizes hunt codes and derives the non-resident and reservation
//!    sub-pools for the rules in force
//! 2. Drops applicants already awarded and clears outcomes on the rest
//! 3. Runs four rounds, one per choice ordinal. Each round buckets the
//!    waiting applicants by code, allocates every bucket in sort order and
//!    applies the tallies once the round is complete
//! 4. Marks the rest not awarded and merges counters back onto every
//!    original hunt-code row
//!
//! [`DrawTask`] wraps this with blob-store I/O and CSV export.

mod allocation;
mod engine;
mod error;
mod export;
mod metrics;
mod sanitize;
mod sort;
mod task;
mod types;

pub use allocation::{
  ActiveRules, BucketOutcome, CHOICE_ORDINALS, DrawBucket, QuotaDelta, allocate, allocate_bucket,
  bucket_applicants,
};
pub use engine::run_draw;
pub use error::DrawError;
pub use export::{read_applicants, read_hunt_codes, write_applicants, write_hunt_codes, write_metrics};
pub use metrics::{ApplicantTotals, DrawMetrics, MetricRow, QuotaTotals, percent};
pub use sanitize::{capped_pool, filter_applicants, merge_hunt_codes, sanitize_hunt_codes};
pub use sort::ApplicantComparator;
pub use task::{DrawArtifacts, DrawInputs, DrawTask};
pub use types::{
  Applicant, DrawConfig, DrawOutcome, DrawResult, DrawSort, HuntCode, NonResidentPool, QuotaRule,
  ReservedPool, ResidentTally, Residency, SortDirection, SortField, SortRule,
};
