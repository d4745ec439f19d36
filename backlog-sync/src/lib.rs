//! # backlog-sync
//!
//! Content digests, diff classification, iteration planning and sync-state
//! write-back.
//!
//! Call [`pipeline::run`] to parse the configured artifacts and build a
//! [`SyncPlan`] against the stored snapshot, or [`build_plan`] to do the same
//! from an already-parsed project. After the remote calls,
//! [`writeback::commit`] folds their results into the next snapshot.

pub mod classify;
pub mod digest;
pub mod error;
pub mod iteration;
pub mod pipeline;
pub mod plan;
pub mod writeback;

pub use classify::{classify, Classification, Classified};
pub use digest::{compute_digest, normalize, normalize_list, EntityKind, Fingerprinted, HASH_SCOPE_VERSION};
pub use error::SyncError;
pub use iteration::{generate_slug, plan_iterations, IterationAction, IterationDirective};
pub use plan::{build_plan, ClassCounts, PlanSummary, SyncPlan};
pub use writeback::{SyncResults, WriteBackCounts};
