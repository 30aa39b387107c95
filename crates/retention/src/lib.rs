//! Retention sweep over a user's post and comment history
//!
//! Thin orchestration on top of the rate gate: every listing page and every
//! delete is one gated request made through [`ApiClient`].
//!
//! Per user:
//! 1. `scan::scan()` pages `user/{name}/overview` until the `after` cursor
//!    runs out, queueing entries older than the per-kind cutoff
//! 2. `delete::delete_all()` deletes them one at a time and stops at the
//!    first failure

pub mod client;
pub mod delete;
pub mod error;
pub mod listing;
pub mod policy;
pub mod scan;
pub mod sweep;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{ApiClient, Identity};
pub use delete::delete_all;
pub use error::{Error, Result};
pub use listing::{EntryKind, RetentionTarget};
pub use policy::{Cutoffs, Retention, RetentionPolicy, parse_duration};
pub use scan::scan;
pub use sweep::{SweepSummary, sweep_user};
