//! Reconciliation of local and remote records.
//!
//! Each collection keeps one [`ReconciledView`]: local mutations are applied
//! as they happen, remote snapshots are merged under a [`MergePolicy`], and
//! the result is a deduplicated sequence ordered by recency, newest first.
//!
//! Remote snapshots are treated as additive. A record that disappears from
//! the remote feed stays in the view, and a record deleted locally comes
//! back if a later snapshot still lists it; the feed carries no tombstones.

mod policy;
mod view;

pub use policy::{MergePolicy, MergeStats};
pub use view::{LocalMutation, PendingChange, ReconciledView};
