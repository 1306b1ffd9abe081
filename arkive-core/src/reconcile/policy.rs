use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::record::Record;

/// Decides which version survives when a remote record shares an id with a
/// local one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// The remote record always replaces the local one (the cloud is the
    /// source of truth). Timestamps are not consulted.
    #[default]
    RemoteWins,
    /// The local record survives only when its modification instant is
    /// strictly newer than the remote one. Ties go to the remote record.
    NewestWins,
}

impl MergePolicy {
    /// Returns true if `remote` should replace `local`.
    pub fn prefers_remote<R: Record>(&self, local: &R, remote: &R) -> bool {
        match self {
            MergePolicy::RemoteWins => true,
            MergePolicy::NewestWins => local.modified_at() <= remote.modified_at(),
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::RemoteWins => write!(f, "remote-wins"),
            MergePolicy::NewestWins => write!(f, "newest-wins"),
        }
    }
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "remote-wins" | "remote" => Ok(MergePolicy::RemoteWins),
            "newest-wins" | "newest" => Ok(MergePolicy::NewestWins),
            _ => Err(format!(
                "Invalid merge policy: '{}'. Valid options: remote-wins, newest-wins",
                s
            )),
        }
    }
}

/// Statistics about one remote merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Records in the remote snapshot
    pub received: usize,
    /// Ids that were not in the view before
    pub inserted: usize,
    /// Local records replaced by their remote version
    pub overwritten: usize,
    /// Local records kept because the policy preferred them
    pub kept_local: usize,
}
