//! Sync state types shared by the engine and its consumers.

use std::fmt;

/// Where the current sync cycle is
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncPhase {
    #[default]
    Idle,
    Pulling,
    Reconciling,
    Pushing,
}

/// How the client relates to the shared store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncState {
    /// No remote configured, or nothing has reached it yet
    #[default]
    LocalOnly,
    /// The last remote exchange succeeded
    Synced,
    /// The last remote exchange failed; local state may be ahead of or behind
    /// the shared store
    Degraded,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Pulling => "pulling",
            Self::Reconciling => "reconciling",
            Self::Pushing => "pushing",
        };
        f.write_str(label)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LocalOnly => "local only",
            Self::Synced => "synced",
            Self::Degraded => "degraded",
        };
        f.write_str(label)
    }
}
