//! Backing stores for the link mapping.
//!
//! Every store exposes the same contract: `load` returns the whole mapping,
//! `save` overwrites it. Nothing is incremental.

use async_trait::async_trait;

use crate::{error::StoreError, models::LinkMap};

mod file;
mod git;
mod memory;

pub use file::JsonFileStore;
pub use git::GitSyncStore;
pub use memory::MemoryStore;

/// What a successful [`LinkStore::save`] actually achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written to a store that has no remote tier.
    Persisted,
    /// Written locally and pushed to the remote.
    PersistedAndSynced,
    /// Written locally, but the remote push failed. The local copy will be
    /// overwritten by the next pull.
    PersistedLocally { reason: String },
}

impl SaveOutcome {
    /// Warning text for the user, if any. The failure detail stays in the
    /// server log.
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::PersistedLocally { .. } => Some(
                "Saved on this server, but syncing to the remote repository failed. \
                 The change may be lost on the next sync."
                    .into(),
            ),
            Self::Persisted | Self::PersistedAndSynced => None,
        }
    }
}

#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Load the full mapping. Missing or unreadable data yields an empty map.
    async fn load(&self) -> LinkMap;

    /// Overwrite the backing store with `links`.
    ///
    /// Errors only when nothing was persisted at all.
    async fn save(&self, links: &LinkMap) -> Result<SaveOutcome, StoreError>;

    /// Short human-readable description for startup logs.
    fn describe(&self) -> String;
}
