use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{LinkStore, SaveOutcome};
use crate::{error::StoreError, models::LinkMap};

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    links: RwLock<LinkMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_links(links: LinkMap) -> Self {
        Self {
            links: RwLock::new(links),
        }
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn load(&self) -> LinkMap {
        self.links.read().await.clone()
    }

    async fn save(&self, links: &LinkMap) -> Result<SaveOutcome, StoreError> {
        *self.links.write().await = links.clone();
        Ok(SaveOutcome::Persisted)
    }

    fn describe(&self) -> String {
        "in-memory".into()
    }
}
