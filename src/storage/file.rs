use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use super::{LinkStore, SaveOutcome};
use crate::{error::StoreError, models::LinkMap};

/// The mapping as a single pretty-printed JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the document without touching any remote. Shared with the git
    /// store, which adds its own sync step afterwards.
    pub(crate) async fn write(&self, links: &LinkMap) -> Result<(), StoreError> {
        let bytes = to_json(links)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl LinkStore for JsonFileStore {
    async fn load(&self) -> LinkMap {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LinkMap::new(),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}; treating as empty", self.path.display(), e);
                return LinkMap::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(links) => links,
            Err(e) => {
                // Existing links become unreachable until the file is repaired
                // or overwritten by the next save.
                tracing::warn!(
                    "{} is not a valid link mapping ({}); treating as empty",
                    self.path.display(),
                    e
                );
                LinkMap::new()
            }
        }
    }

    async fn save(&self, links: &LinkMap) -> Result<SaveOutcome, StoreError> {
        self.write(links).await?;
        tracing::debug!("Saved {} link(s) to {}", links.len(), self.path.display());
        Ok(SaveOutcome::Persisted)
    }

    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }
}

/// Serialize with four-space indentation.
fn to_json(links: &LinkMap) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    links.serialize(&mut ser)?;
    Ok(out)
}
