//! Weight map storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{StoreError, WeightStore};
use crate::types::WeightMap;

/// JSON file of `uid -> weight`.
pub struct FileWeightStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileWeightStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `weights.json` inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("weights.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl WeightStore for FileWeightStore {
    async fn load(&self) -> Result<WeightMap, StoreError> {
        let _guard = self.lock.lock().await;

        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(WeightMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, weights: &WeightMap) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(weights)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), entries = weights.len(), "Stored weights");
        Ok(())
    }
}

/// In-memory weight map.
#[derive(Default)]
pub struct MemoryWeightStore {
    weights: Mutex<WeightMap>,
}

impl MemoryWeightStore {
    pub fn new(initial: WeightMap) -> Self {
        Self {
            weights: Mutex::new(initial),
        }
    }
}

#[async_trait]
impl WeightStore for MemoryWeightStore {
    async fn load(&self) -> Result<WeightMap, StoreError> {
        Ok(self.weights.lock().await.clone())
    }

    async fn store(&self, weights: &WeightMap) -> Result<(), StoreError> {
        *self.weights.lock().await = weights.clone();
        Ok(())
    }
}
