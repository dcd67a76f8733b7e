use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::types::{PoolState, Result};

/// Persistence for pool state between runs.
#[async_trait]
pub trait PoolStore: Send + Sync {
    /// `None` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<PoolState>>;
    async fn save(&self, state: &PoolState) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Option<PoolState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PoolStore for MemoryStore {
    async fn load(&self) -> Result<Option<PoolState>> {
        Ok(self.state.lock().await.clone())
    }

    async fn save(&self, state: &PoolState) -> Result<()> {
        *self.state.lock().await = Some(state.clone());
        Ok(())
    }
}

/// Pool state as pretty-printed JSON on disk.
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
}

#[async_trait]
impl PoolStore for JsonFileStore {
    async fn load(&self) -> Result<Option<PoolState>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No saved state at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let state = serde_json::from_str(&content)?;
        info!("Loaded pool state from {}", self.path.display());
        Ok(Some(state))
    }

    async fn save(&self, state: &PoolState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.path, json).await?;
        info!("Saved pool state to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math::FixedMath,
        types::{AmmError, AssetId, AssetPair, ProviderId},
    };

    fn sample() -> PoolState {
        let math = FixedMath::default();
        let mut state = PoolState::new(AssetPair::new(AssetId::new("ETH"), AssetId::new("USDC")).unwrap());
        state.reserve_x = math.from_int(10).unwrap();
        state.reserve_y = math.from_ratio(100, 3).unwrap();
        state.expected_price = math.from_ratio(10, 3).unwrap();
        state.last_update = 42;
        state.total_liquidity_tokens = math.from_int(10).unwrap();
        state.liquidity_balance.insert(ProviderId::new("alice"), math.from_int(10).unwrap());
        state
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_none());
        store.save(&sample()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(sample()));
    }

    #[tokio::test]
    async fn test_json_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("pool.json"));
        assert!(store.load().await.unwrap().is_none());

        store.save(&sample()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(sample()));
    }

    #[tokio::test]
    async fn test_json_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        tokio::fs::write(&path, "not json").await.unwrap();
        let store = JsonFileStore::new(path);
        assert!(matches!(store.load().await, Err(AmmError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_store_as_trait_object() {
        let store: Box<dyn PoolStore> = Box::new(MemoryStore::new());
        store.save(&sample()).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap().last_update(), 42);
    }
}
