//! Swap persistence capability
//!
//! The engines only need a key-value contract keyed by swap id: upsert,
//! load-by-id, load-all. [`MemoryStore`] is the reference implementation;
//! embedders back the trait with whatever database their platform provides.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{SwapError, SwapResult};
use crate::swap::Swap;

/// Key-value persistence for swap records
#[async_trait]
pub trait SwapStore: Send + Sync {
    /// Insert or replace the row for `swap.id`
    async fn save(&self, swap: &Swap) -> SwapResult<()>;

    /// Load one swap; fails with [`SwapError::NotFound`] if absent
    async fn load(&self, id: &str) -> SwapResult<Swap>;

    /// Load every persisted swap, in no particular order
    async fn load_all(&self) -> SwapResult<Vec<Swap>>;
}

/// In-memory store keeping each swap as a JSON row
#[derive(Default)]
pub struct MemoryStore {
    rows: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SwapStore for MemoryStore {
    async fn save(&self, swap: &Swap) -> SwapResult<()> {
        let row = serde_json::to_string(swap).map_err(|e| SwapError::Storage(e.to_string()))?;
        self.rows.insert(swap.id.clone(), row);
        Ok(())
    }

    async fn load(&self, id: &str) -> SwapResult<Swap> {
        let row = self
            .rows
            .get(id)
            .ok_or_else(|| SwapError::NotFound(id.to_string()))?;
        serde_json::from_str(row.value()).map_err(|e| SwapError::Storage(e.to_string()))
    }

    async fn load_all(&self) -> SwapResult<Vec<Swap>> {
        self.rows
            .iter()
            .map(|row| {
                serde_json::from_str(row.value()).map_err(|e| SwapError::Storage(e.to_string()))
            })
            .collect()
    }
}
