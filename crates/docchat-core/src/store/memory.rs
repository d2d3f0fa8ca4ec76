//! In-memory [`VectorIndex`] for tests and embedding into other programs.
//!
//! Records live in a `HashMap` behind `std::sync::RwLock`. Search is a
//! brute-force scan using squared Euclidean distance.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::squared_l2;
use crate::models::{source_id_of, IndexedChunk};

use super::{Neighbor, VectorIndex};

#[derive(Debug, Default)]
pub struct InMemoryIndex {
    records: RwLock<HashMap<String, IndexedChunk>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, records: &[IndexedChunk]) -> Result<()> {
        let mut stored = self
            .records
            .write()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))?;
        for record in records {
            stored.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn replace_source(&self, source_id: &str, records: &[IndexedChunk]) -> Result<()> {
        let mut stored = self
            .records
            .write()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))?;
        stored.retain(|_, rec| source_id_of(&rec.metadata) != Some(source_id));
        for record in records {
            stored.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let stored = self
            .records
            .read()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))?;

        let mut scored: Vec<(&String, f64, &IndexedChunk)> = stored
            .iter()
            .map(|(id, rec)| (id, squared_l2(query, &rec.embedding), rec))
            .collect();

        // Ties break on id so results do not depend on HashMap order.
        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(_, distance, rec)| Neighbor {
                content: rec.content.clone(),
                metadata: rec.metadata.clone(),
                distance,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        let stored = self
            .records
            .read()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))?;
        Ok(stored.len())
    }
}
