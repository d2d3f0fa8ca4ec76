//! SQLite-backed [`VectorIndex`].
//!
//! Vectors are stored as little-endian `f32` BLOBs in the `chunk_index`
//! table. Search loads every vector of matching dimensionality and ranks
//! by squared Euclidean distance in Rust, so it scales linearly with the
//! corpus.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use docchat_core::embedding::{blob_to_vec, squared_l2, vec_to_blob};
use docchat_core::models::{source_id_of, IndexedChunk, Metadata};
use docchat_core::store::{Neighbor, VectorIndex};

use crate::config::Config;
use crate::db;
use crate::migrate;

pub struct SqliteIndex {
    pool: SqlitePool,
}

/// Chunk count for one source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCount {
    pub source_id: String,
    pub chunks: i64,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and ensure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::migrate_pool(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Chunks per source, most chunks first.
    pub async fn source_counts(&self) -> Result<Vec<SourceCount>> {
        let rows = sqlx::query(
            r#"
            SELECT source_id, COUNT(*) AS chunks
            FROM chunk_index
            GROUP BY source_id
            ORDER BY chunks DESC, source_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SourceCount {
                source_id: row.get("source_id"),
                chunks: row.get("chunks"),
            })
            .collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Insert or overwrite `records` inside an open transaction.
async fn write_records(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    records: &[IndexedChunk],
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    for record in records {
        let metadata_json = serde_json::to_string(&record.metadata)?;
        let source_id = source_id_of(&record.metadata).unwrap_or_default();

        sqlx::query(
            r#"
            INSERT INTO chunk_index (id, source_id, content, metadata_json, embedding, dims, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                source_id = excluded.source_id,
                content = excluded.content,
                metadata_json = excluded.metadata_json,
                embedding = excluded.embedding,
                dims = excluded.dims,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.id)
        .bind(source_id)
        .bind(&record.content)
        .bind(&metadata_json)
        .bind(vec_to_blob(&record.embedding))
        .bind(record.embedding.len() as i64)
        .bind(now)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("Failed to upsert chunk {}", record.id))?;
    }

    Ok(())
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn upsert(&self, records: &[IndexedChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_records(&mut tx, records).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_source(&self, source_id: &str, records: &[IndexedChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM chunk_index WHERE source_id = ?")
            .bind(source_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to clear chunks of {}", source_id))?
            .rows_affected();
        write_records(&mut tx, records).await?;

        tx.commit().await?;
        tracing::debug!(source_id, removed, written = records.len(), "replaced source chunks");
        Ok(())
    }

    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let rows = sqlx::query(
            "SELECT id, content, metadata_json, embedding FROM chunk_index WHERE dims = ?",
        )
        .bind(query.len() as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(String, Neighbor)> = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let metadata_json: String = row.get("metadata_json");
            let metadata: Metadata = serde_json::from_str(&metadata_json)
                .with_context(|| format!("Corrupt metadata for chunk {}", row.get::<String, _>("id")))?;

            scored.push((
                row.get("id"),
                Neighbor {
                    content: row.get("content"),
                    metadata,
                    distance: squared_l2(query, &blob_to_vec(&blob)),
                },
            ));
        }

        scored.sort_by(|a, b| {
            a.1.distance
                .partial_cmp(&b.1.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, n)| n).collect())
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk_index")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, source: &str, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            id: id.to_string(),
            content: format!("text of {}", id),
            metadata: json!({"source_id": source, "chunk_start": 0})
                .as_object()
                .cloned()
                .unwrap(),
            embedding,
        }
    }

    async fn open_temp() -> (SqliteIndex, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.db.path = tmp.path().join("data/test.sqlite");
        (SqliteIndex::open(&config).await.unwrap(), tmp)
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let (index, _tmp) = open_temp().await;
        index.upsert(&[record("a.md-0", "a.md", vec![1.0, 0.0])]).await.unwrap();
        index.upsert(&[record("a.md-0", "a.md", vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        let hits = index.nearest(&[0.0, 1.0], 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].distance.abs() < 1e-9);
        assert_eq!(hits[0].metadata["source_id"], "a.md");
    }

    #[tokio::test]
    async fn test_nearest_orders_and_skips_other_dims() {
        let (index, _tmp) = open_temp().await;
        index
            .upsert(&[
                record("far", "f.md", vec![-1.0, 0.0]),
                record("near", "n.md", vec![1.0, 0.0]),
                record("other", "o.md", vec![1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = index.nearest(&[1.0, 0.0], 5).await.unwrap();
        let contents: Vec<&str> = hits.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(contents, vec!["text of near", "text of far"]);
        assert!((hits[1].distance - 4.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_replace_source_removes_stale_chunks() {
        let (index, _tmp) = open_temp().await;
        index
            .upsert(&[
                record("a.md-0", "a.md", vec![1.0, 0.0]),
                record("a.md-800", "a.md", vec![0.0, 1.0]),
                record("b.md-0", "b.md", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        index
            .replace_source("a.md", &[record("a.md-0", "a.md", vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 2);
        let hits = index.nearest(&[0.0, 1.0], 5).await.unwrap();
        assert!(hits.iter().all(|h| h.content != "text of a.md-800"));

        index.replace_source("a.md", &[]).await.unwrap();
        let counts = index.source_counts().await.unwrap();
        assert_eq!(
            counts,
            vec![SourceCount {
                source_id: "b.md".into(),
                chunks: 1
            }]
        );
    }

    #[tokio::test]
    async fn test_source_counts() {
        let (index, _tmp) = open_temp().await;
        index
            .upsert(&[
                record("a-0", "a.md", vec![1.0]),
                record("a-5", "a.md", vec![1.0]),
                record("b-0", "b.md", vec![1.0]),
            ])
            .await
            .unwrap();

        let counts = index.source_counts().await.unwrap();
        assert_eq!(
            counts,
            vec![
                SourceCount {
                    source_id: "a.md".into(),
                    chunks: 2
                },
                SourceCount {
                    source_id: "b.md".into(),
                    chunks: 1
                },
            ]
        );
    }
}
