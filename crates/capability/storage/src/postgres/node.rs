//! Postgres 节点目录实现

use super::parse_uuid;
use crate::error::StorageError;
use crate::traits::NodeDirectory;
use domain::NodeRecord;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct PgNodeDirectory {
    pub pool: PgPool,
}

impl PgNodeDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl NodeDirectory for PgNodeDirectory {
    async fn touch(&self, node: &NodeRecord) -> Result<(), StorageError> {
        sqlx::query(
            "insert into cluster_nodes (uuid, name, address, last_seen, deleted) \
             values ($1, $2, $3, to_timestamp($4 / 1000.0), $5) \
             on conflict (uuid) do update set \
             name = excluded.name, address = excluded.address, \
             last_seen = excluded.last_seen, deleted = excluded.deleted",
        )
        .bind(node.uuid.to_string())
        .bind(&node.name)
        .bind(&node.address)
        .bind(node.last_seen_at_ms as f64)
        .bind(node.deleted)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_live_nodes(
        &self,
        now_ms: i64,
        liveness_ms: i64,
    ) -> Result<Vec<NodeRecord>, StorageError> {
        let rows = sqlx::query(
            "select uuid, name, address, deleted, \
             (extract(epoch from last_seen) * 1000)::bigint as last_seen_at_ms \
             from cluster_nodes \
             where deleted = false and last_seen >= to_timestamp($1 / 1000.0) \
             order by name asc",
        )
        .bind(now_ms.saturating_sub(liveness_ms) as f64)
        .fetch_all(&self.pool)
        .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let uuid: String = row.try_get("uuid")?;
            items.push(NodeRecord {
                uuid: parse_uuid(&uuid)?,
                name: row.try_get("name")?,
                address: row.try_get("address")?,
                last_seen_at_ms: row.try_get("last_seen_at_ms")?,
                deleted: row.try_get("deleted")?,
            });
        }
        Ok(items)
    }

    async fn mark_deleted(&self, uuid: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query("update cluster_nodes set deleted = true where uuid = $1")
            .bind(uuid.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
