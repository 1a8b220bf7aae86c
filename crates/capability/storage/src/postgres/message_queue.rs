//! Postgres 集群消息队列实现

use super::parse_uuid;
use crate::error::StorageError;
use crate::models::{MessageStatus, OutgoingMessage, QueuedMessage};
use crate::traits::MessageQueue;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct PgMessageQueue {
    pub pool: PgPool,
}

impl PgMessageQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageQueue for PgMessageQueue {
    async fn enqueue(&self, messages: Vec<OutgoingMessage>) -> Result<(), StorageError> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for message in messages {
            sqlx::query(
                "insert into message_bus_messages \
                 (message_id, message_type, payload, sender, receiver, status, created_at) \
                 values ($1, $2, $3, $4, $5, $6, to_timestamp($7 / 1000.0))",
            )
            .bind(message.message_id.to_string())
            .bind(&message.message_type)
            .bind(&message.payload)
            .bind(message.sender.to_string())
            .bind(message.receiver.to_string())
            .bind(MessageStatus::Pending.as_str())
            .bind(message.created_at_ms as f64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn poll_pending(
        &self,
        receiver: Uuid,
        limit: usize,
    ) -> Result<Vec<QueuedMessage>, StorageError> {
        let rows = sqlx::query(
            "select id, message_id, message_type, payload, sender, receiver, status, \
             (extract(epoch from created_at) * 1000)::bigint as created_at_ms, \
             (extract(epoch from cycled_at) * 1000)::bigint as cycled_at_ms \
             from message_bus_messages \
             where receiver = $1 and status = $2 \
             order by id asc \
             limit $3",
        )
        .bind(receiver.to_string())
        .bind(MessageStatus::Pending.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row.try_get("status")?;
            let message_id: String = row.try_get("message_id")?;
            let sender: String = row.try_get("sender")?;
            let receiver: String = row.try_get("receiver")?;
            items.push(QueuedMessage {
                id: row.try_get("id")?,
                message_id: parse_uuid(&message_id)?,
                message_type: row.try_get("message_type")?,
                payload: row.try_get("payload")?,
                sender: parse_uuid(&sender)?,
                receiver: parse_uuid(&receiver)?,
                status: MessageStatus::parse(&status)
                    .ok_or_else(|| StorageError::new(format!("unknown message status {status}")))?,
                created_at_ms: row.try_get("created_at_ms")?,
                cycled_at_ms: row.try_get("cycled_at_ms")?,
            });
        }
        Ok(items)
    }

    async fn ack(&self, id: i64, status: MessageStatus, now_ms: i64) -> Result<(), StorageError> {
        sqlx::query(
            "update message_bus_messages set status = $1, cycled_at = to_timestamp($2 / 1000.0) \
             where id = $3",
        )
        .bind(status.as_str())
        .bind(now_ms as f64)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
