//! 集群消息队列内存实现（单进程多节点测试）

use crate::error::StorageError;
use crate::models::{MessageStatus, OutgoingMessage, QueuedMessage};
use crate::traits::MessageQueue;
use std::sync::RwLock;
use uuid::Uuid;

struct QueueState {
    next_id: i64,
    rows: Vec<QueuedMessage>,
}

pub struct InMemoryMessageQueue {
    state: RwLock<QueueState>,
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(QueueState {
                next_id: 1,
                rows: Vec::new(),
            }),
        }
    }

    /// 指定接收方的全部行（含已确认），便于测试断言。
    pub fn rows_for(&self, receiver: Uuid) -> Result<Vec<QueuedMessage>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(state
            .rows
            .iter()
            .filter(|row| row.receiver == receiver)
            .cloned()
            .collect())
    }
}

impl Default for InMemoryMessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn enqueue(&self, messages: Vec<OutgoingMessage>) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        for message in messages {
            let id = state.next_id;
            state.next_id += 1;
            state.rows.push(QueuedMessage {
                id,
                message_id: message.message_id,
                message_type: message.message_type,
                payload: message.payload,
                sender: message.sender,
                receiver: message.receiver,
                status: MessageStatus::Pending,
                created_at_ms: message.created_at_ms,
                cycled_at_ms: None,
            });
        }
        Ok(())
    }

    async fn poll_pending(
        &self,
        receiver: Uuid,
        limit: usize,
    ) -> Result<Vec<QueuedMessage>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(state
            .rows
            .iter()
            .filter(|row| row.receiver == receiver && row.status == MessageStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn ack(&self, id: i64, status: MessageStatus, now_ms: i64) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        if let Some(row) = state.rows.iter_mut().find(|row| row.id == id) {
            row.status = status;
            row.cycled_at_ms = Some(now_ms);
        }
        Ok(())
    }
}
