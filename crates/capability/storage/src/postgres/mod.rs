//! # PostgreSQL 存储实现模块
//!
//! 集群节点共享的持久化：消息队列、节点目录与监控策略。
//!
//! ## 数据库模式要求
//!
//! - `message_bus_messages`：(id bigserial, message_id, message_type, payload text,
//!   sender, receiver, status, created_at, cycled_at)，索引 `(receiver, status, id)`
//! - `cluster_nodes`：(uuid primary key, name, address, last_seen, deleted)
//! - `monitored_ssids`：(id bigserial, uuid, ssid, enabled, organization_id, tenant_id,
//!   detectors jsonb, disco_monitor_type, disco_monitor_configuration, similar_looking_ssid_threshold,
//!   ssid_substrings jsonb, approved_clients jsonb, created_at, updated_at)，
//!   唯一约束 `(coalesce(organization_id, ''), coalesce(tenant_id, ''), ssid)`
//!
//! UUID 以文本存储；时间戳读写时统一换算为 epoch 毫秒。
//! 所有查询使用参数绑定。

pub mod message_queue;
pub mod node;
pub mod policy;

pub use message_queue::*;
pub use node::*;
pub use policy::*;

use crate::error::StorageError;
use uuid::Uuid;

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(value).map_err(|err| StorageError::new(err.to_string()))
}

pub(crate) fn parse_optional_uuid(value: Option<String>) -> Result<Option<Uuid>, StorageError> {
    value.as_deref().map(parse_uuid).transpose()
}
