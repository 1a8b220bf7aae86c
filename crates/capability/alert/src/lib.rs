//! 告警引擎：检测事件合并为告警、订阅分发、集群复制。
//!
//! 告警按 (检测类型, 作用域, 主体) 合并。同一 key 的更新互斥（分片锁），
//! 不同 key 互不阻塞。

mod engine;
mod notifier;
mod replication;
mod subscription;

pub use engine::{AlertEngine, RecordOutcome};
pub use notifier::{LogNotifier, Notifier};
pub use replication::AlertReplicationHandler;
pub use subscription::SubscriptionRegistry;

use wsm_bus::BusError;
use wsm_storage::StorageError;

/// 告警引擎错误。
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("bus error: {0}")]
    Bus(#[from] BusError),
    #[error("notification error: {0}")]
    Notification(String),
    #[error("subscription error: {0}")]
    Subscription(String),
}

/// 分发策略：每个 ACTIVE 周期通知一次，或每次发生都通知。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationPolicy {
    #[default]
    OncePerActivePeriod,
    EveryOccurrence,
}
