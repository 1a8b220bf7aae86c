//! 内存存储实现模块
//!
//! 用于单节点部署、测试与演示；集群部署时消息队列与节点目录应使用 Postgres 实现。
//!
//! - MonitoredSsidStore: InMemoryMonitoredSsidStore
//! - MacAddressContextStore: InMemoryMacAddressContextStore
//! - BaselineStore: InMemoryBaselineStore
//! - WatchlistStore: InMemoryWatchlistStore
//! - AlertStore: InMemoryAlertStore
//! - MessageQueue: InMemoryMessageQueue
//! - NodeDirectory: InMemoryNodeDirectory

pub mod alert;
pub mod baseline;
pub mod mac_context;
pub mod message_queue;
pub mod node;
pub mod policy;
pub mod watchlist;

pub use alert::*;
pub use baseline::*;
pub use mac_context::*;
pub use message_queue::*;
pub use node::*;
pub use policy::*;
pub use watchlist::*;
