//! # WSM Storage 模块
//!
//! 检测核心的持久化抽象层：接口以 async trait 定义，检测与告警代码只依赖 trait，
//! 具体后端在启动时装配。
//!
//! ## 模块说明
//!
//! - [`models`]：仅存在于存储层的数据结构（基线、观察名单、消息队列行）
//! - [`traits`]：存储接口定义
//! - [`error`]：存储错误类型
//! - [`validation`]：组织/租户作用域校验
//! - [`connection`]：PostgreSQL 连接池
//!
//! ## 存储实现
//!
//! - [`in_memory`]：`RwLock<HashMap>` 实现，覆盖全部接口；单节点部署与测试使用
//! - [`postgres`]：消息队列、节点目录、监控策略（集群共享）
//! - [`redis`]：SSID 基线（`SET NX` 原子引导）
//!
//! ## 多租户隔离
//!
//! 租户数据接口显式接收 `TenantContext`，读取只返回上下文作用域覆盖的记录，
//! 写入要求记录作用域与上下文一致。

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod redis;
pub mod traits;
pub mod validation;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use crate::redis::RedisBaselineStore;
pub use traits::*;
pub use validation::*;

pub use in_memory::{
    InMemoryAlertStore, InMemoryBaselineStore, InMemoryMacAddressContextStore,
    InMemoryMessageQueue, InMemoryMonitoredSsidStore, InMemoryNodeDirectory,
    InMemoryWatchlistStore,
};

pub use postgres::{PgMessageQueue, PgMonitoredSsidStore, PgNodeDirectory};
