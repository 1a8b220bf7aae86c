//! 存储接口 Trait 定义
//!
//! - MonitoredSsidStore：监控策略
//! - MacAddressContextStore：MAC 注解
//! - BaselineStore：SSID 基线（检测历史上下文）
//! - WatchlistStore：租户观察名单
//! - AlertStore：告警持久化
//! - MessageQueue：集群消息队列
//! - NodeDirectory：集群节点目录
//!
//! 租户数据接口显式接收 TenantContext；集群级接口（队列、节点）不区分租户。

use crate::error::StorageError;
use crate::models::{
    MessageStatus, OutgoingMessage, QueuedMessage, SsidBaseline, TenantWatchlist,
};
use async_trait::async_trait;
use domain::{
    AlertStatus, DetectionAlert, MacAddressContext, MonitoredSsid, NodeRecord, Scope,
    TenantContext,
};
use uuid::Uuid;

/// 监控策略存储接口
///
/// 每个 (organization_id, tenant_id, ssid) 至多一条策略。
#[async_trait]
pub trait MonitoredSsidStore: Send + Sync {
    /// 列出调用方可见的策略
    async fn list_policies(&self, ctx: &TenantContext) -> Result<Vec<MonitoredSsid>, StorageError>;

    /// 列出作用域覆盖目标作用域的全部策略（全局 + 组织级 + 租户级）
    async fn list_covering(
        &self,
        ctx: &TenantContext,
        target: &Scope,
    ) -> Result<Vec<MonitoredSsid>, StorageError>;

    /// 按 UUID 查找策略
    async fn find_policy(
        &self,
        ctx: &TenantContext,
        uuid: Uuid,
    ) -> Result<Option<MonitoredSsid>, StorageError>;

    /// 写入策略；同一 (作用域, ssid) 已存在时覆盖并保留 id/uuid/created_at
    async fn upsert_policy(
        &self,
        ctx: &TenantContext,
        record: MonitoredSsid,
    ) -> Result<MonitoredSsid, StorageError>;

    /// 删除策略
    async fn delete_policy(&self, ctx: &TenantContext, uuid: Uuid) -> Result<bool, StorageError>;
}

/// MAC 注解存储接口
#[async_trait]
pub trait MacAddressContextStore: Send + Sync {
    /// 按 MAC 查找当前作用域内的注解
    async fn find_by_mac(
        &self,
        ctx: &TenantContext,
        mac_address: &str,
    ) -> Result<Option<MacAddressContext>, StorageError>;

    /// 列出当前作用域内的全部注解
    async fn list_contexts(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<MacAddressContext>, StorageError>;

    /// 写入注解；同一 (作用域, mac) 已存在时覆盖
    async fn upsert_context(
        &self,
        ctx: &TenantContext,
        record: MacAddressContext,
    ) -> Result<MacAddressContext, StorageError>;
}

/// SSID 基线存储接口（检测历史上下文）
///
/// key 为 (ctx 作用域, ssid)。
#[async_trait]
pub trait BaselineStore: Send + Sync {
    async fn get_baseline(
        &self,
        ctx: &TenantContext,
        ssid: &str,
    ) -> Result<Option<SsidBaseline>, StorageError>;

    async fn set_baseline(
        &self,
        ctx: &TenantContext,
        ssid: &str,
        baseline: SsidBaseline,
    ) -> Result<(), StorageError>;

    /// 仅在 key 不存在时写入（原子）；返回是否写入成功
    async fn set_baseline_if_absent(
        &self,
        ctx: &TenantContext,
        ssid: &str,
        baseline: SsidBaseline,
    ) -> Result<bool, StorageError>;
}

/// 租户观察名单存储接口
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    /// 读取当前作用域的观察名单；不存在时返回空名单
    async fn get_watchlist(&self, ctx: &TenantContext) -> Result<TenantWatchlist, StorageError>;

    async fn set_watchlist(
        &self,
        ctx: &TenantContext,
        watchlist: TenantWatchlist,
    ) -> Result<(), StorageError>;
}

/// 告警存储接口
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// 按 uuid 写入告警；已存在时 occurrence_count 只增不减，RESOLVED 不回退为 ACTIVE
    async fn upsert_alert(
        &self,
        ctx: &TenantContext,
        alert: &DetectionAlert,
    ) -> Result<(), StorageError>;

    async fn find_alert(
        &self,
        ctx: &TenantContext,
        uuid: Uuid,
    ) -> Result<Option<DetectionAlert>, StorageError>;

    /// 列出调用方可见的告警（按 last_seen 倒序），可按状态过滤
    async fn list_alerts(
        &self,
        ctx: &TenantContext,
        status: Option<AlertStatus>,
        limit: usize,
    ) -> Result<Vec<DetectionAlert>, StorageError>;
}

/// 集群消息队列接口
///
/// 每条消息按接收节点拆分为多行；接收方轮询 PENDING 行并确认。
/// 未确认的行会在下一次轮询中重新投递（至少一次）。
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn enqueue(&self, messages: Vec<OutgoingMessage>) -> Result<(), StorageError>;

    /// 按入队顺序读取发给 receiver 的 PENDING 行
    async fn poll_pending(
        &self,
        receiver: Uuid,
        limit: usize,
    ) -> Result<Vec<QueuedMessage>, StorageError>;

    /// 设置行状态（PROCESSED / FAILED / UNHANDLED）
    async fn ack(&self, id: i64, status: MessageStatus, now_ms: i64) -> Result<(), StorageError>;
}

/// 集群节点目录接口
#[async_trait]
pub trait NodeDirectory: Send + Sync {
    /// 写入/刷新节点心跳
    async fn touch(&self, node: &NodeRecord) -> Result<(), StorageError>;

    /// 存活窗口内且未删除的节点
    async fn list_live_nodes(
        &self,
        now_ms: i64,
        liveness_ms: i64,
    ) -> Result<Vec<NodeRecord>, StorageError>;

    /// 标记节点删除（下线）
    async fn mark_deleted(&self, uuid: Uuid) -> Result<bool, StorageError>;
}
