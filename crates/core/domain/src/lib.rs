pub mod data;
pub mod detection;
pub mod node;
pub mod policy;

pub use data::{
    BssidObservation, ClientObservation, DisconnectionObservation, Dot11Batch,
    ProbeRequestObservation, normalize_mac, sanitize_ssid,
};
pub use detection::{
    AlertKey, AlertStatus, DetectionAlert, DetectionEvent, DetectionType, DetectionTypeInfo,
    Subscription, Subsystem,
};
pub use node::NodeRecord;
pub use policy::{Bandit, DetectorKind, MacAddressContext, MonitoredSsid};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 组织/租户作用域：策略、告警与遥测的隔离边界。
///
/// `organization_id` 为空表示全局（系统级）作用域；
/// `tenant_id` 为空表示组织级作用域。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub organization_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
}

impl Scope {
    pub fn new(organization_id: Option<Uuid>, tenant_id: Option<Uuid>) -> Self {
        Self {
            organization_id,
            tenant_id,
        }
    }

    pub fn global() -> Self {
        Self::default()
    }

    /// 当前（策略）作用域是否覆盖目标（遥测）作用域。
    ///
    /// 全局策略覆盖所有租户；组织级策略覆盖该组织下所有租户；
    /// 租户级策略只覆盖自己。
    pub fn covers(&self, target: &Scope) -> bool {
        match (self.organization_id, self.tenant_id) {
            (None, _) => true,
            (Some(org), None) => target.organization_id == Some(org),
            (Some(org), Some(tenant)) => {
                target.organization_id == Some(org) && target.tenant_id == Some(tenant)
            }
        }
    }

    /// 存储 key 片段。
    pub fn key(&self) -> String {
        format!(
            "org:{}:tenant:{}",
            self.organization_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.tenant_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string())
        )
    }
}

/// 租户上下文：所有模块共享的执行上下文。
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub organization_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub user_id: String,
}

impl TenantContext {
    /// 构造显式身份与作用域的租户上下文。
    pub fn new(
        organization_id: Option<Uuid>,
        tenant_id: Option<Uuid>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            organization_id,
            tenant_id,
            user_id: user_id.into(),
        }
    }

    /// 检测链路内部使用的系统上下文。
    pub fn system(scope: Scope) -> Self {
        Self::new(scope.organization_id, scope.tenant_id, "system")
    }

    pub fn scope(&self) -> Scope {
        Scope::new(self.organization_id, self.tenant_id)
    }

    /// 是否为系统级（超级管理员）上下文。
    pub fn is_system_wide(&self) -> bool {
        self.organization_id.is_none()
    }
}

/// 当前 Unix 毫秒时间戳。
pub fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}

impl Default for TenantContext {
    /// 空上下文（仅用于测试或占位）。
    fn default() -> Self {
        Self {
            organization_id: None,
            tenant_id: None,
            user_id: "".to_string(),
        }
    }
}
