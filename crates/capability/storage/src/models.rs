//! 存储相关数据结构
//!
//! 领域对象（策略、告警、节点）直接复用 `domain` 中的定义；
//! 这里只定义仅存在于存储层的结构：基线、租户观察名单、消息队列行。

use domain::{Bandit, Scope};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// 单个 BSSID 的已建立基线。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BssidBaseline {
    #[serde(default)]
    pub channels: BTreeSet<u16>,
    #[serde(default)]
    pub security_suites: BTreeSet<String>,
    #[serde(default)]
    pub fingerprints: BTreeSet<String>,
}

/// 受保护 SSID 的基线：允许的 BSSID 集合及其信道/安全套件/指纹。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsidBaseline {
    #[serde(default)]
    pub bssids: BTreeMap<String, BssidBaseline>,
    pub updated_at_ms: i64,
}

impl SsidBaseline {
    pub fn bssid(&self, bssid: &str) -> Option<&BssidBaseline> {
        self.bssids.get(bssid)
    }

    pub fn contains_bssid(&self, bssid: &str) -> bool {
        self.bssids.contains_key(bssid)
    }
}

/// 基线存储 key：(作用域, SSID)。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BaselineKey {
    pub scope_key: String,
    pub ssid: String,
}

impl BaselineKey {
    pub fn new(scope: &Scope, ssid: &str) -> Self {
        Self {
            scope_key: scope.key(),
            ssid: ssid.to_string(),
        }
    }

    pub fn redis_key(&self) -> String {
        format!("wsm:{}:ssid:{}:baseline", self.scope_key, self.ssid)
    }
}

/// 放行条件（字段/操作符/比较值），由过滤器在检测时解析。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowFilter {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: String,
}

/// 租户级观察名单：集群范围检测器的输入。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantWatchlist {
    #[serde(default)]
    pub bandits: Vec<Bandit>,
    #[serde(default)]
    pub monitored_probe_ssids: BTreeSet<String>,
    #[serde(default)]
    pub approved_ssids: BTreeSet<String>,
    #[serde(default)]
    pub allow_filters: Vec<AllowFilter>,
}

impl TenantWatchlist {
    pub fn is_empty(&self) -> bool {
        self.bandits.is_empty()
            && self.monitored_probe_ssids.is_empty()
            && self.approved_ssids.is_empty()
    }
}

/// 消息队列行状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Pending,
    Processed,
    Failed,
    Unhandled,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "PENDING",
            MessageStatus::Processed => "PROCESSED",
            MessageStatus::Failed => "FAILED",
            MessageStatus::Unhandled => "UNHANDLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(MessageStatus::Pending),
            "PROCESSED" => Some(MessageStatus::Processed),
            "FAILED" => Some(MessageStatus::Failed),
            "UNHANDLED" => Some(MessageStatus::Unhandled),
            _ => None,
        }
    }
}

/// 消息队列行：一条消息投递给一个接收节点。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    /// 队列行 id（同一消息投递给多个节点时各不相同）。
    pub id: i64,
    pub message_id: Uuid,
    pub message_type: String,
    pub payload: String,
    pub sender: Uuid,
    pub receiver: Uuid,
    pub status: MessageStatus,
    pub created_at_ms: i64,
    pub cycled_at_ms: Option<i64>,
}

/// 待入队的消息（尚未分配队列行 id）。
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub message_id: Uuid,
    pub message_type: String,
    pub payload: String,
    pub sender: Uuid,
    pub receiver: Uuid,
    pub created_at_ms: i64,
}
