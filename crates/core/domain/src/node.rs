//! 集群节点。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 集群节点记录（进程/资源指标不在此模型内）。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub uuid: Uuid,
    pub name: String,
    pub address: String,
    pub last_seen_at_ms: i64,
    #[serde(default)]
    pub deleted: bool,
}

impl NodeRecord {
    /// 节点在存活窗口内上报过心跳且未被删除。
    pub fn is_live(&self, now_ms: i64, liveness_ms: i64) -> bool {
        !self.deleted && now_ms.saturating_sub(self.last_seen_at_ms) <= liveness_ms
    }
}
