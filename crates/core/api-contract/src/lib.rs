//! 稳定的 DTO 与 API 响应契约。

use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 列表查询的单个过滤条件。
///
/// `operator` 取值：equals、not_equals、equals_numeric、not_equals_numeric、
/// regex_match、not_regex_match、greater_than、smaller_than、in_cidr、not_in_cidr、
/// is_private、is_not_private。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterParameter {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: String,
}

/// 解析 `filters` 查询参数（JSON 数组）。
pub fn parse_filter_parameters(raw: &str) -> Result<Vec<FilterParameter>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
}

/// 告警列表查询参数。
#[derive(Debug, Default, Deserialize)]
pub struct AlertListQuery {
    pub filters: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

/// 告警返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDto {
    pub uuid: String,
    pub detection_type: String,
    pub title: String,
    pub subsystem: String,
    pub organization_id: Option<String>,
    pub tenant_id: Option<String>,
    pub subject_key: String,
    pub details: serde_json::Value,
    pub status: String,
    pub occurrence_count: u64,
    pub first_seen_at_ms: i64,
    pub last_seen_at_ms: i64,
    pub resolved_at_ms: Option<i64>,
}

/// 监控策略写入请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertMonitoredSsidRequest {
    pub uuid: Option<String>,
    pub ssid: String,
    pub enabled: bool,
    #[serde(default)]
    pub detectors: Vec<String>,
    pub disco_monitor_type: Option<String>,
    pub disco_monitor_configuration: Option<serde_json::Value>,
    #[serde(default)]
    pub similar_looking_ssid_threshold: u32,
    #[serde(default)]
    pub ssid_substrings: Vec<String>,
    #[serde(default)]
    pub approved_clients: Vec<String>,
}

/// 监控策略返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoredSsidDto {
    pub uuid: String,
    pub ssid: String,
    pub enabled: bool,
    pub detectors: Vec<String>,
    pub updated_at_ms: i64,
}

/// 订阅创建请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub subscriber_id: String,
    pub detection_type: String,
}

/// 遥测批次受理结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAcceptedDto {
    pub accepted: bool,
    pub beacons: usize,
    pub disconnections: usize,
}

/// 订阅返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDto {
    pub subscriber_id: String,
    pub detection_type: String,
    pub organization_id: Option<String>,
    /// 同一订阅已存在时为 false。
    pub created: bool,
}

/// 进程内计数器快照。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub batches_received: u64,
    pub detection_events: u64,
    pub detector_skipped: u64,
    pub detector_config_errors: u64,
    pub batch_deadline_exceeded: u64,
    pub alerts_activated: u64,
    pub alerts_coalesced: u64,
    pub alerts_resolved: u64,
    pub alert_record_failures: u64,
    pub notifications_sent: u64,
    pub bus_messages_sent: u64,
    pub bus_delivery_failures: u64,
    pub bus_messages_received: u64,
    pub bus_messages_unhandled: u64,
}
