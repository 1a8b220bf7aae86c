//! HTTP 响应辅助函数和 DTO 转换
//!
//! 提供统一的错误响应构造函数和 DTO 转换函数：
//! - 错误响应：bad_request_error, invalid_filter_error, not_found_error, storage_error,
//!   unavailable_error, internal_error
//! - DTO 转换：alert_to_dto, policy_to_dto
//!
//! 所有错误返回统一的 ApiResponse 格式，HTTP 状态码与错误码一一对应。

use api_contract::{AlertDto, ApiResponse, MonitoredSsidDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{DetectionAlert, MonitoredSsid};
use wsm_storage::StorageError;

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 过滤条件不合法（未知操作符或比较值无法解析）
pub fn invalid_filter_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.FILTER", message.into())),
    )
        .into_response()
}

/// 资源未找到错误响应
pub fn not_found_error() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("RESOURCE.NOT_FOUND", "not found")),
    )
        .into_response()
}

/// 存储错误响应
pub fn storage_error(err: StorageError) -> Response {
    let message = err.to_string();
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("INTERNAL.ERROR", message)),
    )
        .into_response()
}

/// 批次队列已满，调用方应稍后重试
pub fn unavailable_error(message: impl Into<String>) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiResponse::<()>::error("SERVICE.BUSY", message.into())),
    )
        .into_response()
}

/// 其余内部错误
pub fn internal_error(err: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("INTERNAL.ERROR", err.to_string())),
    )
        .into_response()
}

/// DetectionAlert 转 AlertDto
pub fn alert_to_dto(alert: DetectionAlert) -> AlertDto {
    AlertDto {
        uuid: alert.uuid.to_string(),
        detection_type: alert.detection_type.as_str().to_string(),
        title: alert.title().to_string(),
        subsystem: alert.subsystem.as_str().to_string(),
        organization_id: alert.scope.organization_id.map(|id| id.to_string()),
        tenant_id: alert.scope.tenant_id.map(|id| id.to_string()),
        subject_key: alert.subject_key,
        details: alert.details,
        status: alert.status.as_str().to_string(),
        occurrence_count: alert.occurrence_count,
        first_seen_at_ms: alert.first_seen_at_ms,
        last_seen_at_ms: alert.last_seen_at_ms,
        resolved_at_ms: alert.resolved_at_ms,
    }
}

/// MonitoredSsid 转 MonitoredSsidDto
pub fn policy_to_dto(record: MonitoredSsid) -> MonitoredSsidDto {
    MonitoredSsidDto {
        uuid: record.uuid.to_string(),
        ssid: record.ssid,
        enabled: record.enabled,
        detectors: record
            .detectors
            .iter()
            .map(|kind| kind.as_str().to_string())
            .collect(),
        updated_at_ms: record.updated_at_ms,
    }
}
