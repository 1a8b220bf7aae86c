//! 请求参数校验与解析

use axum::response::Response;
use domain::{AlertStatus, DetectorKind};
use uuid::Uuid;
use wsm_filter::Filter;

use crate::utils::response::{bad_request_error, invalid_filter_error};

/// 列表默认返回条数上限
pub const DEFAULT_LIST_LIMIT: usize = 500;

/// 验证必填字段，去除首尾空格并检查非空
pub fn normalize_required(value: String, field: &str) -> Result<String, Response> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(bad_request_error(format!("{field} required")));
    }
    Ok(trimmed.to_string())
}

/// 解析路径中的 UUID
pub fn parse_uuid(value: &str, field: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(value.trim()).map_err(|_| bad_request_error(format!("invalid {field}")))
}

/// 解析可选的 UUID 字段
pub fn parse_optional_uuid(value: Option<String>, field: &str) -> Result<Option<Uuid>, Response> {
    match value {
        Some(value) if !value.trim().is_empty() => parse_uuid(&value, field).map(Some),
        _ => Ok(None),
    }
}

/// 解析 `filters` 查询参数；任一条件不合法整体拒绝
pub fn parse_filters(raw: Option<&str>) -> Result<Vec<Filter>, Response> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    let parameters = api_contract::parse_filter_parameters(raw)
        .map_err(|err| invalid_filter_error(format!("malformed filters: {err}")))?;
    parameters
        .iter()
        .map(|parameter| {
            Filter::parse(&parameter.field, &parameter.operator, &parameter.value)
                .map_err(|err| invalid_filter_error(err.to_string()))
        })
        .collect()
}

/// 解析可选的告警状态
pub fn parse_status(value: Option<&str>) -> Result<Option<AlertStatus>, Response> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => AlertStatus::parse(value)
            .map(Some)
            .ok_or_else(|| bad_request_error(format!("unknown status `{value}`"))),
    }
}

/// 解析检测器能力名称
pub fn parse_detectors(values: &[String]) -> Result<Vec<DetectorKind>, Response> {
    values
        .iter()
        .map(|value| {
            let value = value.trim();
            DetectorKind::ALL
                .iter()
                .copied()
                .find(|kind| kind.as_str() == value)
                .ok_or_else(|| bad_request_error(format!("unknown detector `{value}`")))
        })
        .collect()
}
