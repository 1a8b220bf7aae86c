//! 监控策略管理。
//!
//! - GET /monitored-ssids
//! - PUT /monitored-ssids
//! - DELETE /monitored-ssids/:policy_id
//!
//! 写入成功后立即失效本节点策略缓存，并经总线通知其他节点。

use api_contract::{ApiResponse, UpsertMonitoredSsidRequest};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use domain::{MonitoredSsid, Scope, now_epoch_ms, normalize_mac, sanitize_ssid};
use tracing::warn;

use crate::AppState;
use crate::middleware::require_tenant_context;
use crate::utils::response::{bad_request_error, not_found_error, policy_to_dto, storage_error};
use crate::utils::validation::{normalize_required, parse_detectors, parse_optional_uuid, parse_uuid};

pub async fn list_monitored_ssids(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = match require_tenant_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match state.policies.list_policies(&ctx).await {
        Ok(items) => {
            let items: Vec<_> = items.into_iter().map(policy_to_dto).collect();
            (StatusCode::OK, Json(ApiResponse::success(items))).into_response()
        }
        Err(err) => storage_error(err),
    }
}

pub async fn upsert_monitored_ssid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpsertMonitoredSsidRequest>,
) -> Response {
    let ctx = match require_tenant_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let record = match build_policy(req, ctx.scope()) {
        Ok(record) => record,
        Err(response) => return response,
    };
    match state.policies.upsert_policy(&ctx, record).await {
        Ok(saved) => {
            announce_policy_change(&state, saved.scope());
            (StatusCode::OK, Json(ApiResponse::success(policy_to_dto(saved)))).into_response()
        }
        Err(err) => storage_error(err),
    }
}

pub async fn delete_monitored_ssid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(policy_id): Path<String>,
) -> Response {
    let ctx = match require_tenant_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let policy_id = match parse_uuid(&policy_id, "policy_id") {
        Ok(id) => id,
        Err(response) => return response,
    };
    let existing = match state.policies.find_policy(&ctx, policy_id).await {
        Ok(Some(policy)) => policy,
        Ok(None) => return not_found_error(),
        Err(err) => return storage_error(err),
    };
    match state.policies.delete_policy(&ctx, policy_id).await {
        Ok(true) => {
            announce_policy_change(&state, existing.scope());
            (StatusCode::OK, Json(ApiResponse::success(true))).into_response()
        }
        Ok(false) => not_found_error(),
        Err(err) => storage_error(err),
    }
}

/// 策略已落库；广播失败只影响其他节点的缓存时效（TTL 兜底）。
fn announce_policy_change(state: &AppState, scope: Scope) {
    if let Err(err) = state.pipeline.policy_changed(scope) {
        warn!(target: "wsm.api", error = %err, "policy_change_broadcast_failed");
    }
}

fn build_policy(req: UpsertMonitoredSsidRequest, scope: Scope) -> Result<MonitoredSsid, Response> {
    let ssid = normalize_required(sanitize_ssid(&req.ssid), "ssid")?;
    let uuid = parse_optional_uuid(req.uuid, "uuid")?;
    let detectors = parse_detectors(&req.detectors)?;

    let mut record = MonitoredSsid::new(ssid, scope, now_epoch_ms());
    if let Some(uuid) = uuid {
        record.uuid = uuid;
    }
    record.enabled = req.enabled;
    record.detectors = detectors.into_iter().collect();
    record.disco_monitor_type = req
        .disco_monitor_type
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    // 配置按原文保存，由检测器在运行时解析；格式错误只影响该检测器
    record.disco_monitor_configuration = req.disco_monitor_configuration.map(|value| match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    });
    record.similar_looking_ssid_threshold = req.similar_looking_ssid_threshold;
    record.ssid_substrings = req
        .ssid_substrings
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    for client in req.approved_clients {
        match normalize_mac(&client) {
            Some(mac) => {
                record.approved_clients.insert(mac);
            }
            None => return Err(bad_request_error(format!("invalid approved client `{client}`"))),
        }
    }
    Ok(record)
}
