//! 告警查询与人工解除。
//!
//! - GET /alerts?filters=[...]&status=ACTIVE&limit=100
//! - GET /alerts/:alert_id
//! - POST /alerts/:alert_id/acknowledge

use api_contract::{AlertListQuery, ApiResponse};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use domain::now_epoch_ms;
use tracing::info;
use wsm_filter::matches_all;

use crate::AppState;
use crate::middleware::require_tenant_context;
use crate::utils::response::{alert_to_dto, internal_error, not_found_error, storage_error};
use crate::utils::validation::{DEFAULT_LIST_LIMIT, parse_filters, parse_status, parse_uuid};

pub async fn list_alerts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AlertListQuery>,
) -> Response {
    let ctx = match require_tenant_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let filters = match parse_filters(query.filters.as_deref()) {
        Ok(filters) => filters,
        Err(response) => return response,
    };
    let status = match parse_status(query.status.as_deref()) {
        Ok(status) => status,
        Err(response) => return response,
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    // 过滤条件在存储结果上求值，limit 在过滤之后截断
    match state.alert_store.list_alerts(&ctx, status, 0).await {
        Ok(alerts) => {
            let items: Vec<_> = alerts
                .into_iter()
                .filter(|alert| matches_all(&filters, alert))
                .take(limit)
                .map(alert_to_dto)
                .collect();
            (StatusCode::OK, Json(ApiResponse::success(items))).into_response()
        }
        Err(err) => storage_error(err),
    }
}

pub async fn get_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(alert_id): Path<String>,
) -> Response {
    let ctx = match require_tenant_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let alert_id = match parse_uuid(&alert_id, "alert_id") {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.alert_store.find_alert(&ctx, alert_id).await {
        Ok(Some(alert)) => {
            (StatusCode::OK, Json(ApiResponse::success(alert_to_dto(alert)))).into_response()
        }
        Ok(None) => not_found_error(),
        Err(err) => storage_error(err),
    }
}

/// 人工解除 ACTIVE 告警；已解除或不可见的告警返回 404。
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(alert_id): Path<String>,
) -> Response {
    let ctx = match require_tenant_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let alert_id = match parse_uuid(&alert_id, "alert_id") {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state
        .pipeline
        .alerts()
        .acknowledge(&ctx, alert_id, now_epoch_ms())
        .await
    {
        Ok(Some(alert)) => {
            info!(
                target: "wsm.api",
                alert_id = %alert.uuid,
                user_id = %ctx.user_id,
                "alert_acknowledged"
            );
            (StatusCode::OK, Json(ApiResponse::success(alert_to_dto(alert)))).into_response()
        }
        Ok(None) => not_found_error(),
        Err(err) => internal_error(err),
    }
}
