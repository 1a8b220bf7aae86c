//! 802.11 遥测批次接入。
//!
//! - POST /telemetry/batches
//!
//! 批次进入有界队列后立即返回 202，由后台 worker 执行检测；
//! 队列已满返回 503，调用方自行重试。

use api_contract::{ApiResponse, BatchAcceptedDto};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use domain::{Dot11Batch, now_epoch_ms};
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::AppState;
use crate::middleware::require_tenant_context;
use crate::utils::response::{bad_request_error, internal_error, unavailable_error};

pub async fn submit_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut batch): Json<Dot11Batch>,
) -> Response {
    let ctx = match require_tenant_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    // 组织级调用方只能上报自己作用域的数据；系统级调用方沿用批次自带作用域
    if !ctx.is_system_wide() {
        batch.organization_id = ctx.organization_id;
        batch.tenant_id = ctx.tenant_id;
    }
    if batch.tenant_id.is_some() && batch.organization_id.is_none() {
        return bad_request_error("tenant_id requires organization_id");
    }
    if batch.received_at_ms <= 0 {
        batch.received_at_ms = now_epoch_ms();
    }

    let accepted = BatchAcceptedDto {
        accepted: true,
        beacons: batch.beacons.len(),
        disconnections: batch.disconnections.len(),
    };
    match state.batches.try_send(batch) {
        // 接收计数由 pipeline 在处理批次时记录
        Ok(()) => (StatusCode::ACCEPTED, Json(ApiResponse::success(accepted))).into_response(),
        Err(TrySendError::Full(_)) => {
            warn!(target: "wsm.api", "batch_queue_full");
            unavailable_error("batch queue full")
        }
        Err(TrySendError::Closed(_)) => internal_error("batch worker stopped"),
    }
}
