//! 健康检查与计数器快照。
//!
//! - GET /health
//! - GET /metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use wsm_telemetry::metrics;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            batches_received: snapshot.batches_received,
            detection_events: snapshot.detection_events,
            detector_skipped: snapshot.detector_skipped,
            detector_config_errors: snapshot.detector_config_errors,
            batch_deadline_exceeded: snapshot.batch_deadline_exceeded,
            alerts_activated: snapshot.alerts_activated,
            alerts_coalesced: snapshot.alerts_coalesced,
            alerts_resolved: snapshot.alerts_resolved,
            alert_record_failures: snapshot.alert_record_failures,
            notifications_sent: snapshot.notifications_sent,
            bus_messages_sent: snapshot.bus_messages_sent,
            bus_delivery_failures: snapshot.bus_delivery_failures,
            bus_messages_received: snapshot.bus_messages_received,
            bus_messages_unhandled: snapshot.bus_messages_unhandled,
        })),
    )
        .into_response()
}
