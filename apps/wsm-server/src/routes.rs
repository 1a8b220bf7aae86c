//! 路由定义
//!
//! 集中管理所有 API 路由，将路径映射到对应的 handlers。
//! 路由包括：
//! - 健康检查与计数器：/health, /metrics
//! - 告警：/alerts/*
//! - 监控策略：/monitored-ssids/*
//! - 订阅：/subscriptions/*
//! - 遥测接入：/telemetry/batches

use super::AppState;
use super::handlers::*;
use axum::{
    Router,
    routing::{delete, get, post},
};

/// 创建 API 路由
///
/// 返回包含所有 API 端点的 Router，由调用方挂到 / 与 /api/ 两种前缀下
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/alerts", get(list_alerts))
        .route("/alerts/:alert_id", get(get_alert))
        .route("/alerts/:alert_id/acknowledge", post(acknowledge_alert))
        .route(
            "/monitored-ssids",
            get(list_monitored_ssids).put(upsert_monitored_ssid),
        )
        .route("/monitored-ssids/:policy_id", delete(delete_monitored_ssid))
        .route(
            "/subscriptions",
            get(list_subscriptions).post(create_subscription),
        )
        .route(
            "/subscriptions/:subscriber_id/:detection_type",
            delete(delete_subscription),
        )
        .route("/telemetry/batches", post(submit_batch))
}
