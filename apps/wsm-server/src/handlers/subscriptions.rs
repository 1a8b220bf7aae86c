//! 告警订阅。
//!
//! - GET /subscriptions
//! - POST /subscriptions
//! - DELETE /subscriptions/:subscriber_id/:detection_type

use api_contract::{ApiResponse, CreateSubscriptionRequest, SubscriptionDto};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use domain::{DetectionType, Subscription};

use crate::AppState;
use crate::middleware::require_tenant_context;
use crate::utils::response::{bad_request_error, internal_error, not_found_error};
use crate::utils::validation::normalize_required;

fn subscription_to_dto(subscription: Subscription, created: bool) -> SubscriptionDto {
    SubscriptionDto {
        subscriber_id: subscription.subscriber_id,
        detection_type: subscription.detection_type.as_str().to_string(),
        organization_id: subscription.organization_id.map(|id| id.to_string()),
        created,
    }
}

fn parse_detection_type(value: &str) -> Result<DetectionType, Response> {
    DetectionType::parse(value.trim())
        .ok_or_else(|| bad_request_error(format!("unknown detection type `{value}`")))
}

pub async fn list_subscriptions(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = match require_tenant_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match state.pipeline.alerts().subscriptions().list() {
        Ok(items) => {
            let items: Vec<_> = items
                .into_iter()
                .filter(|item| ctx.is_system_wide() || item.organization_id == ctx.organization_id)
                .map(|item| subscription_to_dto(item, false))
                .collect();
            (StatusCode::OK, Json(ApiResponse::success(items))).into_response()
        }
        Err(err) => internal_error(err),
    }
}

/// 订阅某检测类型（`WILDCARD` 订阅全部）；组织级调用方只会收到本组织的告警。
pub async fn create_subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Response {
    let ctx = match require_tenant_context(&headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let subscriber_id = match normalize_required(req.subscriber_id, "subscriber_id") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let detection_type = match parse_detection_type(&req.detection_type) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let subscription = Subscription {
        subscriber_id,
        detection_type,
        organization_id: ctx.organization_id,
    };
    match state
        .pipeline
        .alerts()
        .subscriptions()
        .subscribe(subscription.clone())
    {
        Ok(created) => {
            let status = if created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (
                status,
                Json(ApiResponse::success(subscription_to_dto(subscription, created))),
            )
                .into_response()
        }
        Err(err) => bad_request_error(err.to_string()),
    }
}

pub async fn delete_subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((subscriber_id, detection_type)): Path<(String, String)>,
) -> Response {
    if let Err(response) = require_tenant_context(&headers) {
        return response;
    }
    let detection_type = match parse_detection_type(&detection_type) {
        Ok(value) => value,
        Err(response) => return response,
    };
    match state
        .pipeline
        .alerts()
        .subscriptions()
        .unsubscribe(&subscriber_id, detection_type)
    {
        Ok(true) => (StatusCode::OK, Json(ApiResponse::success(true))).into_response(),
        Ok(false) => not_found_error(),
        Err(err) => internal_error(err),
    }
}
