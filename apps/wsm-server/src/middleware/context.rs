//! 请求上下文中间件
//!
//! 提供以下中间件和辅助函数：
//! - request_context：请求上下文中间件，注入 request_id/trace_id
//! - require_tenant_context：从请求头提取调用方作用域
//!
//! 身份认证由前置网关完成，本节点只信任网关写入的作用域头：
//! - x-organization-id：组织 UUID，缺省表示系统级调用方
//! - x-tenant-id：租户 UUID，必须同时给出组织
//! - x-user-id：调用方标识，仅用于日志

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use domain::TenantContext;
use tracing::{Instrument, info_span};
use wsm_telemetry::new_request_ids;

use crate::utils::response::bad_request_error;
use crate::utils::validation::parse_optional_uuid;

pub const ORGANIZATION_HEADER: &str = "x-organization-id";
pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";

/// 请求上下文中间件：注入 request_id/trace_id
pub async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// 提取调用方租户上下文
pub fn require_tenant_context(headers: &HeaderMap) -> Result<TenantContext, Response> {
    let organization_id =
        parse_optional_uuid(header_text(headers, ORGANIZATION_HEADER), ORGANIZATION_HEADER)?;
    let tenant_id = parse_optional_uuid(header_text(headers, TENANT_HEADER), TENANT_HEADER)?;
    if tenant_id.is_some() && organization_id.is_none() {
        return Err(bad_request_error(format!(
            "{TENANT_HEADER} requires {ORGANIZATION_HEADER}"
        )));
    }
    let user_id = header_text(headers, USER_HEADER).unwrap_or_else(|| "anonymous".to_string());
    Ok(TenantContext::new(organization_id, tenant_id, user_id))
}
