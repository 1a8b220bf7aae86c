//! WiFi 安全监控节点：遥测接入、检测流水线、告警管理 API 与集群消息总线。

mod bootstrap;
mod handlers;
mod middleware;
mod routes;
mod utils;

use axum::{Router, middleware as axum_middleware};
use domain::Dot11Batch;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::info;
use wsm_config::AppConfig;
use wsm_pipeline::DetectionPipeline;
use wsm_storage::{AlertStore, MonitoredSsidStore};
use wsm_telemetry::init_tracing;

use crate::bootstrap::{Backends, assemble};
use crate::middleware::request_context;
use crate::routes::create_api_router;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: DetectionPipeline,
    pub policies: Arc<dyn MonitoredSsidStore>,
    pub alert_store: Arc<dyn AlertStore>,
    pub batches: mpsc::Sender<Dot11Batch>,
}

/// 组装 HTTP 应用：同一组路由同时挂在 / 与 /api 下。
pub fn create_app(state: AppState) -> Router {
    let api = create_api_router();
    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // 注入 request_id/trace_id
        .layer(axum_middleware::from_fn(request_context))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // 存储后端：配置了数据库 / Redis 则连接，否则使用单进程内存实现
    let backends = Backends::connect(&config).await?;
    // 注册总线处理器并冻结处理器表
    let node = assemble(&config, backends)?;
    node.bus
        .wait_initialized(Duration::from_millis(config.bus_init_timeout_ms))
        .await?;
    let (state, _tasks) = node.spawn_background(&config);

    info!(
        target: "wsm.server",
        node_id = %config.node_id,
        http_addr = %config.http_addr,
        "node_started"
    );
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    axum::serve(listener, create_app(state)).await?;
    Ok(())
}
