//! 数据库连接管理

use crate::error::StorageError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 8;
/// 取连接的等待上限；超时按存储错误返回，轮询任务下一轮重试。
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// 建立 Postgres 连接池。
///
/// 消息队列轮询、节点心跳与策略读取共用同一个池。
pub async fn connect_pool(database_url: &str) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
        .map_err(|err| StorageError::new(format!("postgres connect failed: {err}")))?;
    Ok(pool)
}
