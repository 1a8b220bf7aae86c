//! 节点运行配置加载。

use std::env;
use uuid::Uuid;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 告警通知模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertNotifyMode {
    /// 每个 ACTIVE 周期仅通知一次，后续发生只计数。
    Once,
    /// 每次发生都通知。
    Every,
}

/// 节点运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub node_id: Uuid,
    pub node_name: String,
    pub node_address: String,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub node_liveness_seconds: u64,
    pub node_heartbeat_seconds: u64,
    pub bus_poll_interval_ms: u64,
    pub bus_poll_batch_size: usize,
    pub bus_init_timeout_ms: u64,
    pub detection_parallelism: usize,
    pub detection_deadline_ms: u64,
    pub baseline_bootstrap: bool,
    pub alert_notify_mode: AlertNotifyMode,
    pub policy_cache_ttl_seconds: u64,
    pub batch_queue_size: usize,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr =
            env::var("WSM_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:22900".to_string());
        let node_id = match read_optional("WSM_NODE_ID") {
            Some(value) => Uuid::parse_str(&value)
                .map_err(|_| ConfigError::Invalid("WSM_NODE_ID".to_string(), value))?,
            None => Uuid::new_v4(),
        };
        let node_name = read_optional("WSM_NODE_NAME").unwrap_or_else(|| node_id.to_string());
        let node_address = read_optional("WSM_NODE_ADDRESS").unwrap_or_else(|| http_addr.clone());
        let database_url = read_optional("WSM_DATABASE_URL");
        let redis_url = read_optional("WSM_REDIS_URL");
        let node_liveness_seconds = read_u64_with_default("WSM_NODE_LIVENESS_SECONDS", 120)?;
        let node_heartbeat_seconds = read_u64_with_default("WSM_NODE_HEARTBEAT_SECONDS", 10)?;
        let bus_poll_interval_ms = read_u64_with_default("WSM_BUS_POLL_INTERVAL_MS", 1000)?;
        let bus_poll_batch_size = read_usize_with_default("WSM_BUS_POLL_BATCH_SIZE", 100)?;
        let bus_init_timeout_ms = read_u64_with_default("WSM_BUS_INIT_TIMEOUT_MS", 5000)?;
        let detection_parallelism = read_usize_with_default("WSM_DETECTION_PARALLELISM", 8)?;
        let detection_deadline_ms = read_u64_with_default("WSM_DETECTION_DEADLINE_MS", 10_000)?;
        let baseline_bootstrap = read_bool_with_default("WSM_BASELINE_BOOTSTRAP", true);
        let alert_notify_mode = read_notify_mode("WSM_ALERT_NOTIFY_MODE")?;
        let policy_cache_ttl_seconds = read_u64_with_default("WSM_POLICY_CACHE_TTL_SECONDS", 60)?;
        let batch_queue_size = read_usize_with_default("WSM_BATCH_QUEUE_SIZE", 64)?;

        Ok(Self {
            http_addr,
            node_id,
            node_name,
            node_address,
            database_url,
            redis_url,
            node_liveness_seconds,
            node_heartbeat_seconds,
            bus_poll_interval_ms,
            bus_poll_batch_size: bus_poll_batch_size.max(1),
            bus_init_timeout_ms,
            detection_parallelism: detection_parallelism.max(1),
            detection_deadline_ms,
            baseline_bootstrap,
            alert_notify_mode,
            policy_cache_ttl_seconds,
            batch_queue_size: batch_queue_size.max(1),
        })
    }
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_usize_with_default(key: &str, default: usize) -> Result<usize, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}

fn read_notify_mode(key: &str) -> Result<AlertNotifyMode, ConfigError> {
    let Some(value) = read_optional(key) else {
        return Ok(AlertNotifyMode::Once);
    };
    parse_notify_mode(&value).ok_or_else(|| ConfigError::Invalid(key.to_string(), value))
}

fn parse_notify_mode(value: &str) -> Option<AlertNotifyMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "once" => Some(AlertNotifyMode::Once),
        "every" => Some(AlertNotifyMode::Every),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_mode_is_case_insensitive() {
        assert_eq!(parse_notify_mode("Every"), Some(AlertNotifyMode::Every));
        assert_eq!(parse_notify_mode(" once "), Some(AlertNotifyMode::Once));
        assert_eq!(parse_notify_mode("sometimes"), None);
    }

    #[test]
    fn unset_numeric_env_uses_default() {
        let value = read_u64_with_default("WSM_TEST_UNSET_NUMERIC_KEY", 42);
        assert_eq!(value.ok(), Some(42));
    }
}
