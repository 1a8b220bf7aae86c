//! 追踪初始化、请求 ID 生成与进程内计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub batches_received: u64,
    pub detection_events: u64,
    pub detector_skipped: u64,
    pub detector_config_errors: u64,
    pub batch_deadline_exceeded: u64,
    pub alerts_activated: u64,
    pub alerts_coalesced: u64,
    pub alerts_resolved: u64,
    pub alert_record_failures: u64,
    pub notifications_sent: u64,
    pub bus_messages_sent: u64,
    pub bus_delivery_failures: u64,
    pub bus_messages_received: u64,
    pub bus_messages_unhandled: u64,
}

/// 进程内计数器。
pub struct TelemetryMetrics {
    batches_received: AtomicU64,
    detection_events: AtomicU64,
    detector_skipped: AtomicU64,
    detector_config_errors: AtomicU64,
    batch_deadline_exceeded: AtomicU64,
    alerts_activated: AtomicU64,
    alerts_coalesced: AtomicU64,
    alerts_resolved: AtomicU64,
    alert_record_failures: AtomicU64,
    notifications_sent: AtomicU64,
    bus_messages_sent: AtomicU64,
    bus_delivery_failures: AtomicU64,
    bus_messages_received: AtomicU64,
    bus_messages_unhandled: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            batches_received: AtomicU64::new(0),
            detection_events: AtomicU64::new(0),
            detector_skipped: AtomicU64::new(0),
            detector_config_errors: AtomicU64::new(0),
            batch_deadline_exceeded: AtomicU64::new(0),
            alerts_activated: AtomicU64::new(0),
            alerts_coalesced: AtomicU64::new(0),
            alerts_resolved: AtomicU64::new(0),
            alert_record_failures: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            bus_messages_sent: AtomicU64::new(0),
            bus_delivery_failures: AtomicU64::new(0),
            bus_messages_received: AtomicU64::new(0),
            bus_messages_unhandled: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_received: self.batches_received.load(Ordering::Relaxed),
            detection_events: self.detection_events.load(Ordering::Relaxed),
            detector_skipped: self.detector_skipped.load(Ordering::Relaxed),
            detector_config_errors: self.detector_config_errors.load(Ordering::Relaxed),
            batch_deadline_exceeded: self.batch_deadline_exceeded.load(Ordering::Relaxed),
            alerts_activated: self.alerts_activated.load(Ordering::Relaxed),
            alerts_coalesced: self.alerts_coalesced.load(Ordering::Relaxed),
            alerts_resolved: self.alerts_resolved.load(Ordering::Relaxed),
            alert_record_failures: self.alert_record_failures.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            bus_messages_sent: self.bus_messages_sent.load(Ordering::Relaxed),
            bus_delivery_failures: self.bus_delivery_failures.load(Ordering::Relaxed),
            bus_messages_received: self.bus_messages_received.load(Ordering::Relaxed),
            bus_messages_unhandled: self.bus_messages_unhandled.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录遥测批次接收次数。
pub fn record_batch_received() {
    metrics().batches_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录检测事件数量。
pub fn record_detection_events(count: u64) {
    metrics()
        .detection_events
        .fetch_add(count, Ordering::Relaxed);
}

/// 记录检测器因上下文缺失而跳过。
pub fn record_detector_skipped() {
    metrics().detector_skipped.fetch_add(1, Ordering::Relaxed);
}

/// 记录检测器配置错误。
pub fn record_detector_config_error() {
    metrics()
        .detector_config_errors
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录批次超过截止时间。
pub fn record_batch_deadline_exceeded() {
    metrics()
        .batch_deadline_exceeded
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录告警进入 ACTIVE。
pub fn record_alert_activated() {
    metrics().alerts_activated.fetch_add(1, Ordering::Relaxed);
}

/// 记录重复检测合并进已有告警。
pub fn record_alert_coalesced() {
    metrics().alerts_coalesced.fetch_add(1, Ordering::Relaxed);
}

/// 记录告警进入 RESOLVED。
pub fn record_alert_resolved() {
    metrics().alerts_resolved.fetch_add(1, Ordering::Relaxed);
}

/// 记录单条告警持久化/分发失败。
pub fn record_alert_record_failure() {
    metrics()
        .alert_record_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录订阅通知次数。
pub fn record_notification_sent() {
    metrics().notifications_sent.fetch_add(1, Ordering::Relaxed);
}

/// 记录总线投递（每个对端一次）。
pub fn record_bus_message_sent() {
    metrics().bus_messages_sent.fetch_add(1, Ordering::Relaxed);
}

/// 记录总线对端不可达。
pub fn record_bus_delivery_failure() {
    metrics()
        .bus_delivery_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录总线收到的消息。
pub fn record_bus_message_received() {
    metrics()
        .bus_messages_received
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录未注册类型的消息。
pub fn record_bus_message_unhandled() {
    metrics()
        .bus_messages_unhandled
        .fetch_add(1, Ordering::Relaxed);
}
