//! 节点装配模块
//!
//! 按配置选择存储后端（PostgreSQL / Redis / 内存），把消息总线、告警引擎、
//! 检测流水线与 HTTP 状态组装在一起，并按固定顺序注册总线处理器：
//! 1. 告警复制：new-alert / alert-resolved
//! 2. 策略缓存失效：policy-changed / mac-context-changed
//! 3. 冻结处理器表（initialize），此后才允许 send
//!
//! 后台任务（心跳、总线轮询、批次 worker）在 [`Node::spawn_background`] 中启动。

use domain::{Dot11Batch, NodeRecord, now_epoch_ms};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use wsm_alert::{AlertEngine, AlertReplicationHandler, LogNotifier, NotificationPolicy};
use wsm_bus::{
    BusConfig, BusError, MessageBus, MessageType, QueueMessageBus, spawn_heartbeat,
};
use wsm_config::{AlertNotifyMode, AppConfig};
use wsm_detect::DetectorSettings;
use wsm_pipeline::{
    DetectionPipeline, PipelineConfig, PipelineStores, PolicyCache, PolicyCacheInvalidator,
};
use wsm_storage::{
    AlertStore, BaselineStore, InMemoryAlertStore, InMemoryBaselineStore,
    InMemoryMacAddressContextStore, InMemoryMessageQueue, InMemoryMonitoredSsidStore,
    InMemoryNodeDirectory, InMemoryWatchlistStore, MessageQueue, MonitoredSsidStore,
    NodeDirectory, PgMessageQueue, PgMonitoredSsidStore, PgNodeDirectory, RedisBaselineStore,
    StorageError, connect_pool,
};

use crate::AppState;

/// 需要跨节点共享的存储后端。
#[derive(Clone)]
pub struct Backends {
    pub queue: Arc<dyn MessageQueue>,
    pub nodes: Arc<dyn NodeDirectory>,
    pub policies: Arc<dyn MonitoredSsidStore>,
    pub baselines: Arc<dyn BaselineStore>,
}

impl Backends {
    /// 单进程内存后端（未配置数据库时使用，也用于测试）。
    pub fn in_memory() -> Self {
        Self {
            queue: Arc::new(InMemoryMessageQueue::new()),
            nodes: Arc::new(InMemoryNodeDirectory::new()),
            policies: Arc::new(InMemoryMonitoredSsidStore::new()),
            baselines: Arc::new(InMemoryBaselineStore::new()),
        }
    }

    /// 按配置连接外部存储；未配置的部分退回内存实现。
    pub async fn connect(config: &AppConfig) -> Result<Self, StorageError> {
        let mut backends = Self::in_memory();
        if let Some(database_url) = &config.database_url {
            let pool = connect_pool(database_url).await?;
            backends.queue = Arc::new(PgMessageQueue::new(pool.clone()));
            backends.nodes = Arc::new(PgNodeDirectory::new(pool.clone()));
            backends.policies = Arc::new(PgMonitoredSsidStore::new(pool));
            info!(target: "wsm.server", "postgres_backend_connected");
        }
        if let Some(redis_url) = &config.redis_url {
            backends.baselines = Arc::new(RedisBaselineStore::connect(redis_url)?);
            info!(target: "wsm.server", "redis_baselines_connected");
        }
        Ok(backends)
    }
}

/// 装配完成、总线已初始化的节点。
pub struct Node {
    pub state: AppState,
    pub bus: QueueMessageBus,
    nodes: Arc<dyn NodeDirectory>,
    record: NodeRecord,
    batches: mpsc::Receiver<Dot11Batch>,
}

pub fn pipeline_config(config: &AppConfig) -> PipelineConfig {
    PipelineConfig {
        parallelism: config.detection_parallelism,
        deadline: Duration::from_millis(config.detection_deadline_ms),
        baseline_bootstrap: config.baseline_bootstrap,
        detector_settings: DetectorSettings::default(),
    }
}

fn notification_policy(mode: AlertNotifyMode) -> NotificationPolicy {
    match mode {
        AlertNotifyMode::Once => NotificationPolicy::OncePerActivePeriod,
        AlertNotifyMode::Every => NotificationPolicy::EveryOccurrence,
    }
}

/// 组装节点并完成总线初始化。
pub fn assemble(config: &AppConfig, backends: Backends) -> Result<Node, BusError> {
    let bus = QueueMessageBus::new(
        config.node_id,
        backends.queue.clone(),
        backends.nodes.clone(),
        BusConfig {
            liveness_ms: i64::try_from(config.node_liveness_seconds.saturating_mul(1000))
                .unwrap_or(i64::MAX),
            poll_batch_size: config.bus_poll_batch_size,
        },
    );
    let shared_bus: Arc<dyn MessageBus> = Arc::new(bus.clone());

    // 告警按节点保存，集群内经总线复制
    let alert_store: Arc<dyn AlertStore> = Arc::new(InMemoryAlertStore::new());
    let alerts = AlertEngine::new(
        alert_store.clone(),
        Arc::new(LogNotifier),
        shared_bus.clone(),
        notification_policy(config.alert_notify_mode),
    );
    let cache = Arc::new(PolicyCache::new(Duration::from_secs(
        config.policy_cache_ttl_seconds,
    )));
    let stores = PipelineStores {
        policies: backends.policies.clone(),
        mac_contexts: Arc::new(InMemoryMacAddressContextStore::new()),
        baselines: backends.baselines.clone(),
        watchlists: Arc::new(InMemoryWatchlistStore::new()),
    };
    let pipeline = DetectionPipeline::new(
        stores,
        alerts.clone(),
        shared_bus,
        cache.clone(),
        pipeline_config(config),
    );

    let replication = Arc::new(AlertReplicationHandler::new(alerts));
    bus.on_message_received(MessageType::NewAlert, replication.clone())?;
    bus.on_message_received(MessageType::AlertResolved, replication)?;
    let invalidator = Arc::new(PolicyCacheInvalidator::new(cache));
    bus.on_message_received(MessageType::PolicyChanged, invalidator.clone())?;
    bus.on_message_received(MessageType::MacContextChanged, invalidator)?;
    bus.initialize()?;

    let (sender, batches) = mpsc::channel(config.batch_queue_size.max(1));
    let state = AppState {
        pipeline,
        policies: backends.policies,
        alert_store,
        batches: sender,
    };
    let record = NodeRecord {
        uuid: config.node_id,
        name: config.node_name.clone(),
        address: config.node_address.clone(),
        last_seen_at_ms: now_epoch_ms(),
        deleted: false,
    };
    Ok(Node {
        state,
        bus,
        nodes: backends.nodes,
        record,
        batches,
    })
}

impl Node {
    /// 启动心跳、总线轮询与批次 worker。
    pub fn spawn_background(self, config: &AppConfig) -> (AppState, Vec<JoinHandle<()>>) {
        let handles = vec![
            spawn_heartbeat(
                self.nodes,
                self.record,
                Duration::from_secs(config.node_heartbeat_seconds.max(1)),
            ),
            self.bus
                .spawn_poller(Duration::from_millis(config.bus_poll_interval_ms.max(1))),
            self.state.pipeline.spawn_batch_worker(self.batches),
        ];
        (self.state, handles)
    }
}
