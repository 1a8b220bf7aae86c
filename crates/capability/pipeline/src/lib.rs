//! 检测流水线：遥测批次 → 策略检测器 / 租户级检测器 → 告警引擎。
//!
//! 每个批次内，不同策略的检测并发执行（信号量限制并发度），整批受截止时间约束。
//! 超时放弃未完成的策略；已写入告警引擎的结果保留。

mod cache;

pub use cache::{PolicyCache, PolicyCacheInvalidator, PolicySnapshot};

use domain::{DetectionEvent, Dot11Batch, MonitoredSsid, Scope, TenantContext};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use wsm_alert::AlertEngine;
use wsm_bus::{Message, MessageBus, MessageType};
use wsm_detect::{
    DetectionContext, DetectorSettings, WatchlistInput, baseline_from_batch, parse_allow_filters,
    run_policy_detectors, run_watchlist_detectors,
};
use wsm_storage::{
    BaselineStore, MacAddressContextStore, MonitoredSsidStore, SsidBaseline, WatchlistStore,
};

/// Pipeline 处理错误。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("bus error: {0}")]
    Bus(String),
}

/// Pipeline 参数。
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub parallelism: usize,
    pub deadline: Duration,
    pub baseline_bootstrap: bool,
    pub detector_settings: DetectorSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallelism: 8,
            deadline: Duration::from_secs(10),
            baseline_bootstrap: true,
            detector_settings: DetectorSettings::default(),
        }
    }
}

impl PipelineConfig {
    fn sanitized(mut self) -> Self {
        if self.parallelism == 0 {
            self.parallelism = 1;
        }
        if self.deadline.is_zero() {
            self.deadline = Duration::from_millis(1);
        }
        self
    }
}

/// 检测所需的存储协作方。
#[derive(Clone)]
pub struct PipelineStores {
    pub policies: Arc<dyn MonitoredSsidStore>,
    pub mac_contexts: Arc<dyn MacAddressContextStore>,
    pub baselines: Arc<dyn BaselineStore>,
    pub watchlists: Arc<dyn WatchlistStore>,
}

/// 单个批次的处理结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub policies_evaluated: usize,
    pub events: usize,
    pub alerts_recorded: usize,
    pub alert_failures: usize,
    pub detectors_skipped: usize,
    pub baselines_bootstrapped: usize,
    pub timed_out: bool,
}

#[derive(Debug, Default)]
struct PolicyReport {
    events: usize,
    recorded: usize,
    failures: usize,
    skipped: usize,
    bootstrapped: bool,
    bssids: BTreeSet<String>,
}

struct PipelineInner {
    stores: PipelineStores,
    alerts: AlertEngine,
    bus: Arc<dyn MessageBus>,
    cache: Arc<PolicyCache>,
    config: PipelineConfig,
    permits: Arc<Semaphore>,
}

/// 检测流水线入口。
#[derive(Clone)]
pub struct DetectionPipeline {
    inner: Arc<PipelineInner>,
}

impl DetectionPipeline {
    pub fn new(
        stores: PipelineStores,
        alerts: AlertEngine,
        bus: Arc<dyn MessageBus>,
        cache: Arc<PolicyCache>,
        config: PipelineConfig,
    ) -> Self {
        let config = config.sanitized();
        let permits = Arc::new(Semaphore::new(config.parallelism));
        Self {
            inner: Arc::new(PipelineInner {
                stores,
                alerts,
                bus,
                cache,
                config,
                permits,
            }),
        }
    }

    pub fn alerts(&self) -> &AlertEngine {
        &self.inner.alerts
    }

    pub fn cache(&self) -> &Arc<PolicyCache> {
        &self.inner.cache
    }

    /// 处理一个遥测批次。
    pub async fn handle_batch(&self, mut batch: Dot11Batch) -> Result<BatchReport, PipelineError> {
        wsm_telemetry::record_batch_received();
        batch.normalize_macs();
        let scope = batch.scope();
        let snapshot = self
            .inner
            .cache
            .load(
                &scope,
                self.inner.stores.policies.as_ref(),
                self.inner.stores.mac_contexts.as_ref(),
            )
            .await?;

        let batch = Arc::new(batch);
        let known_macs = Arc::new(snapshot.known_macs.clone());
        let mut report = BatchReport::default();
        let mut monitored_bssids = BTreeSet::new();
        let mut tasks = JoinSet::new();
        for policy in snapshot.policies.iter().filter(|policy| policy.enabled) {
            let inner = self.inner.clone();
            let batch = batch.clone();
            let known_macs = known_macs.clone();
            let policy = policy.clone();
            tasks.spawn(async move {
                let _permit = inner.permits.clone().acquire_owned().await;
                evaluate_policy(&inner, &batch, &policy, &known_macs).await
            });
        }

        let mut reports = Vec::new();
        let collected = tokio::time::timeout(self.inner.config.deadline, async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(policy_report) => reports.push(policy_report),
                    Err(err) => warn!(target: "wsm.pipeline", error = %err, "policy_task_failed"),
                }
            }
        })
        .await;
        if collected.is_err() {
            wsm_telemetry::record_batch_deadline_exceeded();
            warn!(
                target: "wsm.pipeline",
                organization_id = ?scope.organization_id,
                tenant_id = ?scope.tenant_id,
                deadline_ms = self.inner.config.deadline.as_millis() as u64,
                abandoned = tasks.len(),
                "batch_deadline_exceeded"
            );
            report.timed_out = true;
            tasks.abort_all();
        }
        for policy_report in reports {
            report.policies_evaluated += 1;
            report.events += policy_report.events;
            report.alerts_recorded += policy_report.recorded;
            report.alert_failures += policy_report.failures;
            report.detectors_skipped += policy_report.skipped;
            report.baselines_bootstrapped += usize::from(policy_report.bootstrapped);
            monitored_bssids.extend(policy_report.bssids);
        }

        let monitored_ssids: BTreeSet<String> = snapshot
            .policies
            .iter()
            .filter(|policy| policy.enabled)
            .map(|policy| policy.ssid.clone())
            .collect();
        let events = self
            .watchlist_events(&batch, &known_macs, &monitored_ssids, &monitored_bssids)
            .await;
        report.events += events.len();
        let (recorded, failures) = record_events(&self.inner.alerts, events).await;
        report.alerts_recorded += recorded;
        report.alert_failures += failures;

        info!(
            target: "wsm.pipeline",
            organization_id = ?scope.organization_id,
            tenant_id = ?scope.tenant_id,
            policies = report.policies_evaluated,
            events = report.events,
            alerts = report.alerts_recorded,
            alert_failures = report.alert_failures,
            timed_out = report.timed_out,
            "batch_processed"
        );
        Ok(report)
    }

    async fn watchlist_events(
        &self,
        batch: &Dot11Batch,
        known_macs: &BTreeSet<String>,
        monitored_ssids: &BTreeSet<String>,
        monitored_bssids: &BTreeSet<String>,
    ) -> Vec<DetectionEvent> {
        let ctx = TenantContext::system(batch.scope());
        let watchlist = match self.inner.stores.watchlists.get_watchlist(&ctx).await {
            Ok(watchlist) => watchlist,
            Err(err) => {
                warn!(target: "wsm.pipeline", error = %err, "watchlist_load_failed");
                return Vec::new();
            }
        };
        let (allow_filters, _) = parse_allow_filters(&watchlist.allow_filters);
        let input = WatchlistInput {
            watchlist: &watchlist,
            allow_filters: &allow_filters,
            known_macs,
            monitored_ssids,
            monitored_bssids,
        };
        let events = run_watchlist_detectors(batch, &input);
        wsm_telemetry::record_detection_events(events.len() as u64);
        events
    }

    /// 本节点失效缓存并通知集群其他节点。
    pub fn policy_changed(&self, scope: Scope) -> Result<(), PipelineError> {
        self.broadcast_invalidation(MessageType::PolicyChanged, scope)
    }

    pub fn mac_context_changed(&self, scope: Scope) -> Result<(), PipelineError> {
        self.broadcast_invalidation(MessageType::MacContextChanged, scope)
    }

    fn broadcast_invalidation(
        &self,
        message_type: MessageType,
        scope: Scope,
    ) -> Result<(), PipelineError> {
        self.inner.cache.invalidate(&scope);
        let message = Message::json(message_type, &scope)
            .map_err(|err| PipelineError::Bus(err.to_string()))?;
        self.inner
            .bus
            .send(message)
            .map_err(|err| PipelineError::Bus(err.to_string()))
    }

    /// 后台批次消费任务。
    pub fn spawn_batch_worker(
        &self,
        mut batches: mpsc::Receiver<Dot11Batch>,
    ) -> tokio::task::JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            while let Some(batch) = batches.recv().await {
                if let Err(err) = pipeline.handle_batch(batch).await {
                    warn!(target: "wsm.pipeline", error = %err, "batch_failed");
                }
            }
            debug!(target: "wsm.pipeline", "batch_worker_stopped");
        })
    }
}

async fn evaluate_policy(
    inner: &PipelineInner,
    batch: &Dot11Batch,
    policy: &MonitoredSsid,
    known_macs: &BTreeSet<String>,
) -> PolicyReport {
    let mut report = PolicyReport::default();
    let (baseline, bootstrapped) = load_baseline(inner, batch, policy).await;
    report.bootstrapped = bootstrapped;
    if let Some(baseline) = &baseline {
        report.bssids.extend(baseline.bssids.keys().cloned());
    }

    let ctx = DetectionContext {
        baseline: baseline.as_ref(),
        known_macs,
        settings: &inner.config.detector_settings,
    };
    let outcome = run_policy_detectors(batch, policy, &ctx);
    report.skipped = outcome.skipped.len();
    report.events = outcome.events.len();
    wsm_telemetry::record_detection_events(outcome.events.len() as u64);

    let (recorded, failures) = record_events(&inner.alerts, outcome.events).await;
    report.recorded = recorded;
    report.failures = failures;
    report
}

/// 读取基线；缺失且允许引导时以本批次建立（同一 key 并发引导只有一个成功）。
async fn load_baseline(
    inner: &PipelineInner,
    batch: &Dot11Batch,
    policy: &MonitoredSsid,
) -> (Option<SsidBaseline>, bool) {
    let ctx = TenantContext::system(batch.scope());
    let baselines = &inner.stores.baselines;
    match baselines.get_baseline(&ctx, &policy.ssid).await {
        Ok(Some(baseline)) => return (Some(baseline), false),
        Ok(None) => {}
        Err(err) => {
            warn!(
                target: "wsm.pipeline",
                monitored_ssid = %policy.uuid,
                error = %err,
                "baseline_load_failed"
            );
            return (None, false);
        }
    }
    if !inner.config.baseline_bootstrap {
        return (None, false);
    }
    let Some(candidate) = baseline_from_batch(batch, policy, batch.received_at_ms) else {
        return (None, false);
    };
    match baselines
        .set_baseline_if_absent(&ctx, &policy.ssid, candidate.clone())
        .await
    {
        Ok(true) => {
            info!(
                target: "wsm.pipeline",
                monitored_ssid = %policy.uuid,
                ssid = %policy.ssid,
                bssids = candidate.bssids.len(),
                "baseline_bootstrapped"
            );
            (Some(candidate), true)
        }
        Ok(false) => match baselines.get_baseline(&ctx, &policy.ssid).await {
            Ok(baseline) => (baseline, false),
            Err(err) => {
                warn!(target: "wsm.pipeline", error = %err, "baseline_load_failed");
                (None, false)
            }
        },
        Err(err) => {
            warn!(
                target: "wsm.pipeline",
                monitored_ssid = %policy.uuid,
                error = %err,
                "baseline_bootstrap_failed"
            );
            (None, false)
        }
    }
}

/// 逐条记录告警；单条失败不影响其余事件。
async fn record_events(alerts: &AlertEngine, events: Vec<DetectionEvent>) -> (usize, usize) {
    let mut recorded = 0;
    let mut failures = 0;
    for event in events {
        let detection_type = event.detection_type;
        let subject = event.subject_key.clone();
        match alerts.record(event).await {
            Ok(_) => recorded += 1,
            Err(err) => {
                wsm_telemetry::record_alert_record_failure();
                warn!(
                    target: "wsm.pipeline",
                    detection_type = detection_type.as_str(),
                    subject = %subject,
                    error = %err,
                    "alert_record_failed"
                );
                failures += 1;
            }
        }
    }
    (recorded, failures)
}
