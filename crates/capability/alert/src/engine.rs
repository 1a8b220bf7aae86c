//! 告警状态机：NONE → ACTIVE → ACTIVE(次数累加) → RESOLVED → NONE。
//!
//! 合并表只保存 ACTIVE 告警；解除即从表中移除，后续同 key 事件开启新的 ACTIVE 周期。

use crate::{AlertError, NotificationPolicy, Notifier, SubscriptionRegistry};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use domain::{AlertKey, AlertStatus, DetectionAlert, DetectionEvent, TenantContext};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wsm_bus::{Message, MessageBus, MessageType};
use wsm_storage::AlertStore;

/// 一次 `record` 的结果。
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub alert: DetectionAlert,
    /// 是否由 NONE 进入 ACTIVE（新的告警周期）。
    pub is_new_occurrence: bool,
    /// 是否触发了订阅通知与集群分发。
    pub distributed: bool,
}

struct EngineInner {
    alerts: DashMap<AlertKey, DetectionAlert>,
    store: Arc<dyn AlertStore>,
    subscriptions: SubscriptionRegistry,
    notifier: Arc<dyn Notifier>,
    bus: Arc<dyn MessageBus>,
    policy: NotificationPolicy,
}

/// 告警引擎。
#[derive(Clone)]
pub struct AlertEngine {
    inner: Arc<EngineInner>,
}

impl AlertEngine {
    pub fn new(
        store: Arc<dyn AlertStore>,
        notifier: Arc<dyn Notifier>,
        bus: Arc<dyn MessageBus>,
        policy: NotificationPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                alerts: DashMap::new(),
                store,
                subscriptions: SubscriptionRegistry::new(),
                notifier,
                bus,
                policy,
            }),
        }
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.inner.subscriptions
    }

    pub fn policy(&self) -> NotificationPolicy {
        self.inner.policy
    }

    /// 记录检测事件。
    ///
    /// 合并表先更新，随后持久化与分发；持久化或分发失败返回错误，
    /// 但合并结果保留，同 key 的下一次事件仍会被正确计数。
    pub async fn record(&self, event: DetectionEvent) -> Result<RecordOutcome, AlertError> {
        let (alert, is_new_occurrence) = self.coalesce(&event);
        if is_new_occurrence {
            wsm_telemetry::record_alert_activated();
            info!(
                target: "wsm.alert",
                alert_id = %alert.uuid,
                detection_type = alert.detection_type.as_str(),
                subject = %alert.subject_key,
                organization_id = ?alert.scope.organization_id,
                tenant_id = ?alert.scope.tenant_id,
                "alert_activated"
            );
        } else {
            wsm_telemetry::record_alert_coalesced();
            debug!(
                target: "wsm.alert",
                alert_id = %alert.uuid,
                detection_type = alert.detection_type.as_str(),
                occurrence_count = alert.occurrence_count,
                "alert_coalesced"
            );
        }

        let persisted = self.persist(&alert).await;
        let distributed = is_new_occurrence
            || self.inner.policy == NotificationPolicy::EveryOccurrence;
        let mut result = persisted;
        if distributed {
            self.notify_subscribers(&alert).await;
            let replicated = self.broadcast(MessageType::NewAlert, &alert);
            if result.is_ok() {
                result = replicated;
            }
        }
        result.map(|()| RecordOutcome {
            alert,
            is_new_occurrence,
            distributed,
        })
    }

    fn coalesce(&self, event: &DetectionEvent) -> (DetectionAlert, bool) {
        // entry 守卫只在本函数内持有，不跨 await
        match self.inner.alerts.entry(event.key()) {
            Entry::Occupied(mut entry) => {
                let alert = entry.get_mut();
                alert.occurrence_count = alert.occurrence_count.saturating_add(1);
                alert.last_seen_at_ms = alert.last_seen_at_ms.max(event.observed_at_ms);
                alert.first_seen_at_ms = alert.first_seen_at_ms.min(event.observed_at_ms);
                alert.details = event.details.clone();
                (alert.clone(), false)
            }
            Entry::Vacant(entry) => {
                let alert = DetectionAlert::activate(event);
                entry.insert(alert.clone());
                (alert, true)
            }
        }
    }

    /// 解除告警；key 未处于 ACTIVE 时为空操作。
    pub async fn resolve(
        &self,
        key: &AlertKey,
        resolved_at_ms: i64,
    ) -> Result<Option<DetectionAlert>, AlertError> {
        let Some(alert) = self.take_resolved(key, resolved_at_ms) else {
            return Ok(None);
        };
        let persisted = self.persist(&alert).await;
        let replicated = self.broadcast(MessageType::AlertResolved, &alert);
        persisted.and(replicated).map(|()| Some(alert))
    }

    /// 按 uuid 解除调用方可见的 ACTIVE 告警。
    pub async fn acknowledge(
        &self,
        ctx: &TenantContext,
        alert_id: Uuid,
        resolved_at_ms: i64,
    ) -> Result<Option<DetectionAlert>, AlertError> {
        let scope = ctx.scope();
        let key = self
            .inner
            .alerts
            .iter()
            .find(|item| item.uuid == alert_id && scope.covers(&item.scope))
            .map(|item| item.key().clone());
        match key {
            Some(key) => self.resolve(&key, resolved_at_ms).await,
            None => Ok(None),
        }
    }

    fn take_resolved(&self, key: &AlertKey, resolved_at_ms: i64) -> Option<DetectionAlert> {
        let Some((_, mut alert)) = self.inner.alerts.remove(key) else {
            debug!(
                target: "wsm.alert",
                detection_type = key.detection_type.as_str(),
                subject = %key.subject_key,
                "alert_resolve_untracked"
            );
            return None;
        };
        alert.status = AlertStatus::Resolved;
        alert.resolved_at_ms = Some(resolved_at_ms.max(alert.last_seen_at_ms));
        wsm_telemetry::record_alert_resolved();
        info!(
            target: "wsm.alert",
            alert_id = %alert.uuid,
            detection_type = alert.detection_type.as_str(),
            subject = %alert.subject_key,
            occurrence_count = alert.occurrence_count,
            "alert_resolved"
        );
        Some(alert)
    }

    /// 应用对端复制来的告警（不再通知、不再转发）。
    ///
    /// 重复应用同一告警结果不变：次数与时间取并集（max/min）。
    /// 本地已解除的 uuid 不会因迟到或重投的 ACTIVE 消息复活。
    pub async fn apply_replicated(
        &self,
        alert: DetectionAlert,
    ) -> Result<Option<DetectionAlert>, AlertError> {
        if !alert.is_active() {
            return self.apply_replicated_resolution(&alert).await;
        }
        if !self.inner.alerts.contains_key(&alert.key()) && self.is_resolved(&alert).await? {
            debug!(
                target: "wsm.alert",
                alert_id = %alert.uuid,
                detection_type = alert.detection_type.as_str(),
                "replicated_alert_already_resolved"
            );
            return Ok(None);
        }
        let merged = match self.inner.alerts.entry(alert.key()) {
            Entry::Occupied(mut entry) => {
                let local = entry.get_mut();
                local.occurrence_count = local.occurrence_count.max(alert.occurrence_count);
                local.last_seen_at_ms = local.last_seen_at_ms.max(alert.last_seen_at_ms);
                local.first_seen_at_ms = local.first_seen_at_ms.min(alert.first_seen_at_ms);
                local.clone()
            }
            Entry::Vacant(entry) => {
                entry.insert(alert.clone());
                alert
            }
        };
        self.persist(&merged).await?;
        Ok(Some(merged))
    }

    /// 应用对端的解除；本地未跟踪该 key 时为空操作。
    pub async fn apply_replicated_resolution(
        &self,
        alert: &DetectionAlert,
    ) -> Result<Option<DetectionAlert>, AlertError> {
        let resolved_at_ms = alert.resolved_at_ms.unwrap_or(alert.last_seen_at_ms);
        let Some(local) = self.take_resolved(&alert.key(), resolved_at_ms) else {
            return Ok(None);
        };
        self.persist(&local).await?;
        Ok(Some(local))
    }

    async fn is_resolved(&self, alert: &DetectionAlert) -> Result<bool, AlertError> {
        let ctx = TenantContext::system(alert.scope);
        let stored = self.inner.store.find_alert(&ctx, alert.uuid).await?;
        Ok(stored.is_some_and(|stored| stored.status == AlertStatus::Resolved))
    }

    /// 当前 ACTIVE 告警。
    pub fn active(&self, key: &AlertKey) -> Option<DetectionAlert> {
        self.inner.alerts.get(key).map(|item| item.value().clone())
    }

    /// 调用方可见的全部 ACTIVE 告警（按 last_seen 倒序）。
    pub fn active_alerts(&self, ctx: &TenantContext) -> Vec<DetectionAlert> {
        let scope = ctx.scope();
        let mut alerts: Vec<DetectionAlert> = self
            .inner
            .alerts
            .iter()
            .filter(|item| scope.covers(&item.scope))
            .map(|item| item.value().clone())
            .collect();
        alerts.sort_by(|a, b| b.last_seen_at_ms.cmp(&a.last_seen_at_ms));
        alerts
    }

    async fn persist(&self, alert: &DetectionAlert) -> Result<(), AlertError> {
        let ctx = TenantContext::system(alert.scope);
        self.inner
            .store
            .upsert_alert(&ctx, alert)
            .await
            .map_err(|err| {
                warn!(
                    target: "wsm.alert",
                    alert_id = %alert.uuid,
                    error = %err,
                    "alert_persist_failed"
                );
                AlertError::from(err)
            })
    }

    async fn notify_subscribers(&self, alert: &DetectionAlert) -> usize {
        let subscribers = match self.inner.subscriptions.subscribers_for(alert) {
            Ok(subscribers) => subscribers,
            Err(err) => {
                warn!(target: "wsm.alert", error = %err, "subscription_lookup_failed");
                return 0;
            }
        };
        let mut sent = 0;
        for subscriber in subscribers {
            match self.inner.notifier.notify(&subscriber, alert).await {
                Ok(()) => {
                    wsm_telemetry::record_notification_sent();
                    sent += 1;
                }
                Err(err) => warn!(
                    target: "wsm.alert",
                    alert_id = %alert.uuid,
                    subscriber_id = %subscriber,
                    error = %err,
                    "alert_notification_failed"
                ),
            }
        }
        sent
    }

    fn broadcast(&self, message_type: MessageType, alert: &DetectionAlert) -> Result<(), AlertError> {
        let message = Message::json(message_type, alert)?;
        self.inner.bus.send(message).map_err(|err| {
            warn!(
                target: "wsm.alert",
                alert_id = %alert.uuid,
                message_type = message_type.as_str(),
                error = %err,
                "alert_broadcast_failed"
            );
            AlertError::from(err)
        })
    }
}
