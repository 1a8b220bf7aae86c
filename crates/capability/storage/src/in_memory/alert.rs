//! 告警内存实现

use crate::error::StorageError;
use crate::traits::AlertStore;
use crate::validation::ensure_scope;
use domain::{AlertStatus, DetectionAlert, TenantContext};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

pub struct InMemoryAlertStore {
    alerts: RwLock<HashMap<Uuid, DetectionAlert>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self {
            alerts: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryAlertStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn upsert_alert(
        &self,
        ctx: &TenantContext,
        alert: &DetectionAlert,
    ) -> Result<(), StorageError> {
        ensure_scope(ctx, &alert.scope)?;
        let mut alerts = self
            .alerts
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut record = alert.clone();
        if let Some(existing) = alerts.get(&alert.uuid) {
            record.occurrence_count = record.occurrence_count.max(existing.occurrence_count);
            record.last_seen_at_ms = record.last_seen_at_ms.max(existing.last_seen_at_ms);
            record.first_seen_at_ms = record.first_seen_at_ms.min(existing.first_seen_at_ms);
            // RESOLVED 是终态，同一 uuid 不回到 ACTIVE
            if existing.status == AlertStatus::Resolved {
                record.status = AlertStatus::Resolved;
                record.resolved_at_ms = record.resolved_at_ms.or(existing.resolved_at_ms);
            }
        }
        alerts.insert(record.uuid, record);
        Ok(())
    }

    async fn find_alert(
        &self,
        ctx: &TenantContext,
        uuid: Uuid,
    ) -> Result<Option<DetectionAlert>, StorageError> {
        let alerts = self
            .alerts
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let scope = ctx.scope();
        Ok(alerts
            .get(&uuid)
            .filter(|item| scope.covers(&item.scope))
            .cloned())
    }

    async fn list_alerts(
        &self,
        ctx: &TenantContext,
        status: Option<AlertStatus>,
        limit: usize,
    ) -> Result<Vec<DetectionAlert>, StorageError> {
        let alerts = self
            .alerts
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let scope = ctx.scope();
        let mut items: Vec<DetectionAlert> = alerts
            .values()
            .filter(|item| scope.covers(&item.scope))
            .filter(|item| status.is_none_or(|status| item.status == status))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.last_seen_at_ms.cmp(&a.last_seen_at_ms));
        if limit > 0 && items.len() > limit {
            items.truncate(limit);
        }
        Ok(items)
    }
}
