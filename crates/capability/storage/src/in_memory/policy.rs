//! 监控策略内存实现

use crate::error::StorageError;
use crate::traits::MonitoredSsidStore;
use crate::validation::{ensure_same_scope, ensure_scope};
use domain::{MonitoredSsid, Scope, TenantContext};
use std::sync::RwLock;
use uuid::Uuid;

pub struct InMemoryMonitoredSsidStore {
    policies: RwLock<Vec<MonitoredSsid>>,
}

impl InMemoryMonitoredSsidStore {
    pub fn new() -> Self {
        Self {
            policies: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryMonitoredSsidStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MonitoredSsidStore for InMemoryMonitoredSsidStore {
    async fn list_policies(&self, ctx: &TenantContext) -> Result<Vec<MonitoredSsid>, StorageError> {
        let policies = self
            .policies
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let scope = ctx.scope();
        Ok(policies
            .iter()
            .filter(|item| scope.covers(&item.scope()))
            .cloned()
            .collect())
    }

    async fn list_covering(
        &self,
        ctx: &TenantContext,
        target: &Scope,
    ) -> Result<Vec<MonitoredSsid>, StorageError> {
        ensure_scope(ctx, target)?;
        let policies = self
            .policies
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(policies
            .iter()
            .filter(|item| item.scope().covers(target))
            .cloned()
            .collect())
    }

    async fn find_policy(
        &self,
        ctx: &TenantContext,
        uuid: Uuid,
    ) -> Result<Option<MonitoredSsid>, StorageError> {
        let policies = self
            .policies
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let scope = ctx.scope();
        Ok(policies
            .iter()
            .find(|item| item.uuid == uuid && scope.covers(&item.scope()))
            .cloned())
    }

    async fn upsert_policy(
        &self,
        ctx: &TenantContext,
        mut record: MonitoredSsid,
    ) -> Result<MonitoredSsid, StorageError> {
        ensure_same_scope(ctx, &record.scope())?;
        let mut policies = self
            .policies
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let existing = policies
            .iter_mut()
            .find(|item| item.scope() == record.scope() && item.ssid == record.ssid);
        if let Some(existing) = existing {
            record.id = existing.id;
            record.uuid = existing.uuid;
            record.created_at_ms = existing.created_at_ms;
            *existing = record.clone();
            return Ok(record);
        }
        record.id = policies.iter().map(|item| item.id).max().unwrap_or(0) + 1;
        policies.push(record.clone());
        Ok(record)
    }

    async fn delete_policy(&self, ctx: &TenantContext, uuid: Uuid) -> Result<bool, StorageError> {
        let mut policies = self
            .policies
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let before = policies.len();
        policies.retain(|item| {
            item.uuid != uuid || ensure_same_scope(ctx, &item.scope()).is_err()
        });
        Ok(policies.len() != before)
    }
}
