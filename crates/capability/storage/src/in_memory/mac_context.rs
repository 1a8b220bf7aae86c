//! MAC 注解内存实现

use crate::error::StorageError;
use crate::traits::MacAddressContextStore;
use crate::validation::ensure_same_scope;
use domain::{MacAddressContext, TenantContext, normalize_mac};
use std::collections::HashMap;
use std::sync::RwLock;

pub struct InMemoryMacAddressContextStore {
    // key: "{scope}:{mac}"
    contexts: RwLock<HashMap<String, MacAddressContext>>,
}

impl InMemoryMacAddressContextStore {
    pub fn new() -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryMacAddressContextStore {
    fn default() -> Self {
        Self::new()
    }
}

fn context_key(scope_key: &str, mac: &str) -> String {
    format!("{}:{}", scope_key, mac)
}

#[async_trait::async_trait]
impl MacAddressContextStore for InMemoryMacAddressContextStore {
    async fn find_by_mac(
        &self,
        ctx: &TenantContext,
        mac_address: &str,
    ) -> Result<Option<MacAddressContext>, StorageError> {
        let Some(mac) = normalize_mac(mac_address) else {
            return Ok(None);
        };
        let contexts = self
            .contexts
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(contexts
            .get(&context_key(&ctx.scope().key(), &mac))
            .cloned())
    }

    async fn list_contexts(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<MacAddressContext>, StorageError> {
        let contexts = self
            .contexts
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let scope = ctx.scope();
        let mut items: Vec<MacAddressContext> = contexts
            .values()
            .filter(|item| item.scope() == scope)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.mac_address.cmp(&b.mac_address));
        Ok(items)
    }

    async fn upsert_context(
        &self,
        ctx: &TenantContext,
        mut record: MacAddressContext,
    ) -> Result<MacAddressContext, StorageError> {
        ensure_same_scope(ctx, &record.scope())?;
        let mac = normalize_mac(&record.mac_address)
            .ok_or_else(|| StorageError::new("invalid mac address"))?;
        record.mac_address = mac.clone();
        let mut contexts = self
            .contexts
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let key = context_key(&record.scope().key(), &mac);
        if let Some(existing) = contexts.get(&key) {
            record.id = existing.id;
            record.uuid = existing.uuid;
            record.created_at_ms = existing.created_at_ms;
        } else {
            record.id = contexts.values().map(|item| item.id).max().unwrap_or(0) + 1;
        }
        contexts.insert(key, record.clone());
        Ok(record)
    }
}
