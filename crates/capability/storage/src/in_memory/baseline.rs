//! SSID 基线内存实现

use crate::error::StorageError;
use crate::models::{BaselineKey, SsidBaseline};
use crate::traits::BaselineStore;
use domain::TenantContext;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;

pub struct InMemoryBaselineStore {
    baselines: RwLock<HashMap<BaselineKey, SsidBaseline>>,
}

impl InMemoryBaselineStore {
    pub fn new() -> Self {
        Self {
            baselines: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBaselineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BaselineStore for InMemoryBaselineStore {
    async fn get_baseline(
        &self,
        ctx: &TenantContext,
        ssid: &str,
    ) -> Result<Option<SsidBaseline>, StorageError> {
        let baselines = self
            .baselines
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(baselines
            .get(&BaselineKey::new(&ctx.scope(), ssid))
            .cloned())
    }

    async fn set_baseline(
        &self,
        ctx: &TenantContext,
        ssid: &str,
        baseline: SsidBaseline,
    ) -> Result<(), StorageError> {
        let mut baselines = self
            .baselines
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        baselines.insert(BaselineKey::new(&ctx.scope(), ssid), baseline);
        Ok(())
    }

    async fn set_baseline_if_absent(
        &self,
        ctx: &TenantContext,
        ssid: &str,
        baseline: SsidBaseline,
    ) -> Result<bool, StorageError> {
        let mut baselines = self
            .baselines
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        match baselines.entry(BaselineKey::new(&ctx.scope(), ssid)) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(baseline);
                Ok(true)
            }
        }
    }
}
