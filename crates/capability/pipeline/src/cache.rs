//! 按作用域缓存监控策略与已注解 MAC。

use crate::PipelineError;
use async_trait::async_trait;
use domain::{MonitoredSsid, Scope, TenantContext, normalize_mac};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;
use wsm_bus::{BusError, Message, MessageHandler, MessageType};
use wsm_storage::{MacAddressContextStore, MonitoredSsidStore};

/// 某个遥测作用域下的检测输入。
#[derive(Debug, Default)]
pub struct PolicySnapshot {
    /// 覆盖该作用域的全部策略（全局、组织级、租户级）。
    pub policies: Vec<MonitoredSsid>,
    pub known_macs: BTreeSet<String>,
}

struct CachedSnapshot {
    loaded_at: Instant,
    snapshot: Arc<PolicySnapshot>,
}

pub struct PolicyCache {
    ttl: Duration,
    entries: RwLock<HashMap<Scope, CachedSnapshot>>,
}

impl PolicyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// 读取缓存，过期或缺失时从存储加载。
    pub async fn load(
        &self,
        scope: &Scope,
        policies: &dyn MonitoredSsidStore,
        mac_contexts: &dyn MacAddressContextStore,
    ) -> Result<Arc<PolicySnapshot>, PipelineError> {
        if let Some(snapshot) = self.cached(scope)? {
            return Ok(snapshot);
        }

        let ctx = TenantContext::system(*scope);
        let covering = policies
            .list_covering(&ctx, scope)
            .await
            .map_err(|err| PipelineError::Storage(err.to_string()))?;
        let known_macs = mac_contexts
            .list_contexts(&ctx)
            .await
            .map_err(|err| PipelineError::Storage(err.to_string()))?
            .into_iter()
            .filter_map(|item| normalize_mac(&item.mac_address))
            .collect();
        let snapshot = Arc::new(PolicySnapshot {
            policies: covering,
            known_macs,
        });

        let mut entries = self
            .entries
            .write()
            .map_err(|_| PipelineError::Storage("policy cache lock failed".to_string()))?;
        entries.insert(
            *scope,
            CachedSnapshot {
                loaded_at: Instant::now(),
                snapshot: snapshot.clone(),
            },
        );
        Ok(snapshot)
    }

    fn cached(&self, scope: &Scope) -> Result<Option<Arc<PolicySnapshot>>, PipelineError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| PipelineError::Storage("policy cache lock failed".to_string()))?;
        Ok(entries
            .get(scope)
            .filter(|entry| entry.loaded_at.elapsed() < self.ttl)
            .map(|entry| entry.snapshot.clone()))
    }

    /// 失效被变更作用域覆盖的全部缓存项。
    pub fn invalidate(&self, changed: &Scope) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|scope, _| !changed.covers(scope));
        before - entries.len()
    }
}

/// 策略 / MAC 注解变更消息处理器：失效本节点缓存。
pub struct PolicyCacheInvalidator {
    cache: Arc<PolicyCache>,
}

impl PolicyCacheInvalidator {
    pub fn new(cache: Arc<PolicyCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl MessageHandler for PolicyCacheInvalidator {
    async fn handle(&self, message: &Message) -> Result<(), BusError> {
        match message.message_type() {
            MessageType::PolicyChanged | MessageType::MacContextChanged => {
                let scope: Scope = message.decode()?;
                let removed = self.cache.invalidate(&scope);
                debug!(
                    target: "wsm.pipeline",
                    message_type = message.message_type().as_str(),
                    organization_id = ?scope.organization_id,
                    tenant_id = ?scope.tenant_id,
                    removed,
                    "policy_cache_invalidated"
                );
                Ok(())
            }
            other => Err(BusError::Handler(format!(
                "unexpected message type {}",
                other.as_str()
            ))),
        }
    }
}
