//! 租户观察名单内存实现

use crate::error::StorageError;
use crate::models::TenantWatchlist;
use crate::traits::WatchlistStore;
use domain::TenantContext;
use std::collections::HashMap;
use std::sync::RwLock;

pub struct InMemoryWatchlistStore {
    watchlists: RwLock<HashMap<String, TenantWatchlist>>,
}

impl InMemoryWatchlistStore {
    pub fn new() -> Self {
        Self {
            watchlists: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryWatchlistStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl WatchlistStore for InMemoryWatchlistStore {
    async fn get_watchlist(&self, ctx: &TenantContext) -> Result<TenantWatchlist, StorageError> {
        let watchlists = self
            .watchlists
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(watchlists
            .get(&ctx.scope().key())
            .cloned()
            .unwrap_or_default())
    }

    async fn set_watchlist(
        &self,
        ctx: &TenantContext,
        watchlist: TenantWatchlist,
    ) -> Result<(), StorageError> {
        let mut watchlists = self
            .watchlists
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        watchlists.insert(ctx.scope().key(), watchlist);
        Ok(())
    }
}
