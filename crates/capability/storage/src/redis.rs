//! Redis SSID 基线存储实现
//!
//! 基线以 JSON 存储在 `wsm:{scope}:ssid:{ssid}:baseline`；
//! `set_baseline_if_absent` 使用 `SET NX` 保证并发引导时不会互相覆盖。

use crate::error::StorageError;
use crate::models::{BaselineKey, SsidBaseline};
use crate::traits::BaselineStore;
use domain::TenantContext;
use redis::AsyncCommands;

pub struct RedisBaselineStore {
    client: redis::Client,
}

impl RedisBaselineStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn connect(redis_url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self::new(client))
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StorageError> {
        Ok(self.client.get_multiplexed_tokio_connection().await?)
    }
}

#[async_trait::async_trait]
impl BaselineStore for RedisBaselineStore {
    async fn get_baseline(
        &self,
        ctx: &TenantContext,
        ssid: &str,
    ) -> Result<Option<SsidBaseline>, StorageError> {
        let mut connection = self.connection().await?;
        let key = BaselineKey::new(&ctx.scope(), ssid).redis_key();
        let data: Option<String> = connection.get(key).await?;
        let Some(data) = data else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&data)?))
    }

    async fn set_baseline(
        &self,
        ctx: &TenantContext,
        ssid: &str,
        baseline: SsidBaseline,
    ) -> Result<(), StorageError> {
        let mut connection = self.connection().await?;
        let key = BaselineKey::new(&ctx.scope(), ssid).redis_key();
        let data = serde_json::to_string(&baseline)?;
        connection.set::<_, _, ()>(key, data).await?;
        Ok(())
    }

    async fn set_baseline_if_absent(
        &self,
        ctx: &TenantContext,
        ssid: &str,
        baseline: SsidBaseline,
    ) -> Result<bool, StorageError> {
        let mut connection = self.connection().await?;
        let key = BaselineKey::new(&ctx.scope(), ssid).redis_key();
        let data = serde_json::to_string(&baseline)?;
        let written: bool = connection.set_nx(key, data).await?;
        Ok(written)
    }
}
