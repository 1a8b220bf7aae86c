//! Postgres 监控策略实现

use super::{parse_optional_uuid, parse_uuid};
use crate::error::StorageError;
use crate::traits::MonitoredSsidStore;
use crate::validation::{ensure_same_scope, ensure_scope};
use domain::{MonitoredSsid, Scope, TenantContext};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const POLICY_COLUMNS: &str = "id, uuid, ssid, enabled, organization_id, tenant_id, \
     detectors::text as detectors, disco_monitor_type, disco_monitor_configuration, \
     similar_looking_ssid_threshold, ssid_substrings::text as ssid_substrings, \
     approved_clients::text as approved_clients, \
     (extract(epoch from created_at) * 1000)::bigint as created_at_ms, \
     (extract(epoch from updated_at) * 1000)::bigint as updated_at_ms";

pub struct PgMonitoredSsidStore {
    pub pool: PgPool,
}

impl PgMonitoredSsidStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn optional_id(value: Option<Uuid>) -> Option<String> {
    value.map(|id| id.to_string())
}

fn map_policy(row: &PgRow) -> Result<MonitoredSsid, StorageError> {
    let uuid: String = row.try_get("uuid")?;
    let detectors: String = row.try_get("detectors")?;
    let ssid_substrings: String = row.try_get("ssid_substrings")?;
    let approved_clients: String = row.try_get("approved_clients")?;
    let threshold: i32 = row.try_get("similar_looking_ssid_threshold")?;
    Ok(MonitoredSsid {
        id: row.try_get("id")?,
        uuid: parse_uuid(&uuid)?,
        ssid: row.try_get("ssid")?,
        enabled: row.try_get("enabled")?,
        organization_id: parse_optional_uuid(row.try_get("organization_id")?)?,
        tenant_id: parse_optional_uuid(row.try_get("tenant_id")?)?,
        detectors: serde_json::from_str(&detectors)?,
        disco_monitor_type: row.try_get("disco_monitor_type")?,
        disco_monitor_configuration: row.try_get("disco_monitor_configuration")?,
        similar_looking_ssid_threshold: threshold.max(0) as u32,
        ssid_substrings: serde_json::from_str(&ssid_substrings)?,
        approved_clients: serde_json::from_str(&approved_clients)?,
        created_at_ms: row.try_get("created_at_ms")?,
        updated_at_ms: row.try_get("updated_at_ms")?,
    })
}

#[async_trait::async_trait]
impl MonitoredSsidStore for PgMonitoredSsidStore {
    async fn list_policies(&self, ctx: &TenantContext) -> Result<Vec<MonitoredSsid>, StorageError> {
        let sql = format!(
            "select {POLICY_COLUMNS} from monitored_ssids \
             where ($1::text is null or organization_id = $1) \
             and ($2::text is null or tenant_id = $2) \
             order by ssid asc"
        );
        let rows = sqlx::query(&sql)
            .bind(optional_id(ctx.organization_id))
            .bind(optional_id(ctx.tenant_id))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_policy).collect()
    }

    async fn list_covering(
        &self,
        ctx: &TenantContext,
        target: &Scope,
    ) -> Result<Vec<MonitoredSsid>, StorageError> {
        ensure_scope(ctx, target)?;
        let sql = format!(
            "select {POLICY_COLUMNS} from monitored_ssids \
             where organization_id is null \
             or (organization_id = $1 and tenant_id is null) \
             or (organization_id = $1 and tenant_id = $2) \
             order by ssid asc"
        );
        let rows = sqlx::query(&sql)
            .bind(optional_id(target.organization_id))
            .bind(optional_id(target.tenant_id))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_policy).collect()
    }

    async fn find_policy(
        &self,
        ctx: &TenantContext,
        uuid: Uuid,
    ) -> Result<Option<MonitoredSsid>, StorageError> {
        let sql = format!(
            "select {POLICY_COLUMNS} from monitored_ssids \
             where uuid = $1 \
             and ($2::text is null or organization_id = $2) \
             and ($3::text is null or tenant_id = $3)"
        );
        let row = sqlx::query(&sql)
            .bind(uuid.to_string())
            .bind(optional_id(ctx.organization_id))
            .bind(optional_id(ctx.tenant_id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_policy).transpose()
    }

    async fn upsert_policy(
        &self,
        ctx: &TenantContext,
        record: MonitoredSsid,
    ) -> Result<MonitoredSsid, StorageError> {
        ensure_same_scope(ctx, &record.scope())?;
        let sql = format!(
            "insert into monitored_ssids \
             (uuid, ssid, enabled, organization_id, tenant_id, detectors, disco_monitor_type, \
             disco_monitor_configuration, similar_looking_ssid_threshold, ssid_substrings, \
             approved_clients, created_at, updated_at) \
             values ($1, $2, $3, $4, $5, $6::jsonb, $7, $8, $9, $10::jsonb, $11::jsonb, \
             to_timestamp($12 / 1000.0), to_timestamp($13 / 1000.0)) \
             on conflict ((coalesce(organization_id, '')), (coalesce(tenant_id, '')), ssid) \
             do update set enabled = excluded.enabled, detectors = excluded.detectors, \
             disco_monitor_type = excluded.disco_monitor_type, \
             disco_monitor_configuration = excluded.disco_monitor_configuration, \
             similar_looking_ssid_threshold = excluded.similar_looking_ssid_threshold, \
             ssid_substrings = excluded.ssid_substrings, \
             approved_clients = excluded.approved_clients, updated_at = excluded.updated_at \
             returning {POLICY_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(record.uuid.to_string())
            .bind(&record.ssid)
            .bind(record.enabled)
            .bind(optional_id(record.organization_id))
            .bind(optional_id(record.tenant_id))
            .bind(serde_json::to_string(&record.detectors)?)
            .bind(&record.disco_monitor_type)
            .bind(&record.disco_monitor_configuration)
            .bind(record.similar_looking_ssid_threshold.min(i32::MAX as u32) as i32)
            .bind(serde_json::to_string(&record.ssid_substrings)?)
            .bind(serde_json::to_string(&record.approved_clients)?)
            .bind(record.created_at_ms as f64)
            .bind(record.updated_at_ms as f64)
            .fetch_one(&self.pool)
            .await?;
        map_policy(&row)
    }

    async fn delete_policy(&self, ctx: &TenantContext, uuid: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "delete from monitored_ssids where uuid = $1 \
             and ($2::text is null or organization_id = $2) \
             and ($3::text is null or tenant_id = $3)",
        )
        .bind(uuid.to_string())
        .bind(optional_id(ctx.organization_id))
        .bind(optional_id(ctx.tenant_id))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
