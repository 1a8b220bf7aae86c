use domain::{
    AlertStatus, DetectionAlert, DetectionEvent, DetectionType, MacAddressContext, Scope,
    TenantContext,
};
use uuid::Uuid;
use wsm_storage::{
    AlertStore, InMemoryAlertStore, InMemoryMacAddressContextStore, MacAddressContextStore,
};

fn alert(scope: Scope, subject: &str, count: u64) -> DetectionAlert {
    let mut alert = DetectionAlert::activate(&DetectionEvent {
        detection_type: DetectionType::Dot11MonitorBssid,
        scope,
        subject_key: subject.to_string(),
        details: serde_json::json!({}),
        observed_at_ms: 1_000,
        monitored_ssid_uuid: None,
    });
    alert.occurrence_count = count;
    alert
}

#[tokio::test]
async fn upsert_never_decreases_occurrence_count() {
    let store = InMemoryAlertStore::new();
    let scope = Scope::new(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
    let ctx = TenantContext::system(scope);
    let newer = alert(scope, "AA:AA:AA:AA:AA:01", 5);
    let mut older = newer.clone();
    older.occurrence_count = 2;

    store.upsert_alert(&ctx, &newer).await.expect("newer");
    store.upsert_alert(&ctx, &older).await.expect("older");

    let stored = store
        .find_alert(&ctx, newer.uuid)
        .await
        .expect("find")
        .expect("present");
    assert_eq!(stored.occurrence_count, 5);
}

#[tokio::test]
async fn upsert_keeps_resolved_alert_resolved() {
    let store = InMemoryAlertStore::new();
    let scope = Scope::new(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
    let ctx = TenantContext::system(scope);
    let active = alert(scope, "AA:AA:AA:AA:AA:01", 3);
    let mut resolved = active.clone();
    resolved.status = AlertStatus::Resolved;
    resolved.resolved_at_ms = Some(9_000);

    store.upsert_alert(&ctx, &resolved).await.expect("resolved");
    store.upsert_alert(&ctx, &active).await.expect("late active");

    let stored = store
        .find_alert(&ctx, active.uuid)
        .await
        .expect("find")
        .expect("present");
    assert_eq!(stored.status, AlertStatus::Resolved);
    assert_eq!(stored.resolved_at_ms, Some(9_000));
    assert!(
        store
            .list_alerts(&ctx, Some(AlertStatus::Active), 0)
            .await
            .expect("list")
            .is_empty()
    );
}

#[tokio::test]
async fn list_filters_by_status_and_scope() {
    let store = InMemoryAlertStore::new();
    let org = Uuid::new_v4();
    let mine = Scope::new(Some(org), Some(Uuid::new_v4()));
    let other = Scope::new(Some(Uuid::new_v4()), Some(Uuid::new_v4()));
    let system = TenantContext::system(Scope::global());

    let active = alert(mine, "AA:AA:AA:AA:AA:01", 1);
    let mut resolved = alert(mine, "AA:AA:AA:AA:AA:02", 1);
    resolved.status = AlertStatus::Resolved;
    for item in [&active, &resolved, &alert(other, "AA:AA:AA:AA:AA:03", 1)] {
        store.upsert_alert(&system, item).await.expect("upsert");
    }

    let org_ctx = TenantContext::new(Some(org), None, "user-1");
    let visible = store.list_alerts(&org_ctx, None, 0).await.expect("list");
    assert_eq!(visible.len(), 2);
    let only_active = store
        .list_alerts(&org_ctx, Some(AlertStatus::Active), 0)
        .await
        .expect("list");
    assert_eq!(only_active.len(), 1);
    assert_eq!(only_active[0].uuid, active.uuid);
}

#[tokio::test]
async fn mac_context_lookup_normalizes_address() {
    let store = InMemoryMacAddressContextStore::new();
    let org = Uuid::new_v4();
    let tenant = Uuid::new_v4();
    let ctx = TenantContext::new(Some(org), Some(tenant), "user-1");
    store
        .upsert_context(
            &ctx,
            MacAddressContext {
                id: 0,
                uuid: Uuid::new_v4(),
                mac_address: "aa-bb-cc-dd-ee-ff".to_string(),
                name: Some("laptop".to_string()),
                description: "documented BYOD".to_string(),
                notes: None,
                organization_id: org,
                tenant_id: tenant,
                created_at_ms: 1,
                updated_at_ms: 1,
            },
        )
        .await
        .expect("upsert");

    let found = store
        .find_by_mac(&ctx, "AA:BB:CC:DD:EE:FF")
        .await
        .expect("find");
    assert_eq!(found.and_then(|item| item.name).as_deref(), Some("laptop"));
    assert!(store.find_by_mac(&ctx, "not-a-mac").await.expect("find").is_none());
}
