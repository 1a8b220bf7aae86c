use domain::{Scope, TenantContext};
use uuid::Uuid;
use wsm_storage::{BaselineStore, BssidBaseline, InMemoryBaselineStore, SsidBaseline};

fn baseline_with(bssid: &str, channel: u16) -> SsidBaseline {
    let mut entry = BssidBaseline::default();
    entry.channels.insert(channel);
    let mut baseline = SsidBaseline::default();
    baseline.bssids.insert(bssid.to_string(), entry);
    baseline
}

#[tokio::test]
async fn set_if_absent_never_overwrites() {
    let store = InMemoryBaselineStore::new();
    let ctx = TenantContext::system(Scope::new(Some(Uuid::new_v4()), Some(Uuid::new_v4())));

    assert!(
        store
            .set_baseline_if_absent(&ctx, "CorpWifi", baseline_with("AA:AA:AA:AA:AA:01", 6))
            .await
            .expect("first")
    );
    assert!(
        !store
            .set_baseline_if_absent(&ctx, "CorpWifi", baseline_with("AA:AA:AA:AA:AA:02", 11))
            .await
            .expect("second")
    );

    let stored = store
        .get_baseline(&ctx, "CorpWifi")
        .await
        .expect("get")
        .expect("present");
    assert!(stored.contains_bssid("AA:AA:AA:AA:AA:01"));
    assert!(!stored.contains_bssid("AA:AA:AA:AA:AA:02"));
}

#[tokio::test]
async fn baselines_are_isolated_per_scope() {
    let store = InMemoryBaselineStore::new();
    let org = Uuid::new_v4();
    let a = TenantContext::system(Scope::new(Some(org), Some(Uuid::new_v4())));
    let b = TenantContext::system(Scope::new(Some(org), Some(Uuid::new_v4())));

    store
        .set_baseline(&a, "CorpWifi", baseline_with("AA:AA:AA:AA:AA:01", 6))
        .await
        .expect("set");
    assert!(store.get_baseline(&b, "CorpWifi").await.expect("get").is_none());
}
