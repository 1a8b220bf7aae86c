use async_trait::async_trait;
use domain::{
    Bandit, BssidObservation, DetectionType, DetectorKind, DisconnectionObservation, Dot11Batch,
    MonitoredSsid, Scope, TenantContext,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wsm_alert::{AlertEngine, LogNotifier, NotificationPolicy};
use wsm_bus::{BusConfig, Message, MessageBus, MessageHandler, MessageType, QueueMessageBus};
use wsm_pipeline::{
    DetectionPipeline, PipelineConfig, PipelineStores, PolicyCache, PolicyCacheInvalidator,
};
use wsm_storage::{
    AlertStore, BaselineStore, InMemoryAlertStore, InMemoryBaselineStore,
    InMemoryMacAddressContextStore, InMemoryMessageQueue, InMemoryMonitoredSsidStore,
    InMemoryNodeDirectory, InMemoryWatchlistStore, MonitoredSsidStore, SsidBaseline,
    StorageError, TenantWatchlist, WatchlistStore,
};

const KNOWN: &str = "AA:AA:AA:AA:AA:01";
const ROGUE: &str = "BB:BB:BB:BB:BB:02";

struct Harness {
    pipeline: DetectionPipeline,
    policies: Arc<InMemoryMonitoredSsidStore>,
    baselines: Arc<dyn BaselineStore>,
    watchlists: Arc<InMemoryWatchlistStore>,
    alerts: Arc<InMemoryAlertStore>,
}

fn org() -> Uuid {
    Uuid::from_u128(10)
}

fn tenant_scope() -> Scope {
    Scope::new(Some(org()), Some(Uuid::from_u128(20)))
}

fn harness_with(baselines: Arc<dyn BaselineStore>, config: PipelineConfig) -> Harness {
    let policies = Arc::new(InMemoryMonitoredSsidStore::new());
    let watchlists = Arc::new(InMemoryWatchlistStore::new());
    let alerts = Arc::new(InMemoryAlertStore::new());
    let bus = Arc::new(QueueMessageBus::new(
        Uuid::new_v4(),
        Arc::new(InMemoryMessageQueue::new()),
        Arc::new(InMemoryNodeDirectory::new()),
        BusConfig::default(),
    ));
    bus.initialize().expect("initialize");
    let engine = AlertEngine::new(
        alerts.clone(),
        Arc::new(LogNotifier),
        bus.clone(),
        NotificationPolicy::OncePerActivePeriod,
    );
    let stores = PipelineStores {
        policies: policies.clone(),
        mac_contexts: Arc::new(InMemoryMacAddressContextStore::new()),
        baselines: baselines.clone(),
        watchlists: watchlists.clone(),
    };
    let cache = Arc::new(PolicyCache::new(Duration::from_secs(3600)));
    Harness {
        pipeline: DetectionPipeline::new(stores, engine, bus, cache, config),
        policies,
        baselines,
        watchlists,
        alerts,
    }
}

fn harness() -> Harness {
    harness_with(
        Arc::new(InMemoryBaselineStore::new()),
        PipelineConfig::default(),
    )
}

async fn add_policy(harness: &Harness, policy: MonitoredSsid) {
    harness
        .policies
        .upsert_policy(&TenantContext::system(Scope::global()), policy)
        .await
        .expect("upsert");
}

fn beacon(bssid: &str, ssid: &str, ts: i64) -> BssidObservation {
    BssidObservation {
        bssid: bssid.to_string(),
        ssid: ssid.to_string(),
        channel: 6,
        security_suite: Some("WPA2-PSK-CCMP".to_string()),
        fingerprint: Some("fp-1".to_string()),
        signal_dbm: -55,
        observed_at_ms: ts,
    }
}

fn batch(scope: Scope, beacons: Vec<BssidObservation>) -> Dot11Batch {
    Dot11Batch {
        organization_id: scope.organization_id,
        tenant_id: scope.tenant_id,
        received_at_ms: 1_000,
        beacons,
        ..Dot11Batch::default()
    }
}

async fn active_types(harness: &Harness) -> Vec<(DetectionType, String, u64)> {
    let ctx = TenantContext::system(Scope::global());
    let mut alerts: Vec<(DetectionType, String, u64)> = harness
        .alerts
        .list_alerts(&ctx, None, 0)
        .await
        .expect("list")
        .into_iter()
        .map(|alert| (alert.detection_type, alert.subject_key, alert.occurrence_count))
        .collect();
    alerts.sort_by(|a, b| a.1.cmp(&b.1));
    alerts
}

#[tokio::test]
async fn first_batch_bootstraps_baseline_then_rogue_bssid_alerts() {
    let harness = harness();
    add_policy(
        &harness,
        MonitoredSsid::new("CorpWifi", Scope::new(Some(org()), None), 1)
            .with_detector(DetectorKind::UnexpectedBssid),
    )
    .await;

    let first = harness
        .pipeline
        .handle_batch(batch(tenant_scope(), vec![beacon(KNOWN, "CorpWifi", 1)]))
        .await
        .expect("batch");
    assert_eq!(first.baselines_bootstrapped, 1);
    assert_eq!(first.events, 0);

    let ctx = TenantContext::system(tenant_scope());
    let baseline = harness
        .baselines
        .get_baseline(&ctx, "CorpWifi")
        .await
        .expect("baseline")
        .expect("bootstrapped");
    assert!(baseline.contains_bssid(KNOWN));

    for ts in [2, 3] {
        let report = harness
            .pipeline
            .handle_batch(batch(
                tenant_scope(),
                vec![beacon(KNOWN, "CorpWifi", ts), beacon(ROGUE, "CorpWifi", ts)],
            ))
            .await
            .expect("batch");
        assert_eq!(report.alerts_recorded, 1);
    }
    assert_eq!(
        active_types(&harness).await,
        vec![(DetectionType::Dot11MonitorBssid, ROGUE.to_string(), 2)]
    );
}

#[tokio::test]
async fn bssid_spelling_differences_do_not_raise_alerts() {
    let harness = harness();
    add_policy(
        &harness,
        MonitoredSsid::new("CorpWifi", Scope::new(Some(org()), None), 1)
            .with_detector(DetectorKind::UnexpectedBssid),
    )
    .await;

    harness
        .pipeline
        .handle_batch(batch(tenant_scope(), vec![beacon(KNOWN, "CorpWifi", 1)]))
        .await
        .expect("bootstrap");
    for spelling in ["aa:aa:aa:aa:aa:01", "aa-aa-aa-aa-aa-01"] {
        let report = harness
            .pipeline
            .handle_batch(batch(tenant_scope(), vec![beacon(spelling, "CorpWifi", 2)]))
            .await
            .expect("batch");
        assert_eq!(report.events, 0);
    }
    assert!(active_types(&harness).await.is_empty());
}

#[tokio::test]
async fn policies_of_other_organizations_do_not_apply() {
    let harness = harness();
    let mut foreign = MonitoredSsid::new("CorpWifi", Scope::new(Some(Uuid::new_v4()), None), 1)
        .with_detector(DetectorKind::SimilarLookingSsid);
    foreign.similar_looking_ssid_threshold = 2;
    add_policy(&harness, foreign).await;

    let report = harness
        .pipeline
        .handle_batch(batch(tenant_scope(), vec![beacon(ROGUE, "CorpWif1", 1)]))
        .await
        .expect("batch");
    assert_eq!(report.policies_evaluated, 0);
    assert!(active_types(&harness).await.is_empty());
}

#[tokio::test]
async fn misconfigured_policy_does_not_blind_other_policies() {
    let harness = harness();
    let mut broken = MonitoredSsid::new("CorpWifi", tenant_scope(), 1)
        .with_detector(DetectorKind::DiscoMonitor);
    broken.disco_monitor_type = Some("STATIC_THRESHOLD".to_string());
    broken.disco_monitor_configuration = Some("{\"threshold\": \"ten\"}".to_string());
    add_policy(&harness, broken).await;

    let mut guest = MonitoredSsid::new("GuestNet", Scope::global(), 1)
        .with_detector(DetectorKind::SimilarLookingSsid);
    guest.similar_looking_ssid_threshold = 1;
    add_policy(&harness, guest).await;

    let mut observed = batch(
        tenant_scope(),
        vec![beacon(KNOWN, "CorpWifi", 1), beacon(ROGUE, "GuestNe7", 1)],
    );
    observed.disconnections = (0..20)
        .map(|i| DisconnectionObservation {
            bssid: KNOWN.to_string(),
            client_mac: format!("CC:CC:CC:CC:CC:{:02X}", i),
            reason_code: None,
            observed_at_ms: 60_000,
        })
        .collect();
    let report = harness.pipeline.handle_batch(observed).await.expect("batch");

    assert_eq!(report.policies_evaluated, 2);
    assert_eq!(report.detectors_skipped, 1);
    assert_eq!(
        active_types(&harness).await,
        vec![(
            DetectionType::Dot11MonitorSimilarLookingSsid,
            "GuestNe7".to_string(),
            1
        )]
    );
}

#[tokio::test]
async fn watchlist_detectors_run_for_batch_scope() {
    let harness = harness();
    harness
        .watchlists
        .set_watchlist(
            &TenantContext::system(tenant_scope()),
            TenantWatchlist {
                bandits: vec![Bandit {
                    uuid: Uuid::from_u128(99),
                    name: "pineapple".to_string(),
                    fingerprints: BTreeSet::from(["evil".to_string()]),
                }],
                ..TenantWatchlist::default()
            },
        )
        .await
        .expect("watchlist");

    let mut hostile = beacon(ROGUE, "FreeWifi", 1);
    hostile.fingerprint = Some("evil".to_string());
    let report = harness
        .pipeline
        .handle_batch(batch(tenant_scope(), vec![hostile]))
        .await
        .expect("batch");
    assert_eq!(report.alerts_recorded, 1);
    assert_eq!(
        active_types(&harness).await,
        vec![(
            DetectionType::Dot11BanditContact,
            Uuid::from_u128(99).to_string(),
            1
        )]
    );
}

#[tokio::test]
async fn cached_policies_refresh_after_change_notification() {
    let harness = harness();
    let report = harness
        .pipeline
        .handle_batch(batch(tenant_scope(), vec![beacon(ROGUE, "CorpWif1", 1)]))
        .await
        .expect("batch");
    assert_eq!(report.policies_evaluated, 0);

    let mut policy = MonitoredSsid::new("CorpWifi", tenant_scope(), 1)
        .with_detector(DetectorKind::SimilarLookingSsid);
    policy.similar_looking_ssid_threshold = 1;
    add_policy(&harness, policy).await;

    let stale = harness
        .pipeline
        .handle_batch(batch(tenant_scope(), vec![beacon(ROGUE, "CorpWif1", 2)]))
        .await
        .expect("batch");
    assert_eq!(stale.policies_evaluated, 0);

    let invalidator = PolicyCacheInvalidator::new(harness.pipeline.cache().clone());
    let message =
        Message::json(MessageType::PolicyChanged, &Scope::new(Some(org()), None)).expect("encode");
    invalidator.handle(&message).await.expect("invalidate");

    let fresh = harness
        .pipeline
        .handle_batch(batch(tenant_scope(), vec![beacon(ROGUE, "CorpWif1", 3)]))
        .await
        .expect("batch");
    assert_eq!(fresh.policies_evaluated, 1);
    assert_eq!(fresh.alerts_recorded, 1);
}

#[tokio::test]
async fn local_policy_change_invalidates_and_broadcasts() {
    let harness = harness();
    harness
        .pipeline
        .handle_batch(batch(tenant_scope(), Vec::new()))
        .await
        .expect("batch");
    assert_eq!(harness.pipeline.cache().invalidate(&Scope::global()), 1);

    harness
        .pipeline
        .handle_batch(batch(tenant_scope(), Vec::new()))
        .await
        .expect("batch");
    harness
        .pipeline
        .policy_changed(tenant_scope())
        .expect("broadcast");
    assert_eq!(harness.pipeline.cache().invalidate(&Scope::global()), 0);
}

struct SlowBaselines;

#[async_trait]
impl BaselineStore for SlowBaselines {
    async fn get_baseline(
        &self,
        _ctx: &TenantContext,
        _ssid: &str,
    ) -> Result<Option<SsidBaseline>, StorageError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(None)
    }

    async fn set_baseline(
        &self,
        _ctx: &TenantContext,
        _ssid: &str,
        _baseline: SsidBaseline,
    ) -> Result<(), StorageError> {
        Ok(())
    }

    async fn set_baseline_if_absent(
        &self,
        _ctx: &TenantContext,
        _ssid: &str,
        _baseline: SsidBaseline,
    ) -> Result<bool, StorageError> {
        Ok(false)
    }
}

#[tokio::test]
async fn batch_deadline_abandons_slow_policies() {
    let harness = harness_with(
        Arc::new(SlowBaselines),
        PipelineConfig {
            deadline: Duration::from_millis(50),
            ..PipelineConfig::default()
        },
    );
    add_policy(
        &harness,
        MonitoredSsid::new("CorpWifi", tenant_scope(), 1)
            .with_detector(DetectorKind::UnexpectedBssid),
    )
    .await;
    let report = harness
        .pipeline
        .handle_batch(batch(tenant_scope(), vec![beacon(ROGUE, "CorpWifi", 1)]))
        .await
        .expect("batch");
    assert!(report.timed_out);
    assert_eq!(report.policies_evaluated, 0);
}
