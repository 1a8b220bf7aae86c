use async_trait::async_trait;
use domain::{
    AlertStatus, DetectionAlert, DetectionEvent, DetectionType, Scope, Subscription,
    TenantContext,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use wsm_alert::{
    AlertEngine, AlertError, AlertReplicationHandler, NotificationPolicy, Notifier,
};
use wsm_bus::{BusError, Message, MessageBus, MessageHandler, MessageType};
use wsm_storage::{AlertStore, InMemoryAlertStore, StorageError};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, Uuid)>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<(String, Uuid)> {
        self.sent.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subscriber_id: &str, alert: &DetectionAlert) -> Result<(), AlertError> {
        self.sent
            .lock()
            .expect("lock")
            .push((subscriber_id.to_string(), alert.uuid));
        Ok(())
    }
}

struct RecordingBus {
    initialized: bool,
    sent: Mutex<Vec<Message>>,
}

impl RecordingBus {
    fn ready() -> Self {
        Self {
            initialized: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<Message> {
        self.sent.lock().expect("lock").clone()
    }
}

impl MessageBus for RecordingBus {
    fn on_message_received(
        &self,
        _message_type: MessageType,
        _handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BusError> {
        Ok(())
    }

    fn initialize(&self) -> Result<(), BusError> {
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn send(&self, message: Message) -> Result<(), BusError> {
        if !self.initialized {
            return Err(BusError::NotInitialized);
        }
        self.sent.lock().expect("lock").push(message);
        Ok(())
    }
}

struct FailingStore;

#[async_trait]
impl AlertStore for FailingStore {
    async fn upsert_alert(
        &self,
        _ctx: &TenantContext,
        _alert: &DetectionAlert,
    ) -> Result<(), StorageError> {
        Err(StorageError::new("database unavailable"))
    }

    async fn find_alert(
        &self,
        _ctx: &TenantContext,
        _uuid: Uuid,
    ) -> Result<Option<DetectionAlert>, StorageError> {
        Ok(None)
    }

    async fn list_alerts(
        &self,
        _ctx: &TenantContext,
        _status: Option<AlertStatus>,
        _limit: usize,
    ) -> Result<Vec<DetectionAlert>, StorageError> {
        Ok(Vec::new())
    }
}

struct Fixture {
    engine: AlertEngine,
    store: Arc<InMemoryAlertStore>,
    notifier: Arc<RecordingNotifier>,
    bus: Arc<RecordingBus>,
}

fn fixture(policy: NotificationPolicy) -> Fixture {
    let store = Arc::new(InMemoryAlertStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let bus = Arc::new(RecordingBus::ready());
    let engine = AlertEngine::new(store.clone(), notifier.clone(), bus.clone(), policy);
    Fixture {
        engine,
        store,
        notifier,
        bus,
    }
}

fn scope() -> Scope {
    Scope::new(Some(Uuid::from_u128(1)), Some(Uuid::from_u128(2)))
}

fn event(detection_type: DetectionType, subject: &str, observed_at_ms: i64) -> DetectionEvent {
    DetectionEvent {
        detection_type,
        scope: scope(),
        subject_key: subject.to_string(),
        details: json!({"bssid": subject}),
        observed_at_ms,
        monitored_ssid_uuid: None,
    }
}

fn subscribe(engine: &AlertEngine, subscriber: &str, detection_type: DetectionType) {
    engine
        .subscriptions()
        .subscribe(Subscription {
            subscriber_id: subscriber.to_string(),
            detection_type,
            organization_id: None,
        })
        .expect("subscribe");
}

#[tokio::test]
async fn repeated_detection_coalesces_into_one_alert() {
    let fx = fixture(NotificationPolicy::OncePerActivePeriod);
    subscribe(&fx.engine, "soc", DetectionType::Dot11MonitorBssid);

    let first = fx
        .engine
        .record(event(DetectionType::Dot11MonitorBssid, "AA:BB:CC:DD:EE:01", 10))
        .await
        .expect("record");
    let second = fx
        .engine
        .record(event(DetectionType::Dot11MonitorBssid, "AA:BB:CC:DD:EE:01", 20))
        .await
        .expect("record");

    assert!(first.is_new_occurrence && first.distributed);
    assert!(!second.is_new_occurrence && !second.distributed);
    assert_eq!(second.alert.uuid, first.alert.uuid);
    assert_eq!(second.alert.occurrence_count, 2);
    assert_eq!(
        (second.alert.first_seen_at_ms, second.alert.last_seen_at_ms),
        (10, 20)
    );

    let ctx = TenantContext::system(Scope::global());
    let stored = fx
        .store
        .list_alerts(&ctx, Some(AlertStatus::Active), 0)
        .await
        .expect("list");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].occurrence_count, 2);
    assert_eq!(fx.notifier.sent().len(), 1);
    assert_eq!(fx.bus.sent().len(), 1);
}

#[tokio::test]
async fn every_occurrence_policy_distributes_each_bump() {
    let fx = fixture(NotificationPolicy::EveryOccurrence);
    subscribe(&fx.engine, "soc", DetectionType::Wildcard);
    for ts in [1, 2, 3] {
        fx.engine
            .record(event(DetectionType::Dot11MonitorChannel, "AA:BB:CC:DD:EE:01", ts))
            .await
            .expect("record");
    }
    assert_eq!(fx.notifier.sent().len(), 3);
    assert_eq!(fx.bus.sent().len(), 3);
}

#[tokio::test]
async fn wildcard_and_specific_subscription_notify_once() {
    let fx = fixture(NotificationPolicy::OncePerActivePeriod);
    subscribe(&fx.engine, "soc", DetectionType::Dot11BanditContact);
    subscribe(&fx.engine, "soc", DetectionType::Wildcard);
    subscribe(&fx.engine, "pager", DetectionType::Wildcard);
    subscribe(&fx.engine, "other", DetectionType::Dot11Probereq);

    let outcome = fx
        .engine
        .record(event(DetectionType::Dot11BanditContact, "bandit-1", 5))
        .await
        .expect("record");
    let mut sent = fx.notifier.sent();
    sent.sort();
    assert_eq!(
        sent,
        vec![
            ("pager".to_string(), outcome.alert.uuid),
            ("soc".to_string(), outcome.alert.uuid),
        ]
    );
}

#[tokio::test]
async fn wildcard_covers_every_detection_type() {
    let fx = fixture(NotificationPolicy::OncePerActivePeriod);
    subscribe(&fx.engine, "soc", DetectionType::Wildcard);
    let detectable: Vec<DetectionType> = DetectionType::detectable().collect();
    for (index, detection_type) in detectable.iter().enumerate() {
        fx.engine
            .record(event(*detection_type, "subject", index as i64))
            .await
            .expect("record");
    }
    assert_eq!(fx.notifier.sent().len(), detectable.len());
}

#[tokio::test]
async fn resolving_untracked_key_is_a_noop() {
    let fx = fixture(NotificationPolicy::OncePerActivePeriod);
    let key = event(DetectionType::Dot11MonitorBssid, "AA:BB:CC:DD:EE:01", 1).key();
    let resolved = fx.engine.resolve(&key, 5).await.expect("no error");
    assert!(resolved.is_none());
    assert!(fx.engine.active(&key).is_none());
    assert!(fx.bus.sent().is_empty());
}

#[tokio::test]
async fn resolution_opens_a_fresh_active_period() {
    let fx = fixture(NotificationPolicy::OncePerActivePeriod);
    let first = fx
        .engine
        .record(event(DetectionType::Dot11MonitorBssid, "AA:BB:CC:DD:EE:01", 1))
        .await
        .expect("record");
    let resolved = fx
        .engine
        .resolve(&first.alert.key(), 50)
        .await
        .expect("resolve")
        .expect("tracked");
    assert_eq!(resolved.status, AlertStatus::Resolved);
    assert_eq!(resolved.resolved_at_ms, Some(50));
    assert_eq!(
        fx.bus.sent().last().map(|message| message.message_type()),
        Some(MessageType::AlertResolved)
    );

    let again = fx
        .engine
        .record(event(DetectionType::Dot11MonitorBssid, "AA:BB:CC:DD:EE:01", 60))
        .await
        .expect("record");
    assert!(again.is_new_occurrence);
    assert_ne!(again.alert.uuid, first.alert.uuid);
    assert_eq!(again.alert.occurrence_count, 1);

    let ctx = TenantContext::system(Scope::global());
    let stored = fx
        .store
        .find_alert(&ctx, first.alert.uuid)
        .await
        .expect("find")
        .expect("stored");
    assert_eq!(stored.status, AlertStatus::Resolved);
}

#[tokio::test]
async fn acknowledge_is_scoped_to_caller() {
    let fx = fixture(NotificationPolicy::OncePerActivePeriod);
    let outcome = fx
        .engine
        .record(event(DetectionType::Dot11Probereq, "CorpWifi", 1))
        .await
        .expect("record");

    let stranger = TenantContext::new(Some(Uuid::new_v4()), None, "user-2");
    assert!(
        fx.engine
            .acknowledge(&stranger, outcome.alert.uuid, 10)
            .await
            .expect("ack")
            .is_none()
    );

    let owner = TenantContext::new(scope().organization_id, scope().tenant_id, "user-1");
    assert_eq!(fx.engine.active_alerts(&owner).len(), 1);
    let acked = fx
        .engine
        .acknowledge(&owner, outcome.alert.uuid, 10)
        .await
        .expect("ack");
    assert!(acked.is_some());
    assert!(fx.engine.active_alerts(&owner).is_empty());
}

#[tokio::test]
async fn duplicate_replication_leaves_one_active_alert() {
    let origin = fixture(NotificationPolicy::OncePerActivePeriod);
    origin
        .engine
        .record(event(DetectionType::Dot11MonitorFingerprint, "AA:BB:CC:DD:EE:01", 7))
        .await
        .expect("record");
    let message = origin.bus.sent().pop().expect("replicated");

    let peer = fixture(NotificationPolicy::OncePerActivePeriod);
    subscribe(&peer.engine, "soc", DetectionType::Wildcard);
    let handler = AlertReplicationHandler::new(peer.engine.clone());
    handler.handle(&message).await.expect("first delivery");
    handler.handle(&message).await.expect("second delivery");

    let ctx = TenantContext::system(Scope::global());
    let active = peer.engine.active_alerts(&ctx);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].occurrence_count, 1);
    assert!(peer.notifier.sent().is_empty());
    assert!(peer.bus.sent().is_empty());
}

#[tokio::test]
async fn redelivered_activation_after_resolution_stays_resolved() {
    let origin = fixture(NotificationPolicy::OncePerActivePeriod);
    let outcome = origin
        .engine
        .record(event(DetectionType::Dot11MonitorBssid, "AA:BB:CC:DD:EE:01", 7))
        .await
        .expect("record");
    origin
        .engine
        .resolve(&outcome.alert.key(), 20)
        .await
        .expect("resolve")
        .expect("tracked");
    let sent = origin.bus.sent();
    let (activated, resolved) = (&sent[0], &sent[1]);
    assert_eq!(resolved.message_type(), MessageType::AlertResolved);

    let peer = fixture(NotificationPolicy::OncePerActivePeriod);
    let handler = AlertReplicationHandler::new(peer.engine.clone());
    handler.handle(activated).await.expect("activation");
    handler.handle(resolved).await.expect("resolution");
    handler.handle(activated).await.expect("redelivery");

    let ctx = TenantContext::system(Scope::global());
    assert!(peer.engine.active_alerts(&ctx).is_empty());
    let stored = peer
        .store
        .find_alert(&ctx, outcome.alert.uuid)
        .await
        .expect("find")
        .expect("stored");
    assert_eq!(stored.status, AlertStatus::Resolved);
    assert_eq!(stored.resolved_at_ms, Some(20));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_records_on_one_key_coalesce() {
    const RECORDS: u64 = 64;
    let fx = fixture(NotificationPolicy::OncePerActivePeriod);
    let mut tasks = Vec::new();
    for index in 0..RECORDS {
        for subject in ["AA:BB:CC:DD:EE:01", "AA:BB:CC:DD:EE:02"] {
            let engine = fx.engine.clone();
            tasks.push(tokio::spawn(async move {
                engine
                    .record(event(DetectionType::Dot11MonitorBssid, subject, index as i64))
                    .await
            }));
        }
    }
    let mut new_occurrences = 0;
    for task in tasks {
        let outcome = task.await.expect("join").expect("record");
        if outcome.is_new_occurrence {
            new_occurrences += 1;
        }
    }

    assert_eq!(new_occurrences, 2);
    let ctx = TenantContext::system(Scope::global());
    let active = fx.engine.active_alerts(&ctx);
    assert_eq!(active.len(), 2);
    for alert in &active {
        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(alert.occurrence_count, RECORDS);
        assert_eq!(
            (alert.first_seen_at_ms, alert.last_seen_at_ms),
            (0, RECORDS as i64 - 1)
        );
    }
    let stored = fx
        .store
        .list_alerts(&ctx, Some(AlertStatus::Active), 0)
        .await
        .expect("list");
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|alert| alert.occurrence_count == RECORDS));
    assert_eq!(fx.bus.sent().len(), 2);
}

#[tokio::test]
async fn replicated_resolution_before_activation_is_ignored() {
    let peer = fixture(NotificationPolicy::OncePerActivePeriod);
    let handler = AlertReplicationHandler::new(peer.engine.clone());
    let mut alert = DetectionAlert::activate(&event(DetectionType::Dot11MonitorBssid, "X", 1));
    alert.status = AlertStatus::Resolved;
    alert.resolved_at_ms = Some(2);
    let message = Message::json(MessageType::AlertResolved, &alert).expect("encode");
    handler.handle(&message).await.expect("no-op");
    assert!(peer.engine.active(&alert.key()).is_none());
}

#[tokio::test]
async fn persistence_failure_keeps_coalescing_state() {
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = AlertEngine::new(
        Arc::new(FailingStore),
        notifier.clone(),
        Arc::new(RecordingBus::ready()),
        NotificationPolicy::OncePerActivePeriod,
    );
    subscribe(&engine, "soc", DetectionType::Wildcard);
    let first = event(DetectionType::Dot11UnapprovedSsid, "Backdoor", 1);
    let err = engine.record(first.clone()).await.expect_err("store down");
    assert!(matches!(err, AlertError::Storage(_)));
    assert_eq!(notifier.sent().len(), 1);

    let _ = engine.record(first.clone()).await;
    let active = engine.active(&first.key()).expect("tracked");
    assert_eq!(active.occurrence_count, 2);
}

#[tokio::test]
async fn uninitialized_bus_surfaces_as_error() {
    let engine = AlertEngine::new(
        Arc::new(InMemoryAlertStore::new()),
        Arc::new(RecordingNotifier::default()),
        Arc::new(RecordingBus {
            initialized: false,
            sent: Mutex::new(Vec::new()),
        }),
        NotificationPolicy::OncePerActivePeriod,
    );
    let err = engine
        .record(event(DetectionType::Dot11MonitorBssid, "A", 1))
        .await
        .expect_err("bus not ready");
    assert!(matches!(err, AlertError::Bus(BusError::NotInitialized)));
}
