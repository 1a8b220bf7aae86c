use async_trait::async_trait;
use domain::NodeRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;
use wsm_bus::{
    BusConfig, BusError, DeliveryReport, Message, MessageBus, MessageHandler, MessageType,
    PollReport, QueueMessageBus,
};
use wsm_storage::{
    InMemoryMessageQueue, InMemoryNodeDirectory, MessageQueue, MessageStatus, NodeDirectory,
    OutgoingMessage, QueuedMessage, StorageError,
};

#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<Vec<(Uuid, Option<Uuid>, String)>>,
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle(&self, message: &Message) -> Result<(), BusError> {
        self.seen.lock().await.push((
            message.id(),
            message.origin_node_id(),
            message.payload().to_string(),
        ));
        Ok(())
    }
}

struct FailingHandler;

#[async_trait]
impl MessageHandler for FailingHandler {
    async fn handle(&self, _message: &Message) -> Result<(), BusError> {
        Err(BusError::Handler("boom".to_string()))
    }
}

struct UnreachableQueue;

#[async_trait]
impl MessageQueue for UnreachableQueue {
    async fn enqueue(&self, _messages: Vec<OutgoingMessage>) -> Result<(), StorageError> {
        Err(StorageError::new("connection refused"))
    }

    async fn poll_pending(
        &self,
        _receiver: Uuid,
        _limit: usize,
    ) -> Result<Vec<QueuedMessage>, StorageError> {
        Ok(Vec::new())
    }

    async fn ack(
        &self,
        _id: i64,
        _status: MessageStatus,
        _now_ms: i64,
    ) -> Result<(), StorageError> {
        Ok(())
    }
}

struct Cluster {
    queue: Arc<InMemoryMessageQueue>,
    nodes: Arc<InMemoryNodeDirectory>,
}

impl Cluster {
    async fn new(live: &[Uuid]) -> Self {
        let nodes = Arc::new(InMemoryNodeDirectory::new());
        for (index, uuid) in live.iter().enumerate() {
            nodes
                .touch(&NodeRecord {
                    uuid: *uuid,
                    name: format!("node-{index}"),
                    address: format!("10.0.0.{index}:22900"),
                    last_seen_at_ms: domain::now_epoch_ms(),
                    deleted: false,
                })
                .await
                .expect("touch");
        }
        Self {
            queue: Arc::new(InMemoryMessageQueue::new()),
            nodes,
        }
    }

    fn bus(&self, node_id: Uuid) -> QueueMessageBus {
        QueueMessageBus::new(
            node_id,
            self.queue.clone(),
            self.nodes.clone(),
            BusConfig::default(),
        )
    }
}

#[tokio::test]
async fn send_before_initialize_is_rejected() {
    let cluster = Cluster::new(&[]).await;
    let bus = cluster.bus(Uuid::new_v4());
    let err = bus
        .send(Message::new(MessageType::PolicyChanged, "{}"))
        .expect_err("not initialized");
    assert!(matches!(err, BusError::NotInitialized));
    assert!(matches!(
        bus.process_pending().await,
        Err(BusError::NotInitialized)
    ));
}

#[tokio::test]
async fn handler_table_is_fixed_at_initialize() {
    let cluster = Cluster::new(&[]).await;
    let bus = cluster.bus(Uuid::new_v4());
    let handler = Arc::new(RecordingHandler::default());
    bus.on_message_received(MessageType::NewAlert, handler.clone())
        .expect("register");
    assert!(matches!(
        bus.on_message_received(MessageType::NewAlert, handler.clone()),
        Err(BusError::HandlerAlreadyRegistered("new-alert"))
    ));

    bus.initialize().expect("initialize");
    bus.initialize().expect("initialize is idempotent");
    assert!(bus.is_initialized());
    assert!(matches!(
        bus.on_message_received(MessageType::AlertResolved, handler),
        Err(BusError::AlreadyInitialized)
    ));
}

#[tokio::test]
async fn wait_initialized_is_bounded() {
    let cluster = Cluster::new(&[]).await;
    let bus = cluster.bus(Uuid::new_v4());
    let err = bus
        .wait_initialized(Duration::from_millis(20))
        .await
        .expect_err("timeout");
    assert!(matches!(err, BusError::InitTimeout(20)));

    let waiter = {
        let bus = bus.clone();
        tokio::spawn(async move { bus.wait_initialized(Duration::from_secs(5)).await })
    };
    bus.initialize().expect("initialize");
    waiter.await.expect("join").expect("initialized");
}

#[tokio::test]
async fn delivery_reaches_live_peers_only() {
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let cluster = Cluster::new(&[a, b]).await;
    cluster
        .nodes
        .touch(&NodeRecord {
            uuid: c,
            name: "stale".to_string(),
            address: "10.0.0.9:22900".to_string(),
            last_seen_at_ms: 0,
            deleted: false,
        })
        .await
        .expect("touch");

    let sender = cluster.bus(a);
    sender.initialize().expect("initialize");
    let message = Message::new(MessageType::PolicyChanged, r#"{"organizationId":null}"#);
    let report = sender.deliver(&message).await;
    assert_eq!(report, DeliveryReport { peers: 1, failed: 0 });

    assert!(cluster.queue.rows_for(a).expect("rows").is_empty());
    assert!(cluster.queue.rows_for(c).expect("rows").is_empty());
    let rows = cluster.queue.rows_for(b).expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sender, a);
    assert_eq!(rows[0].message_type, "policy-changed");
}

#[tokio::test]
async fn received_messages_are_dispatched_and_acknowledged() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let cluster = Cluster::new(&[a, b]).await;
    let sender = cluster.bus(a);
    sender.initialize().expect("initialize");

    let receiver = cluster.bus(b);
    let handler = Arc::new(RecordingHandler::default());
    receiver
        .on_message_received(MessageType::NewAlert, handler.clone())
        .expect("register");
    receiver
        .on_message_received(MessageType::AlertResolved, Arc::new(FailingHandler))
        .expect("register");
    receiver.initialize().expect("initialize");

    let alert = Message::new(MessageType::NewAlert, "{\"n\":1}");
    sender.deliver(&alert).await;
    sender
        .deliver(&Message::new(MessageType::AlertResolved, "{}"))
        .await;
    sender
        .deliver(&Message::new(MessageType::MacContextChanged, "{}"))
        .await;

    let report = receiver.process_pending().await.expect("poll");
    assert_eq!(
        report,
        PollReport {
            processed: 1,
            failed: 1,
            unhandled: 1,
        }
    );
    let seen = handler.seen.lock().await.clone();
    assert_eq!(seen, vec![(alert.id(), Some(a), "{\"n\":1}".to_string())]);

    let statuses: Vec<MessageStatus> = cluster
        .queue
        .rows_for(b)
        .expect("rows")
        .into_iter()
        .map(|row| row.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            MessageStatus::Processed,
            MessageStatus::Failed,
            MessageStatus::Unhandled,
        ]
    );
    assert_eq!(
        receiver.process_pending().await.expect("poll"),
        PollReport::default()
    );
}

#[tokio::test]
async fn unreachable_queue_never_fails_send() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let cluster = Cluster::new(&[a, b]).await;
    let bus = QueueMessageBus::new(
        a,
        Arc::new(UnreachableQueue),
        cluster.nodes.clone(),
        BusConfig::default(),
    );
    bus.initialize().expect("initialize");
    let message = Message::new(MessageType::NewAlert, "{}");
    assert_eq!(
        bus.deliver(&message).await,
        DeliveryReport { peers: 1, failed: 1 }
    );
    bus.send(message).expect("send does not surface delivery failures");
}

#[tokio::test]
async fn send_delivers_in_background() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let cluster = Cluster::new(&[a, b]).await;
    let bus = cluster.bus(a);
    bus.initialize().expect("initialize");
    bus.send(Message::new(MessageType::PolicyChanged, "{}"))
        .expect("send");

    let mut delivered = false;
    for _ in 0..100 {
        if !cluster.queue.rows_for(b).expect("rows").is_empty() {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(delivered);
}
