//! 基于共享消息队列的总线实现。
//!
//! 发送方为每个存活对端写入一行；各节点轮询发给自己的 PENDING 行，
//! 分发给处理器后确认。未确认的行在下次轮询时重新投递。

use crate::{BusError, Message, MessageBus, MessageHandler, MessageType};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wsm_storage::{MessageQueue, MessageStatus, NodeDirectory, OutgoingMessage, QueuedMessage};

type HandlerTable = HashMap<MessageType, Arc<dyn MessageHandler>>;

/// 总线参数。
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub liveness_ms: i64,
    pub poll_batch_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            liveness_ms: 120_000,
            poll_batch_size: 100,
        }
    }
}

/// 单次投递结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub peers: usize,
    pub failed: usize,
}

/// 单次轮询结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub processed: usize,
    pub failed: usize,
    pub unhandled: usize,
}

struct BusInner {
    node_id: Uuid,
    queue: Arc<dyn MessageQueue>,
    nodes: Arc<dyn NodeDirectory>,
    config: BusConfig,
    pending: Mutex<HandlerTable>,
    handlers: OnceLock<HandlerTable>,
    ready: watch::Sender<bool>,
}

/// 消息队列总线。
#[derive(Clone)]
pub struct QueueMessageBus {
    inner: Arc<BusInner>,
}

impl QueueMessageBus {
    pub fn new(
        node_id: Uuid,
        queue: Arc<dyn MessageQueue>,
        nodes: Arc<dyn NodeDirectory>,
        config: BusConfig,
    ) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            inner: Arc::new(BusInner {
                node_id,
                queue,
                nodes,
                config,
                pending: Mutex::new(HashMap::new()),
                handlers: OnceLock::new(),
                ready,
            }),
        }
    }

    pub fn node_id(&self) -> Uuid {
        self.inner.node_id
    }

    /// 有界等待初始化完成。
    pub async fn wait_initialized(&self, timeout: Duration) -> Result<(), BusError> {
        let mut ready = self.inner.ready.subscribe();
        match tokio::time::timeout(timeout, ready.wait_for(|value| *value)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(BusError::NotInitialized),
            Err(_) => Err(BusError::InitTimeout(timeout.as_millis() as u64)),
        }
    }

    /// 把消息写给当前存活的全部对端（不含本节点）。
    ///
    /// 对端不可达只计数与记录日志，不向上传播。
    pub async fn deliver(&self, message: &Message) -> DeliveryReport {
        let now_ms = domain::now_epoch_ms();
        let peers = match self
            .inner
            .nodes
            .list_live_nodes(now_ms, self.inner.config.liveness_ms)
            .await
        {
            Ok(nodes) => nodes
                .into_iter()
                .filter(|node| node.uuid != self.inner.node_id)
                .collect::<Vec<_>>(),
            Err(err) => {
                wsm_telemetry::record_bus_delivery_failure();
                warn!(
                    target: "wsm.bus",
                    message_id = %message.id(),
                    error = %err,
                    "node_directory_unavailable"
                );
                return DeliveryReport::default();
            }
        };
        if peers.is_empty() {
            debug!(
                target: "wsm.bus",
                message_id = %message.id(),
                message_type = message.message_type().as_str(),
                "message_no_peers"
            );
            return DeliveryReport::default();
        }

        let mut report = DeliveryReport {
            peers: peers.len(),
            failed: 0,
        };
        let rows = peers
            .iter()
            .map(|peer| OutgoingMessage {
                message_id: message.id(),
                message_type: message.message_type().as_str().to_string(),
                payload: message.payload().to_string(),
                sender: self.inner.node_id,
                receiver: peer.uuid,
                created_at_ms: message.created_at_ms(),
            })
            .collect();
        match self.inner.queue.enqueue(rows).await {
            Ok(()) => {
                for _ in &peers {
                    wsm_telemetry::record_bus_message_sent();
                }
            }
            Err(err) => {
                report.failed = peers.len();
                let err = BusError::DeliveryUnreachable(err.to_string());
                for peer in &peers {
                    wsm_telemetry::record_bus_delivery_failure();
                    warn!(
                        target: "wsm.bus",
                        message_id = %message.id(),
                        peer = %peer.uuid,
                        peer_address = %peer.address,
                        error = %err,
                        "message_delivery_unreachable"
                    );
                }
            }
        }
        report
    }

    /// 轮询一次发给本节点的消息并分发。
    pub async fn process_pending(&self) -> Result<PollReport, BusError> {
        let handlers = self.inner.handlers.get().ok_or(BusError::NotInitialized)?;
        let rows = self
            .inner
            .queue
            .poll_pending(self.inner.node_id, self.inner.config.poll_batch_size)
            .await
            .map_err(|err| BusError::DeliveryUnreachable(err.to_string()))?;

        let mut report = PollReport::default();
        for row in rows {
            wsm_telemetry::record_bus_message_received();
            let status = self.dispatch(handlers, &row).await;
            match status {
                MessageStatus::Processed => report.processed += 1,
                MessageStatus::Failed => report.failed += 1,
                MessageStatus::Unhandled => report.unhandled += 1,
                MessageStatus::Pending => {}
            }
            if let Err(err) = self
                .inner
                .queue
                .ack(row.id, status, domain::now_epoch_ms())
                .await
            {
                // 未确认的行下次轮询会重新投递
                warn!(
                    target: "wsm.bus",
                    row_id = row.id,
                    error = %err,
                    "message_ack_failed"
                );
            }
        }
        Ok(report)
    }

    async fn dispatch(&self, handlers: &HandlerTable, row: &QueuedMessage) -> MessageStatus {
        let handler = MessageType::parse(&row.message_type)
            .and_then(|message_type| handlers.get(&message_type).map(|h| (message_type, h)));
        let Some((message_type, handler)) = handler else {
            wsm_telemetry::record_bus_message_unhandled();
            info!(
                target: "wsm.bus",
                message_id = %row.message_id,
                message_type = %row.message_type,
                sender = %row.sender,
                "message_unhandled"
            );
            return MessageStatus::Unhandled;
        };

        let message = Message::received(
            row.message_id,
            message_type,
            row.payload.clone(),
            row.sender,
            row.created_at_ms,
        );
        match handler.handle(&message).await {
            Ok(()) => MessageStatus::Processed,
            Err(err) => {
                warn!(
                    target: "wsm.bus",
                    message_id = %row.message_id,
                    message_type = message_type.as_str(),
                    sender = %row.sender,
                    error = %err,
                    "message_handler_failed"
                );
                MessageStatus::Failed
            }
        }
    }

    /// 后台轮询任务。
    pub fn spawn_poller(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let bus = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(err) = bus.process_pending().await {
                    warn!(target: "wsm.bus", error = %err, "message_poll_failed");
                }
            }
        })
    }
}

impl MessageBus for QueueMessageBus {
    fn on_message_received(
        &self,
        message_type: MessageType,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BusError> {
        let mut pending = self
            .inner
            .pending
            .lock()
            .map_err(|_| BusError::Handler("handler table lock failed".to_string()))?;
        if self.inner.handlers.get().is_some() {
            return Err(BusError::AlreadyInitialized);
        }
        if pending.contains_key(&message_type) {
            return Err(BusError::HandlerAlreadyRegistered(message_type.as_str()));
        }
        pending.insert(message_type, handler);
        Ok(())
    }

    fn initialize(&self) -> Result<(), BusError> {
        let mut pending = self
            .inner
            .pending
            .lock()
            .map_err(|_| BusError::Handler("handler table lock failed".to_string()))?;
        if self.inner.handlers.get().is_none() {
            let table = std::mem::take(&mut *pending);
            let registered: Vec<&'static str> = table.keys().map(|item| item.as_str()).collect();
            let _ = self.inner.handlers.set(table);
            info!(
                target: "wsm.bus",
                node_id = %self.inner.node_id,
                handlers = ?registered,
                "message_bus_initialized"
            );
        }
        drop(pending);
        self.inner.ready.send_replace(true);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.inner.handlers.get().is_some()
    }

    fn send(&self, message: Message) -> Result<(), BusError> {
        if !self.is_initialized() {
            return Err(BusError::NotInitialized);
        }
        let bus = self.clone();
        tokio::spawn(async move {
            bus.deliver(&message).await;
        });
        Ok(())
    }
}
