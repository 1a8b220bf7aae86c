//! 集群告警复制处理器（new-alert / alert-resolved）。

use crate::AlertEngine;
use async_trait::async_trait;
use domain::DetectionAlert;
use wsm_bus::{BusError, Message, MessageHandler, MessageType};

pub struct AlertReplicationHandler {
    engine: AlertEngine,
}

impl AlertReplicationHandler {
    pub fn new(engine: AlertEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl MessageHandler for AlertReplicationHandler {
    async fn handle(&self, message: &Message) -> Result<(), BusError> {
        let alert: DetectionAlert = message.decode()?;
        let result = match message.message_type() {
            MessageType::NewAlert => self.engine.apply_replicated(alert).await,
            MessageType::AlertResolved => self.engine.apply_replicated_resolution(&alert).await,
            other => {
                return Err(BusError::Handler(format!(
                    "unexpected message type {}",
                    other.as_str()
                )));
            }
        };
        result
            .map(|_| ())
            .map_err(|err| BusError::Handler(err.to_string()))
    }
}
