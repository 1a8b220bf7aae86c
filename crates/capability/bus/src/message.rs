//! 集群消息。

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::BusError;

/// 消息类型（封闭集合）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageType {
    /// 新告警或告警次数更新，载荷为 DetectionAlert。
    NewAlert,
    /// 告警解除，载荷为 DetectionAlert。
    AlertResolved,
    /// 监控策略变更，载荷为 Scope。
    PolicyChanged,
    /// MAC 注解变更，载荷为 Scope。
    MacContextChanged,
}

impl MessageType {
    pub const ALL: [MessageType; 4] = [
        MessageType::NewAlert,
        MessageType::AlertResolved,
        MessageType::PolicyChanged,
        MessageType::MacContextChanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::NewAlert => "new-alert",
            MessageType::AlertResolved => "alert-resolved",
            MessageType::PolicyChanged => "policy-changed",
            MessageType::MacContextChanged => "mac-context-changed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        MessageType::ALL
            .into_iter()
            .find(|item| item.as_str() == value.trim())
    }
}

/// 不可变消息。
///
/// `origin_node_id` 在发送前为空，由接收端根据队列行的 sender 填充。
#[derive(Debug, Clone)]
pub struct Message {
    id: Uuid,
    message_type: MessageType,
    payload: String,
    origin_node_id: Option<Uuid>,
    created_at_ms: i64,
}

impl Message {
    pub fn new(message_type: MessageType, payload: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message_type,
            payload: payload.into(),
            origin_node_id: None,
            created_at_ms: domain::now_epoch_ms(),
        }
    }

    /// 以 JSON 序列化载荷构造消息。
    pub fn json<T: Serialize>(message_type: MessageType, payload: &T) -> Result<Self, BusError> {
        let payload =
            serde_json::to_string(payload).map_err(|err| BusError::Payload(err.to_string()))?;
        Ok(Self::new(message_type, payload))
    }

    pub(crate) fn received(
        id: Uuid,
        message_type: MessageType,
        payload: String,
        origin_node_id: Uuid,
        created_at_ms: i64,
    ) -> Self {
        Self {
            id,
            message_type,
            payload,
            origin_node_id: Some(origin_node_id),
            created_at_ms,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn origin_node_id(&self) -> Option<Uuid> {
        self.origin_node_id
    }

    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }

    /// 反序列化 JSON 载荷。
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BusError> {
        serde_json::from_str(&self.payload).map_err(|err| BusError::Payload(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_names_round_trip() {
        for item in MessageType::ALL {
            assert_eq!(MessageType::parse(item.as_str()), Some(item));
        }
        assert_eq!(MessageType::parse("heartbeat"), None);
    }

    #[test]
    fn decode_reports_payload_errors() {
        let message = Message::new(MessageType::PolicyChanged, "{oops");
        let err = message
            .decode::<serde_json::Value>()
            .expect_err("bad payload");
        assert!(matches!(err, BusError::Payload(_)));
    }
}
