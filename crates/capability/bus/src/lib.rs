//! 集群消息总线。
//!
//! - `initialize` 之前发送消息返回 `NotInitialized`
//! - 每种消息类型只注册一个处理器，初始化时固定
//! - `send` 不阻塞调用方：投递在后台任务中完成，对端不可达只记录日志
//! - 至少一次投递，处理器必须幂等

mod heartbeat;
mod message;
mod queue_bus;

pub use heartbeat::spawn_heartbeat;
pub use message::{Message, MessageType};
pub use queue_bus::{BusConfig, DeliveryReport, PollReport, QueueMessageBus};

use async_trait::async_trait;
use std::sync::Arc;

/// 总线错误。
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("message bus not initialized")]
    NotInitialized,
    #[error("message bus initialization timed out after {0} ms")]
    InitTimeout(u64),
    #[error("message bus already initialized")]
    AlreadyInitialized,
    #[error("handler already registered for {0}")]
    HandlerAlreadyRegistered(&'static str),
    #[error("peer unreachable: {0}")]
    DeliveryUnreachable(String),
    #[error("payload error: {0}")]
    Payload(String),
    #[error("handler error: {0}")]
    Handler(String),
}

/// 消息处理器。
///
/// 同一消息可能被重复投递，实现必须幂等。
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<(), BusError>;
}

/// 消息总线抽象。
pub trait MessageBus: Send + Sync {
    /// 注册处理器；只能在 `initialize` 之前调用。
    fn on_message_received(
        &self,
        message_type: MessageType,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), BusError>;

    /// 完成初始化（幂等）。
    fn initialize(&self) -> Result<(), BusError>;

    fn is_initialized(&self) -> bool;

    /// 交给总线做集群投递，立即返回。
    fn send(&self, message: Message) -> Result<(), BusError>;
}
