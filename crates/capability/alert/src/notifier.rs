use crate::AlertError;
use async_trait::async_trait;
use domain::DetectionAlert;
use tracing::info;

/// 订阅者通知通道。
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subscriber_id: &str, alert: &DetectionAlert) -> Result<(), AlertError>;
}

/// 以结构化日志输出通知。
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subscriber_id: &str, alert: &DetectionAlert) -> Result<(), AlertError> {
        info!(
            target: "wsm.alert",
            subscriber_id = %subscriber_id,
            alert_id = %alert.uuid,
            detection_type = alert.detection_type.as_str(),
            title = alert.title(),
            subject = %alert.subject_key,
            occurrence_count = alert.occurrence_count,
            "alert_notification"
        );
        Ok(())
    }
}
