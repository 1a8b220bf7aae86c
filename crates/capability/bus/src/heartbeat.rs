use domain::NodeRecord;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use wsm_storage::NodeDirectory;

/// 周期性刷新本节点在节点目录中的心跳。
pub fn spawn_heartbeat(
    directory: Arc<dyn NodeDirectory>,
    node: NodeRecord,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let record = NodeRecord {
                last_seen_at_ms: domain::now_epoch_ms(),
                ..node.clone()
            };
            if let Err(err) = directory.touch(&record).await {
                warn!(
                    target: "wsm.bus",
                    node_id = %record.uuid,
                    error = %err,
                    "node_heartbeat_failed"
                );
            }
        }
    })
}
