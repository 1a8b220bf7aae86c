//! 未批准客户端：关联到受保护 SSID 的客户端既不在批准名单中也没有 MAC 注解。
//!
//! 需要同时开启 client_monitoring 与 client_eventing。

use crate::{DetectionContext, Detector, DetectorError, policy_event, ssid_bssids};
use domain::{
    DetectionEvent, DetectionType, DetectorKind, Dot11Batch, MonitoredSsid, normalize_mac,
};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

pub(crate) struct UnapprovedClient;

impl Detector for UnapprovedClient {
    fn kind(&self) -> DetectorKind {
        DetectorKind::ClientEventing
    }

    fn detection_type(&self) -> DetectionType {
        DetectionType::Dot11UnapprovedClient
    }

    fn enabled_for(&self, policy: &MonitoredSsid) -> bool {
        policy.is_detector_enabled(DetectorKind::ClientMonitoring)
            && policy.is_detector_enabled(DetectorKind::ClientEventing)
    }

    fn detect(
        &self,
        batch: &Dot11Batch,
        policy: &MonitoredSsid,
        ctx: &DetectionContext<'_>,
    ) -> Result<Vec<DetectionEvent>, DetectorError> {
        let bssids = ssid_bssids(batch, policy, ctx.baseline);
        let approved: BTreeSet<String> = policy
            .approved_clients
            .iter()
            .filter_map(|mac| normalize_mac(mac))
            .collect();

        let mut unapproved = BTreeMap::new();
        for client in &batch.clients {
            if !bssids.contains(&client.bssid) {
                continue;
            }
            let Some(mac) = normalize_mac(&client.client_mac) else {
                continue;
            };
            if approved.contains(&mac) || ctx.known_macs.contains(&mac) {
                continue;
            }
            unapproved.entry(mac).or_insert(client);
        }

        Ok(unapproved
            .into_iter()
            .map(|(mac, client)| {
                policy_event(
                    batch,
                    policy,
                    self.detection_type(),
                    mac.clone(),
                    json!({
                        "ssid": policy.ssid,
                        "client_mac": mac,
                        "bssid": client.bssid,
                        "signal_dbm": client.signal_dbm,
                    }),
                    client.observed_at_ms,
                )
            })
            .collect())
    }
}
