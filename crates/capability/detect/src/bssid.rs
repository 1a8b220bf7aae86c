//! 未知 BSSID：受保护 SSID 从基线之外的 BSSID 广播。

use crate::{DetectionContext, Detector, DetectorError, policy_event};
use domain::{DetectionEvent, DetectionType, DetectorKind, Dot11Batch, MonitoredSsid};
use serde_json::json;
use std::collections::BTreeMap;

pub(crate) struct UnexpectedBssid;

impl Detector for UnexpectedBssid {
    fn kind(&self) -> DetectorKind {
        DetectorKind::UnexpectedBssid
    }

    fn detection_type(&self) -> DetectionType {
        DetectionType::Dot11MonitorBssid
    }

    fn detect(
        &self,
        batch: &Dot11Batch,
        policy: &MonitoredSsid,
        ctx: &DetectionContext<'_>,
    ) -> Result<Vec<DetectionEvent>, DetectorError> {
        let baseline = ctx.require_baseline("unexpected_bssid")?;
        let mut unexpected = BTreeMap::new();
        for beacon in batch.beacons_for_ssid(&policy.ssid) {
            if baseline.contains_bssid(&beacon.bssid) {
                continue;
            }
            unexpected.entry(beacon.bssid.as_str()).or_insert(beacon);
        }
        Ok(unexpected
            .into_values()
            .map(|beacon| {
                policy_event(
                    batch,
                    policy,
                    self.detection_type(),
                    beacon.bssid.clone(),
                    json!({
                        "ssid": policy.ssid,
                        "bssid": beacon.bssid,
                        "channel": beacon.channel,
                        "signal_dbm": beacon.signal_dbm,
                    }),
                    beacon.observed_at_ms,
                )
            })
            .collect())
    }
}
