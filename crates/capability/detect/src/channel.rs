//! 信道异常：已知 BSSID 出现在其基线信道集合之外。

use crate::{DetectionContext, Detector, DetectorError, policy_event};
use domain::{DetectionEvent, DetectionType, DetectorKind, Dot11Batch, MonitoredSsid};
use serde_json::json;
use std::collections::BTreeSet;

pub(crate) struct UnexpectedChannel;

impl Detector for UnexpectedChannel {
    fn kind(&self) -> DetectorKind {
        DetectorKind::UnexpectedChannel
    }

    fn detection_type(&self) -> DetectionType {
        DetectionType::Dot11MonitorChannel
    }

    fn detect(
        &self,
        batch: &Dot11Batch,
        policy: &MonitoredSsid,
        ctx: &DetectionContext<'_>,
    ) -> Result<Vec<DetectionEvent>, DetectorError> {
        let baseline = ctx.require_baseline("unexpected_channel")?;
        let mut reported = BTreeSet::new();
        let mut events = Vec::new();
        for beacon in batch.beacons_for_ssid(&policy.ssid) {
            let Some(known) = baseline.bssid(&beacon.bssid) else {
                continue;
            };
            if known.channels.is_empty() || known.channels.contains(&beacon.channel) {
                continue;
            }
            if !reported.insert((beacon.bssid.as_str(), beacon.channel)) {
                continue;
            }
            events.push(policy_event(
                batch,
                policy,
                self.detection_type(),
                beacon.bssid.clone(),
                json!({
                    "ssid": policy.ssid,
                    "bssid": beacon.bssid,
                    "expected_channels": known.channels,
                    "observed_channel": beacon.channel,
                }),
                beacon.observed_at_ms,
            ));
        }
        Ok(events)
    }
}
