//! 指纹漂移：已知 BSSID 的设备指纹不在基线中。

use crate::{DetectionContext, Detector, DetectorError, policy_event};
use domain::{DetectionEvent, DetectionType, DetectorKind, Dot11Batch, MonitoredSsid};
use serde_json::json;
use std::collections::BTreeSet;

pub(crate) struct UnexpectedFingerprint;

impl Detector for UnexpectedFingerprint {
    fn kind(&self) -> DetectorKind {
        DetectorKind::UnexpectedFingerprint
    }

    fn detection_type(&self) -> DetectionType {
        DetectionType::Dot11MonitorFingerprint
    }

    fn detect(
        &self,
        batch: &Dot11Batch,
        policy: &MonitoredSsid,
        ctx: &DetectionContext<'_>,
    ) -> Result<Vec<DetectionEvent>, DetectorError> {
        let baseline = ctx.require_baseline("unexpected_fingerprint")?;
        let mut reported = BTreeSet::new();
        let mut events = Vec::new();
        for beacon in batch.beacons_for_ssid(&policy.ssid) {
            let (Some(known), Some(fingerprint)) =
                (baseline.bssid(&beacon.bssid), beacon.fingerprint.as_deref())
            else {
                continue;
            };
            if known.fingerprints.is_empty() || known.fingerprints.contains(fingerprint) {
                continue;
            }
            if !reported.insert((beacon.bssid.as_str(), fingerprint)) {
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
                    "expected_fingerprints": known.fingerprints,
                    "observed_fingerprint": fingerprint,
                }),
                beacon.observed_at_ms,
            ));
        }
        Ok(events)
    }
}
