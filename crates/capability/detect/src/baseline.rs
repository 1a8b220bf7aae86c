//! 由首个批次建立 SSID 基线。

use domain::{Dot11Batch, MonitoredSsid};
use wsm_storage::{BssidBaseline, SsidBaseline};

/// 以批次内受保护 SSID 的 beacon 构造基线；批次中没有该 SSID 时返回 None。
///
/// 未携带安全套件的 beacon 记为开放网络 `NONE`。
pub fn baseline_from_batch(
    batch: &Dot11Batch,
    policy: &MonitoredSsid,
    now_ms: i64,
) -> Option<SsidBaseline> {
    let mut baseline = SsidBaseline {
        updated_at_ms: now_ms,
        ..SsidBaseline::default()
    };
    for beacon in batch.beacons_for_ssid(&policy.ssid) {
        let entry: &mut BssidBaseline = baseline.bssids.entry(beacon.bssid.clone()).or_default();
        entry.channels.insert(beacon.channel);
        entry.security_suites.insert(
            beacon
                .security_suite
                .clone()
                .unwrap_or_else(|| "NONE".to_string()),
        );
        if let Some(fingerprint) = &beacon.fingerprint {
            entry.fingerprints.insert(fingerprint.clone());
        }
    }
    if baseline.bssids.is_empty() {
        return None;
    }
    Some(baseline)
}
