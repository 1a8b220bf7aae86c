//! 多信号轨迹：同一 (BSSID, 信道) 出现多条物理上可区分的信号强度轨迹。
//!
//! 轨迹 = 按强度排序后相邻间隔不超过 `track_gap_dbm` 的连续样本段，
//! 样本数不足 `min_track_samples` 的段视为噪声丢弃。

use crate::{DetectionContext, Detector, DetectorError, DetectorSettings, policy_event};
use domain::{DetectionEvent, DetectionType, DetectorKind, Dot11Batch, MonitoredSsid};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

/// 一条信号轨迹。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalTrack {
    pub start_ms: i64,
    pub end_ms: i64,
    pub centerline: i32,
    pub min_signal: i32,
    pub max_signal: i32,
    pub samples: usize,
}

/// 由 (observed_at_ms, signal_dbm) 样本计算轨迹，按强度从弱到强排列。
pub fn compute_tracks(samples: &[(i64, i32)], settings: &DetectorSettings) -> Vec<SignalTrack> {
    let mut sorted: Vec<(i64, i32)> = samples.to_vec();
    sorted.sort_by_key(|(_, signal)| *signal);

    let mut segments: Vec<Vec<(i64, i32)>> = Vec::new();
    for sample in sorted {
        match segments.last_mut() {
            Some(segment)
                if segment
                    .last()
                    .is_some_and(|(_, last)| sample.1 - last <= settings.track_gap_dbm) =>
            {
                segment.push(sample)
            }
            _ => segments.push(vec![sample]),
        }
    }

    segments
        .into_iter()
        .filter(|segment| segment.len() >= settings.min_track_samples.max(1))
        .map(|segment| {
            let signals: Vec<i32> = segment.iter().map(|(_, signal)| *signal).collect();
            SignalTrack {
                start_ms: segment.iter().map(|(ts, _)| *ts).min().unwrap_or_default(),
                end_ms: segment.iter().map(|(ts, _)| *ts).max().unwrap_or_default(),
                centerline: signals[signals.len() / 2],
                min_signal: signals[0],
                max_signal: signals[signals.len() - 1],
                samples: segment.len(),
            }
        })
        .collect()
}

pub(crate) struct MultipleSignalTracks;

impl Detector for MultipleSignalTracks {
    fn kind(&self) -> DetectorKind {
        DetectorKind::UnexpectedSignalTrack
    }

    fn detection_type(&self) -> DetectionType {
        DetectionType::Dot11MonitorSignalTrack
    }

    fn detect(
        &self,
        batch: &Dot11Batch,
        policy: &MonitoredSsid,
        ctx: &DetectionContext<'_>,
    ) -> Result<Vec<DetectionEvent>, DetectorError> {
        let mut samples: BTreeMap<(&str, u16), Vec<(i64, i32)>> = BTreeMap::new();
        for beacon in batch.beacons_for_ssid(&policy.ssid) {
            samples
                .entry((beacon.bssid.as_str(), beacon.channel))
                .or_default()
                .push((beacon.observed_at_ms, beacon.signal_dbm));
        }

        let mut events = Vec::new();
        for ((bssid, channel), samples) in samples {
            let tracks = compute_tracks(&samples, ctx.settings);
            if tracks.len() <= 1 {
                continue;
            }
            let observed_at_ms = tracks.iter().map(|track| track.end_ms).max().unwrap_or(0);
            events.push(policy_event(
                batch,
                policy,
                self.detection_type(),
                bssid,
                json!({
                    "ssid": policy.ssid,
                    "bssid": bssid,
                    "channel": channel,
                    "track_count": tracks.len(),
                    "tracks": tracks,
                }),
                observed_at_ms,
            ));
        }
        Ok(events)
    }
}
