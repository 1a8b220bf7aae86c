//! 检测器集合。
//!
//! 每个检测器是纯函数：(遥测批次, 监控策略, 上下文) -> 检测事件序列。
//! 检测器之间不共享可变状态；历史上下文（基线、MAC 注解）由调用方预先加载后传入。
//! 单个检测器失败只跳过自身，不影响同批次其他检测器与其他 SSID。

mod baseline;
mod bssid;
mod channel;
mod client;
mod disco;
mod fingerprint;
mod security_suite;
mod signal_track;
mod similar_ssid;
mod substring;
mod watchlist;

pub use baseline::baseline_from_batch;
pub use disco::{DiscoModel, DiscoMonitorConfig};
pub use security_suite::suite_strength;
pub use signal_track::{SignalTrack, compute_tracks};
pub use similar_ssid::{fold_confusables, levenshtein, ssid_distance};
pub use watchlist::{WatchlistInput, parse_allow_filters, run_watchlist_detectors};

use domain::{DetectionEvent, DetectionType, DetectorKind, Dot11Batch, MonitoredSsid};
use std::collections::BTreeSet;
use tracing::{debug, warn};
use wsm_storage::SsidBaseline;

/// 检测器错误：调用方记录后跳过该检测器。
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    /// 策略参数缺失或无法解析。
    #[error("{detector} misconfigured: {reason}")]
    Configuration {
        detector: &'static str,
        reason: String,
    },
    /// 缺少必需的历史上下文（例如尚未建立基线）。
    #[error("{detector} missing context: {what}")]
    MissingContext {
        detector: &'static str,
        what: &'static str,
    },
}

/// 检测参数（全局）。
#[derive(Debug, Clone)]
pub struct DetectorSettings {
    /// 同一信号轨迹内相邻强度的最大间隔（dBm）。
    pub track_gap_dbm: i32,
    /// 构成一条轨迹所需的最少样本数。
    pub min_track_samples: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            track_gap_dbm: 8,
            min_track_samples: 3,
        }
    }
}

/// 单次检测调用的只读上下文。
pub struct DetectionContext<'a> {
    pub baseline: Option<&'a SsidBaseline>,
    /// 已有 MacAddressContext 注解的 MAC（规范化形式）。
    pub known_macs: &'a BTreeSet<String>,
    pub settings: &'a DetectorSettings,
}

impl<'a> DetectionContext<'a> {
    fn require_baseline(&self, detector: &'static str) -> Result<&'a SsidBaseline, DetectorError> {
        self.baseline.ok_or(DetectorError::MissingContext {
            detector,
            what: "ssid baseline",
        })
    }
}

/// 单个策略级检测器。
pub trait Detector: Send + Sync {
    fn kind(&self) -> DetectorKind;

    fn detection_type(&self) -> DetectionType;

    /// 策略是否启用该检测器。
    fn enabled_for(&self, policy: &MonitoredSsid) -> bool {
        policy.is_detector_enabled(self.kind())
    }

    fn detect(
        &self,
        batch: &Dot11Batch,
        policy: &MonitoredSsid,
        ctx: &DetectionContext<'_>,
    ) -> Result<Vec<DetectionEvent>, DetectorError>;
}

/// 策略级检测器注册表（启动时固定）。
pub static POLICY_DETECTORS: [&dyn Detector; 9] = [
    &bssid::UnexpectedBssid,
    &channel::UnexpectedChannel,
    &security_suite::UnexpectedSecuritySuite,
    &fingerprint::UnexpectedFingerprint,
    &signal_track::MultipleSignalTracks,
    &disco::DiscoAnomalies,
    &similar_ssid::SimilarLookingSsid,
    &substring::SsidSubstring,
    &client::UnapprovedClient,
];

/// 一次策略检测的汇总。
#[derive(Debug, Default)]
pub struct DetectorOutcome {
    pub events: Vec<DetectionEvent>,
    pub skipped: Vec<(DetectorKind, DetectorError)>,
}

/// 对单个策略运行全部已启用的检测器。
///
/// 主开关关闭时直接返回空结果；任一检测器报错只记录并跳过。
pub fn run_policy_detectors(
    batch: &Dot11Batch,
    policy: &MonitoredSsid,
    ctx: &DetectionContext<'_>,
) -> DetectorOutcome {
    let mut outcome = DetectorOutcome::default();
    if !policy.enabled {
        return outcome;
    }
    for detector in POLICY_DETECTORS.iter() {
        if !detector.enabled_for(policy) {
            continue;
        }
        match detector.detect(batch, policy, ctx) {
            Ok(events) => outcome.events.extend(events),
            Err(err) => {
                match &err {
                    DetectorError::Configuration { .. } => {
                        wsm_telemetry::record_detector_config_error();
                        warn!(
                            target: "wsm.detect",
                            monitored_ssid = %policy.uuid,
                            detector = detector.kind().as_str(),
                            error = %err,
                            "detector_misconfigured"
                        );
                    }
                    DetectorError::MissingContext { .. } => {
                        wsm_telemetry::record_detector_skipped();
                        debug!(
                            target: "wsm.detect",
                            monitored_ssid = %policy.uuid,
                            detector = detector.kind().as_str(),
                            error = %err,
                            "detector_skipped"
                        );
                    }
                }
                outcome.skipped.push((detector.kind(), err));
            }
        }
    }
    outcome
}

/// 构造归属于批次作用域的检测事件。
pub(crate) fn policy_event(
    batch: &Dot11Batch,
    policy: &MonitoredSsid,
    detection_type: DetectionType,
    subject_key: impl Into<String>,
    details: serde_json::Value,
    observed_at_ms: i64,
) -> DetectionEvent {
    DetectionEvent {
        detection_type,
        scope: batch.scope(),
        subject_key: subject_key.into(),
        details,
        observed_at_ms,
        monitored_ssid_uuid: Some(policy.uuid),
    }
}

/// 广播受保护 SSID 的 BSSID（本批次观测 + 基线）。
pub(crate) fn ssid_bssids(
    batch: &Dot11Batch,
    policy: &MonitoredSsid,
    baseline: Option<&SsidBaseline>,
) -> BTreeSet<String> {
    let mut bssids: BTreeSet<String> = batch
        .beacons_for_ssid(&policy.ssid)
        .map(|beacon| beacon.bssid.clone())
        .collect();
    if let Some(baseline) = baseline {
        bssids.extend(baseline.bssids.keys().cloned());
    }
    bssids
}
