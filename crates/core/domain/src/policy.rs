//! 监控策略与上下文注解。

use crate::Scope;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// 可按策略开关的检测器种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    UnexpectedBssid,
    UnexpectedChannel,
    UnexpectedSecuritySuite,
    UnexpectedFingerprint,
    UnexpectedSignalTrack,
    DiscoMonitor,
    SimilarLookingSsid,
    SsidSubstring,
    ClientMonitoring,
    ClientEventing,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 10] = [
        DetectorKind::UnexpectedBssid,
        DetectorKind::UnexpectedChannel,
        DetectorKind::UnexpectedSecuritySuite,
        DetectorKind::UnexpectedFingerprint,
        DetectorKind::UnexpectedSignalTrack,
        DetectorKind::DiscoMonitor,
        DetectorKind::SimilarLookingSsid,
        DetectorKind::SsidSubstring,
        DetectorKind::ClientMonitoring,
        DetectorKind::ClientEventing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::UnexpectedBssid => "unexpected_bssid",
            DetectorKind::UnexpectedChannel => "unexpected_channel",
            DetectorKind::UnexpectedSecuritySuite => "unexpected_security_suite",
            DetectorKind::UnexpectedFingerprint => "unexpected_fingerprint",
            DetectorKind::UnexpectedSignalTrack => "unexpected_signal_track",
            DetectorKind::DiscoMonitor => "disco_monitor",
            DetectorKind::SimilarLookingSsid => "similar_looking_ssid",
            DetectorKind::SsidSubstring => "ssid_substring",
            DetectorKind::ClientMonitoring => "client_monitoring",
            DetectorKind::ClientEventing => "client_eventing",
        }
    }
}

/// 受保护 SSID 的监控策略。
///
/// 检测器开关以能力集合表示：`detectors` 中存在即启用。
/// 主开关 `enabled` 为 false 时任何检测器都不运行。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoredSsid {
    pub id: i64,
    pub uuid: Uuid,
    pub ssid: String,
    pub enabled: bool,
    pub organization_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub detectors: BTreeSet<DetectorKind>,
    #[serde(default)]
    pub disco_monitor_type: Option<String>,
    #[serde(default)]
    pub disco_monitor_configuration: Option<String>,
    #[serde(default)]
    pub similar_looking_ssid_threshold: u32,
    #[serde(default)]
    pub ssid_substrings: Vec<String>,
    #[serde(default)]
    pub approved_clients: BTreeSet<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl MonitoredSsid {
    /// 构造一条启用但未开启任何检测器的策略。
    pub fn new(ssid: impl Into<String>, scope: Scope, now_ms: i64) -> Self {
        Self {
            id: 0,
            uuid: Uuid::new_v4(),
            ssid: ssid.into(),
            enabled: true,
            organization_id: scope.organization_id,
            tenant_id: scope.tenant_id,
            detectors: BTreeSet::new(),
            disco_monitor_type: None,
            disco_monitor_configuration: None,
            similar_looking_ssid_threshold: 0,
            ssid_substrings: Vec::new(),
            approved_clients: BTreeSet::new(),
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    pub fn with_detector(mut self, kind: DetectorKind) -> Self {
        self.detectors.insert(kind);
        self
    }

    pub fn scope(&self) -> Scope {
        Scope::new(self.organization_id, self.tenant_id)
    }

    /// 检测器是否对该策略生效（主开关 + 能力集合）。
    pub fn is_detector_enabled(&self, kind: DetectorKind) -> bool {
        self.enabled && self.detectors.contains(&kind)
    }

    /// 当前生效的检测器集合；主开关关闭时为空。
    pub fn active_detectors(&self) -> impl Iterator<Item = DetectorKind> + '_ {
        self.detectors
            .iter()
            .copied()
            .filter(move |_| self.enabled)
    }
}

/// 运营人员对 MAC 地址的注解（已知设备）。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacAddressContext {
    pub id: i64,
    pub uuid: Uuid,
    pub mac_address: String,
    #[serde(default)]
    pub name: Option<String>,
    pub description: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub organization_id: Uuid,
    pub tenant_id: Uuid,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl MacAddressContext {
    pub fn scope(&self) -> Scope {
        Scope::new(Some(self.organization_id), Some(self.tenant_id))
    }
}

/// 已知敌对设备签名。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bandit {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub fingerprints: BTreeSet<String>,
}
