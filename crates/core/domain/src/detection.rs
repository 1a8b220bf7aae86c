//! 检测类型、检测事件与告警模型。

use crate::Scope;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 告警所属子系统。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Subsystem {
    Dot11,
    Generic,
}

impl Subsystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::Dot11 => "DOT11",
            Subsystem::Generic => "GENERIC",
        }
    }
}

/// 检测类型（封闭枚举）。`Wildcard` 不对应任何检测器，仅用于订阅“全部”。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionType {
    Dot11MonitorBssid,
    Dot11MonitorChannel,
    Dot11MonitorSecuritySuite,
    Dot11MonitorFingerprint,
    Dot11MonitorSignalTrack,
    Dot11MonitorDiscoAnomalies,
    Dot11MonitorSimilarLookingSsid,
    Dot11MonitorSsidSubstring,
    Dot11BanditContact,
    Dot11Probereq,
    Dot11UnapprovedSsid,
    Dot11UnapprovedClient,
    Wildcard,
}

/// 检测类型的静态描述。
#[derive(Debug, Clone, Copy)]
pub struct DetectionTypeInfo {
    pub detection_type: DetectionType,
    pub name: &'static str,
    pub title: &'static str,
    pub subsystem: Subsystem,
}

const fn info(
    detection_type: DetectionType,
    name: &'static str,
    title: &'static str,
    subsystem: Subsystem,
) -> DetectionTypeInfo {
    DetectionTypeInfo {
        detection_type,
        name,
        title,
        subsystem,
    }
}

/// 检测类型查找表，顺序与枚举声明一致。
const DETECTION_TYPES: [DetectionTypeInfo; 13] = [
    info(
        DetectionType::Dot11MonitorBssid,
        "DOT11_MONITOR_BSSID",
        "WiFi Network Monitor: Unexpected BSSID detected",
        Subsystem::Dot11,
    ),
    info(
        DetectionType::Dot11MonitorChannel,
        "DOT11_MONITOR_CHANNEL",
        "WiFi Network Monitor: Unexpected channel usage detected",
        Subsystem::Dot11,
    ),
    info(
        DetectionType::Dot11MonitorSecuritySuite,
        "DOT11_MONITOR_SECURITY_SUITE",
        "WiFi Network Monitor: Unexpected security suite configuration detected",
        Subsystem::Dot11,
    ),
    info(
        DetectionType::Dot11MonitorFingerprint,
        "DOT11_MONITOR_FINGERPRINT",
        "WiFi Network Monitor: Unexpected BSSID fingerprint detected",
        Subsystem::Dot11,
    ),
    info(
        DetectionType::Dot11MonitorSignalTrack,
        "DOT11_MONITOR_SIGNAL_TRACK",
        "WiFi Network Monitor: Multiple BSSID signal tracks detected",
        Subsystem::Dot11,
    ),
    info(
        DetectionType::Dot11MonitorDiscoAnomalies,
        "DOT11_MONITOR_DISCO_ANOMALIES",
        "WiFi Network Monitor: Disconnection Event Anomalies detected",
        Subsystem::Dot11,
    ),
    info(
        DetectionType::Dot11MonitorSimilarLookingSsid,
        "DOT11_MONITOR_SIMILAR_LOOKING_SSID",
        "WiFi Network Monitor: SSID with a similar name to the monitored SSID detected",
        Subsystem::Dot11,
    ),
    info(
        DetectionType::Dot11MonitorSsidSubstring,
        "DOT11_MONITOR_SSID_SUBSTRING",
        "WiFi Network Monitor: SSID includes a forbidden substring",
        Subsystem::Dot11,
    ),
    info(
        DetectionType::Dot11BanditContact,
        "DOT11_BANDIT_CONTACT",
        "WiFi Bandit detected",
        Subsystem::Dot11,
    ),
    info(
        DetectionType::Dot11Probereq,
        "DOT11_PROBEREQ",
        "Monitored probe request detected",
        Subsystem::Dot11,
    ),
    info(
        DetectionType::Dot11UnapprovedSsid,
        "DOT11_UNAPPROVED_SSID",
        "Unapproved SSID detected",
        Subsystem::Dot11,
    ),
    info(
        DetectionType::Dot11UnapprovedClient,
        "DOT11_UNAPPROVED_CLIENT",
        "Unapproved WiFi Client detected",
        Subsystem::Dot11,
    ),
    info(
        DetectionType::Wildcard,
        "WILDCARD",
        "Subscribed to all detection alerts. (Wildcard)",
        Subsystem::Generic,
    ),
];

impl DetectionType {
    pub fn info(self) -> &'static DetectionTypeInfo {
        &DETECTION_TYPES[self as usize]
    }

    pub fn title(self) -> &'static str {
        self.info().title
    }

    pub fn subsystem(self) -> Subsystem {
        self.info().subsystem
    }

    pub fn as_str(self) -> &'static str {
        self.info().name
    }

    pub fn is_wildcard(self) -> bool {
        self == DetectionType::Wildcard
    }

    pub fn parse(value: &str) -> Option<Self> {
        DETECTION_TYPES
            .iter()
            .find(|item| item.name.eq_ignore_ascii_case(value.trim()))
            .map(|item| item.detection_type)
    }

    /// 所有真实检测类型（不含 Wildcard）。
    pub fn detectable() -> impl Iterator<Item = DetectionType> {
        DETECTION_TYPES
            .iter()
            .map(|item| item.detection_type)
            .filter(|item| !item.is_wildcard())
    }
}

impl std::fmt::Display for DetectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 检测器输出的单条检测事件。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    pub detection_type: DetectionType,
    pub scope: Scope,
    /// 被标记对象的稳定标识（BSSID、SSID、客户端 MAC 等）。
    pub subject_key: String,
    pub details: serde_json::Value,
    pub observed_at_ms: i64,
    #[serde(default)]
    pub monitored_ssid_uuid: Option<Uuid>,
}

impl DetectionEvent {
    pub fn key(&self) -> AlertKey {
        AlertKey {
            detection_type: self.detection_type,
            scope: self.scope,
            subject_key: self.subject_key.clone(),
        }
    }
}

/// 告警合并 key：(类型, 作用域, 对象)。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertKey {
    pub detection_type: DetectionType,
    pub scope: Scope,
    pub subject_key: String,
}

/// 告警状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "ACTIVE",
            AlertStatus::Resolved => "RESOLVED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Some(AlertStatus::Active),
            "RESOLVED" => Some(AlertStatus::Resolved),
            _ => None,
        }
    }
}

/// 检测告警（持久化、集群复制）。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionAlert {
    pub uuid: Uuid,
    pub detection_type: DetectionType,
    pub subsystem: Subsystem,
    pub scope: Scope,
    pub subject_key: String,
    pub details: serde_json::Value,
    pub first_seen_at_ms: i64,
    pub last_seen_at_ms: i64,
    pub status: AlertStatus,
    pub occurrence_count: u64,
    #[serde(default)]
    pub resolved_at_ms: Option<i64>,
    #[serde(default)]
    pub monitored_ssid_uuid: Option<Uuid>,
}

impl DetectionAlert {
    /// 由首个检测事件创建 ACTIVE 告警。
    pub fn activate(event: &DetectionEvent) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            detection_type: event.detection_type,
            subsystem: event.detection_type.subsystem(),
            scope: event.scope,
            subject_key: event.subject_key.clone(),
            details: event.details.clone(),
            first_seen_at_ms: event.observed_at_ms,
            last_seen_at_ms: event.observed_at_ms,
            status: AlertStatus::Active,
            occurrence_count: 1,
            resolved_at_ms: None,
            monitored_ssid_uuid: event.monitored_ssid_uuid,
        }
    }

    pub fn key(&self) -> AlertKey {
        AlertKey {
            detection_type: self.detection_type,
            scope: self.scope,
            subject_key: self.subject_key.clone(),
        }
    }

    pub fn title(&self) -> &'static str {
        self.detection_type.title()
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }
}

/// 告警订阅：(订阅者, 检测类型 | WILDCARD)，可选限定组织。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub subscriber_id: String,
    pub detection_type: DetectionType,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
}

impl Subscription {
    pub fn matches(&self, alert: &DetectionAlert) -> bool {
        let type_matches =
            self.detection_type.is_wildcard() || self.detection_type == alert.detection_type;
        let scope_matches = match self.organization_id {
            None => true,
            Some(org) => alert.scope.organization_id == Some(org),
        };
        type_matches && scope_matches
    }
}
