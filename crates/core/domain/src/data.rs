//! 802.11 遥测批次（由 tap 解码后上送）。

use crate::Scope;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 一次遥测上送批次，按组织/租户归属。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dot11Batch {
    pub organization_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub tap_uuid: Option<Uuid>,
    pub received_at_ms: i64,
    #[serde(default)]
    pub beacons: Vec<BssidObservation>,
    #[serde(default)]
    pub disconnections: Vec<DisconnectionObservation>,
    #[serde(default)]
    pub clients: Vec<ClientObservation>,
    #[serde(default)]
    pub probe_requests: Vec<ProbeRequestObservation>,
}

impl Dot11Batch {
    pub fn scope(&self) -> Scope {
        Scope::new(self.organization_id, self.tenant_id)
    }

    /// 广播指定 SSID 的 beacon 观测。
    pub fn beacons_for_ssid<'a>(
        &'a self,
        ssid: &'a str,
    ) -> impl Iterator<Item = &'a BssidObservation> + 'a {
        self.beacons
            .iter()
            .filter(move |beacon| sanitize_ssid(&beacon.ssid) == ssid)
    }

    /// 将批次内所有 BSSID 与客户端 MAC 规范化为大写冒号形式。
    ///
    /// 检测器按字符串比较地址，接入时统一一次；无法解析的地址保持原样。
    pub fn normalize_macs(&mut self) {
        fn normalize_in_place(mac: &mut String) {
            if let Some(normalized) = normalize_mac(mac) {
                *mac = normalized;
            }
        }
        for beacon in &mut self.beacons {
            normalize_in_place(&mut beacon.bssid);
        }
        for disconnection in &mut self.disconnections {
            normalize_in_place(&mut disconnection.bssid);
            normalize_in_place(&mut disconnection.client_mac);
        }
        for client in &mut self.clients {
            normalize_in_place(&mut client.bssid);
            normalize_in_place(&mut client.client_mac);
        }
        for request in &mut self.probe_requests {
            normalize_in_place(&mut request.client_mac);
        }
    }
}

/// 单条 BSSID 广播观测（beacon / probe response）。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BssidObservation {
    pub bssid: String,
    pub ssid: String,
    pub channel: u16,
    #[serde(default)]
    pub security_suite: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    pub signal_dbm: i32,
    pub observed_at_ms: i64,
}

/// 断连帧（deauth / disassoc）观测。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectionObservation {
    pub bssid: String,
    pub client_mac: String,
    #[serde(default)]
    pub reason_code: Option<u16>,
    pub observed_at_ms: i64,
}

/// 客户端关联观测。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientObservation {
    pub client_mac: String,
    pub bssid: String,
    #[serde(default)]
    pub signal_dbm: Option<i32>,
    pub observed_at_ms: i64,
}

/// Probe request 观测。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeRequestObservation {
    pub client_mac: String,
    pub ssid: String,
    pub observed_at_ms: i64,
}

/// 清洗 SSID：去除 NUL、控制字符、行/段分隔符与制表符，合并连续空格。
pub fn sanitize_ssid(ssid: &str) -> String {
    let cleaned: String = ssid
        .chars()
        .filter(|c| !c.is_control() && *c != '\u{2028}' && *c != '\u{2029}')
        .collect();
    let mut result = String::with_capacity(cleaned.len());
    let mut previous_space = false;
    for c in cleaned.chars() {
        if c == ' ' {
            if !previous_space {
                result.push(c);
            }
            previous_space = true;
        } else {
            result.push(c);
            previous_space = false;
        }
    }
    result.trim().to_string()
}

/// 规范化 MAC 地址为大写冒号分隔形式；非法地址返回 None。
pub fn normalize_mac(mac: &str) -> Option<String> {
    let parts: Vec<&str> = mac.trim().split([':', '-']).collect();
    if parts.len() != 6 {
        return None;
    }
    if parts
        .iter()
        .any(|part| part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return None;
    }
    Some(parts.join(":").to_ascii_uppercase())
}
