//! 领域记录的字段映射。

use crate::{FieldValue, Filterable};
use domain::{
    BssidObservation, ClientObservation, DetectionAlert, DisconnectionObservation,
    ProbeRequestObservation,
};

fn text(value: impl Into<String>) -> Option<FieldValue> {
    Some(FieldValue::Text(value.into()))
}

fn integer(value: impl Into<i64>) -> Option<FieldValue> {
    Some(FieldValue::Integer(value.into()))
}

fn json_field(value: &serde_json::Value) -> Option<FieldValue> {
    match value {
        serde_json::Value::String(value) => text(value.as_str()),
        serde_json::Value::Number(number) => number
            .as_i64()
            .map(FieldValue::Integer)
            .or_else(|| text(number.to_string())),
        serde_json::Value::Bool(value) => text(value.to_string()),
        _ => None,
    }
}

/// JSON 对象按 key 取值；支持 `a.b` 形式的嵌套路径。
impl Filterable for serde_json::Value {
    fn field(&self, name: &str) -> Option<FieldValue> {
        let mut current = self;
        for part in name.split('.') {
            current = current.get(part)?;
        }
        json_field(current)
    }
}

impl Filterable for DetectionAlert {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "uuid" => text(self.uuid.to_string()),
            "detection_type" => text(self.detection_type.as_str()),
            "subsystem" => text(self.subsystem.as_str()),
            "subject_key" => text(self.subject_key.as_str()),
            "status" => text(self.status.as_str()),
            "occurrence_count" => {
                integer(i64::try_from(self.occurrence_count).unwrap_or(i64::MAX))
            }
            "first_seen_at_ms" => integer(self.first_seen_at_ms),
            "last_seen_at_ms" => integer(self.last_seen_at_ms),
            "organization_id" => self.scope.organization_id.and_then(|id| text(id.to_string())),
            "tenant_id" => self.scope.tenant_id.and_then(|id| text(id.to_string())),
            _ => name
                .strip_prefix("details.")
                .and_then(|path| self.details.field(path)),
        }
    }
}

impl Filterable for BssidObservation {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "bssid" => text(self.bssid.as_str()),
            "ssid" => text(self.ssid.as_str()),
            "channel" => integer(self.channel),
            "signal_dbm" => integer(self.signal_dbm),
            "security_suite" => self.security_suite.as_deref().and_then(text),
            "fingerprint" => self.fingerprint.as_deref().and_then(text),
            _ => None,
        }
    }
}

impl Filterable for ClientObservation {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "client_mac" => text(self.client_mac.as_str()),
            "bssid" => text(self.bssid.as_str()),
            "signal_dbm" => self.signal_dbm.and_then(integer),
            _ => None,
        }
    }
}

impl Filterable for ProbeRequestObservation {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "client_mac" => text(self.client_mac.as_str()),
            "ssid" => text(self.ssid.as_str()),
            _ => None,
        }
    }
}

impl Filterable for DisconnectionObservation {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "bssid" => text(self.bssid.as_str()),
            "client_mac" => text(self.client_mac.as_str()),
            "reason_code" => self.reason_code.and_then(integer),
            _ => None,
        }
    }
}
