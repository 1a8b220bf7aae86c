//! 断连异常：受保护 SSID 的 BSSID 上每分钟断连帧数量异常。
//!
//! `disco_monitor_type` 选择统计模型，`disco_monitor_configuration` 为其 JSON 参数：
//! - `STATIC_THRESHOLD`：`{"threshold": N}`，任一分钟桶超过 N 即异常
//! - `MODIFIED_Z_SCORE`：`{"threshold": 3.5, "min_buckets": 5}`，基于中位数/MAD 的修正 z 分数

use crate::{DetectionContext, Detector, DetectorError, policy_event, ssid_bssids};
use domain::{DetectionEvent, DetectionType, DetectorKind, Dot11Batch, MonitoredSsid};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

const BUCKET_MS: i64 = 60_000;
const DETECTOR: &str = "disco_monitor";

/// 断连统计模型。
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoModel {
    StaticThreshold { threshold: u64 },
    ModifiedZScore { threshold: f64, min_buckets: usize },
}

#[derive(Debug, Deserialize)]
struct StaticThresholdConfig {
    threshold: u64,
}

#[derive(Debug, Deserialize)]
struct ModifiedZScoreConfig {
    #[serde(default = "default_z_threshold")]
    threshold: f64,
    #[serde(default = "default_min_buckets")]
    min_buckets: usize,
}

fn default_z_threshold() -> f64 {
    3.5
}

fn default_min_buckets() -> usize {
    5
}

/// 已解析的断连监控配置。
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoMonitorConfig {
    pub model: DiscoModel,
}

impl DiscoMonitorConfig {
    pub fn from_policy(policy: &MonitoredSsid) -> Result<Self, DetectorError> {
        let monitor_type = policy
            .disco_monitor_type
            .as_deref()
            .ok_or_else(|| configuration("disco monitor type not set"))?;
        let raw = policy
            .disco_monitor_configuration
            .as_deref()
            .unwrap_or("{}");
        let model = match monitor_type.trim().to_ascii_uppercase().as_str() {
            "STATIC_THRESHOLD" => {
                let config: StaticThresholdConfig = serde_json::from_str(raw)
                    .map_err(|err| configuration(format!("invalid configuration: {err}")))?;
                DiscoModel::StaticThreshold {
                    threshold: config.threshold,
                }
            }
            "MODIFIED_Z_SCORE" => {
                let config: ModifiedZScoreConfig = serde_json::from_str(raw)
                    .map_err(|err| configuration(format!("invalid configuration: {err}")))?;
                if !config.threshold.is_finite() || config.threshold <= 0.0 {
                    return Err(configuration("z-score threshold must be positive"));
                }
                DiscoModel::ModifiedZScore {
                    threshold: config.threshold,
                    min_buckets: config.min_buckets.max(3),
                }
            }
            other => return Err(configuration(format!("unknown monitor type `{other}`"))),
        };
        Ok(Self { model })
    }
}

fn configuration(reason: impl Into<String>) -> DetectorError {
    DetectorError::Configuration {
        detector: DETECTOR,
        reason: reason.into(),
    }
}

fn bucket_start(observed_at_ms: i64) -> i64 {
    observed_at_ms.div_euclid(BUCKET_MS).saturating_mul(BUCKET_MS)
}

/// 带权中位数：`values` 为 (取值, 出现次数)，`total` 为次数之和。
fn weighted_median(values: &mut [(f64, u64)], total: u64) -> f64 {
    values.sort_by(|a, b| a.0.total_cmp(&b.0));
    let nth = |index: u64| {
        let mut seen = 0u64;
        for (value, weight) in values.iter() {
            seen += weight;
            if index < seen {
                return *value;
            }
        }
        values.last().map(|(value, _)| *value).unwrap_or(0.0)
    };
    let mid = total / 2;
    if total % 2 == 0 {
        (nth(mid - 1) + nth(mid)) / 2.0
    } else {
        nth(mid)
    }
}

/// 返回异常分钟桶：(桶起始毫秒, 断连数, 得分)。
///
/// z 分数模型下，首尾之间没有断连的分钟按计数 0 参与统计，
/// 只记其个数，不展开成逐分钟序列。
fn find_anomaly(buckets: &BTreeMap<i64, u64>, model: &DiscoModel) -> Option<(i64, u64, f64)> {
    match model {
        DiscoModel::StaticThreshold { threshold } => buckets
            .iter()
            .filter(|(_, count)| **count > *threshold)
            .max_by_key(|(_, count)| **count)
            .map(|(bucket, count)| (*bucket, *count, *count as f64)),
        DiscoModel::ModifiedZScore {
            threshold,
            min_buckets,
        } => {
            let (first, last) = (*buckets.keys().next()?, *buckets.keys().next_back()?);
            let span = (i128::from(last) - i128::from(first)) / i128::from(BUCKET_MS) + 1;
            let total = u64::try_from(span).unwrap_or(u64::MAX);
            if total < *min_buckets as u64 {
                return None;
            }
            let empty = total.saturating_sub(buckets.len() as u64);

            let mut values: Vec<(f64, u64)> = buckets
                .values()
                .map(|count| (*count as f64, 1))
                .chain((empty > 0).then_some((0.0, empty)))
                .collect();
            let center = weighted_median(&mut values, total);
            let mut deviations: Vec<(f64, u64)> = values
                .iter()
                .map(|(value, weight)| ((value - center).abs(), *weight))
                .collect();
            let mad = weighted_median(&mut deviations, total);
            let scale = if mad > 0.0 {
                mad / 0.6745
            } else {
                let sum: f64 = deviations
                    .iter()
                    .map(|(deviation, weight)| deviation * *weight as f64)
                    .sum();
                sum / total as f64 * 1.253_314
            };
            if scale <= 0.0 {
                return None;
            }
            // 空桶得分不为正，异常只可能落在有断连的桶上
            buckets
                .iter()
                .map(|(start, count)| (*start, *count, (*count as f64 - center) / scale))
                .filter(|(_, _, score)| *score > *threshold)
                .max_by(|a, b| a.2.total_cmp(&b.2))
        }
    }
}

pub(crate) struct DiscoAnomalies;

impl Detector for DiscoAnomalies {
    fn kind(&self) -> DetectorKind {
        DetectorKind::DiscoMonitor
    }

    fn detection_type(&self) -> DetectionType {
        DetectionType::Dot11MonitorDiscoAnomalies
    }

    fn detect(
        &self,
        batch: &Dot11Batch,
        policy: &MonitoredSsid,
        ctx: &DetectionContext<'_>,
    ) -> Result<Vec<DetectionEvent>, DetectorError> {
        let config = DiscoMonitorConfig::from_policy(policy)?;
        let bssids = ssid_bssids(batch, policy, ctx.baseline);
        if bssids.is_empty() {
            return Err(DetectorError::MissingContext {
                detector: DETECTOR,
                what: "bssids of monitored ssid",
            });
        }

        let mut buckets: BTreeMap<i64, u64> = BTreeMap::new();
        for disconnection in &batch.disconnections {
            if !bssids.contains(&disconnection.bssid) {
                continue;
            }
            *buckets
                .entry(bucket_start(disconnection.observed_at_ms))
                .or_default() += 1;
        }

        let Some((bucket_start_ms, count, score)) = find_anomaly(&buckets, &config.model) else {
            return Ok(Vec::new());
        };
        let model = match config.model {
            DiscoModel::StaticThreshold { threshold } => {
                json!({"type": "STATIC_THRESHOLD", "threshold": threshold})
            }
            DiscoModel::ModifiedZScore {
                threshold,
                min_buckets,
            } => json!({
                "type": "MODIFIED_Z_SCORE",
                "threshold": threshold,
                "min_buckets": min_buckets,
            }),
        };
        Ok(vec![policy_event(
            batch,
            policy,
            self.detection_type(),
            policy.ssid.clone(),
            json!({
                "ssid": policy.ssid,
                "bucket_start_ms": bucket_start_ms,
                "disconnections": count,
                "score": score,
                "model": model,
            }),
            bucket_start_ms.saturating_add(BUCKET_MS - 1),
        )])
    }
}
