//! 告警订阅表。

use crate::AlertError;
use domain::{DetectionAlert, DetectionType, Subscription};
use std::collections::BTreeSet;
use std::sync::RwLock;

#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加订阅；完全相同的订阅已存在时返回 false。
    pub fn subscribe(&self, subscription: Subscription) -> Result<bool, AlertError> {
        if subscription.subscriber_id.trim().is_empty() {
            return Err(AlertError::Subscription(
                "subscriber_id is required".to_string(),
            ));
        }
        let mut subscriptions = self
            .subscriptions
            .write()
            .map_err(|_| AlertError::Subscription("lock failed".to_string()))?;
        if subscriptions.contains(&subscription) {
            return Ok(false);
        }
        subscriptions.push(subscription);
        Ok(true)
    }

    pub fn unsubscribe(
        &self,
        subscriber_id: &str,
        detection_type: DetectionType,
    ) -> Result<bool, AlertError> {
        let mut subscriptions = self
            .subscriptions
            .write()
            .map_err(|_| AlertError::Subscription("lock failed".to_string()))?;
        let before = subscriptions.len();
        subscriptions.retain(|item| {
            !(item.subscriber_id == subscriber_id && item.detection_type == detection_type)
        });
        Ok(subscriptions.len() != before)
    }

    pub fn list(&self) -> Result<Vec<Subscription>, AlertError> {
        let subscriptions = self
            .subscriptions
            .read()
            .map_err(|_| AlertError::Subscription("lock failed".to_string()))?;
        Ok(subscriptions.clone())
    }

    /// 匹配告警的订阅者（按类型或 WILDCARD），每个订阅者只出现一次。
    pub fn subscribers_for(&self, alert: &DetectionAlert) -> Result<BTreeSet<String>, AlertError> {
        let subscriptions = self
            .subscriptions
            .read()
            .map_err(|_| AlertError::Subscription("lock failed".to_string()))?;
        Ok(subscriptions
            .iter()
            .filter(|item| item.matches(alert))
            .map(|item| item.subscriber_id.clone())
            .collect())
    }
}
