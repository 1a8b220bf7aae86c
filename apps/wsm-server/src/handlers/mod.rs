//! Handlers 模块

pub mod alerts;
pub mod metrics;
pub mod monitored_ssids;
pub mod subscriptions;
pub mod telemetry;

pub use alerts::*;
pub use metrics::*;
pub use monitored_ssids::*;
pub use subscriptions::*;
pub use telemetry::*;
