//! FraudShield Gate Library
//!
//! A layered request-security pipeline for a fraud analytics service:
//! per-client rate limiting, signed bearer-token authentication, role-based
//! authorization, and sliding-window anomaly detection with alerting over a
//! redis-backed (or in-process fallback) event store.

pub mod alerts;
pub mod anomaly;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod ratelimit;
pub mod store;
pub mod types;

pub use config::AppConfig;
pub use error::GateError;
pub use metrics::{GatewayMetrics, MetricsReporter};
pub use pipeline::{Access, Caller, GateRequest, Route, SecurityGateway};
pub use store::EventStore;
pub use types::{alert::SecurityAlert, event::SecurityEvent};
