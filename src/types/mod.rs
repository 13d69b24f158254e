//! Shared data structures

pub mod alert;
pub mod event;

pub use alert::{AlertRule, SecurityAlert, Severity};
pub use event::{EventKey, SecurityEvent};
