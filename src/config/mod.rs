// src/config/mod.rs
pub mod monitor;
pub mod sms;

pub use monitor::MonitorConfig;
pub use sms::SmsConfig;
