// src/config/sms.rs
use std::env;

pub const ENV_ACCOUNT_SID: &str = "SECRET_TWILIO_ACCOUNT_SID";
pub const ENV_AUTH_TOKEN: &str = "SECRET_TWILIO_AUTH_TOKEN";
pub const ENV_FROM_NUMBER: &str = "SECRET_TWILIO_PHONE_NUMBER";
pub const ENV_TO_NUMBER: &str = "SECRET_YOUR_PHONE_NUMBER";

/// Twilio credentials and the single alert recipient.
#[derive(Clone, PartialEq, Eq)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
    pub to: String,
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SmsConfig {
    /// All four secrets present, or `None` (SMS disabled).
    pub fn from_env() -> Option<Self> {
        Some(Self {
            account_sid: non_empty(ENV_ACCOUNT_SID)?,
            auth_token: non_empty(ENV_AUTH_TOKEN)?,
            from: non_empty(ENV_FROM_NUMBER)?,
            to: non_empty(ENV_TO_NUMBER)?,
        })
    }
}
