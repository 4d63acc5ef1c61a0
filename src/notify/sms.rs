use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::Notifier;
use crate::error::DeliveryError;

pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Twilio refuses bodies above this many characters.
pub const MAX_BODY_CHARS: usize = 1600;

// Twilio error codes that mean "this number can't receive the message".
const RECIPIENT_ERROR_CODES: [u32; 4] = [21211, 21408, 21610, 21614];

#[derive(Debug, Default, Deserialize)]
struct TwilioError {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    #[serde(default)]
    sid: Option<String>,
}

/// SMS through the Twilio Messages REST endpoint.
#[derive(Clone)]
pub struct TwilioSms {
    client: Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from: String,
}

impl TwilioSms {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: TWILIO_API_BASE.to_string(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from: from.into(),
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }
}

pub fn clamp_body(message: &str) -> String {
    if message.chars().count() <= MAX_BODY_CHARS {
        return message.to_string();
    }
    let mut out: String = message.chars().take(MAX_BODY_CHARS - 1).collect();
    out.push('…');
    out
}

fn classify_failure(status: StatusCode, body: &str) -> DeliveryError {
    let err: TwilioError = serde_json::from_str(body).unwrap_or_default();
    let detail = match (err.code, err.message) {
        (Some(code), Some(msg)) => format!("{msg} (code {code})"),
        (None, Some(msg)) => msg,
        _ => body.chars().take(200).collect(),
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DeliveryError::Auth(detail),
        StatusCode::BAD_REQUEST
            if err
                .code
                .is_some_and(|c| RECIPIENT_ERROR_CODES.contains(&c)) =>
        {
            DeliveryError::InvalidRecipient(detail)
        }
        other => DeliveryError::Rejected {
            status: other.as_u16(),
            detail,
        },
    }
}

#[async_trait::async_trait]
impl Notifier for TwilioSms {
    fn name(&self) -> &'static str {
        "twilio-sms"
    }

    async fn send(&self, message: &str, recipient: &str) -> Result<(), DeliveryError> {
        let body = clamp_body(message);
        let rsp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", recipient),
                ("From", self.from.as_str()),
                ("Body", body.as_str()),
            ])
            .send()
            .await
            .map_err(|e| DeliveryError::Unreachable(e.to_string()))?;

        let status = rsp.status();
        let text = rsp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }

        let sid = serde_json::from_str::<TwilioMessage>(&text)
            .ok()
            .and_then(|m| m.sid)
            .unwrap_or_default();
        tracing::info!(target: "notify", %sid, "SMS sent");
        Ok(())
    }
}
