// src/notify/mod.rs
pub mod format;
pub mod sms;

use std::sync::Arc;

use crate::error::DeliveryError;
use crate::ingest::types::{MonitoredItem, SourceKind};

/// Delivery channel: one message to one recipient.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, message: &str, recipient: &str) -> Result<(), DeliveryError>;
}

/// Fallback channel when no SMS gateway is configured: alerts only reach the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChannel;

#[async_trait::async_trait]
impl Notifier for LogChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &str, recipient: &str) -> Result<(), DeliveryError> {
        tracing::info!(target: "notify", recipient, "{message}");
        Ok(())
    }
}

/// Newly detected items of one source, built right before dispatch.
#[derive(Debug, Clone)]
pub struct NotificationBatch {
    source: SourceKind,
    items: Vec<MonitoredItem>,
}

impl NotificationBatch {
    /// `None` for an empty item list; there is nothing to announce.
    pub fn new(source: SourceKind, items: Vec<MonitoredItem>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self { source, items })
        }
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn items(&self) -> &[MonitoredItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Formats alerts and hands them to the configured channel.
pub struct AlertDispatcher {
    channel: Arc<dyn Notifier>,
    recipient: String,
    max_items: Option<usize>,
}

impl AlertDispatcher {
    pub fn new(channel: Arc<dyn Notifier>, recipient: impl Into<String>) -> Self {
        Self {
            channel,
            recipient: recipient.into(),
            max_items: None,
        }
    }

    /// Cap the number of items listed in one message.
    pub fn with_max_items(mut self, max_items: Option<usize>) -> Self {
        self.max_items = max_items.filter(|n| *n > 0);
        self
    }

    pub fn channel_name(&self) -> &'static str {
        self.channel.name()
    }

    /// One message for the whole batch, never one per item.
    pub async fn notify(&self, batch: &NotificationBatch) -> Result<(), DeliveryError> {
        let message = format::render_batch(batch, self.max_items);
        self.dispatch(&message).await
    }

    pub async fn notify_startup(&self, sources: &[SourceKind]) -> Result<(), DeliveryError> {
        self.dispatch(&format::render_startup(sources)).await
    }

    pub async fn notify_cleared(&self, source: SourceKind) -> Result<(), DeliveryError> {
        self.dispatch(&format::render_cleared(source)).await
    }

    pub async fn notify_shutdown(&self) -> Result<(), DeliveryError> {
        self.dispatch(format::SHUTDOWN_MESSAGE).await
    }

    async fn dispatch(&self, message: &str) -> Result<(), DeliveryError> {
        self.channel.send(message, &self.recipient).await?;
        tracing::debug!(channel = self.channel.name(), chars = message.chars().count(), "alert delivered");
        Ok(())
    }
}
