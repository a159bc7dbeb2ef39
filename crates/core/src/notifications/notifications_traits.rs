//! Notification gateway trait and implementations.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::errors::Result;

/// Trait for delivering user-facing messages (push, SMS, whatever the
/// transport layer provides).
///
/// # Design Rules
///
/// - Delivery is fire-and-forget: the engine never waits on receipts and
///   a failed send must not fail or roll back the mutation that
///   triggered it.
/// - Implementations must be cheap to call; queue internally if the
///   transport is slow.
#[async_trait]
pub trait NotificationGatewayTrait: Send + Sync {
    async fn send(&self, recipient_id: &str, message: &str, ticket_id: Option<&str>)
        -> Result<()>;
}

/// No-op gateway for tests or headless deployments.
#[derive(Clone, Default)]
pub struct NoOpNotificationGateway;

#[async_trait]
impl NotificationGatewayTrait for NoOpNotificationGateway {
    async fn send(
        &self,
        _recipient_id: &str,
        _message: &str,
        _ticket_id: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }
}

/// A sent message captured by the mock gateway.
#[derive(Clone, Debug)]
pub struct SentMessage {
    pub recipient_id: String,
    pub message: String,
    pub ticket_id: Option<String>,
}

/// Mock gateway for testing - collects sent messages.
#[derive(Clone, Default)]
pub struct MockNotificationGateway {
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl MockNotificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured messages.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Messages addressed to one recipient.
    pub fn sent_to(&self, recipient_id: &str) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.recipient_id == recipient_id)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl NotificationGatewayTrait for MockNotificationGateway {
    async fn send(
        &self,
        recipient_id: &str,
        message: &str,
        ticket_id: Option<&str>,
    ) -> Result<()> {
        self.sent.lock().unwrap().push(SentMessage {
            recipient_id: recipient_id.to_string(),
            message: message.to_string(),
            ticket_id: ticket_id.map(str::to_string),
        });
        Ok(())
    }
}
