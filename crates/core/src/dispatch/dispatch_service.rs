//! Call dispatch: selects the next ticket and summons it to a counter.

use std::sync::Arc;

use chrono::Utc;

use crate::constants::CALL_TIMEOUT_MINUTES;
use crate::directory::DirectoryTrait;
use crate::errors::{Result, TicketError, ValidationError};
use crate::notifications::NotificationGatewayTrait;
use crate::schedules::ScheduleService;
use crate::tickets::{Ticket, TicketLedgerService};
use log::warn;

pub struct CallDispatcherService {
    directory: Arc<dyn DirectoryTrait>,
    schedules: Arc<ScheduleService>,
    ledger: Arc<TicketLedgerService>,
    gateway: Arc<dyn NotificationGatewayTrait>,
}

impl CallDispatcherService {
    pub fn new(
        directory: Arc<dyn DirectoryTrait>,
        schedules: Arc<ScheduleService>,
        ledger: Arc<TicketLedgerService>,
        gateway: Arc<dyn NotificationGatewayTrait>,
    ) -> Self {
        CallDispatcherService {
            directory,
            schedules,
            ledger,
            gateway,
        }
    }

    /// Calls the next ticket of the queue with the default expiry window.
    ///
    /// `Ok(None)` means no ticket is pending. Selection picks the highest
    /// priority, ties broken by lowest number; the counter rotates
    /// round-robin over `[1, num_counters]`. Selection and mutation run as
    /// one critical section in the ledger, so two operators calling
    /// concurrently can never dispatch the same ticket.
    pub async fn call_next(&self, queue_id: &str) -> Result<Option<Ticket>> {
        self.call_next_with_timeout(queue_id, CALL_TIMEOUT_MINUTES)
            .await
    }

    /// `call_next` with an explicit expiry window, for queues whose
    /// operators configure a different grace period.
    pub async fn call_next_with_timeout(
        &self,
        queue_id: &str,
        timeout_minutes: i64,
    ) -> Result<Option<Ticket>> {
        if queue_id.is_empty() {
            return Err(ValidationError::MissingField("queueId".to_string()).into());
        }
        let queue = self.directory.get_queue(queue_id)?;
        let now = Utc::now();
        if !self.schedules.is_open(queue_id, now)? {
            return Err(TicketError::QueueClosed.into());
        }

        let called = self.ledger.dispatch_next(&queue, timeout_minutes, now)?;

        // Owner notification is best-effort and happens outside the
        // ledger lock; physical tickets have nobody to notify.
        if let Some(ticket) = &called {
            if let Some(owner) = &ticket.user_id {
                let message = format!(
                    "Ticket {} called to counter {}.",
                    ticket.label(queue.prefix),
                    ticket.counter.unwrap_or(0)
                );
                if let Err(err) = self.gateway.send(owner, &message, Some(&ticket.id)).await {
                    warn!("call notification to {owner} failed: {err}");
                }
            }
        }
        Ok(called)
    }
}
