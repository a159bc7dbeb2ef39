//! Fan-out topics and the structured events published on them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tickets::{CancelReason, Ticket, TicketStatus};

/// Addressable event streams: one per queue (waiting-room viewers) and
/// one per institution (dashboard viewers).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    Queue(String),
    Institution(String),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Queue(id) => write!(f, "queue:{id}"),
            Topic::Institution(id) => write!(f, "institution:{id}"),
        }
    }
}

/// State-change facts emitted after every committed ticket mutation.
///
/// Delivery is at-least-once with FIFO order per topic matching commit
/// order; there is no ordering guarantee across topics.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TicketEvent {
    Issued {
        ticket_id: String,
        queue_id: String,
        institution_id: String,
        ticket_number: u32,
        priority: i32,
        occurred_at: DateTime<Utc>,
    },
    Called {
        ticket_id: String,
        queue_id: String,
        institution_id: String,
        ticket_number: u32,
        counter: u32,
        expires_at: Option<DateTime<Utc>>,
        occurred_at: DateTime<Utc>,
    },
    Served {
        ticket_id: String,
        queue_id: String,
        institution_id: String,
        ticket_number: u32,
        service_minutes: Option<f64>,
        occurred_at: DateTime<Utc>,
    },
    Cancelled {
        ticket_id: String,
        queue_id: String,
        institution_id: String,
        ticket_number: u32,
        reason: CancelReason,
        occurred_at: DateTime<Utc>,
    },
    TradeOffered {
        ticket_id: String,
        queue_id: String,
        institution_id: String,
        ticket_number: u32,
        occurred_at: DateTime<Utc>,
    },
    TradeCompleted {
        ticket_id: String,
        target_ticket_id: String,
        queue_id: String,
        institution_id: String,
        occurred_at: DateTime<Utc>,
    },
}

impl TicketEvent {
    pub fn issued(institution_id: &str, ticket: &Ticket) -> Self {
        TicketEvent::Issued {
            ticket_id: ticket.id.clone(),
            queue_id: ticket.queue_id.clone(),
            institution_id: institution_id.to_string(),
            ticket_number: ticket.ticket_number,
            priority: ticket.priority,
            occurred_at: ticket.issued_at,
        }
    }

    pub fn called(institution_id: &str, ticket: &Ticket, occurred_at: DateTime<Utc>) -> Self {
        debug_assert_eq!(ticket.status, TicketStatus::Called);
        TicketEvent::Called {
            ticket_id: ticket.id.clone(),
            queue_id: ticket.queue_id.clone(),
            institution_id: institution_id.to_string(),
            ticket_number: ticket.ticket_number,
            counter: ticket.counter.unwrap_or(0),
            expires_at: ticket.expires_at,
            occurred_at,
        }
    }

    pub fn served(
        institution_id: &str,
        ticket: &Ticket,
        service_minutes: Option<f64>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        TicketEvent::Served {
            ticket_id: ticket.id.clone(),
            queue_id: ticket.queue_id.clone(),
            institution_id: institution_id.to_string(),
            ticket_number: ticket.ticket_number,
            service_minutes,
            occurred_at,
        }
    }

    pub fn cancelled(
        institution_id: &str,
        ticket: &Ticket,
        reason: CancelReason,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        TicketEvent::Cancelled {
            ticket_id: ticket.id.clone(),
            queue_id: ticket.queue_id.clone(),
            institution_id: institution_id.to_string(),
            ticket_number: ticket.ticket_number,
            reason,
            occurred_at,
        }
    }

    pub fn trade_offered(institution_id: &str, ticket: &Ticket, occurred_at: DateTime<Utc>) -> Self {
        TicketEvent::TradeOffered {
            ticket_id: ticket.id.clone(),
            queue_id: ticket.queue_id.clone(),
            institution_id: institution_id.to_string(),
            ticket_number: ticket.ticket_number,
            occurred_at,
        }
    }

    pub fn trade_completed(
        institution_id: &str,
        ticket: &Ticket,
        target: &Ticket,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        TicketEvent::TradeCompleted {
            ticket_id: ticket.id.clone(),
            target_ticket_id: target.id.clone(),
            queue_id: ticket.queue_id.clone(),
            institution_id: institution_id.to_string(),
            occurred_at,
        }
    }

    pub fn queue_id(&self) -> &str {
        match self {
            TicketEvent::Issued { queue_id, .. }
            | TicketEvent::Called { queue_id, .. }
            | TicketEvent::Served { queue_id, .. }
            | TicketEvent::Cancelled { queue_id, .. }
            | TicketEvent::TradeOffered { queue_id, .. }
            | TicketEvent::TradeCompleted { queue_id, .. } => queue_id,
        }
    }

    pub fn institution_id(&self) -> &str {
        match self {
            TicketEvent::Issued { institution_id, .. }
            | TicketEvent::Called { institution_id, .. }
            | TicketEvent::Served { institution_id, .. }
            | TicketEvent::Cancelled { institution_id, .. }
            | TicketEvent::TradeOffered { institution_id, .. }
            | TicketEvent::TradeCompleted { institution_id, .. } => institution_id,
        }
    }

    /// Topics this event fans out to.
    pub fn topics(&self) -> [Topic; 2] {
        [
            Topic::Queue(self.queue_id().to_string()),
            Topic::Institution(self.institution_id().to_string()),
        ]
    }
}
