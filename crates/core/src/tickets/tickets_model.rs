//! Ticket entity and the snapshot types read out of the ledger.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle states of a ticket.
///
/// Legal edges: Pending→Called→{Served, Cancelled} and Pending→Cancelled.
/// Served and Cancelled are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TicketStatus {
    Pending,
    Called,
    Served,
    Cancelled,
}

/// Why a ticket ended up Cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The holder gave the ticket up while still Pending.
    OwnerRequest,
    /// The call-expiry deadline passed before presence was validated.
    CallExpired,
    /// The queue's schedule closed while the ticket was still Pending.
    QueueClosed,
    /// The ticket was left over from a previous service day.
    DayRollover,
}

/// A numbered, stateful admission slot within a queue.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub queue_id: String,
    /// Strictly increasing per queue within a service day.
    pub ticket_number: u32,
    /// Unique token rendered as a QR code by the excluded delivery layer.
    pub qr_code: String,
    pub status: TicketStatus,
    /// Higher values are dispatched first.
    pub priority: i32,
    /// Counter assigned on call.
    pub counter: Option<u32>,
    /// `None` for physical (anonymous kiosk) tickets.
    pub user_id: Option<String>,
    pub is_physical: bool,
    pub trade_available: bool,
    pub issued_at: DateTime<Utc>,
    /// Call-expiry deadline, set when the ticket is called.
    pub expires_at: Option<DateTime<Utc>>,
    pub attended_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub(crate) fn issue(
        queue_id: &str,
        ticket_number: u32,
        user_id: Option<String>,
        priority: i32,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let is_physical = user_id.is_none();
        Ticket {
            id: Uuid::new_v4().to_string(),
            queue_id: queue_id.to_string(),
            ticket_number,
            qr_code: Uuid::new_v4().simple().to_string(),
            status: TicketStatus::Pending,
            priority,
            counter: None,
            user_id,
            is_physical,
            trade_available: false,
            issued_at,
            expires_at: None,
            attended_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TicketStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TicketStatus::Served | TicketStatus::Cancelled)
    }

    pub fn owned_by(&self, requester_id: &str) -> bool {
        self.user_id.as_deref() == Some(requester_id)
    }

    /// Display label, e.g. "A042".
    pub fn label(&self, prefix: char) -> String {
        format!("{prefix}{:03}", self.ticket_number)
    }
}

/// A Pending ticket plus its priority-adjusted position: how many tickets
/// would be dispatched before it, plus one.
#[derive(Clone, Debug)]
pub struct PendingTicket {
    pub ticket: Ticket,
    pub position: u32,
}

/// Point-in-time counters of one queue's ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub queue_id: String,
    pub service_day: NaiveDate,
    /// Highest ticket number issued today.
    pub last_number: u32,
    /// Count of Pending tickets.
    pub active_tickets: u32,
    /// Round-robin cursor of counter assignment.
    pub last_counter: u32,
    /// Highest ticket number reached by a call today.
    pub current_ticket: u32,
    pub avg_service_minutes: Option<f64>,
    pub last_service_minutes: Option<f64>,
}

/// Result of one queue's close/expire sweep pass.
#[derive(Debug, Default)]
pub struct QueueSweep {
    /// Called tickets whose expiry deadline passed, now Cancelled.
    pub expired: Vec<Ticket>,
    /// Pending tickets cancelled because the queue closed or the service
    /// day rolled over.
    pub closed: Vec<Ticket>,
    /// Tickets still Pending after the pass, with positions.
    pub pending: Vec<PendingTicket>,
    /// Counters snapshot taken in the same critical section.
    pub stats: Option<QueueStats>,
}
