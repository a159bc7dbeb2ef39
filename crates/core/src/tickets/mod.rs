//! Ticket ledger: numbering, status transitions, per-queue counters.

mod tickets_model;
mod tickets_service;
mod tickets_store;
mod tickets_traits;

pub use tickets_model::{CancelReason, PendingTicket, QueueStats, QueueSweep, Ticket, TicketStatus};
pub use tickets_service::TicketLedgerService;
pub use tickets_store::TicketStore;
pub use tickets_traits::TicketLedgerTrait;
