//! Guichê Core - ticket lifecycle engine.
//!
//! This crate owns how service tickets ("senhas") move through states:
//! atomic issuance under daily capacity, schedule-driven admission,
//! priority-ordered call dispatch with counter rotation, trades between
//! waiting users, geofenced presence validation, throttled notification
//! sweeps, and the fan-out channel that keeps queue viewers synchronized.
//!
//! Entity storage, prediction models, rendering and delivery transports
//! are external collaborators reached through the traits in `directory`,
//! `estimator` and `notifications`.

pub mod constants;
pub mod directory;
pub mod dispatch;
pub mod errors;
pub mod estimator;
pub mod fanout;
pub mod notifications;
pub mod presence;
pub mod schedules;
pub mod sweeps;
pub mod tickets;
pub mod trades;
pub mod utils;

// Re-export the types most callers touch.
pub use directory::{Branch, GeoPoint, Queue, Schedule};
pub use errors::{Error, Result};
pub use fanout::{EventBus, TicketEvent, Topic};
pub use tickets::{Ticket, TicketStatus};
