//! Fan-out channel: publishes every committed state change to the queue
//! room and the institution dashboard room.

mod fanout_model;
mod fanout_service;

pub use fanout_model::{TicketEvent, Topic};
pub use fanout_service::EventBus;
