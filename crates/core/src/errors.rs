//! Core error types for the Guichê ticket engine.
//!
//! This module defines storage-agnostic error types. Collaborator-specific
//! failures (estimator transport, notification delivery, directory backends)
//! are converted to these types at the trait boundary.

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the ticket engine.
///
/// Precondition failures carry a specific, actionable variant and are never
/// retried automatically. Invariant breaches surface as `Unexpected` and
/// abort the operation instead of being silently corrected.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ticket operation failed: {0}")]
    Ticket(#[from] TicketError),

    #[error("Directory lookup failed: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Bad input shape, rejected before any state is touched.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),
}

/// Precondition failures of ticket lifecycle operations.
#[derive(Error, Debug)]
pub enum TicketError {
    /// The queue does not admit tickets at this time.
    #[error("queue is closed")]
    QueueClosed,

    /// The queue reached its daily capacity. Carries up to three
    /// alternative queue suggestions when the clustering collaborator
    /// can provide them.
    #[error("queue is at daily capacity")]
    QueueFull { alternatives: Vec<String> },

    /// The requester already holds a pending ticket in this queue.
    #[error("requester already holds a pending ticket in this queue")]
    DuplicateActiveTicket,

    /// The ticket belongs to somebody else.
    #[error("ticket is not owned by the requester")]
    NotOwner,

    /// The ticket is not in a state that allows the requested transition.
    #[error("ticket state does not allow this operation")]
    InvalidState,

    /// The target ticket was never offered for trade.
    #[error("ticket is not offered for trade")]
    NotTradeable,

    /// Trade partners must wait in the same queue.
    #[error("tickets belong to different queues")]
    QueueMismatch,

    /// The requester is outside the branch proximity radius.
    #[error("requester is {distance_km:.2} km away from the branch")]
    TooFar { distance_km: f64 },

    #[error("ticket not found")]
    NotFound,
}

/// Read-only directory lookups that came back empty.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("queue '{0}' not found")]
    QueueNotFound(String),

    #[error("branch '{0}' not found")]
    BranchNotFound(String),
}

impl Error {
    /// True for failures of external collaborators that callers should
    /// degrade around rather than propagate.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Unavailable(_))
    }
}
