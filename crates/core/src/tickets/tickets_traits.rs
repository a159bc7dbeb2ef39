use async_trait::async_trait;

use super::tickets_model::{QueueStats, Ticket};
use crate::errors::Result;

/// Trait for ticket ledger operations exposed to the request layer.
///
/// Internal lifecycle edges (call, serve, expire) are not part of this
/// trait; the dispatcher, presence validator and sweep reach them through
/// crate-internal methods so no caller can write ticket status directly.
#[async_trait]
pub trait TicketLedgerTrait: Send + Sync {
    /// Issues the next ticket of the queue. `requester_id = None` issues a
    /// physical (anonymous) ticket, which skips the duplicate-holder rule.
    async fn issue(
        &self,
        queue_id: &str,
        requester_id: Option<String>,
        priority: i32,
    ) -> Result<Ticket>;

    /// Owner-requested cancellation; only Pending tickets qualify.
    fn cancel(&self, ticket_id: &str, requester_id: &str) -> Result<Ticket>;

    fn get_ticket(&self, ticket_id: &str) -> Result<Ticket>;

    fn queue_stats(&self, queue_id: &str) -> Result<QueueStats>;
}
