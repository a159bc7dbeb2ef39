//! Trade broker: voluntary ticket exchange between two waiting users.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use log::warn;

use crate::constants::TRADE_FANOUT_LIMIT;
use crate::directory::DirectoryTrait;
use crate::errors::{Result, TicketError, ValidationError};
use crate::notifications::NotificationGatewayTrait;
use crate::tickets::{Ticket, TicketLedgerService};

pub struct TradeService {
    directory: Arc<dyn DirectoryTrait>,
    ledger: Arc<TicketLedgerService>,
    gateway: Arc<dyn NotificationGatewayTrait>,
}

impl TradeService {
    pub fn new(
        directory: Arc<dyn DirectoryTrait>,
        ledger: Arc<TicketLedgerService>,
        gateway: Arc<dyn NotificationGatewayTrait>,
    ) -> Self {
        TradeService {
            directory,
            ledger,
            gateway,
        }
    }

    /// Puts a Pending ticket up for trade and tells up to five other
    /// waiting holders in the same queue about it.
    pub async fn offer(&self, ticket_id: &str, owner_id: &str) -> Result<Ticket> {
        if owner_id.is_empty() {
            return Err(ValidationError::MissingField("ownerId".to_string()).into());
        }
        let queue_id = self.ledger.locate(ticket_id)?;
        let queue = self.directory.get_queue(&queue_id)?;
        let now = Utc::now();

        let (ticket, peers) = self.ledger.offer_trade(&queue, ticket_id, owner_id, now)?;

        let message = format!(
            "Ticket {} in '{}' is up for trade.",
            ticket.label(queue.prefix),
            queue.service
        );
        let sends = peers
            .iter()
            .take(TRADE_FANOUT_LIMIT)
            .map(|peer| self.gateway.send(peer, &message, Some(&ticket.id)));
        for (peer, outcome) in peers.iter().zip(join_all(sends).await) {
            if let Err(err) = outcome {
                warn!("trade-offer notification to {peer} failed: {err}");
            }
        }
        Ok(ticket)
    }

    /// Accepts an offered ticket, swapping ownership with the requester's
    /// own Pending ticket in the same queue.
    pub fn accept(
        &self,
        ticket_id: &str,
        target_ticket_id: &str,
        requester_id: &str,
    ) -> Result<(Ticket, Ticket)> {
        if requester_id.is_empty() {
            return Err(ValidationError::MissingField("requesterId".to_string()).into());
        }
        if ticket_id == target_ticket_id {
            return Err(
                ValidationError::InvalidInput("cannot trade a ticket with itself".to_string())
                    .into(),
            );
        }
        let queue_id = self.ledger.locate(ticket_id)?;
        let target_queue_id = self.ledger.locate(target_ticket_id)?;
        if queue_id != target_queue_id {
            return Err(TicketError::QueueMismatch.into());
        }
        let queue = self.directory.get_queue(&queue_id)?;
        let now = Utc::now();
        self.ledger
            .accept_trade(&queue, ticket_id, target_ticket_id, requester_id, now)
    }
}
