//! The ticket ledger: the only component allowed to mutate ticket status.
//!
//! Every mutating operation runs as one short critical section under the
//! owning queue's mutex. Fan-out publication happens inside the section
//! (non-blocking, preserves commit order per topic); collaborator I/O such
//! as clustering lookups happens strictly outside it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::warn;

use super::tickets_model::{CancelReason, QueueStats, QueueSweep, Ticket};
use super::tickets_store::{QueueLedger, TicketStore};
use super::tickets_traits::TicketLedgerTrait;
use crate::constants::ALTERNATIVE_SUGGESTION_LIMIT;
use crate::directory::{DirectoryTrait, Queue};
use crate::errors::{Error, Result, TicketError, ValidationError};
use crate::estimator::ClusteringTrait;
use crate::fanout::{EventBus, TicketEvent};
use crate::schedules::ScheduleService;
use async_trait::async_trait;

pub struct TicketLedgerService {
    directory: Arc<dyn DirectoryTrait>,
    schedules: Arc<ScheduleService>,
    clustering: Arc<dyn ClusteringTrait>,
    store: Arc<TicketStore>,
    bus: Arc<EventBus>,
}

impl TicketLedgerService {
    pub fn new(
        directory: Arc<dyn DirectoryTrait>,
        schedules: Arc<ScheduleService>,
        clustering: Arc<dyn ClusteringTrait>,
        store: Arc<TicketStore>,
        bus: Arc<EventBus>,
    ) -> Self {
        TicketLedgerService {
            directory,
            schedules,
            clustering,
            store,
            bus,
        }
    }

    /// Retires a stale service day before any mutation, emitting rollover
    /// cancellations and pruning the ticket index.
    fn retire_stale_day(&self, ledger: &mut QueueLedger, now: DateTime<Utc>) {
        let (cancelled, retired) = ledger.roll_over(now.date_naive());
        if retired.is_empty() {
            return;
        }
        let institution_id = ledger.queue().institution_id.clone();
        for ticket in &cancelled {
            self.bus.publish(&TicketEvent::cancelled(
                &institution_id,
                ticket,
                CancelReason::DayRollover,
                now,
            ));
        }
        self.store.forget_tickets(&retired);
    }

    /// Queue id holding the ticket.
    pub(crate) fn locate(&self, ticket_id: &str) -> Result<String> {
        self.store
            .queue_of_ticket(ticket_id)
            .ok_or_else(|| TicketError::NotFound.into())
    }

    /// Dispatch edge, used by the call dispatcher only: selects the next
    /// pending ticket, rotates the counter and arms the expiry deadline.
    pub(crate) fn dispatch_next(
        &self,
        queue: &Queue,
        timeout_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>> {
        let ledger = self.store.ledger(queue);
        let mut guard = ledger.lock().unwrap();
        guard.refresh_config(queue);
        self.retire_stale_day(&mut guard, now);
        let called = guard.call_next(timeout_minutes, now)?;
        if let Some(ticket) = &called {
            self.bus
                .publish(&TicketEvent::called(&queue.institution_id, ticket, now));
        }
        Ok(called)
    }

    /// Service edge, used by presence validation only. Re-checks the
    /// Called status and the expiry deadline inside the critical section.
    pub(crate) fn serve(
        &self,
        queue: &Queue,
        ticket_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(Ticket, Option<f64>)> {
        let ledger = self.store.ledger(queue);
        let mut guard = ledger.lock().unwrap();
        let (ticket, service_minutes) = guard.serve(ticket_id, now)?;
        self.bus.publish(&TicketEvent::served(
            &queue.institution_id,
            &ticket,
            service_minutes,
            now,
        ));
        Ok((ticket, service_minutes))
    }

    /// Trade-offer edge. Returns the flagged ticket plus the other pending
    /// holders to notify (caller fans out after releasing the lock).
    pub(crate) fn offer_trade(
        &self,
        queue: &Queue,
        ticket_id: &str,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(Ticket, Vec<String>)> {
        let ledger = self.store.ledger(queue);
        let mut guard = ledger.lock().unwrap();
        let ticket = guard.offer_trade(ticket_id, owner_id)?;
        self.bus
            .publish(&TicketEvent::trade_offered(&queue.institution_id, &ticket, now));
        let peers = guard.other_pending_holders(ticket_id);
        Ok((ticket, peers))
    }

    /// Trade-acceptance edge: atomically swaps ownership of two pending
    /// tickets of the same queue.
    pub(crate) fn accept_trade(
        &self,
        queue: &Queue,
        ticket_id: &str,
        target_ticket_id: &str,
        requester_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(Ticket, Ticket)> {
        let ledger = self.store.ledger(queue);
        let mut guard = ledger.lock().unwrap();
        let (ticket, target) = guard.accept_trade(ticket_id, target_ticket_id, requester_id)?;
        self.bus.publish(&TicketEvent::trade_completed(
            &queue.institution_id,
            &ticket,
            &target,
            now,
        ));
        Ok((ticket, target))
    }

    /// Close/expire branch of the proactive sweep, one critical section
    /// per queue. Idempotent: a repeated run finds nothing left to do.
    pub(crate) fn sweep_queue(
        &self,
        queue: &Queue,
        open: bool,
        now: DateTime<Utc>,
    ) -> Result<QueueSweep> {
        let ledger = self.store.ledger(queue);
        let mut guard = ledger.lock().unwrap();
        guard.refresh_config(queue);
        self.retire_stale_day(&mut guard, now);

        let mut sweep = QueueSweep::default();
        for ticket in guard.expire_called(now) {
            self.bus.publish(&TicketEvent::cancelled(
                &queue.institution_id,
                &ticket,
                CancelReason::CallExpired,
                now,
            ));
            sweep.expired.push(ticket);
        }
        if !open {
            for ticket in guard.cancel_all_pending()? {
                self.bus.publish(&TicketEvent::cancelled(
                    &queue.institution_id,
                    &ticket,
                    CancelReason::QueueClosed,
                    now,
                ));
                sweep.closed.push(ticket);
            }
        }
        sweep.pending = guard.pending_snapshot();
        sweep.stats = Some(guard.stats());
        Ok(sweep)
    }
}

#[async_trait]
impl TicketLedgerTrait for TicketLedgerService {
    /// Issues the next numbered ticket of a queue.
    ///
    /// Number assignment and the `active_tickets` increment commit as one
    /// atomic unit under the queue mutex. A `QueueFull` rejection is
    /// enriched with alternative queue suggestions after the lock is
    /// released; clustering failures degrade to no suggestions.
    async fn issue(
        &self,
        queue_id: &str,
        requester_id: Option<String>,
        priority: i32,
    ) -> Result<Ticket> {
        if queue_id.is_empty() {
            return Err(ValidationError::MissingField("queueId".to_string()).into());
        }
        if matches!(requester_id.as_deref(), Some("")) {
            return Err(
                ValidationError::InvalidInput("requester id must not be empty".to_string()).into(),
            );
        }

        let queue = self.directory.get_queue(queue_id)?;
        let now = Utc::now();
        if !self.schedules.is_open(queue_id, now)? {
            return Err(TicketError::QueueClosed.into());
        }

        let ledger = self.store.ledger(&queue);
        let issued = {
            let mut guard = ledger.lock().unwrap();
            guard.refresh_config(&queue);
            self.retire_stale_day(&mut guard, now);
            match guard.issue(requester_id, priority, now) {
                Ok(ticket) => {
                    self.bus
                        .publish(&TicketEvent::issued(&queue.institution_id, &ticket));
                    Ok(ticket)
                }
                Err(err) => Err(err),
            }
        };

        match issued {
            Ok(ticket) => {
                self.store.index_ticket(&ticket);
                Ok(ticket)
            }
            Err(Error::Ticket(TicketError::QueueFull { .. })) => {
                let alternatives = match self
                    .clustering
                    .alternatives(queue_id, ALTERNATIVE_SUGGESTION_LIMIT)
                    .await
                {
                    Ok(queues) => queues,
                    Err(err) => {
                        warn!("clustering unavailable for queue {queue_id}: {err}");
                        Vec::new()
                    }
                };
                Err(TicketError::QueueFull { alternatives }.into())
            }
            Err(err) => Err(err),
        }
    }

    /// Owner-requested cancellation of a Pending ticket.
    fn cancel(&self, ticket_id: &str, requester_id: &str) -> Result<Ticket> {
        if requester_id.is_empty() {
            return Err(ValidationError::MissingField("requesterId".to_string()).into());
        }
        let queue_id = self.locate(ticket_id)?;
        let ledger = self
            .store
            .existing_ledger(&queue_id)
            .ok_or(TicketError::NotFound)?;
        let now = Utc::now();
        let mut guard = ledger.lock().unwrap();
        let ticket = guard.cancel_by_owner(ticket_id, requester_id)?;
        let institution_id = guard.queue().institution_id.clone();
        self.bus.publish(&TicketEvent::cancelled(
            &institution_id,
            &ticket,
            CancelReason::OwnerRequest,
            now,
        ));
        Ok(ticket)
    }

    fn get_ticket(&self, ticket_id: &str) -> Result<Ticket> {
        self.store
            .get_ticket(ticket_id)
            .ok_or_else(|| TicketError::NotFound.into())
    }

    fn queue_stats(&self, queue_id: &str) -> Result<QueueStats> {
        let queue = self.directory.get_queue(queue_id)?;
        let ledger = self.store.ledger(&queue);
        let guard = ledger.lock().unwrap();
        Ok(guard.stats())
    }
}
