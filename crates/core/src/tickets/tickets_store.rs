//! In-memory ticket ledger state.
//!
//! `QueueLedger` holds one queue's counters and ticket set for the current
//! service day. All access goes through the per-queue mutex owned by
//! `TicketStore`; ledger methods assume the caller already holds it and
//! never perform I/O.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;

use super::tickets_model::{PendingTicket, QueueStats, Ticket, TicketStatus};
use crate::directory::Queue;
use crate::errors::{Error, Result, TicketError};

/// Mutable per-queue state: numbering, counters, and the day's tickets.
pub struct QueueLedger {
    queue: Queue,
    service_day: NaiveDate,
    last_number: u32,
    active_tickets: u32,
    last_counter: u32,
    current_ticket: u32,
    measured_services: u32,
    avg_service_minutes: Option<f64>,
    last_service_minutes: Option<f64>,
    last_attended_at: Option<DateTime<Utc>>,
    tickets: BTreeMap<u32, Ticket>,
}

impl QueueLedger {
    pub(crate) fn new(queue: Queue, service_day: NaiveDate) -> Self {
        let avg_service_minutes = queue.avg_service_minutes;
        QueueLedger {
            queue,
            service_day,
            last_number: 0,
            active_tickets: 0,
            last_counter: 0,
            current_ticket: 0,
            measured_services: 0,
            avg_service_minutes,
            last_service_minutes: None,
            last_attended_at: None,
            tickets: BTreeMap::new(),
        }
    }

    pub(crate) fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Adopts the latest directory configuration (limits, counters can be
    /// edited by the admin layer during the day).
    pub(crate) fn refresh_config(&mut self, queue: &Queue) {
        self.queue = queue.clone();
    }

    /// Retires the previous service day if `today` moved past it.
    ///
    /// Leftover non-terminal tickets are cancelled and returned; numbering
    /// and the call cursor restart from zero, the counter rotation cursor
    /// is kept. The second element lists every retired ticket id so the
    /// store can prune its index.
    pub(crate) fn roll_over(&mut self, today: NaiveDate) -> (Vec<Ticket>, Vec<String>) {
        if today == self.service_day {
            return (Vec::new(), Vec::new());
        }
        let mut cancelled = Vec::new();
        let mut retired_ids = Vec::new();
        for (_, mut ticket) in std::mem::take(&mut self.tickets) {
            retired_ids.push(ticket.id.clone());
            if !ticket.is_terminal() {
                ticket.status = TicketStatus::Cancelled;
                cancelled.push(ticket);
            }
        }
        self.service_day = today;
        self.last_number = 0;
        self.active_tickets = 0;
        self.current_ticket = 0;
        self.last_attended_at = None;
        (cancelled, retired_ids)
    }

    /// Reserves the next ticket number and registers the ticket.
    ///
    /// Number assignment and the `active_tickets` increment happen in this
    /// single call, under the queue mutex, so concurrent issuers can never
    /// observe the same number or double-count.
    pub(crate) fn issue(
        &mut self,
        user_id: Option<String>,
        priority: i32,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        if let Some(requester) = user_id.as_deref() {
            let duplicate = self
                .tickets
                .values()
                .any(|t| t.is_pending() && t.owned_by(requester));
            if duplicate {
                return Err(TicketError::DuplicateActiveTicket.into());
            }
        }
        if self.active_tickets >= self.queue.daily_limit {
            return Err(TicketError::QueueFull {
                alternatives: Vec::new(),
            }
            .into());
        }

        let number = self.last_number + 1;
        if self.tickets.contains_key(&number) {
            return Err(Error::Unexpected(format!(
                "ticket number collision on queue '{}': {number}",
                self.queue.id
            )));
        }

        let ticket = Ticket::issue(&self.queue.id, number, user_id, priority, now);
        self.last_number = number;
        self.active_tickets += 1;
        self.tickets.insert(number, ticket.clone());
        Ok(ticket)
    }

    pub(crate) fn find(&self, ticket_id: &str) -> Option<&Ticket> {
        self.tickets.values().find(|t| t.id == ticket_id)
    }

    fn find_mut(&mut self, ticket_id: &str) -> Option<&mut Ticket> {
        self.tickets.values_mut().find(|t| t.id == ticket_id)
    }

    /// Owner-requested cancellation; only Pending tickets can be given up.
    pub(crate) fn cancel_by_owner(
        &mut self,
        ticket_id: &str,
        requester_id: &str,
    ) -> Result<Ticket> {
        let ticket = self
            .find(ticket_id)
            .ok_or(TicketError::NotFound)?;
        if !ticket.owned_by(requester_id) {
            return Err(TicketError::NotOwner.into());
        }
        if !ticket.is_pending() {
            return Err(TicketError::InvalidState.into());
        }
        self.decrement_active()?;
        let ticket = self
            .find_mut(ticket_id)
            .ok_or(TicketError::NotFound)?;
        ticket.status = TicketStatus::Cancelled;
        ticket.trade_available = false;
        Ok(ticket.clone())
    }

    /// Dispatch order: highest priority first, then lowest number.
    fn next_pending_number(&self) -> Option<u32> {
        self.tickets
            .values()
            .filter(|t| t.is_pending())
            .fold(None::<&Ticket>, |best, t| match best {
                Some(b) if b.priority >= t.priority => Some(b),
                _ => Some(t),
            })
            .map(|t| t.ticket_number)
    }

    /// Selects and calls the next ticket, rotating the counter cursor.
    pub(crate) fn call_next(
        &mut self,
        timeout_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>> {
        let Some(number) = self.next_pending_number() else {
            return Ok(None);
        };
        let counters = self.queue.num_counters.max(1);
        let counter = (self.last_counter % counters) + 1;

        self.decrement_active()?;
        self.last_counter = counter;
        self.current_ticket = self.current_ticket.max(number);

        let ticket = self
            .tickets
            .get_mut(&number)
            .ok_or_else(|| Error::Unexpected("selected ticket vanished from ledger".to_string()))?;
        ticket.status = TicketStatus::Called;
        ticket.counter = Some(counter);
        ticket.trade_available = false;
        ticket.expires_at = Some(now + Duration::minutes(timeout_minutes));
        Ok(Some(ticket.clone()))
    }

    /// Marks a called ticket served and feeds the service-time average.
    ///
    /// Re-checks status and deadline here, under the lock, so a late
    /// validation can never race the expiry sweep.
    pub(crate) fn serve(
        &mut self,
        ticket_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(Ticket, Option<f64>)> {
        let previous_attended = self.last_attended_at;
        let ticket = self
            .find_mut(ticket_id)
            .ok_or(TicketError::NotFound)?;
        if ticket.status != TicketStatus::Called {
            return Err(TicketError::InvalidState.into());
        }
        match ticket.expires_at {
            Some(deadline) if deadline > now => {}
            _ => return Err(TicketError::InvalidState.into()),
        }

        ticket.status = TicketStatus::Served;
        ticket.attended_at = Some(now);
        let served = ticket.clone();

        let service_minutes = previous_attended
            .map(|prev| (now - prev).num_milliseconds() as f64 / 60_000.0)
            .filter(|m| *m >= 0.0);
        if let Some(minutes) = service_minutes {
            self.measured_services += 1;
            self.last_service_minutes = Some(minutes);
            self.avg_service_minutes = Some(match self.avg_service_minutes {
                None => minutes,
                Some(avg) => avg + (minutes - avg) / self.measured_services as f64,
            });
        }
        self.last_attended_at = Some(now);
        Ok((served, service_minutes))
    }

    /// Cancels every Called ticket whose deadline passed. `active_tickets`
    /// is untouched: a Called ticket already left the Pending count when
    /// it was dispatched.
    pub(crate) fn expire_called(&mut self, now: DateTime<Utc>) -> Vec<Ticket> {
        let mut expired = Vec::new();
        for ticket in self.tickets.values_mut() {
            if ticket.status == TicketStatus::Called
                && ticket.expires_at.map(|d| d <= now).unwrap_or(false)
            {
                ticket.status = TicketStatus::Cancelled;
                expired.push(ticket.clone());
            }
        }
        expired
    }

    /// Cancels every Pending ticket (queue closed underneath them).
    pub(crate) fn cancel_all_pending(&mut self) -> Result<Vec<Ticket>> {
        let pending: Vec<u32> = self
            .tickets
            .values()
            .filter(|t| t.is_pending())
            .map(|t| t.ticket_number)
            .collect();
        let mut cancelled = Vec::new();
        for number in pending {
            self.decrement_active()?;
            let ticket = self
                .tickets
                .get_mut(&number)
                .ok_or_else(|| Error::Unexpected("pending ticket vanished from ledger".to_string()))?;
            ticket.status = TicketStatus::Cancelled;
            ticket.trade_available = false;
            cancelled.push(ticket.clone());
        }
        Ok(cancelled)
    }

    /// Flags a Pending ticket as up for trade.
    pub(crate) fn offer_trade(&mut self, ticket_id: &str, owner_id: &str) -> Result<Ticket> {
        let ticket = self
            .find(ticket_id)
            .ok_or(TicketError::NotFound)?;
        if !ticket.owned_by(owner_id) {
            return Err(TicketError::NotOwner.into());
        }
        if !ticket.is_pending() {
            return Err(TicketError::InvalidState.into());
        }
        if ticket.trade_available {
            return Err(TicketError::NotTradeable.into());
        }
        let ticket = self
            .find_mut(ticket_id)
            .ok_or(TicketError::NotFound)?;
        ticket.trade_available = true;
        Ok(ticket.clone())
    }

    /// Swaps ownership between the requester's ticket and an offered one.
    ///
    /// Both tickets live in this ledger (same queue by precondition), so
    /// the single queue mutex covers the whole exchange; the pair is
    /// mutated in ascending ticket-id order.
    pub(crate) fn accept_trade(
        &mut self,
        ticket_id: &str,
        target_ticket_id: &str,
        requester_id: &str,
    ) -> Result<(Ticket, Ticket)> {
        let ticket = self
            .find(ticket_id)
            .ok_or(TicketError::NotFound)?;
        let target = self
            .find(target_ticket_id)
            .ok_or(TicketError::NotFound)?;

        if !ticket.owned_by(requester_id) {
            return Err(TicketError::NotOwner.into());
        }
        if !target.trade_available {
            return Err(TicketError::NotTradeable.into());
        }
        if !ticket.is_pending() || !target.is_pending() {
            return Err(TicketError::InvalidState.into());
        }

        let ticket_user = ticket.user_id.clone();
        let target_user = target.user_id.clone();
        let mut pair = [
            (ticket.ticket_number, ticket.id.clone(), target_user),
            (target.ticket_number, target.id.clone(), ticket_user),
        ];
        pair.sort_by(|a, b| a.1.cmp(&b.1));
        for (number, _, new_user) in pair {
            let t = self
                .tickets
                .get_mut(&number)
                .ok_or_else(|| Error::Unexpected("trade ticket vanished from ledger".to_string()))?;
            t.user_id = new_user;
            t.trade_available = false;
        }

        let ticket = self.find(ticket_id).ok_or(TicketError::NotFound)?.clone();
        let target = self
            .find(target_ticket_id)
            .ok_or(TicketError::NotFound)?
            .clone();
        Ok((ticket, target))
    }

    /// User ids of other Pending holders, for trade-offer fan-out.
    pub(crate) fn other_pending_holders(&self, exclude_ticket_id: &str) -> Vec<String> {
        let mut holders: Vec<String> = Vec::new();
        for ticket in self.tickets.values() {
            if !ticket.is_pending() || ticket.id == exclude_ticket_id {
                continue;
            }
            if let Some(user) = &ticket.user_id {
                if !holders.contains(user) {
                    holders.push(user.clone());
                }
            }
        }
        holders
    }

    /// Pending tickets with their priority-adjusted positions.
    pub(crate) fn pending_snapshot(&self) -> Vec<PendingTicket> {
        let pending: Vec<&Ticket> = self.tickets.values().filter(|t| t.is_pending()).collect();
        pending
            .iter()
            .map(|t| {
                let ahead = pending
                    .iter()
                    .filter(|o| {
                        o.priority > t.priority
                            || (o.priority == t.priority && o.ticket_number < t.ticket_number)
                    })
                    .count() as u32;
                PendingTicket {
                    ticket: (*t).clone(),
                    position: ahead + 1,
                }
            })
            .collect()
    }

    pub(crate) fn stats(&self) -> QueueStats {
        QueueStats {
            queue_id: self.queue.id.clone(),
            service_day: self.service_day,
            last_number: self.last_number,
            active_tickets: self.active_tickets,
            last_counter: self.last_counter,
            current_ticket: self.current_ticket,
            avg_service_minutes: self.avg_service_minutes,
            last_service_minutes: self.last_service_minutes,
        }
    }

    /// Guarded decrement. Underflow means the locking contract was broken
    /// somewhere; surface it instead of clamping.
    fn decrement_active(&mut self) -> Result<()> {
        if self.active_tickets == 0 {
            return Err(Error::Unexpected(format!(
                "active_tickets underflow on queue '{}'",
                self.queue.id
            )));
        }
        self.active_tickets -= 1;
        Ok(())
    }
}

/// Registry of per-queue ledgers plus a ticket-id → queue-id index.
///
/// The `DashMap` shards handle cross-queue concurrency; the `Mutex` inside
/// each entry serializes the read-compute-write sequences of one queue.
#[derive(Default)]
pub struct TicketStore {
    ledgers: DashMap<String, Arc<Mutex<QueueLedger>>>,
    index: DashMap<String, String>,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create the ledger for a queue.
    pub(crate) fn ledger(&self, queue: &Queue) -> Arc<Mutex<QueueLedger>> {
        self.ledgers
            .entry(queue.id.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(QueueLedger::new(
                    queue.clone(),
                    Utc::now().date_naive(),
                )))
            })
            .clone()
    }

    /// Ledger for a queue id that was already touched, if any.
    pub(crate) fn existing_ledger(&self, queue_id: &str) -> Option<Arc<Mutex<QueueLedger>>> {
        self.ledgers.get(queue_id).map(|l| l.clone())
    }

    pub(crate) fn index_ticket(&self, ticket: &Ticket) {
        self.index
            .insert(ticket.id.clone(), ticket.queue_id.clone());
    }

    pub(crate) fn forget_tickets(&self, ticket_ids: &[String]) {
        for id in ticket_ids {
            self.index.remove(id);
        }
    }

    /// Queue holding the ticket, if the ticket is known.
    pub fn queue_of_ticket(&self, ticket_id: &str) -> Option<String> {
        self.index.get(ticket_id).map(|q| q.clone())
    }

    /// Ids of every queue with ledger state, for sweep iteration.
    pub fn queue_ids(&self) -> Vec<String> {
        self.ledgers.iter().map(|l| l.key().clone()).collect()
    }

    /// Point read of a ticket by id.
    pub fn get_ticket(&self, ticket_id: &str) -> Option<Ticket> {
        let queue_id = self.queue_of_ticket(ticket_id)?;
        let ledger = self.existing_ledger(&queue_id)?;
        let guard = ledger.lock().unwrap();
        guard.find(ticket_id).cloned()
    }
}
