//! Presence validation: confirms the holder is at the branch before the
//! ticket is recorded as served.

use std::sync::Arc;

use chrono::Utc;

use crate::constants::PROXIMITY_THRESHOLD_KM;
use crate::directory::{DirectoryTrait, GeoPoint};
use crate::errors::{Result, TicketError};
use crate::schedules::ScheduleService;
use crate::tickets::{Ticket, TicketLedgerService};
use crate::utils::haversine_km;

pub struct PresenceService {
    directory: Arc<dyn DirectoryTrait>,
    schedules: Arc<ScheduleService>,
    ledger: Arc<TicketLedgerService>,
}

impl PresenceService {
    pub fn new(
        directory: Arc<dyn DirectoryTrait>,
        schedules: Arc<ScheduleService>,
        ledger: Arc<TicketLedgerService>,
    ) -> Self {
        PresenceService {
            directory,
            schedules,
            ledger,
        }
    }

    /// Marks a Called ticket as Served.
    ///
    /// When a location is supplied, the great-circle distance to the
    /// branch must be within 0.5 km (`TooFar` otherwise). The Called
    /// status and the expiry deadline are re-checked inside the ledger's
    /// critical section, so a late validation can never race the expiry
    /// sweep. The measured service time feeds the queue's rolling
    /// average, the training signal of the external estimator.
    pub fn validate(
        &self,
        ticket_id: &str,
        requester_location: Option<GeoPoint>,
    ) -> Result<Ticket> {
        let queue_id = self.ledger.locate(ticket_id)?;
        let queue = self.directory.get_queue(&queue_id)?;
        let now = Utc::now();
        if !self.schedules.is_open(&queue_id, now)? {
            return Err(TicketError::QueueClosed.into());
        }

        if let Some(location) = requester_location {
            let branch = self.directory.get_branch(&queue.branch_id)?;
            let distance_km = haversine_km(&location, &branch.location);
            if distance_km > PROXIMITY_THRESHOLD_KM {
                return Err(TicketError::TooFar { distance_km }.into());
            }
        }

        let (ticket, _service_minutes) = self.ledger.serve(&queue, ticket_id, now)?;
        Ok(ticket)
    }
}
