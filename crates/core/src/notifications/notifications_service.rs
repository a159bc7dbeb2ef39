//! Notification engine: geofenced proximity alerts and the proactive
//! sweep that reconciles expired/stale tickets and warns waiting holders.
//!
//! Both sweeps are idempotent and re-entrant. Ledger mutations happen
//! inside the ledger's per-queue critical sections; every gateway send
//! happens after the locks are released, from an outbox collected during
//! the pass.

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use dashmap::DashMap;
use log::{debug, warn};

use super::notifications_traits::NotificationGatewayTrait;
use super::throttle::Throttle;
use crate::constants::{
    DEFAULT_WAIT_MINUTES, DEMAND_ALERT_THRESHOLD, NEARBY_RADIUS_KM, PROXIMITY_THROTTLE_SECS,
    TURN_ALERT_THROTTLE_SECS, TURN_NEAR_MINUTES, WALK_SPEED_KMH,
};
use crate::directory::{DirectoryTrait, GeoPoint, Queue};
use crate::errors::{Result, ValidationError};
use crate::estimator::EstimatorTrait;
use crate::schedules::ScheduleService;
use crate::tickets::{PendingTicket, QueueStats, TicketLedgerService, TicketStore};
use crate::utils::{haversine_km, location_cell, walking_minutes};

/// A user's most recent reported position.
#[derive(Clone, Copy, Debug)]
struct LastLocation {
    point: GeoPoint,
    #[allow(dead_code)]
    seen_at: DateTime<Utc>,
}

/// Counters reported by one proactive sweep pass.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub queues_swept: usize,
    pub expired: usize,
    pub closed_cancelled: usize,
    pub turn_alerts: usize,
    pub move_alerts: usize,
}

pub struct NotificationService {
    directory: Arc<dyn DirectoryTrait>,
    schedules: Arc<ScheduleService>,
    ledger: Arc<TicketLedgerService>,
    store: Arc<TicketStore>,
    estimator: Arc<dyn EstimatorTrait>,
    gateway: Arc<dyn NotificationGatewayTrait>,
    proximity_throttle: Throttle,
    turn_throttle: Throttle,
    move_throttle: Throttle,
    locations: DashMap<String, LastLocation>,
}

impl NotificationService {
    pub fn new(
        directory: Arc<dyn DirectoryTrait>,
        schedules: Arc<ScheduleService>,
        ledger: Arc<TicketLedgerService>,
        store: Arc<TicketStore>,
        estimator: Arc<dyn EstimatorTrait>,
        gateway: Arc<dyn NotificationGatewayTrait>,
    ) -> Self {
        NotificationService {
            directory,
            schedules,
            ledger,
            store,
            estimator,
            gateway,
            proximity_throttle: Throttle::new(PROXIMITY_THROTTLE_SECS),
            turn_throttle: Throttle::new(TURN_ALERT_THROTTLE_SECS),
            move_throttle: Throttle::new(TURN_ALERT_THROTTLE_SECS),
            locations: DashMap::new(),
        }
    }

    /// Geofenced alerting for a user on the move.
    ///
    /// Records the position (consumed later by the proactive sweep's
    /// start-moving alert), then notifies the user about branches within
    /// 1 km that have at least one open, low-demand queue matching the
    /// optional desired-service filter. Repeats are suppressed for an
    /// hour per (user, branch, queue, location cell).
    pub async fn proximity_sweep(
        &self,
        user_id: &str,
        location: GeoPoint,
        service_filter: Option<&str>,
    ) -> Result<Vec<String>> {
        if user_id.is_empty() {
            return Err(ValidationError::MissingField("userId".to_string()).into());
        }
        let now = Utc::now();
        self.locations.insert(
            user_id.to_string(),
            LastLocation {
                point: location,
                seen_at: now,
            },
        );
        let cell = location_cell(&location);

        let mut notified = Vec::new();
        for branch in self.directory.list_branches()? {
            if haversine_km(&location, &branch.location) > NEARBY_RADIUS_KM {
                continue;
            }

            let mut qualifying: Vec<Queue> = Vec::new();
            for queue in self.directory.list_queues(&branch.id)? {
                if let Some(filter) = service_filter {
                    if !queue
                        .service
                        .to_lowercase()
                        .contains(&filter.to_lowercase())
                    {
                        continue;
                    }
                }
                if !self.schedules.is_open(&queue.id, now)? {
                    continue;
                }
                match self.estimator.predict_demand(&queue.id, 1).await {
                    Ok(demand) if demand >= DEMAND_ALERT_THRESHOLD => continue,
                    Ok(_) => {}
                    Err(err) => {
                        // No demand estimate: alert anyway rather than
                        // staying silent.
                        debug!("demand estimate unavailable for queue {}: {err}", queue.id);
                    }
                }
                let key = format!("{user_id}|{}|{}|{cell}", branch.id, queue.id);
                if !self.proximity_throttle.allow(&key, now) {
                    continue;
                }
                qualifying.push(queue);
            }

            if qualifying.is_empty() {
                continue;
            }
            let services: Vec<&str> = qualifying.iter().map(|q| q.service.as_str()).collect();
            let message = format!(
                "{} nearby has a short line for: {}",
                branch.name,
                services.join(", ")
            );
            if let Err(err) = self.gateway.send(user_id, &message, None).await {
                warn!("proximity alert to {user_id} failed: {err}");
            }
            notified.push(branch.id.clone());
        }
        Ok(notified)
    }

    /// System-wide reconciliation pass.
    ///
    /// Per queue, under its ledger lock: retires stale service days,
    /// cancels expired calls, cancels Pending tickets of closed queues.
    /// After the lock: owner notifications for everything cancelled, plus
    /// turn-is-near and start-moving alerts for surviving Pending
    /// tickets.
    pub async fn proactive_sweep(&self) -> Result<SweepReport> {
        let now = Utc::now();
        let mut report = SweepReport::default();

        for queue_id in self.store.queue_ids() {
            let queue = match self.directory.get_queue(&queue_id) {
                Ok(queue) => queue,
                Err(err) => {
                    warn!("queue {queue_id} disappeared from the directory: {err}");
                    continue;
                }
            };
            let open = self.schedules.is_open(&queue_id, now)?;
            let sweep = self.ledger.sweep_queue(&queue, open, now)?;
            report.queues_swept += 1;
            report.expired += sweep.expired.len();
            report.closed_cancelled += sweep.closed.len();

            for ticket in &sweep.expired {
                if let Some(owner) = &ticket.user_id {
                    let message = format!(
                        "Ticket {} expired: the call was not answered in time.",
                        ticket.label(queue.prefix)
                    );
                    self.send_best_effort(owner, &message, Some(&ticket.id)).await;
                }
            }
            for ticket in &sweep.closed {
                if let Some(owner) = &ticket.user_id {
                    let message = format!(
                        "Ticket {} was cancelled: the queue has closed.",
                        ticket.label(queue.prefix)
                    );
                    self.send_best_effort(owner, &message, Some(&ticket.id)).await;
                }
            }

            if !open {
                continue;
            }
            let Some(stats) = sweep.stats.as_ref() else {
                continue;
            };
            let branch = self.directory.get_branch(&queue.branch_id).ok();

            for pending in &sweep.pending {
                let Some(owner) = pending.ticket.user_id.clone() else {
                    continue;
                };
                let last_location = self.locations.get(&owner).map(|r| *r);
                let wait = self
                    .estimate_wait(&queue, stats, pending, last_location.map(|l| l.point), now)
                    .await;

                if wait <= TURN_NEAR_MINUTES {
                    let key = format!("turn|{}", pending.ticket.id);
                    if self.turn_throttle.allow(&key, now) {
                        let message = format!(
                            "Your turn is near: ticket {} is about {:.0} min away.",
                            pending.ticket.label(queue.prefix),
                            wait.max(1.0)
                        );
                        self.send_best_effort(&owner, &message, Some(&pending.ticket.id))
                            .await;
                        report.turn_alerts += 1;
                    }
                }

                if let (Some(last), Some(branch)) = (last_location, branch.as_ref()) {
                    let distance = haversine_km(&last.point, &branch.location);
                    let travel = walking_minutes(distance, WALK_SPEED_KMH);
                    if travel >= wait {
                        let key = format!("move|{}", pending.ticket.id);
                        if self.move_throttle.allow(&key, now) {
                            let message = format!(
                                "Time to head to {}: the walk takes about {:.0} min and ticket {} is {:.0} min away.",
                                branch.name,
                                travel,
                                pending.ticket.label(queue.prefix),
                                wait.max(1.0)
                            );
                            self.send_best_effort(&owner, &message, Some(&pending.ticket.id))
                                .await;
                            report.move_alerts += 1;
                        }
                    }
                }
            }
        }

        self.proximity_throttle.prune(now);
        self.turn_throttle.prune(now);
        self.move_throttle.prune(now);
        Ok(report)
    }

    /// Estimated wait in minutes, degrading from the estimator to the
    /// queue's stored service-time average to a fixed default.
    async fn estimate_wait(
        &self,
        queue: &Queue,
        stats: &QueueStats,
        pending: &PendingTicket,
        location: Option<GeoPoint>,
        now: DateTime<Utc>,
    ) -> f64 {
        match self
            .estimator
            .predict_wait_minutes(
                &queue.id,
                pending.position,
                stats.active_tickets,
                pending.ticket.priority,
                now.hour(),
                location,
            )
            .await
        {
            Ok(minutes) => minutes,
            Err(err) => {
                debug!("wait estimate unavailable for queue {}: {err}", queue.id);
                stats
                    .avg_service_minutes
                    .map(|avg| avg * pending.position as f64)
                    .unwrap_or(DEFAULT_WAIT_MINUTES)
            }
        }
    }

    async fn send_best_effort(&self, recipient: &str, message: &str, ticket_id: Option<&str>) {
        if let Err(err) = self.gateway.send(recipient, message, ticket_id).await {
            warn!("notification to {recipient} failed: {err}");
        }
    }
}
