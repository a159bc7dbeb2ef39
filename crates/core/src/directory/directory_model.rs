//! Read-only directory records: branches, queues and their weekly schedules.
//!
//! These are views of the excluded persistence layer. The engine never
//! mutates them; per-queue counters live in the ticket ledger.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// WGS84 coordinate pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A physical service point of an institution.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: String,
    pub institution_id: String,
    pub name: String,
    pub location: GeoPoint,
}

/// Static configuration of one line of tickets inside a department.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    pub id: String,
    pub branch_id: String,
    pub institution_id: String,
    pub department_id: String,
    /// Display name of the service, matched by the desired-service filter.
    pub service: String,
    /// Single display letter prefixed to ticket numbers ("A042").
    pub prefix: char,
    /// Maximum number of simultaneously pending tickets per service day.
    pub daily_limit: u32,
    /// Counters available for round-robin call dispatch.
    pub num_counters: u32,
    /// Stored service-time average (minutes), seeds the ledger and backs
    /// the estimator fallback.
    pub avg_service_minutes: Option<f64>,
}

/// Operating window of a queue on one weekday. A queue with no schedule
/// row for a weekday is closed that day.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub queue_id: String,
    pub weekday: Weekday,
    pub open_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_closed: bool,
}

impl Schedule {
    /// Whether this row admits tickets at the given wall-clock time.
    pub fn admits(&self, at: NaiveTime) -> bool {
        !self.is_closed && at >= self.open_time && at <= self.end_time
    }
}
