//! Schedule evaluation: does a queue admit tickets at a given instant?

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};

use crate::directory::DirectoryTrait;
use crate::errors::Result;

/// Pure admission gate over the directory's weekly schedule rows.
///
/// Used before issuance, before call dispatch, and by the proactive sweep
/// to auto-cancel tickets whose queue has since closed. No side effects.
pub struct ScheduleService {
    directory: Arc<dyn DirectoryTrait>,
}

impl ScheduleService {
    pub fn new(directory: Arc<dyn DirectoryTrait>) -> Self {
        ScheduleService { directory }
    }

    /// Whether the queue admits tickets at `at`.
    ///
    /// False when the weekday has no schedule row, the row is flagged
    /// closed, or `at` falls outside `[open_time, end_time]`.
    pub fn is_open(&self, queue_id: &str, at: DateTime<Utc>) -> Result<bool> {
        let row = self.directory.get_schedule(queue_id, at.weekday())?;
        Ok(row.map(|s| s.admits(at.time())).unwrap_or(false))
    }
}
