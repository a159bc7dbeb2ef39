//! Dashmap-backed directory used in tests and single-process deployments.

use chrono::Weekday;
use dashmap::DashMap;

use super::directory_model::{Branch, Queue, Schedule};
use super::directory_traits::DirectoryTrait;
use crate::errors::{DirectoryError, Result};

/// In-memory `DirectoryTrait` implementation.
///
/// Production deployments put a storage-backed implementation behind the
/// same trait; the engine does not care which one it talks to.
#[derive(Default)]
pub struct InMemoryDirectory {
    branches: DashMap<String, Branch>,
    queues: DashMap<String, Queue>,
    schedules: DashMap<String, Vec<Schedule>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_branch(&self, branch: Branch) {
        self.branches.insert(branch.id.clone(), branch);
    }

    pub fn insert_queue(&self, queue: Queue) {
        self.queues.insert(queue.id.clone(), queue);
    }

    /// Adds or replaces the schedule row for the row's weekday.
    pub fn insert_schedule(&self, schedule: Schedule) {
        let mut rows = self
            .schedules
            .entry(schedule.queue_id.clone())
            .or_default();
        rows.retain(|s| s.weekday != schedule.weekday);
        rows.push(schedule);
    }

    /// Convenience for tests: one identical open window on all weekdays.
    pub fn insert_schedule_all_days(&self, queue_id: &str, open: chrono::NaiveTime, end: chrono::NaiveTime) {
        for weekday in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ] {
            self.insert_schedule(Schedule {
                queue_id: queue_id.to_string(),
                weekday,
                open_time: open,
                end_time: end,
                is_closed: false,
            });
        }
    }
}

impl DirectoryTrait for InMemoryDirectory {
    fn get_queue(&self, queue_id: &str) -> Result<Queue> {
        self.queues
            .get(queue_id)
            .map(|q| q.clone())
            .ok_or_else(|| DirectoryError::QueueNotFound(queue_id.to_string()).into())
    }

    fn get_branch(&self, branch_id: &str) -> Result<Branch> {
        self.branches
            .get(branch_id)
            .map(|b| b.clone())
            .ok_or_else(|| DirectoryError::BranchNotFound(branch_id.to_string()).into())
    }

    fn get_schedule(&self, queue_id: &str, weekday: Weekday) -> Result<Option<Schedule>> {
        Ok(self
            .schedules
            .get(queue_id)
            .and_then(|rows| rows.iter().find(|s| s.weekday == weekday).cloned()))
    }

    fn list_branches(&self) -> Result<Vec<Branch>> {
        Ok(self.branches.iter().map(|b| b.clone()).collect())
    }

    fn list_queues(&self, branch_id: &str) -> Result<Vec<Queue>> {
        Ok(self
            .queues
            .iter()
            .filter(|q| q.branch_id == branch_id)
            .map(|q| q.clone())
            .collect())
    }
}
