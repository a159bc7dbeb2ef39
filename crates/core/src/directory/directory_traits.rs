use chrono::Weekday;

use super::directory_model::{Branch, Queue, Schedule};
use crate::errors::Result;

/// Read-only lookups into the entity store owned by the admin layer.
///
/// Implementations must be cheap and side-effect free; every engine
/// operation may consult the directory before taking a queue lock.
pub trait DirectoryTrait: Send + Sync {
    fn get_queue(&self, queue_id: &str) -> Result<Queue>;
    fn get_branch(&self, branch_id: &str) -> Result<Branch>;
    /// Schedule row for the weekday, `None` when the queue has no row
    /// (treated as closed by the evaluator).
    fn get_schedule(&self, queue_id: &str, weekday: Weekday) -> Result<Option<Schedule>>;
    fn list_branches(&self) -> Result<Vec<Branch>>;
    fn list_queues(&self, branch_id: &str) -> Result<Vec<Queue>>;
}
