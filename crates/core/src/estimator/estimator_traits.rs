//! Trait seams for the wait-time/demand predictor and the queue
//! clustering model.
//!
//! The models themselves (training, persistence, in-memory state) are an
//! external concern; the engine consumes them as stateless services and
//! degrades gracefully when they are unavailable.

use async_trait::async_trait;

use crate::directory::GeoPoint;
use crate::errors::{Error, Result};

/// Wait-time and demand prediction consumed by the notification engine.
///
/// Failures map to `Error::Unavailable`; callers fall back to the queue's
/// stored service-time average or a fixed default, never abort.
#[async_trait]
pub trait EstimatorTrait: Send + Sync {
    /// Predicted wait in minutes for a ticket at `position` in the queue.
    #[allow(clippy::too_many_arguments)]
    async fn predict_wait_minutes(
        &self,
        queue_id: &str,
        position: u32,
        active_tickets: u32,
        priority: i32,
        hour_of_day: u32,
        location: Option<GeoPoint>,
    ) -> Result<f64>;

    /// Predicted demand for the queue `hours_ahead` from now, normalized
    /// to the queue's capacity (1.0 = at capacity).
    async fn predict_demand(&self, queue_id: &str, hours_ahead: u32) -> Result<f64>;
}

/// Alternative-queue suggestions for `QueueFull` rejections.
#[async_trait]
pub trait ClusteringTrait: Send + Sync {
    /// Up to `n` queue ids offering a similar service, nearest first.
    async fn alternatives(&self, queue_id: &str, n: usize) -> Result<Vec<String>>;
}

/// Estimator stub that reports itself unavailable, forcing callers onto
/// their fallback path. Default wiring for deployments without the model.
#[derive(Clone, Default)]
pub struct UnavailableEstimator;

#[async_trait]
impl EstimatorTrait for UnavailableEstimator {
    async fn predict_wait_minutes(
        &self,
        _queue_id: &str,
        _position: u32,
        _active_tickets: u32,
        _priority: i32,
        _hour_of_day: u32,
        _location: Option<GeoPoint>,
    ) -> Result<f64> {
        Err(Error::Unavailable("estimator not configured".to_string()))
    }

    async fn predict_demand(&self, _queue_id: &str, _hours_ahead: u32) -> Result<f64> {
        Err(Error::Unavailable("estimator not configured".to_string()))
    }
}

/// Clustering stub that never suggests alternatives.
#[derive(Clone, Default)]
pub struct NoAlternatives;

#[async_trait]
impl ClusteringTrait for NoAlternatives {
    async fn alternatives(&self, _queue_id: &str, _n: usize) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
