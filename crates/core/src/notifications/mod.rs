//! Notification engine: throttled geofenced alerts and the proactive
//! reconciliation sweep.

mod notifications_service;
mod notifications_traits;
mod throttle;

pub use notifications_service::{NotificationService, SweepReport};
pub use notifications_traits::{
    MockNotificationGateway, NoOpNotificationGateway, NotificationGatewayTrait, SentMessage,
};
pub use throttle::Throttle;
