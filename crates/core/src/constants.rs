/// Minutes a called ticket stays claimable before the sweep expires it.
pub const CALL_TIMEOUT_MINUTES: i64 = 5;

/// Maximum distance (km) from the branch accepted by presence validation.
pub const PROXIMITY_THRESHOLD_KM: f64 = 0.5;

/// Radius (km) scanned by the proximity sweep for nearby branches.
pub const NEARBY_RADIUS_KM: f64 = 1.0;

/// Predicted demand at or above this value suppresses proximity alerts.
pub const DEMAND_ALERT_THRESHOLD: f64 = 0.7;

/// Suppression window for repeated proximity alerts, per
/// (user, branch, queue, location cell).
pub const PROXIMITY_THROTTLE_SECS: i64 = 3600;

/// Suppression window for repeated turn-alerts on the same ticket.
pub const TURN_ALERT_THROTTLE_SECS: i64 = 60;

/// Estimated wait (minutes) at or below which the holder is told the turn
/// is near.
pub const TURN_NEAR_MINUTES: f64 = 5.0;

/// Wait estimate (minutes) used when the estimator is unavailable and the
/// queue has no stored service-time average.
pub const DEFAULT_WAIT_MINUTES: f64 = 5.0;

/// Walking speed used to turn distance into travel time for the
/// start-moving alert.
pub const WALK_SPEED_KMH: f64 = 4.5;

/// How many other waiting holders are told about a new trade offer.
pub const TRADE_FANOUT_LIMIT: usize = 5;

/// Alternative queue suggestions attached to a `QueueFull` rejection.
pub const ALTERNATIVE_SUGGESTION_LIMIT: usize = 3;

/// Proactive sweep cadence (seconds).
pub const SWEEP_INTERVAL_SECS: u64 = 30;

/// Delay before the first proactive sweep after startup (seconds).
pub const SWEEP_INITIAL_DELAY_SECS: u64 = 5;

/// Per-topic buffer of the fan-out broadcast channels.
pub const EVENT_BUS_CAPACITY: usize = 256;
