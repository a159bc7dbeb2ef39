//! Shared wiring for the engine integration tests.

use std::sync::Arc;

use chrono::NaiveTime;

use guiche_core::directory::{Branch, GeoPoint, InMemoryDirectory, Queue};
use guiche_core::dispatch::CallDispatcherService;
use guiche_core::estimator::{NoAlternatives, UnavailableEstimator};
use guiche_core::fanout::EventBus;
use guiche_core::notifications::{MockNotificationGateway, NotificationService};
use guiche_core::presence::PresenceService;
use guiche_core::schedules::ScheduleService;
use guiche_core::tickets::{TicketLedgerService, TicketStore};
use guiche_core::trades::TradeService;

pub const BRANCH_POINT: GeoPoint = GeoPoint {
    latitude: -23.5505,
    longitude: -46.6333,
};

pub struct TestWorld {
    pub directory: Arc<InMemoryDirectory>,
    pub bus: Arc<EventBus>,
    pub ledger: Arc<TicketLedgerService>,
    pub dispatcher: CallDispatcherService,
    pub trades: TradeService,
    pub presence: PresenceService,
    pub notifications: Arc<NotificationService>,
    pub gateway: MockNotificationGateway,
}

/// Fully wired engine over an in-memory directory with one branch.
/// Queues are added by the individual tests via [`add_queue`].
pub fn world() -> TestWorld {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.insert_branch(Branch {
        id: "b1".to_string(),
        institution_id: "i1".to_string(),
        name: "Centro".to_string(),
        location: BRANCH_POINT,
    });

    let schedules = Arc::new(ScheduleService::new(directory.clone()));
    let store = Arc::new(TicketStore::new());
    let bus = Arc::new(EventBus::default());
    let gateway = MockNotificationGateway::new();

    let ledger = Arc::new(TicketLedgerService::new(
        directory.clone(),
        schedules.clone(),
        Arc::new(NoAlternatives),
        store.clone(),
        bus.clone(),
    ));
    let dispatcher = CallDispatcherService::new(
        directory.clone(),
        schedules.clone(),
        ledger.clone(),
        Arc::new(gateway.clone()),
    );
    let trades = TradeService::new(directory.clone(), ledger.clone(), Arc::new(gateway.clone()));
    let presence = PresenceService::new(directory.clone(), schedules.clone(), ledger.clone());
    let notifications = Arc::new(NotificationService::new(
        directory.clone(),
        schedules,
        ledger.clone(),
        store,
        Arc::new(UnavailableEstimator),
        Arc::new(gateway.clone()),
    ));

    TestWorld {
        directory,
        bus,
        ledger,
        dispatcher,
        trades,
        presence,
        notifications,
        gateway,
    }
}

/// Registers a queue on branch `b1`, open around the clock every day.
pub fn add_queue(world: &TestWorld, queue_id: &str, daily_limit: u32, num_counters: u32) {
    world.directory.insert_queue(Queue {
        id: queue_id.to_string(),
        branch_id: "b1".to_string(),
        institution_id: "i1".to_string(),
        department_id: "d1".to_string(),
        service: "General service".to_string(),
        prefix: 'A',
        daily_limit,
        num_counters,
        avg_service_minutes: None,
    });
    world.directory.insert_schedule_all_days(
        queue_id,
        NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
    );
}
