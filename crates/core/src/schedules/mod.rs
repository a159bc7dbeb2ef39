mod schedules_service;

pub use schedules_service::ScheduleService;
