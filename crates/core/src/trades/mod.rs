mod trades_service;

pub use trades_service::TradeService;
