pub mod error;
pub mod lifecycle;
pub mod notification_handler;
pub mod pool_service;
pub mod settlement;
pub mod settlement_worker;
pub mod update_protocol;
pub mod validation;

pub use error::{ConflictReason, PoolError, PoolResult};
pub use lifecycle::WagerState;
pub use notification_handler::{NotificationEmitter, Notifier, StoredNotifier, TelegramNotifier};
pub use pool_service::{CompletedWager, PoolService, ProposeWager, SettlementReport};
pub use settlement::{RetrySummary, SettlementEngine};
pub use settlement_worker::SettlementWorker;
pub use update_protocol::RetryPolicy;
