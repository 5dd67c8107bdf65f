pub mod notification;
pub mod pool;
pub mod settlement;

pub use notification::NotificationRepository;
pub use pool::PoolRepository;
pub use settlement::SettlementRepository;
