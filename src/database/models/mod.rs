pub mod notification;
pub mod pool;
pub mod settlement;
pub mod utils;
pub mod wager;

// Re-export models explicitly to avoid ambiguous glob re-exports
pub use notification::{Notification, PoolEvent};
pub use pool::Pool;
pub use settlement::{PointDelta, Settlement};
pub use utils::Page;
pub use wager::{SettlementStatus, Wager};
