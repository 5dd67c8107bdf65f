// MongoDB modules
pub mod memory;
pub mod models;
pub mod mongodb;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use memory::MemoryStore;
pub use mongodb::MongoDbClient;
pub use service::MongoDbService;
pub use store::{Completion, NotificationStore, PoolStore, SettlementStore, WagerPatch};
