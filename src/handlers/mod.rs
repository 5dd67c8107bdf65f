pub mod auth;
pub mod notification;
pub mod pool;

pub use auth::ApiKey;
