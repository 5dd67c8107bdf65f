pub mod notification;
pub mod pool;
pub mod routes;

pub use routes::*;
