pub mod dto;
pub mod pool;

pub use dto::*;
pub use pool::*;
