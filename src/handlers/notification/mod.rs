pub mod dto;
pub mod notification;

pub use dto::*;
pub use notification::*;
