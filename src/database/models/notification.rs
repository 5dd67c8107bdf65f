use bson::oid::ObjectId;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Pool and wager events that users are told about
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolEvent {
    PoolCreated,
    WagerProposed,
    WagerAccepted,
    WagerCompleted,
}

impl PoolEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolEvent::PoolCreated => "POOL_CREATED",
            PoolEvent::WagerProposed => "WAGER_PROPOSED",
            PoolEvent::WagerAccepted => "WAGER_ACCEPTED",
            PoolEvent::WagerCompleted => "WAGER_COMPLETED",
        }
    }
}

/// Notification model for MongoDB
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub event: PoolEvent,
    pub created_by: String,
    pub user_email: String,
    pub title: String,
    pub message: String,
    pub link: String,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub created_at: u64,
}

impl Notification {
    pub fn new(
        event: PoolEvent,
        created_by: String,
        user_email: String,
        title: String,
        message: String,
        link: String,
    ) -> Self {
        Self {
            id: Some(ObjectId::new()),
            event,
            created_by,
            user_email,
            title,
            message,
            link,
            is_read: false,
            is_dismissed: false,
            created_at: Utc::now().timestamp() as u64,
        }
    }
}
