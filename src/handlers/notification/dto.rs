use serde::{Deserialize, Serialize};

use crate::database::models::{Notification, PoolEvent};

fn default_page_num() -> u64 {
    1
}

fn default_page_size() -> u64 {
    20
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub event: PoolEvent,
    pub created_by: String,
    pub user_email: String,
    pub title: String,
    pub message: String,
    pub link: String,
    pub is_read: bool,
    pub created_at: u64,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id.map(|id| id.to_hex()).unwrap_or_default(),
            event: notification.event,
            created_by: notification.created_by,
            user_email: notification.user_email,
            title: notification.title,
            message: notification.message,
            link: notification.link,
            is_read: notification.is_read,
            created_at: notification.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsQuery {
    pub user_email: String,
    #[serde(default = "default_page_num")]
    pub page_num: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadRequest {
    pub user_email: String,
}
