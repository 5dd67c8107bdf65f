use crate::database::models::utils::page_offset;
use crate::database::models::{Notification, Page};
use crate::database::mongodb::{MongoDbClient, NOTIFICATIONS_COLLECTION};
use crate::database::store::NotificationStore;
use anyhow::Result;
use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::TryStreamExt;
use log::debug;
use mongodb::Collection;
use std::sync::Arc;

/// Notification repository for MongoDB operations
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    client: Arc<MongoDbClient>,
}

impl NotificationRepository {
    /// Create a new NotificationRepository instance
    pub fn new(client: Arc<MongoDbClient>) -> Self {
        Self { client }
    }

    fn collection(&self) -> Collection<Notification> {
        self.client.collection::<Notification>(NOTIFICATIONS_COLLECTION)
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        self.collection().insert_one(notification).await?;
        debug!(
            "Stored {} notification for {}",
            notification.event.as_str(),
            notification.user_email
        );
        Ok(())
    }

    async fn find_for_user(
        &self,
        page_num: u64,
        page_size: u64,
        user_email: &str,
    ) -> Result<Page<Notification>> {
        let collection = self.collection();
        let filter = doc! { "userEmail": user_email, "isDismissed": false };

        let limit = i64::try_from(page_size)?;
        let total_items = collection.count_documents(filter.clone()).await?;
        let cursor = collection
            .find(filter)
            .sort(doc! { "_id": -1 })
            .skip(page_offset(page_num, page_size))
            .limit(limit)
            .await?;
        let items: Vec<Notification> = cursor.try_collect().await?;

        Ok(Page::new(items, page_num, page_size, total_items))
    }

    async fn mark_read(&self, notification_id: &ObjectId) -> Result<bool> {
        let result = self
            .collection()
            .update_one(
                doc! { "_id": notification_id },
                doc! { "$set": { "isRead": true } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn mark_all_read(&self, user_email: &str) -> Result<u64> {
        let result = self
            .collection()
            .update_many(
                doc! { "userEmail": user_email, "isRead": false, "isDismissed": false },
                doc! { "$set": { "isRead": true } },
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn dismiss(&self, notification_id: &ObjectId) -> Result<bool> {
        let result = self
            .collection()
            .update_one(
                doc! { "_id": notification_id },
                doc! { "$set": { "isDismissed": true } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }
}
