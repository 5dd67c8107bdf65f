use crate::database::models::utils::page_offset;
use crate::database::models::{Page, Pool, SettlementStatus, Wager};
use crate::database::mongodb::{MongoDbClient, POOLS_COLLECTION};
use crate::database::store::{PoolStore, WagerPatch};
use anyhow::Result;
use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use chrono::Utc;
use futures::TryStreamExt;
use log::{debug, info};
use mongodb::{options::ReturnDocument, Collection};
use std::sync::Arc;

/// Pool repository for MongoDB operations
#[derive(Debug, Clone)]
pub struct PoolRepository {
    client: Arc<MongoDbClient>,
}

impl PoolRepository {
    /// Create a new PoolRepository instance
    pub fn new(client: Arc<MongoDbClient>) -> Self {
        Self { client }
    }

    fn collection(&self) -> Collection<Pool> {
        self.client.collection::<Pool>(POOLS_COLLECTION)
    }
}

/// Filter matching a pool whose embedded wager satisfies `element`
fn wager_element_filter(pool_id: &ObjectId, element: Document) -> Document {
    doc! {
        "_id": pool_id,
        "wagers": { "$elemMatch": element }
    }
}

/// Positional update for the wager element matched by `wager_element_filter`
fn wager_update_document(patch: &WagerPatch) -> Document {
    let mut set = Document::new();
    set.insert("updatedAt", Utc::now().timestamp());

    if let Some(is_active) = patch.is_active {
        set.insert("wagers.$.isActive", is_active);
    }
    if let Some(completion) = &patch.complete {
        set.insert("wagers.$.isComplete", true);
        set.insert("wagers.$.winners", completion.winners.clone());
        set.insert("wagers.$.completedBy", completion.completed_by.clone());
        set.insert("wagers.$.completedAt", completion.completed_at as i64);
    }
    if let Some(status) = patch.settlement_status {
        set.insert("wagers.$.settlementStatus", status.as_str());
    }

    let mut update = doc! {
        "$set": set,
        "$inc": { "wagers.$.revision": 1_i64 }
    };
    if let Some(user) = &patch.add_active_user {
        update.insert("$addToSet", doc! { "wagers.$.activeUsers": user });
    }

    update
}

#[async_trait]
impl PoolStore for PoolRepository {
    async fn get_by_id(&self, pool_id: &ObjectId) -> Result<Option<Pool>> {
        let pool = self.collection().find_one(doc! { "_id": pool_id }).await?;
        Ok(pool)
    }

    async fn insert_one(&self, mut pool: Pool) -> Result<Pool> {
        let result = self.collection().insert_one(&pool).await?;
        if pool.id.is_none() {
            pool.id = result.inserted_id.as_object_id();
        }

        info!("Inserted new pool: {} ({})", pool.id_hex(), pool.name);
        Ok(pool)
    }

    async fn delete_one(&self, pool_id: &ObjectId) -> Result<Option<Pool>> {
        let deleted = self
            .collection()
            .find_one_and_delete(doc! { "_id": pool_id })
            .await?;

        if deleted.is_some() {
            info!("Deleted pool {}", pool_id);
        } else {
            debug!("Pool {} not found", pool_id);
        }

        Ok(deleted)
    }

    async fn add_user(&self, pool_id: &ObjectId, user_email: &str) -> Result<bool> {
        let update = doc! {
            "$addToSet": { "users": user_email },
            "$set": { "updatedAt": Utc::now().timestamp() }
        };

        let result = self
            .collection()
            .update_one(doc! { "_id": pool_id }, update)
            .await?;

        debug!(
            "Added user {} to pool {} (matched: {}, modified: {})",
            user_email, pool_id, result.matched_count, result.modified_count
        );
        Ok(result.matched_count > 0)
    }

    async fn add_wager(&self, pool_id: &ObjectId, wager: &Wager) -> Result<bool> {
        let update = doc! {
            "$push": { "wagers": bson::to_bson(wager)? },
            "$set": { "updatedAt": Utc::now().timestamp() }
        };

        let result = self
            .collection()
            .update_one(doc! { "_id": pool_id }, update)
            .await?;

        Ok(result.matched_count > 0)
    }

    async fn pull_open_wager(
        &self,
        pool_id: &ObjectId,
        wager_id: &ObjectId,
    ) -> Result<Option<Wager>> {
        let filter = wager_element_filter(pool_id, doc! { "_id": wager_id, "isComplete": false });
        let update = doc! {
            "$pull": { "wagers": { "_id": wager_id } },
            "$set": { "updatedAt": Utc::now().timestamp() }
        };

        let before = self
            .collection()
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::Before)
            .await?;

        Ok(before.and_then(|pool| pool.wagers.into_iter().find(|w| &w.id == wager_id)))
    }

    async fn update_wager(
        &self,
        pool_id: &ObjectId,
        wager_id: &ObjectId,
        expected_revision: i64,
        patch: &WagerPatch,
    ) -> Result<Option<Wager>> {
        let filter =
            wager_element_filter(pool_id, doc! { "_id": wager_id, "revision": expected_revision });

        let after = self
            .collection()
            .find_one_and_update(filter, wager_update_document(patch))
            .return_document(ReturnDocument::After)
            .await?;

        Ok(after.and_then(|pool| pool.wagers.into_iter().find(|w| &w.id == wager_id)))
    }

    async fn get_user_pools(
        &self,
        page_num: u64,
        page_size: u64,
        user_email: &str,
    ) -> Result<Page<Pool>> {
        let collection = self.collection();
        let filter = doc! { "users": user_email };

        let limit = i64::try_from(page_size)?;
        let total_items = collection.count_documents(filter.clone()).await?;
        let cursor = collection
            .find(filter)
            .projection(doc! { "wagers": 0 })
            .sort(doc! { "_id": -1 })
            .skip(page_offset(page_num, page_size))
            .limit(limit)
            .await?;
        let items: Vec<Pool> = cursor.try_collect().await?;

        Ok(Page::new(items, page_num, page_size, total_items))
    }

    async fn find_pending_settlements(&self) -> Result<Vec<Pool>> {
        let filter = doc! {
            "wagers": {
                "$elemMatch": {
                    "isComplete": true,
                    "settlementStatus": SettlementStatus::Pending.as_str()
                }
            }
        };

        let mut cursor = self.collection().find(filter).await?;
        let mut pools = Vec::new();

        while let Some(pool) = cursor.try_next().await? {
            pools.push(pool);
        }

        Ok(pools)
    }
}
