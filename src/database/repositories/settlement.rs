use crate::database::models::Settlement;
use crate::database::mongodb::{MongoDbClient, SETTLEMENTS_COLLECTION};
use crate::database::store::SettlementStore;
use anyhow::Result;
use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::TryStreamExt;
use log::{debug, info};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use std::sync::Arc;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Settlement repository for MongoDB operations
#[derive(Debug, Clone)]
pub struct SettlementRepository {
    client: Arc<MongoDbClient>,
}

impl SettlementRepository {
    /// Create a new SettlementRepository instance
    pub fn new(client: Arc<MongoDbClient>) -> Self {
        Self { client }
    }
}

fn is_duplicate_key(error: &MongoError) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

#[async_trait]
impl SettlementStore for SettlementRepository {
    async fn record(&self, settlement: &Settlement) -> Result<bool> {
        let collection = self.client.collection::<Settlement>(SETTLEMENTS_COLLECTION);

        match collection.insert_one(settlement).await {
            Ok(_) => {
                info!(
                    "Recorded settlement for wager {} in pool {}",
                    settlement.wager_id, settlement.pool_id
                );
                Ok(true)
            }
            Err(e) if is_duplicate_key(&e) => {
                debug!(
                    "Settlement for wager {} already recorded",
                    settlement.wager_id
                );
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_pool(&self, pool_id: &ObjectId) -> Result<Vec<Settlement>> {
        let collection = self.client.collection::<Settlement>(SETTLEMENTS_COLLECTION);
        let mut cursor = collection.find(doc! { "poolId": pool_id }).await?;
        let mut settlements = Vec::new();

        while let Some(settlement) = cursor.try_next().await? {
            settlements.push(settlement);
        }

        Ok(settlements)
    }
}
