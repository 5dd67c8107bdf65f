use anyhow::Result;

use super::mongodb::MongoDbClient;
use super::repositories::{NotificationRepository, PoolRepository, SettlementRepository};
use crate::config::MongoDbConfig;

/// MongoDB service for managing database operations
///
/// A thin facade over the repository layer: it connects once and hands out the
/// repositories that back the store traits.
#[derive(Debug, Clone)]
pub struct MongoDbService {
    pool_repo: PoolRepository,
    settlement_repo: SettlementRepository,
    notification_repo: NotificationRepository,
}

impl MongoDbService {
    /// Create a new MongoDB service
    pub async fn new(config: &MongoDbConfig) -> Result<Self> {
        // Validate configuration
        config.validate()?;
        // Initialize MongoDB client
        let client = MongoDbClient::init(config).await?;

        // Create repositories
        let pool_repo = PoolRepository::new(client.clone());
        let settlement_repo = SettlementRepository::new(client.clone());
        let notification_repo = NotificationRepository::new(client);

        Ok(Self {
            pool_repo,
            settlement_repo,
            notification_repo,
        })
    }

    // ========== Repository Getters ==========

    /// Get pool repository
    pub fn get_pool_repo(&self) -> &PoolRepository {
        &self.pool_repo
    }

    /// Get settlement repository
    pub fn get_settlement_repo(&self) -> &SettlementRepository {
        &self.settlement_repo
    }

    /// Get notification repository
    pub fn get_notification_repo(&self) -> &NotificationRepository {
        &self.notification_repo
    }
}
