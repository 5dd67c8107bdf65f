use crate::config::MongoDbConfig;
use anyhow::{anyhow, Result};
use log::{error, info};
use mongodb::{
    bson::doc,
    options::{ClientOptions, IndexOptions, ServerApi, ServerApiVersion},
    Client, Collection, Database as MongoDatabase, IndexModel,
};
use std::sync::Arc;
use std::time::Duration;

pub const POOLS_COLLECTION: &str = "pools";
pub const SETTLEMENTS_COLLECTION: &str = "settlements";
pub const NOTIFICATIONS_COLLECTION: &str = "notifications";

/// MongoDB client wrapper for managing database connections and operations
#[derive(Debug, Clone)]
pub struct MongoDbClient {
    _client: Client,
    database: MongoDatabase,
}

impl MongoDbClient {
    /// Initialize the MongoDB client with configuration
    pub async fn init(config: &MongoDbConfig) -> Result<Arc<Self>> {
        // Get connection string from config or use default
        let connection_string = config.uri.clone();

        // Get database name from config or use default
        let database_name = config.database.clone();

        info!(
            "Connecting to MongoDB at {} with database {}",
            connection_string, database_name
        );

        // Create client options
        let mut client_options = ClientOptions::parse(&connection_string)
            .await
            .map_err(|e| anyhow!("Failed to parse MongoDB connection string: {}", e))?;

        // Set server API version if using MongoDB Atlas
        let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
        client_options.server_api = Some(server_api);
        client_options.connect_timeout = Some(Duration::from_millis(config.connection_timeout_ms));
        client_options.max_pool_size = config.max_pool_size;

        // Create client
        let client = Client::with_options(client_options)
            .map_err(|e| anyhow!("Failed to create MongoDB client: {}", e))?;

        // Get database
        let database = client.database(&database_name);

        // Test connection
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => info!(
                "Successfully connected to MongoDB database: {}",
                database_name
            ),
            Err(e) => {
                error!("Failed to connect to MongoDB: {}", e);
                return Err(anyhow!("Failed to connect to MongoDB: {}", e));
            }
        }

        let db_client = Arc::new(Self {
            _client: client,
            database,
        });

        db_client.create_indexes().await?;

        Ok(db_client)
    }

    /// Get a collection with the given name
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database.collection(name)
    }

    /// Get database reference
    pub fn database(&self) -> MongoDatabase {
        self.database.clone()
    }

    /// Create required indexes for all collections
    pub async fn create_indexes(&self) -> Result<()> {
        info!("Creating MongoDB indexes...");

        // Pool indexes
        self.create_pool_indexes().await?;

        // Settlement indexes
        self.create_settlement_indexes().await?;

        // Notification indexes
        self.create_notification_indexes().await?;

        info!("MongoDB indexes created successfully");
        Ok(())
    }

    /// Create indexes for pools collection
    async fn create_pool_indexes(&self) -> Result<()> {
        let collection = self
            .database
            .collection::<mongodb::bson::Document>(POOLS_COLLECTION);

        let indexes = [
            // Membership lookups for a user's pool listing
            doc! { "users": 1 },
            // Wager element lookups by id
            doc! { "wagers._id": 1 },
            // Settlement sweep
            doc! { "wagers.isComplete": 1, "wagers.settlementStatus": 1 },
        ];

        for keys in indexes {
            let index = IndexModel::builder().keys(keys).build();
            collection
                .create_index(index)
                .await
                .map_err(|e| anyhow!("Failed to create pool index: {}", e))?;
        }

        Ok(())
    }

    /// Create indexes for settlements collection
    async fn create_settlement_indexes(&self) -> Result<()> {
        let collection = self
            .database
            .collection::<mongodb::bson::Document>(SETTLEMENTS_COLLECTION);

        // One settlement per wager; duplicate inserts are how retries stay idempotent
        let wager_index = IndexModel::builder()
            .keys(doc! { "wagerId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        collection
            .create_index(wager_index)
            .await
            .map_err(|e| anyhow!("Failed to create settlement wagerId index: {}", e))?;

        let pool_index = IndexModel::builder().keys(doc! { "poolId": 1 }).build();

        collection
            .create_index(pool_index)
            .await
            .map_err(|e| anyhow!("Failed to create settlement poolId index: {}", e))?;

        Ok(())
    }

    /// Create indexes for notifications collection
    async fn create_notification_indexes(&self) -> Result<()> {
        let collection = self
            .database
            .collection::<mongodb::bson::Document>(NOTIFICATIONS_COLLECTION);

        let index = IndexModel::builder()
            .keys(doc! { "userEmail": 1, "isDismissed": 1, "_id": -1 })
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|e| anyhow!("Failed to create notification index: {}", e))?;

        Ok(())
    }
}
