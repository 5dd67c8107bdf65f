use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::Parser;
use env_logger::Env;
use log::{info, warn, LevelFilter};
use std::sync::Arc;

use wager_pools_api::config::{Config, DEFAULT_CONFIG_PATH};
use wager_pools_api::database::{
    MemoryStore, MongoDbService, NotificationStore, PoolStore, SettlementStore,
};
use wager_pools_api::routes::configure_routes;
use wager_pools_api::services::{
    NotificationEmitter, PoolService, SettlementWorker, StoredNotifier, TelegramNotifier,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Keep everything in process memory instead of MongoDB
    #[arg(long)]
    in_memory: bool,
}

type Stores = (
    Arc<dyn PoolStore>,
    Arc<dyn SettlementStore>,
    Arc<dyn NotificationStore>,
);

async fn init_stores(config: &Config, in_memory: bool) -> std::io::Result<Stores> {
    if in_memory {
        warn!("Running with the in-memory store, nothing will be persisted");
        let store = Arc::new(MemoryStore::new());
        let pools: Arc<dyn PoolStore> = store.clone();
        let settlements: Arc<dyn SettlementStore> = store.clone();
        let notifications: Arc<dyn NotificationStore> = store;
        return Ok((pools, settlements, notifications));
    }

    let db_service = MongoDbService::new(&config.database)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    info!("Connected to MongoDB database {}", config.database.database);

    let pools: Arc<dyn PoolStore> = Arc::new(db_service.get_pool_repo().clone());
    let settlements: Arc<dyn SettlementStore> =
        Arc::new(db_service.get_settlement_repo().clone());
    let notifications: Arc<dyn NotificationStore> =
        Arc::new(db_service.get_notification_repo().clone());
    Ok((pools, settlements, notifications))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 1. Parse command line arguments and setup logging
    let args = Args::parse();
    let log_level = match args.log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level.to_string())).init();

    // 2. Load configuration
    let config = Config::load(&args.config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    info!("Starting Wager Pools API...");
    info!("Configuration loaded: {:?}", config);

    // 3. Stores, notifiers and services
    let (pools, settlements, notification_store) = init_stores(&config, args.in_memory).await?;

    let mut notifications =
        NotificationEmitter::default().with_notifier(Arc::new(StoredNotifier::new(
            notification_store.clone(),
        )));
    match TelegramNotifier::from_config(&config.telegram) {
        Some(telegram) => {
            info!("Telegram notifications enabled");
            notifications = notifications.with_notifier(Arc::new(telegram));
        }
        None => info!("Telegram not configured, notifications are only stored"),
    }

    let pool_service = PoolService::new(pools, settlements, notifications, &config.wagers);

    // 4. Background settlement retries
    let settlement_worker = SettlementWorker::from_config(
        pool_service.settlement_engine().clone(),
        &config.settlement,
    );
    settlement_worker.start();

    // Build bind address from config
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    info!("Server will be available at http://{}", bind_addr);

    let result = HttpServer::new(move || {
        // Configure CORS from config
        let allowed_origins = config.cors.allowed_origins.clone();

        let cors = Cors::default().allowed_origin_fn(move |origin, _req_head| {
            let origin_str = match origin.to_str() {
                Ok(s) => s,
                Err(_) => return false,
            };
            allowed_origins.iter().any(|allowed| origin_str == allowed)
        });

        // Convert string methods to HTTP methods
        let mut methods: Vec<actix_web::http::Method> = config
            .cors
            .allowed_methods
            .iter()
            .filter_map(|m| m.parse().ok())
            .collect();
        methods.push(actix_web::http::Method::OPTIONS);

        let cors = cors
            .allowed_methods(methods)
            .allowed_headers(config.cors.allowed_headers.clone())
            .max_age(3600);

        let cors = if config.cors.supports_credentials {
            cors.supports_credentials()
        } else {
            cors
        };

        App::new()
            .app_data(web::Data::new(pool_service.clone()))
            .app_data(web::Data::from(notification_store.clone()))
            .app_data(web::Data::new(Arc::new(config.clone())))
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_routes)
    })
    .bind(&bind_addr)?
    .run()
    .await;

    settlement_worker.stop();
    result
}
