use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;

use super::error::PoolResult;
use super::settlement::{RetrySummary, SettlementEngine};
use crate::config::SettlementConfig;

const DEFAULT_RETRY_INTERVAL_SECONDS: u64 = 60;

/// Background sweep that re-applies settlements left pending by a failed transfer
pub struct SettlementWorker {
    engine: SettlementEngine,
    retry_interval_seconds: u64,
    running: Arc<AtomicBool>,
}

impl SettlementWorker {
    pub fn new(engine: SettlementEngine, retry_interval_seconds: Option<u64>) -> Self {
        Self {
            engine,
            retry_interval_seconds: retry_interval_seconds
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_RETRY_INTERVAL_SECONDS),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(engine: SettlementEngine, config: &SettlementConfig) -> Self {
        Self::new(engine, Some(config.retry_interval_seconds))
    }

    pub async fn run_once(&self) -> PoolResult<RetrySummary> {
        self.engine.retry_pending().await
    }

    pub fn start(&self) -> JoinHandle<()> {
        info!(
            "Starting settlement retry worker (every {}s)...",
            self.retry_interval_seconds
        );

        let engine = self.engine.clone();
        let running = self.running.clone();
        let retry_interval = self.retry_interval_seconds;
        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(retry_interval));
            // The first tick fires immediately; skip it so startup is not a sweep
            interval.tick().await;

            while running.load(Ordering::SeqCst) {
                interval.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                if let Err(e) = engine.retry_pending().await {
                    error!("Failed to sweep pending settlements: {}", e);
                }
            }

            info!("Settlement retry worker stopped");
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
