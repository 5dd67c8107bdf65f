mod test_pool_lifecycle;

use std::sync::Arc;
use std::time::Duration;

use bson::oid::ObjectId;

use crate::config::WagerConfig;
use crate::database::MemoryStore;
use crate::services::{NotificationEmitter, PoolService, ProposeWager, StoredNotifier};

pub(crate) const A: &str = "a@x.io";
pub(crate) const B: &str = "b@x.io";
pub(crate) const C: &str = "c@x.io";

pub(crate) fn wager_config(max_update_attempts: u32) -> WagerConfig {
    WagerConfig {
        max_update_attempts,
        retry_backoff_ms: 1,
        open_acceptance: true,
    }
}

/// Pool service over a fresh memory store that also stores notifications
pub(crate) fn service_with(config: &WagerConfig) -> (PoolService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let notifications =
        NotificationEmitter::default().with_notifier(Arc::new(StoredNotifier::new(store.clone())));
    let service = PoolService::new(store.clone(), store.clone(), notifications, config);
    (service, store)
}

pub(crate) fn service() -> (PoolService, Arc<MemoryStore>) {
    service_with(&wager_config(3))
}

/// Pool with members a, b and c
pub(crate) async fn abc_pool(service: &PoolService) -> ObjectId {
    let pool = service.create_pool("friday bets", A).await.unwrap();
    let pool_id = pool.id.unwrap();
    service.add_user(&pool_id, B).await.unwrap();
    service.add_user(&pool_id, C).await.unwrap();
    pool_id
}

pub(crate) fn proposal(created_by: &str, amount: i64, users: &[&str]) -> ProposeWager {
    ProposeWager {
        created_by: created_by.to_string(),
        amount,
        description: "first snow before december".to_string(),
        users: users.iter().map(|u| u.to_string()).collect(),
    }
}

pub(crate) fn emails(users: &[&str]) -> Vec<String> {
    users.iter().map(|u| u.to_string()).collect()
}

/// Let spawned notification deliveries run
pub(crate) async fn drain_notifications() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
