//! Optimistic read-modify-write for wagers embedded in a shared pool document.
//!
//! Each attempt re-reads the pool, plans the change against that fresh wager and
//! writes it only if the wager's revision is unchanged. Concurrent writers bump
//! the revision, so a stale plan never overwrites their change.

use bson::oid::ObjectId;
use log::{debug, warn};
use rand::Rng;
use std::time::Duration;

use super::error::{ConflictReason, PoolError, PoolResult};
use crate::config::WagerConfig;
use crate::database::models::{Pool, Wager};
use crate::database::store::{PoolStore, WagerPatch};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    pub fn from_config(config: &WagerConfig) -> Self {
        Self::new(config.max_update_attempts, config.retry_backoff())
    }

    /// Delay after the given failed attempt (1-based): exponential plus up to one base of jitter
    pub(crate) fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = self.base_backoff.as_millis() as u64;
        let exponential = base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
        let jitter = if base_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=base_ms)
        };
        Duration::from_millis(exponential + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&WagerConfig::default())
    }
}

/// Outcome of a wager read-modify-write
#[derive(Debug, Clone)]
pub struct WagerUpdate {
    /// Pool as read on the successful attempt
    pub pool: Pool,
    /// Wager after the write, or as read when nothing needed writing
    pub wager: Wager,
    pub changed: bool,
}

pub async fn update_wager<F>(
    store: &dyn PoolStore,
    policy: &RetryPolicy,
    pool_id: &ObjectId,
    wager_id: &ObjectId,
    mut plan: F,
) -> PoolResult<WagerUpdate>
where
    F: FnMut(&Pool, &Wager) -> PoolResult<Option<WagerPatch>> + Send,
{
    for attempt in 1..=policy.max_attempts {
        let pool = store
            .get_by_id(pool_id)
            .await?
            .ok_or_else(|| PoolError::pool_not_found(pool_id))?;
        let wager = pool
            .find_wager(wager_id)
            .cloned()
            .ok_or_else(|| PoolError::wager_not_found(wager_id))?;

        let Some(patch) = plan(&pool, &wager)? else {
            return Ok(WagerUpdate {
                pool,
                wager,
                changed: false,
            });
        };

        match store
            .update_wager(pool_id, wager_id, wager.revision, &patch)
            .await?
        {
            Some(updated) => {
                return Ok(WagerUpdate {
                    pool,
                    wager: updated,
                    changed: true,
                })
            }
            None => {
                debug!(
                    "Wager {} moved past revision {} (attempt {}/{})",
                    wager_id, wager.revision, attempt, policy.max_attempts
                );
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.backoff(attempt)).await;
                }
            }
        }
    }

    warn!(
        "Giving up on wager {} in pool {} after {} conflicting attempts",
        wager_id, pool_id, policy.max_attempts
    );
    Err(ConflictReason::RetriesExhausted {
        wager_id: wager_id.to_hex(),
        attempts: policy.max_attempts,
    }
    .into())
}
