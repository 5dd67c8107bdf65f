use bson::oid::ObjectId;
use log::{debug, error, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::{ConflictReason, PoolError, PoolResult};
use super::lifecycle::{check_removable, plan_accept, plan_complete};
use super::notification_handler::NotificationEmitter;
use super::settlement::SettlementEngine;
use super::update_protocol::{update_wager, RetryPolicy};
use super::validation::{
    validate_amount, validate_page, validate_pool_name, validate_user_email, validate_user_emails,
};
use crate::config::WagerConfig;
use crate::database::models::{Page, PointDelta, Pool, PoolEvent, Wager};
use crate::database::store::{PoolStore, SettlementStore};

/// Input for proposing a wager
#[derive(Debug, Clone)]
pub struct ProposeWager {
    pub created_by: String,
    pub amount: i64,
    pub description: String,
    pub users: Vec<String>,
}

/// What happened to the point transfer of a just-completed wager
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SettlementReport {
    Applied { deltas: Vec<PointDelta> },
    Pending { reason: String },
}

#[derive(Debug, Clone)]
pub struct CompletedWager {
    pub wager: Wager,
    pub settlement: SettlementReport,
}

/// Pool aggregate operations.
///
/// Structural checks run against a fresh read before anything is written.
/// In-place wager changes go through the optimistic update protocol.
#[derive(Clone)]
pub struct PoolService {
    pools: Arc<dyn PoolStore>,
    settlement: SettlementEngine,
    notifications: NotificationEmitter,
    policy: RetryPolicy,
    open_acceptance: bool,
}

fn pool_link(pool_id: &ObjectId) -> String {
    format!("/pools/{}", pool_id.to_hex())
}

fn wager_link(pool_id: &ObjectId, wager_id: &ObjectId) -> String {
    format!("/pools/{}/wagers/{}", pool_id.to_hex(), wager_id.to_hex())
}

fn everyone_but(users: Vec<String>, actor: &str) -> Vec<String> {
    users.into_iter().filter(|u| u != actor).collect()
}

impl PoolService {
    pub fn new(
        pools: Arc<dyn PoolStore>,
        settlements: Arc<dyn SettlementStore>,
        notifications: NotificationEmitter,
        config: &WagerConfig,
    ) -> Self {
        let policy = RetryPolicy::from_config(config);
        Self {
            settlement: SettlementEngine::new(pools.clone(), settlements, policy.clone()),
            pools,
            notifications,
            policy,
            open_acceptance: config.open_acceptance,
        }
    }

    pub fn settlement_engine(&self) -> &SettlementEngine {
        &self.settlement
    }

    async fn require_pool(&self, pool_id: &ObjectId) -> PoolResult<Pool> {
        self.pools
            .get_by_id(pool_id)
            .await?
            .ok_or_else(|| PoolError::pool_not_found(pool_id))
    }

    pub async fn create_pool(&self, name: &str, created_by: &str) -> PoolResult<Pool> {
        validate_pool_name(name)?;
        validate_user_email(created_by)?;

        let pool = self
            .pools
            .insert_one(Pool::new(name.trim().to_string(), created_by.to_string()))
            .await?;
        info!("Created pool {} \"{}\" for {}", pool.id_hex(), pool.name, created_by);

        if let Some(pool_id) = pool.id {
            self.notifications.emit(
                PoolEvent::PoolCreated,
                created_by,
                &[created_by.to_string()],
                "Pool created",
                &format!("You created the pool \"{}\"", pool.name),
                &pool_link(&pool_id),
            );
        }

        Ok(pool)
    }

    pub async fn get_pool_by_id(&self, pool_id: &ObjectId) -> PoolResult<Pool> {
        debug!("Getting pool {}", pool_id);
        self.require_pool(pool_id).await
    }

    pub async fn delete_pool(&self, pool_id: &ObjectId) -> PoolResult<Pool> {
        let deleted = self
            .pools
            .delete_one(pool_id)
            .await?
            .ok_or_else(|| PoolError::pool_not_found(pool_id))?;
        info!("Deleted pool {} \"{}\"", pool_id, deleted.name);
        Ok(deleted)
    }

    /// Set-add a user; adding an existing member is a no-op
    pub async fn add_user(&self, pool_id: &ObjectId, user_email: &str) -> PoolResult<Pool> {
        validate_user_email(user_email)?;

        if !self.pools.add_user(pool_id, user_email).await? {
            return Err(PoolError::pool_not_found(pool_id));
        }
        info!("Added {} to pool {}", user_email, pool_id);

        self.require_pool(pool_id).await
    }

    pub async fn get_user_pools(
        &self,
        page_num: u64,
        page_size: u64,
        user_email: &str,
    ) -> PoolResult<Page<Pool>> {
        debug!("Getting pools for {}", user_email);
        validate_page(page_num, page_size)?;
        Ok(self
            .pools
            .get_user_pools(page_num, page_size, user_email)
            .await?)
    }

    /// Propose a wager among current pool members.
    ///
    /// Membership is checked against a fresh read of the pool.
    pub async fn propose_wager(&self, pool_id: &ObjectId, request: ProposeWager) -> PoolResult<Wager> {
        validate_amount(request.amount)?;
        validate_user_email(&request.created_by)?;
        validate_user_emails(&request.users)?;

        let pool = self.require_pool(pool_id).await?;
        let outsiders =
            pool.non_members(std::iter::once(&request.created_by).chain(request.users.iter()));
        if !outsiders.is_empty() {
            return Err(PoolError::not_pool_members(pool_id, outsiders));
        }

        let wager = Wager::new(
            request.amount,
            request.description,
            request.created_by,
            request.users,
        );
        if !self.pools.add_wager(pool_id, &wager).await? {
            return Err(PoolError::pool_not_found(pool_id));
        }
        info!(
            "Wager {} for {} points proposed in pool {} by {}",
            wager.id, wager.amount, pool_id, wager.created_by
        );

        self.notifications.emit(
            PoolEvent::WagerProposed,
            &wager.created_by,
            &everyone_but(wager.users.clone(), &wager.created_by),
            "New wager",
            &format!(
                "{} proposed a {} point wager in \"{}\": {}",
                wager.created_by, wager.amount, pool.name, wager.description
            ),
            &wager_link(pool_id, &wager.id),
        );

        Ok(wager)
    }

    pub async fn accept_wager(
        &self,
        pool_id: &ObjectId,
        wager_id: &ObjectId,
        user_email: &str,
    ) -> PoolResult<Wager> {
        validate_user_email(user_email)?;

        let open_acceptance = self.open_acceptance;
        let update = update_wager(
            self.pools.as_ref(),
            &self.policy,
            pool_id,
            wager_id,
            |_, wager| plan_accept(wager, user_email, open_acceptance),
        )
        .await?;

        if !update.changed {
            debug!("{} had already accepted wager {}", user_email, wager_id);
            return Ok(update.wager);
        }

        let wager = update.wager;
        info!(
            "{} accepted wager {} in pool {} ({} active users)",
            user_email,
            wager_id,
            pool_id,
            wager.active_users.len()
        );
        self.notifications.emit(
            PoolEvent::WagerAccepted,
            user_email,
            &everyone_but(wager.audience(), user_email),
            "Wager accepted",
            &format!(
                "{} accepted the wager \"{}\" in \"{}\"",
                user_email, wager.description, update.pool.name
            ),
            &wager_link(pool_id, wager_id),
        );

        Ok(wager)
    }

    /// Complete a wager, then settle it.
    ///
    /// The completion is stored first and stands even if settlement fails; the
    /// failure is reported as a pending settlement and retried later.
    pub async fn complete_wager(
        &self,
        pool_id: &ObjectId,
        wager_id: &ObjectId,
        completed_by: &str,
        winners: &[String],
    ) -> PoolResult<CompletedWager> {
        validate_user_email(completed_by)?;

        let update = update_wager(
            self.pools.as_ref(),
            &self.policy,
            pool_id,
            wager_id,
            |_, wager| plan_complete(wager, completed_by, winners).map(Some),
        )
        .await?;
        let completed = update.wager;
        info!(
            "{} completed wager {} in pool {}, winners: {}",
            completed_by,
            wager_id,
            pool_id,
            completed.winners.join(", ")
        );

        self.notifications.emit(
            PoolEvent::WagerCompleted,
            completed_by,
            &everyone_but(completed.audience(), completed_by),
            "Wager completed",
            &format!(
                "{} completed the wager \"{}\" in \"{}\". Winners: {}",
                completed_by,
                completed.description,
                update.pool.name,
                completed.winners.join(", ")
            ),
            &wager_link(pool_id, wager_id),
        );

        match self.settlement.settle(pool_id, &completed).await {
            Ok((settlement, wager)) => Ok(CompletedWager {
                wager,
                settlement: SettlementReport::Applied {
                    deltas: settlement.deltas,
                },
            }),
            Err(e) => {
                error!(
                    "Wager {} is complete but its settlement is pending: {}",
                    wager_id, e
                );
                Ok(CompletedWager {
                    wager: completed,
                    settlement: SettlementReport::Pending {
                        reason: e.to_string(),
                    },
                })
            }
        }
    }

    /// Remove a wager that has not been settled
    pub async fn remove_wager(&self, pool_id: &ObjectId, wager_id: &ObjectId) -> PoolResult<Wager> {
        for attempt in 1..=self.policy.max_attempts {
            if let Some(removed) = self.pools.pull_open_wager(pool_id, wager_id).await? {
                info!("Removed wager {} from pool {}", wager_id, pool_id);
                return Ok(removed);
            }

            // Nothing was pulled; work out why from a fresh read
            let pool = self.require_pool(pool_id).await?;
            let wager = pool
                .find_wager(wager_id)
                .ok_or_else(|| PoolError::wager_not_found(wager_id))?;
            check_removable(wager)?;

            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.backoff(attempt)).await;
            }
        }

        Err(ConflictReason::RetriesExhausted {
            wager_id: wager_id.to_hex(),
            attempts: self.policy.max_attempts,
        }
        .into())
    }

    pub async fn get_balances(&self, pool_id: &ObjectId) -> PoolResult<BTreeMap<String, i64>> {
        self.settlement.pool_balances(pool_id).await
    }
}
