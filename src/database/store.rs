//! Storage seams used by the pool services.
//!
//! Every write here is atomic on a single document. Nothing spans documents.

use anyhow::Result;
use async_trait::async_trait;
use bson::oid::ObjectId;

use super::models::{Notification, Page, Pool, Settlement, SettlementStatus, Wager};

/// Completion fields written together with the `isComplete` flag
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub winners: Vec<String>,
    pub completed_by: String,
    pub completed_at: u64,
}

/// In-place change to one embedded wager.
///
/// Applied as a single element update; the store always bumps `revision` by one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WagerPatch {
    pub is_active: Option<bool>,
    pub add_active_user: Option<String>,
    pub complete: Option<Completion>,
    pub settlement_status: Option<SettlementStatus>,
}

impl WagerPatch {
    /// Apply the patch to an in-memory copy, mirroring what the store does
    pub fn apply_to(&self, wager: &mut Wager) {
        if let Some(is_active) = self.is_active {
            wager.is_active = is_active;
        }
        if let Some(user) = &self.add_active_user {
            if !wager.active_users.contains(user) {
                wager.active_users.push(user.clone());
            }
        }
        if let Some(completion) = &self.complete {
            wager.is_complete = true;
            wager.winners = completion.winners.clone();
            wager.completed_by = Some(completion.completed_by.clone());
            wager.completed_at = Some(completion.completed_at);
        }
        if let Some(status) = self.settlement_status {
            wager.settlement_status = Some(status);
        }
        wager.revision += 1;
    }
}

/// Pool documents and their embedded wagers
#[async_trait]
pub trait PoolStore: Send + Sync {
    async fn get_by_id(&self, pool_id: &ObjectId) -> Result<Option<Pool>>;

    async fn insert_one(&self, pool: Pool) -> Result<Pool>;

    /// Delete a pool, returning the removed document
    async fn delete_one(&self, pool_id: &ObjectId) -> Result<Option<Pool>>;

    /// Set-add a user to the pool. Returns false when the pool does not exist.
    async fn add_user(&self, pool_id: &ObjectId, user_email: &str) -> Result<bool>;

    /// Append a wager. Returns false when the pool does not exist.
    async fn add_wager(&self, pool_id: &ObjectId, wager: &Wager) -> Result<bool>;

    /// Remove a wager only while it is not complete, returning the removed wager.
    /// `None` means nothing matched: pool or wager missing, or the wager is complete.
    async fn pull_open_wager(&self, pool_id: &ObjectId, wager_id: &ObjectId)
        -> Result<Option<Wager>>;

    /// Apply `patch` to the wager only if its revision still equals `expected_revision`.
    /// `None` means nothing matched and the caller has to re-read.
    async fn update_wager(
        &self,
        pool_id: &ObjectId,
        wager_id: &ObjectId,
        expected_revision: i64,
        patch: &WagerPatch,
    ) -> Result<Option<Wager>>;

    /// Pools the user belongs to, newest first, wagers projected out
    async fn get_user_pools(&self, page_num: u64, page_size: u64, user_email: &str)
        -> Result<Page<Pool>>;

    /// Pools holding at least one complete wager whose settlement is still pending
    async fn find_pending_settlements(&self) -> Result<Vec<Pool>>;
}

/// Settlement documents, at most one per wager
#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Record a settlement. Returns false if one already exists for the wager.
    async fn record(&self, settlement: &Settlement) -> Result<bool>;

    async fn find_by_pool(&self, pool_id: &ObjectId) -> Result<Vec<Settlement>>;
}

/// Persisted per-user notifications
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: &Notification) -> Result<()>;

    /// Undismissed notifications for a user, newest first
    async fn find_for_user(
        &self,
        page_num: u64,
        page_size: u64,
        user_email: &str,
    ) -> Result<Page<Notification>>;

    async fn mark_read(&self, notification_id: &ObjectId) -> Result<bool>;

    async fn mark_all_read(&self, user_email: &str) -> Result<u64>;

    async fn dismiss(&self, notification_id: &ObjectId) -> Result<bool>;
}
