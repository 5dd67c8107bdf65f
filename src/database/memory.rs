//! In-memory document store.
//!
//! Each pool document sits behind its own `DashMap` entry lock, which gives the
//! same single-document atomicity the MongoDB repositories rely on.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::models::utils::page_offset;
use super::models::{Notification, Page, Pool, Settlement, SettlementStatus, Wager};
use super::store::{NotificationStore, PoolStore, SettlementStore, WagerPatch};

#[derive(Debug, Default)]
pub struct MemoryStore {
    pools: DashMap<ObjectId, Pool>,
    // Keyed by wager id, which keeps recording idempotent
    settlements: DashMap<ObjectId, Settlement>,
    notifications: DashMap<ObjectId, Notification>,
    failing_settlement_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` settlement writes fail
    pub fn fail_next_settlement_writes(&self, count: usize) {
        self.failing_settlement_writes.store(count, Ordering::SeqCst);
    }

    fn take_settlement_failure(&self) -> bool {
        self.failing_settlement_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// All stored notifications for a user, dismissed ones included, oldest first
    pub fn notifications_for(&self, user_email: &str) -> Vec<Notification> {
        let mut found: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.user_email == user_email)
            .map(|n| n.value().clone())
            .collect();
        found.sort_by_key(|n| n.id);
        found
    }
}

fn paginate<T>(mut items: Vec<T>, page_num: u64, page_size: u64) -> Page<T> {
    let total_items = items.len() as u64;
    let offset = page_offset(page_num, page_size) as usize;
    let items: Vec<T> = if offset >= items.len() {
        Vec::new()
    } else {
        items.drain(offset..).take(page_size as usize).collect()
    };
    Page::new(items, page_num, page_size, total_items)
}

#[async_trait]
impl PoolStore for MemoryStore {
    async fn get_by_id(&self, pool_id: &ObjectId) -> Result<Option<Pool>> {
        Ok(self.pools.get(pool_id).map(|p| p.value().clone()))
    }

    async fn insert_one(&self, mut pool: Pool) -> Result<Pool> {
        let id = *pool.id.get_or_insert_with(ObjectId::new);
        if self.pools.contains_key(&id) {
            return Err(anyhow!("Pool {} already exists", id));
        }
        self.pools.insert(id, pool.clone());
        Ok(pool)
    }

    async fn delete_one(&self, pool_id: &ObjectId) -> Result<Option<Pool>> {
        Ok(self.pools.remove(pool_id).map(|(_, pool)| pool))
    }

    async fn add_user(&self, pool_id: &ObjectId, user_email: &str) -> Result<bool> {
        let Some(mut pool) = self.pools.get_mut(pool_id) else {
            return Ok(false);
        };
        if !pool.has_user(user_email) {
            pool.users.push(user_email.to_string());
            pool.updated_at = Utc::now().timestamp() as u64;
        }
        Ok(true)
    }

    async fn add_wager(&self, pool_id: &ObjectId, wager: &Wager) -> Result<bool> {
        let Some(mut pool) = self.pools.get_mut(pool_id) else {
            return Ok(false);
        };
        if !pool.wagers.iter().any(|w| w.id == wager.id) {
            pool.wagers.push(wager.clone());
            pool.updated_at = Utc::now().timestamp() as u64;
        }
        Ok(true)
    }

    async fn pull_open_wager(
        &self,
        pool_id: &ObjectId,
        wager_id: &ObjectId,
    ) -> Result<Option<Wager>> {
        let Some(mut pool) = self.pools.get_mut(pool_id) else {
            return Ok(None);
        };
        let Some(index) = pool
            .wagers
            .iter()
            .position(|w| &w.id == wager_id && !w.is_complete)
        else {
            return Ok(None);
        };

        pool.updated_at = Utc::now().timestamp() as u64;
        Ok(Some(pool.wagers.remove(index)))
    }

    async fn update_wager(
        &self,
        pool_id: &ObjectId,
        wager_id: &ObjectId,
        expected_revision: i64,
        patch: &WagerPatch,
    ) -> Result<Option<Wager>> {
        let Some(mut pool) = self.pools.get_mut(pool_id) else {
            return Ok(None);
        };
        let Some(wager) = pool
            .wagers
            .iter_mut()
            .find(|w| &w.id == wager_id && w.revision == expected_revision)
        else {
            debug!(
                "No wager {} at revision {} in pool {}",
                wager_id, expected_revision, pool_id
            );
            return Ok(None);
        };

        patch.apply_to(wager);
        let updated = wager.clone();
        pool.updated_at = Utc::now().timestamp() as u64;
        Ok(Some(updated))
    }

    async fn get_user_pools(
        &self,
        page_num: u64,
        page_size: u64,
        user_email: &str,
    ) -> Result<Page<Pool>> {
        let mut pools: Vec<Pool> = self
            .pools
            .iter()
            .filter(|p| p.has_user(user_email))
            .map(|p| {
                let mut pool = p.value().clone();
                pool.wagers.clear();
                pool
            })
            .collect();
        // ObjectIds grow with creation time, so this is newest first
        pools.sort_by(|a, b| b.id.cmp(&a.id));

        Ok(paginate(pools, page_num, page_size))
    }

    async fn find_pending_settlements(&self) -> Result<Vec<Pool>> {
        Ok(self
            .pools
            .iter()
            .filter(|p| {
                p.wagers.iter().any(|w| {
                    w.is_complete && w.settlement_status == Some(SettlementStatus::Pending)
                })
            })
            .map(|p| p.value().clone())
            .collect())
    }
}

#[async_trait]
impl SettlementStore for MemoryStore {
    async fn record(&self, settlement: &Settlement) -> Result<bool> {
        if self.take_settlement_failure() {
            return Err(anyhow!("settlement store unavailable"));
        }

        match self.settlements.entry(settlement.wager_id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                let mut stored = settlement.clone();
                stored.id.get_or_insert_with(ObjectId::new);
                entry.insert(stored);
                Ok(true)
            }
        }
    }

    async fn find_by_pool(&self, pool_id: &ObjectId) -> Result<Vec<Settlement>> {
        let mut settlements: Vec<Settlement> = self
            .settlements
            .iter()
            .filter(|s| &s.pool_id == pool_id)
            .map(|s| s.value().clone())
            .collect();
        settlements.sort_by_key(|s| s.id);
        Ok(settlements)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        let mut stored = notification.clone();
        let id = *stored.id.get_or_insert_with(ObjectId::new);
        self.notifications.insert(id, stored);
        Ok(())
    }

    async fn find_for_user(
        &self,
        page_num: u64,
        page_size: u64,
        user_email: &str,
    ) -> Result<Page<Notification>> {
        let mut found: Vec<Notification> = self
            .notifications_for(user_email)
            .into_iter()
            .filter(|n| !n.is_dismissed)
            .collect();
        found.reverse();

        Ok(paginate(found, page_num, page_size))
    }

    async fn mark_read(&self, notification_id: &ObjectId) -> Result<bool> {
        match self.notifications.get_mut(notification_id) {
            Some(mut notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_email: &str) -> Result<u64> {
        let mut modified = 0;
        for mut notification in self.notifications.iter_mut() {
            if notification.user_email == user_email
                && !notification.is_read
                && !notification.is_dismissed
            {
                notification.is_read = true;
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn dismiss(&self, notification_id: &ObjectId) -> Result<bool> {
        match self.notifications.get_mut(notification_id) {
            Some(mut notification) => {
                notification.is_dismissed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
