use bson::oid::ObjectId;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::wager::Wager;

/// Pool document for MongoDB
///
/// Wagers are embedded; a wager has no identity outside the pool that owns it.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub created_by: String,
    pub users: Vec<String>,
    // Absent when the wagers are projected out of a listing query.
    #[serde(default)]
    pub wagers: Vec<Wager>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Pool {
    pub fn new(name: String, created_by: String) -> Self {
        let now = Utc::now().timestamp() as u64;
        Self {
            id: Some(ObjectId::new()),
            name,
            users: vec![created_by.clone()],
            created_by,
            wagers: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id_hex(&self) -> String {
        self.id
            .map(|oid| oid.to_hex())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn has_user(&self, user_email: &str) -> bool {
        self.users.iter().any(|u| u == user_email)
    }

    pub fn find_wager(&self, wager_id: &ObjectId) -> Option<&Wager> {
        self.wagers.iter().find(|w| &w.id == wager_id)
    }

    /// Users from `candidates` that are not members of this pool, in the order given.
    pub fn non_members<'a>(&self, candidates: impl IntoIterator<Item = &'a String>) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for user in candidates {
            if !self.has_user(user) && !missing.contains(user) {
                missing.push(user.clone());
            }
        }
        missing
    }
}
