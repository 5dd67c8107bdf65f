use bson::oid::ObjectId;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Whether the point transfer for a completed wager has been written
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Pending,
    Applied,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Pending => "pending",
            SettlementStatus::Applied => "applied",
        }
    }
}

/// Wager embedded in a pool document
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wager {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub amount: i64,
    pub description: String,
    pub created_by: String,
    pub users: Vec<String>,
    pub active_users: Vec<String>,
    pub is_active: bool,
    pub is_complete: bool,
    #[serde(default)]
    pub winners: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_status: Option<SettlementStatus>,
    #[serde(default)]
    pub revision: i64,
    pub created_at: u64,
}

impl Wager {
    /// A freshly proposed wager. The creator is always a participant and the first acceptor.
    pub fn new(amount: i64, description: String, created_by: String, users: Vec<String>) -> Self {
        let mut participants: Vec<String> = Vec::with_capacity(users.len() + 1);
        if !users.contains(&created_by) {
            participants.push(created_by.clone());
        }
        for user in users {
            if !participants.contains(&user) {
                participants.push(user);
            }
        }

        Self {
            id: ObjectId::new(),
            amount,
            description,
            active_users: vec![created_by.clone()],
            created_by,
            users: participants,
            is_active: false,
            is_complete: false,
            winners: Vec::new(),
            completed_by: None,
            completed_at: None,
            settlement_status: None,
            revision: 0,
            created_at: Utc::now().timestamp() as u64,
        }
    }

    pub fn is_participant(&self, user_email: &str) -> bool {
        self.users.iter().any(|u| u == user_email)
    }

    pub fn has_accepted(&self, user_email: &str) -> bool {
        self.active_users.iter().any(|u| u == user_email)
    }

    /// Participants and acceptors, each listed once
    pub fn audience(&self) -> Vec<String> {
        let mut audience = self.users.clone();
        for user in &self.active_users {
            if !audience.contains(user) {
                audience.push(user.clone());
            }
        }
        audience
    }
}
