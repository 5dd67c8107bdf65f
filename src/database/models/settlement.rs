use bson::oid::ObjectId;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Net change to one user's points
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PointDelta {
    pub user: String,
    pub points: i64,
}

/// Settlement document, one per completed wager
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub pool_id: ObjectId,
    pub wager_id: ObjectId,
    pub amount: i64,
    pub winners: Vec<String>,
    pub deltas: Vec<PointDelta>,
    pub created_at: u64,
}

impl Settlement {
    pub fn new(
        pool_id: ObjectId,
        wager_id: ObjectId,
        amount: i64,
        winners: Vec<String>,
        deltas: Vec<PointDelta>,
    ) -> Self {
        Self {
            id: None,
            pool_id,
            wager_id,
            amount,
            winners,
            deltas,
            created_at: Utc::now().timestamp() as u64,
        }
    }
}
