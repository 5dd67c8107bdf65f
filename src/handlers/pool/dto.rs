use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::database::models::{Pool, SettlementStatus, Wager};
use crate::services::{CompletedWager, SettlementReport, WagerState};

fn default_page_num() -> u64 {
    1
}

fn default_page_size() -> u64 {
    50
}

/// Response model for a wager embedded in a pool
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WagerResponse {
    pub id: String,
    pub amount: i64,
    pub description: String,
    pub created_by: String,
    pub users: Vec<String>,
    pub active_users: Vec<String>,
    pub is_active: bool,
    pub is_complete: bool,
    pub state: WagerState,
    pub winners: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_status: Option<SettlementStatus>,
    pub created_at: u64,
}

impl From<Wager> for WagerResponse {
    fn from(wager: Wager) -> Self {
        Self {
            id: wager.id.to_hex(),
            state: wager.state(),
            amount: wager.amount,
            description: wager.description,
            created_by: wager.created_by,
            users: wager.users,
            active_users: wager.active_users,
            is_active: wager.is_active,
            is_complete: wager.is_complete,
            winners: wager.winners,
            completed_by: wager.completed_by,
            completed_at: wager.completed_at,
            settlement_status: wager.settlement_status,
            created_at: wager.created_at,
        }
    }
}

/// Response model for pool API endpoints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolResponse {
    pub id: String,
    pub name: String,
    pub created_by: String,
    pub users: Vec<String>,
    pub wagers: Vec<WagerResponse>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<Pool> for PoolResponse {
    fn from(pool: Pool) -> Self {
        Self {
            id: pool.id_hex(),
            name: pool.name,
            created_by: pool.created_by,
            users: pool.users,
            wagers: pool.wagers.into_iter().map(WagerResponse::from).collect(),
            created_at: pool.created_at,
            updated_at: pool.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteWagerResponse {
    pub wager: WagerResponse,
    pub settlement: SettlementReport,
}

impl From<CompletedWager> for CompleteWagerResponse {
    fn from(completed: CompletedWager) -> Self {
        Self {
            wager: completed.wager.into(),
            settlement: completed.settlement,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancesResponse {
    pub pool_id: String,
    pub balances: BTreeMap<String, i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePoolRequest {
    pub name: String,
    pub created_by: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUserRequest {
    pub user_email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeWagerRequest {
    pub created_by: String,
    pub amount: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptWagerRequest {
    pub user_email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteWagerRequest {
    pub completed_by: String,
    pub winners: Vec<String>,
}

/// Query for the pools a user belongs to
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPoolsQuery {
    pub user_email: String,
    #[serde(default = "default_page_num")]
    pub page_num: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}
