use thiserror::Error;

/// Why a wager write was refused as a conflict
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    #[error("wager {wager_id} is already settled")]
    AlreadySettled { wager_id: String },

    #[error("wager {wager_id} changed concurrently {attempts} times in a row")]
    RetriesExhausted { wager_id: String, attempts: u32 },
}

/// Errors raised by pool and wager operations
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not members of {scope}: {}", users.join(", "))]
    Membership { scope: String, users: Vec<String> },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Conflict(#[from] ConflictReason),

    #[error("settlement of wager {wager_id} failed: {reason}")]
    Settlement { wager_id: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type PoolResult<T> = Result<T, PoolError>;

impl PoolError {
    pub fn pool_not_found(id: impl ToString) -> Self {
        PoolError::NotFound {
            entity: "pool",
            id: id.to_string(),
        }
    }

    pub fn wager_not_found(id: impl ToString) -> Self {
        PoolError::NotFound {
            entity: "wager",
            id: id.to_string(),
        }
    }

    pub fn not_pool_members(pool_id: impl std::fmt::Display, users: Vec<String>) -> Self {
        PoolError::Membership {
            scope: format!("pool {}", pool_id),
            users,
        }
    }

    pub fn not_wager_participants(wager_id: impl std::fmt::Display, users: Vec<String>) -> Self {
        PoolError::Membership {
            scope: format!("wager {}", wager_id),
            users,
        }
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            PoolError::Validation(_) => "VALIDATION_ERROR",
            PoolError::Membership { .. } => "MEMBERSHIP_ERROR",
            PoolError::NotFound { .. } => "NOT_FOUND_ERROR",
            PoolError::Conflict(_) => "CONFLICT_ERROR",
            PoolError::Settlement { .. } => "SETTLEMENT_ERROR",
            PoolError::Store(_) => "STORE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_error_names_users() {
        let err = PoolError::not_pool_members(
            "p1",
            vec!["c@x.io".to_string(), "d@x.io".to_string()],
        );
        assert_eq!(err.to_string(), "not members of pool p1: c@x.io, d@x.io");
        assert_eq!(err.kind(), "MEMBERSHIP_ERROR");
    }

    #[test]
    fn test_conflict_kind() {
        let err: PoolError = ConflictReason::AlreadySettled {
            wager_id: "w1".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "CONFLICT_ERROR");
        assert_eq!(err.to_string(), "wager w1 is already settled");
    }
}
