use regex::Regex;
use std::sync::OnceLock;

use super::error::{PoolError, PoolResult};
use crate::database::models::utils::MAX_PAGE_SIZE;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
    })
}

pub fn validate_user_email(user_email: &str) -> PoolResult<()> {
    if email_pattern().is_match(user_email) {
        Ok(())
    } else {
        Err(PoolError::Validation(format!(
            "'{}' is not a valid user email",
            user_email
        )))
    }
}

pub fn validate_user_emails<'a>(users: impl IntoIterator<Item = &'a String>) -> PoolResult<()> {
    for user in users {
        validate_user_email(user)?;
    }
    Ok(())
}

pub fn validate_pool_name(name: &str) -> PoolResult<()> {
    if name.trim().is_empty() {
        return Err(PoolError::Validation("pool name must not be empty".to_string()));
    }
    Ok(())
}

/// Largest stake a single wager may carry
pub const MAX_WAGER_AMOUNT: i64 = 1_000_000_000_000;

pub fn validate_amount(amount: i64) -> PoolResult<()> {
    if amount <= 0 {
        return Err(PoolError::Validation(format!(
            "wager amount must be positive, got {}",
            amount
        )));
    }
    if amount > MAX_WAGER_AMOUNT {
        return Err(PoolError::Validation(format!(
            "wager amount must be at most {}, got {}",
            MAX_WAGER_AMOUNT, amount
        )));
    }
    Ok(())
}

pub fn validate_page(page_num: u64, page_size: u64) -> PoolResult<()> {
    if page_num == 0 || page_size == 0 {
        return Err(PoolError::Validation(
            "pageNum and pageSize must be positive".to_string(),
        ));
    }
    if page_size > MAX_PAGE_SIZE {
        return Err(PoolError::Validation(format!(
            "pageSize must be at most {}, got {}",
            MAX_PAGE_SIZE, page_size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_email_shape() {
        assert!(validate_user_email("a@x.io").is_ok());
        assert!(validate_user_email("first.last@mail.example.com").is_ok());
        assert!(validate_user_email("").is_err());
        assert!(validate_user_email("nobody").is_err());
        assert!(validate_user_email("a@b").is_err());
        assert!(validate_user_email("a b@x.io").is_err());
    }

    #[test]
    fn test_pool_name_and_amount() {
        assert!(validate_pool_name("Office pool").is_ok());
        assert!(matches!(validate_pool_name("   "), Err(PoolError::Validation(_))));
        assert!(validate_amount(1).is_ok());
        assert!(matches!(validate_amount(0), Err(PoolError::Validation(_))));
        assert!(matches!(validate_amount(-5), Err(PoolError::Validation(_))));
        assert!(validate_amount(MAX_WAGER_AMOUNT).is_ok());
        assert!(matches!(
            validate_amount(MAX_WAGER_AMOUNT + 1),
            Err(PoolError::Validation(_))
        ));
        assert!(matches!(validate_amount(i64::MAX), Err(PoolError::Validation(_))));
    }

    #[test]
    fn test_page_bounds() {
        assert!(validate_page(1, 50).is_ok());
        assert!(validate_page(3, MAX_PAGE_SIZE).is_ok());
        assert!(validate_page(0, 50).is_err());
        assert!(validate_page(1, 0).is_err());
        assert!(matches!(
            validate_page(1, MAX_PAGE_SIZE + 1),
            Err(PoolError::Validation(_))
        ));
        assert!(validate_page(1, u64::MAX).is_err());
    }
}
