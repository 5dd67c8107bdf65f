//! Wager lifecycle: Proposed -> Active -> Settled.
//!
//! Planning functions are pure. They look at a freshly read wager and either
//! refuse the transition or describe the element update that performs it.
//! `Settled` is terminal.

use chrono::Utc;
use serde::Serialize;

use super::error::{ConflictReason, PoolError, PoolResult};
use crate::database::models::{SettlementStatus, Wager};
use crate::database::store::{Completion, WagerPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WagerState {
    Proposed,
    Active,
    Settled,
}

impl Wager {
    pub fn state(&self) -> WagerState {
        if self.is_complete {
            WagerState::Settled
        } else if self.is_active {
            WagerState::Active
        } else {
            WagerState::Proposed
        }
    }
}

fn already_settled(wager: &Wager) -> PoolError {
    ConflictReason::AlreadySettled {
        wager_id: wager.id.to_hex(),
    }
    .into()
}

/// Accept: Proposed | Active -> Active.
///
/// A single acceptance activates the wager. `Ok(None)` means the user has already
/// accepted an active wager and nothing needs writing.
pub fn plan_accept(
    wager: &Wager,
    user_email: &str,
    open_acceptance: bool,
) -> PoolResult<Option<WagerPatch>> {
    if wager.state() == WagerState::Settled {
        return Err(already_settled(wager));
    }

    if !open_acceptance && !wager.is_participant(user_email) {
        return Err(PoolError::not_wager_participants(
            wager.id,
            vec![user_email.to_string()],
        ));
    }

    if wager.is_active && wager.has_accepted(user_email) {
        return Ok(None);
    }

    Ok(Some(WagerPatch {
        is_active: Some(true),
        add_active_user: Some(user_email.to_string()),
        ..Default::default()
    }))
}

/// Complete: Proposed | Active -> Settled, recording the winners.
///
/// The settlement is left pending; the settlement engine applies it afterwards.
pub fn plan_complete(
    wager: &Wager,
    completed_by: &str,
    winners: &[String],
) -> PoolResult<WagerPatch> {
    if wager.state() == WagerState::Settled {
        return Err(already_settled(wager));
    }

    let mut unique_winners: Vec<String> = Vec::with_capacity(winners.len());
    for winner in winners {
        if !unique_winners.contains(winner) {
            unique_winners.push(winner.clone());
        }
    }

    if unique_winners.is_empty() {
        return Err(PoolError::Validation(
            "a wager needs at least one winner".to_string(),
        ));
    }

    let outsiders: Vec<String> = unique_winners
        .iter()
        .filter(|w| !wager.is_participant(w))
        .cloned()
        .collect();
    if !outsiders.is_empty() {
        return Err(PoolError::not_wager_participants(wager.id, outsiders));
    }

    Ok(WagerPatch {
        complete: Some(Completion {
            winners: unique_winners,
            completed_by: completed_by.to_string(),
            completed_at: Utc::now().timestamp() as u64,
        }),
        settlement_status: Some(SettlementStatus::Pending),
        ..Default::default()
    })
}

/// Marks the settlement of a completed wager as applied; `Ok(None)` if it already is.
pub fn plan_settlement_applied(wager: &Wager) -> PoolResult<Option<WagerPatch>> {
    if !wager.is_complete {
        return Err(PoolError::Validation(format!(
            "wager {} is not complete",
            wager.id
        )));
    }

    if wager.settlement_status == Some(SettlementStatus::Applied) {
        return Ok(None);
    }

    Ok(Some(WagerPatch {
        settlement_status: Some(SettlementStatus::Applied),
        ..Default::default()
    }))
}

/// Only wagers that have not been settled can be removed.
pub fn check_removable(wager: &Wager) -> PoolResult<()> {
    if wager.state() == WagerState::Settled {
        return Err(already_settled(wager));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wager() -> Wager {
        Wager::new(
            10,
            "first snow before december".to_string(),
            "a@x.io".to_string(),
            vec!["a@x.io".to_string(), "b@x.io".to_string()],
        )
    }

    fn apply(wager: &mut Wager, patch: Option<WagerPatch>) {
        if let Some(patch) = patch {
            patch.apply_to(wager);
        }
    }

    #[test]
    fn test_accept_activates_proposed_wager() {
        let mut wager = wager();
        assert_eq!(wager.state(), WagerState::Proposed);

        let patch = plan_accept(&wager, "b@x.io", true).unwrap();
        apply(&mut wager, patch);

        assert_eq!(wager.state(), WagerState::Active);
        assert_eq!(wager.active_users, vec!["a@x.io", "b@x.io"]);
    }

    #[test]
    fn test_repeated_accept_is_a_no_op() {
        let mut wager = wager();
        let patch = plan_accept(&wager, "b@x.io", true).unwrap();
        apply(&mut wager, patch);
        let revision = wager.revision;

        assert!(plan_accept(&wager, "b@x.io", true).unwrap().is_none());
        assert_eq!(wager.revision, revision);
        assert_eq!(wager.active_users, vec!["a@x.io", "b@x.io"]);
    }

    #[test]
    fn test_creator_accept_activates() {
        // The creator is already an active user, but an explicit accept still flips isActive
        let mut wager = wager();
        let patch = plan_accept(&wager, "a@x.io", true).unwrap();
        assert!(patch.is_some());

        apply(&mut wager, patch);
        assert!(wager.is_active);
        assert_eq!(wager.active_users, vec!["a@x.io"]);
    }

    #[test]
    fn test_accept_by_outsider() {
        let wager = wager();
        assert!(plan_accept(&wager, "c@x.io", true).unwrap().is_some());

        let err = plan_accept(&wager, "c@x.io", false).unwrap_err();
        assert_eq!(err.kind(), "MEMBERSHIP_ERROR");
    }

    #[test]
    fn test_accept_settled_wager_conflicts() {
        let mut wager = wager();
        let patch = plan_complete(&wager, "a@x.io", &["b@x.io".to_string()]).unwrap();
        apply(&mut wager, Some(patch));

        let err = plan_accept(&wager, "b@x.io", true).unwrap_err();
        assert!(matches!(
            err,
            PoolError::Conflict(ConflictReason::AlreadySettled { .. })
        ));
    }

    #[test]
    fn test_complete_records_winners_and_pending_settlement() {
        let mut wager = wager();
        let winners = vec!["b@x.io".to_string(), "b@x.io".to_string()];
        let patch = plan_complete(&wager, "a@x.io", &winners).unwrap();
        patch.apply_to(&mut wager);

        assert_eq!(wager.state(), WagerState::Settled);
        assert_eq!(wager.winners, vec!["b@x.io"]);
        assert_eq!(wager.completed_by.as_deref(), Some("a@x.io"));
        assert_eq!(wager.settlement_status, Some(SettlementStatus::Pending));
    }

    #[test]
    fn test_complete_twice_conflicts() {
        let mut wager = wager();
        plan_complete(&wager, "a@x.io", &["b@x.io".to_string()])
            .unwrap()
            .apply_to(&mut wager);

        let err = plan_complete(&wager, "a@x.io", &["a@x.io".to_string()]).unwrap_err();
        assert_eq!(err.kind(), "CONFLICT_ERROR");
    }

    #[test]
    fn test_complete_validates_winners() {
        let wager = wager();

        let err = plan_complete(&wager, "a@x.io", &[]).unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_ERROR");

        let err = plan_complete(&wager, "a@x.io", &["c@x.io".to_string()]).unwrap_err();
        match err {
            PoolError::Membership { users, .. } => assert_eq!(users, vec!["c@x.io"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_settlement_applied_once() {
        let mut wager = wager();
        assert!(plan_settlement_applied(&wager).is_err());

        plan_complete(&wager, "a@x.io", &["b@x.io".to_string()])
            .unwrap()
            .apply_to(&mut wager);
        let patch = plan_settlement_applied(&wager).unwrap();
        apply(&mut wager, patch);

        assert_eq!(wager.settlement_status, Some(SettlementStatus::Applied));
        assert!(plan_settlement_applied(&wager).unwrap().is_none());
    }

    #[test]
    fn test_only_open_wagers_are_removable() {
        let mut wager = wager();
        assert!(check_removable(&wager).is_ok());

        plan_complete(&wager, "a@x.io", &["b@x.io".to_string()])
            .unwrap()
            .apply_to(&mut wager);
        assert!(check_removable(&wager).is_err());
    }
}
