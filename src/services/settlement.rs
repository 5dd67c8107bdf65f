//! Point settlement for completed wagers.
//!
//! The stake moves from the losing acceptors to the winners: winners split the
//! amount equally, losers (`activeUsers` minus winners) pay it equally. Integer
//! remainders go one point at a time to the first users in list order, so the
//! deltas always sum to zero.

use bson::oid::ObjectId;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::{PoolError, PoolResult};
use super::lifecycle::plan_settlement_applied;
use super::update_protocol::{update_wager, RetryPolicy};
use crate::database::models::{PointDelta, Settlement, SettlementStatus, Wager};
use crate::database::store::{PoolStore, SettlementStore};

/// Split `total` points across `count` recipients, remainder to the first ones
fn shares(total: i64, count: usize) -> impl Iterator<Item = i64> {
    let count = count as i64;
    let base = total / count;
    let remainder = total % count;
    (0..count).map(move |i| if i < remainder { base + 1 } else { base })
}

/// Point deltas for a wager resolved in favour of `winners`.
///
/// Empty when there is nobody to pay (no winners, or every acceptor won).
pub fn split_points(amount: i64, winners: &[String], active_users: &[String]) -> Vec<PointDelta> {
    let mut losers: Vec<&String> = Vec::new();
    for user in active_users {
        if !winners.contains(user) && !losers.contains(&user) {
            losers.push(user);
        }
    }

    if winners.is_empty() || losers.is_empty() || amount <= 0 {
        return Vec::new();
    }

    let credits = winners
        .iter()
        .zip(shares(amount, winners.len()))
        .map(|(user, points)| PointDelta {
            user: user.clone(),
            points,
        });
    let debits = losers
        .iter()
        .zip(shares(amount, losers.len()))
        .map(|(user, points)| PointDelta {
            user: (*user).clone(),
            points: -points,
        });

    credits.chain(debits).collect()
}

/// Net points per user. Every listed member starts at zero.
///
/// Fails with `SettlementError` naming the offending wager if a total leaves the
/// `i64` range.
pub fn balances<'a>(
    members: impl IntoIterator<Item = &'a String>,
    settlements: &[Settlement],
) -> PoolResult<BTreeMap<String, i64>> {
    let mut totals: BTreeMap<String, i64> = members.into_iter().map(|m| (m.clone(), 0)).collect();
    for settlement in settlements {
        for delta in &settlement.deltas {
            let total = totals.entry(delta.user.clone()).or_insert(0);
            *total = total
                .checked_add(delta.points)
                .ok_or_else(|| PoolError::Settlement {
                    wager_id: settlement.wager_id.to_hex(),
                    reason: format!("balance of {} overflows", delta.user),
                })?;
        }
    }
    Ok(totals)
}

/// Counts from one sweep over pending settlements
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetrySummary {
    pub attempted: usize,
    pub applied: usize,
    pub failed: usize,
}

/// Applies the point transfer for completed wagers.
///
/// Runs after the completion flag is stored and never undoes it. A failure leaves
/// the wager `pending` for the retry sweep.
#[derive(Clone)]
pub struct SettlementEngine {
    pools: Arc<dyn PoolStore>,
    settlements: Arc<dyn SettlementStore>,
    policy: RetryPolicy,
}

impl SettlementEngine {
    pub fn new(
        pools: Arc<dyn PoolStore>,
        settlements: Arc<dyn SettlementStore>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            pools,
            settlements,
            policy,
        }
    }

    /// Record the settlement for a completed wager and mark it applied.
    ///
    /// Safe to call repeatedly: the settlement document is unique per wager.
    pub async fn settle(&self, pool_id: &ObjectId, wager: &Wager) -> PoolResult<(Settlement, Wager)> {
        let wager_id = wager.id;
        let failed = |reason: String| PoolError::Settlement {
            wager_id: wager_id.to_hex(),
            reason,
        };

        if !wager.is_complete {
            return Err(failed("wager is not complete".to_string()));
        }

        let deltas = split_points(wager.amount, &wager.winners, &wager.active_users);
        let settlement = Settlement::new(
            *pool_id,
            wager.id,
            wager.amount,
            wager.winners.clone(),
            deltas,
        );

        let recorded = self
            .settlements
            .record(&settlement)
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !recorded {
            debug!("Settlement for wager {} was already recorded", wager_id);
        }

        let update = update_wager(
            self.pools.as_ref(),
            &self.policy,
            pool_id,
            &wager_id,
            |_, current| plan_settlement_applied(current),
        )
        .await
        .map_err(|e| failed(e.to_string()))?;

        info!(
            "Settled wager {} in pool {}: {} point transfers",
            wager_id,
            pool_id,
            settlement.deltas.len()
        );
        Ok((settlement, update.wager))
    }

    /// Retry every complete wager whose settlement is still pending
    pub async fn retry_pending(&self) -> PoolResult<RetrySummary> {
        let pools = self.pools.find_pending_settlements().await?;
        let mut summary = RetrySummary::default();

        for pool in pools {
            let Some(pool_id) = pool.id else {
                continue;
            };
            let pending = pool.wagers.iter().filter(|w| {
                w.is_complete && w.settlement_status == Some(SettlementStatus::Pending)
            });

            for wager in pending {
                summary.attempted += 1;
                match self.settle(&pool_id, wager).await {
                    Ok(_) => summary.applied += 1,
                    Err(e) => {
                        summary.failed += 1;
                        warn!("Settlement retry failed: {}", e);
                    }
                }
            }
        }

        if summary.attempted > 0 {
            info!(
                "Settlement retry sweep: {} attempted, {} applied, {} failed",
                summary.attempted, summary.applied, summary.failed
            );
        }
        Ok(summary)
    }

    /// Net points for every member of the pool, plus anyone else who was settled
    pub async fn pool_balances(&self, pool_id: &ObjectId) -> PoolResult<BTreeMap<String, i64>> {
        let pool = self
            .pools
            .get_by_id(pool_id)
            .await?
            .ok_or_else(|| PoolError::pool_not_found(pool_id))?;
        let settlements = self.settlements.find_by_pool(pool_id).await.map_err(|e| {
            error!("Failed to load settlements for pool {}: {}", pool_id, e);
            PoolError::Store(e)
        })?;

        balances(&pool.users, &settlements).map_err(|e| {
            error!("Failed to total balances for pool {}: {}", pool_id, e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn total(deltas: &[PointDelta]) -> i64 {
        deltas.iter().map(|d| d.points).sum()
    }

    #[test]
    fn test_single_winner_single_loser() {
        let deltas = split_points(10, &users(&["b"]), &users(&["a", "b"]));

        assert_eq!(
            deltas,
            vec![
                PointDelta {
                    user: "b".to_string(),
                    points: 10
                },
                PointDelta {
                    user: "a".to_string(),
                    points: -10
                },
            ]
        );
    }

    #[test]
    fn test_uninvited_acceptor_shares_the_loss() {
        let deltas = split_points(10, &users(&["b"]), &users(&["a", "b", "c"]));

        assert_eq!(total(&deltas), 0);
        assert!(deltas.contains(&PointDelta {
            user: "a".to_string(),
            points: -5
        }));
        assert!(deltas.contains(&PointDelta {
            user: "c".to_string(),
            points: -5
        }));
    }

    #[test]
    fn test_remainders_stay_zero_sum() {
        for amount in 1..40 {
            for winner_count in 1..4 {
                let all = users(&["a", "b", "c", "d", "e", "f"]);
                let winners = all[..winner_count].to_vec();
                let deltas = split_points(amount, &winners, &all);

                assert_eq!(total(&deltas), 0, "amount {amount}, winners {winner_count}");
                let credited: i64 = deltas.iter().filter(|d| d.points > 0).map(|d| d.points).sum();
                assert_eq!(credited, amount);
            }
        }
    }

    #[test]
    fn test_remainder_goes_to_first_listed() {
        let deltas = split_points(10, &users(&["a", "b", "c"]), &users(&["d"]));

        assert_eq!(deltas[0].points, 4);
        assert_eq!(deltas[1].points, 3);
        assert_eq!(deltas[2].points, 3);
        assert_eq!(deltas[3].points, -10);
    }

    #[test]
    fn test_no_losers_means_no_transfer() {
        assert!(split_points(10, &users(&["a", "b"]), &users(&["a", "b"])).is_empty());
        assert!(split_points(10, &users(&["b"]), &users(&["b"])).is_empty());
        assert!(split_points(10, &[], &users(&["a"])).is_empty());
    }

    #[test]
    fn test_balances_include_members_at_zero() {
        let pool_id = ObjectId::new();
        let settlement = Settlement::new(
            pool_id,
            ObjectId::new(),
            10,
            users(&["b"]),
            split_points(10, &users(&["b"]), &users(&["a", "b", "z"])),
        );
        let members = users(&["a", "b", "c"]);

        let totals = balances(&members, &[settlement]).unwrap();

        assert_eq!(totals["a"], -5);
        assert_eq!(totals["b"], 10);
        assert_eq!(totals["c"], 0);
        assert_eq!(totals["z"], -5);
        assert_eq!(totals.values().sum::<i64>(), 0);
    }

    #[test]
    fn test_balances_report_overflow() {
        let pool_id = ObjectId::new();
        let big = |wager_id| {
            Settlement::new(
                pool_id,
                wager_id,
                i64::MAX,
                users(&["b"]),
                vec![PointDelta {
                    user: "b".to_string(),
                    points: i64::MAX,
                }],
            )
        };
        let second = ObjectId::new();

        let err = balances(&users(&["a", "b"]), &[big(ObjectId::new()), big(second)]).unwrap_err();

        match err {
            PoolError::Settlement { wager_id, .. } => assert_eq!(wager_id, second.to_hex()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
