//! Reward unlock across card cycles
//!
//! A reward milestone is measured in *cumulative* stamps. The cumulative total
//! at the end of cycle `c` is `c × N` for every completed cycle and
//! `(c − 1) × N + final_stamps` on the current one, so it only grows with `c`
//! and the cycles meeting a milestone form one contiguous range ending at the
//! current cycle.

use sqlx::SqliteConnection;

use super::error::LedgerResult;
use super::expiry::expires_at_for;
use super::stamp_cycle::CardAdvance;
use crate::db::repository::reward_instance;
use shared::models::{RewardUnlock, StampReward};

/// Cumulative stamps held at the end of `cycle`
pub fn total_stamps_at_cycle(
    cycle: i32,
    current_cycle: i32,
    final_stamps: i32,
    stamps_required: i32,
) -> i64 {
    let n = stamps_required as i64;
    let on_card = if cycle < current_cycle {
        n
    } else {
        final_stamps as i64
    };
    (cycle as i64 - 1) * n + on_card
}

/// First cycle whose cumulative total reaches `milestone`, if any cycle up to
/// `current_cycle` does.
pub fn first_qualifying_cycle(
    milestone: i32,
    current_cycle: i32,
    final_stamps: i32,
    stamps_required: i32,
) -> Option<i32> {
    if stamps_required < 1 || current_cycle < 1 {
        return None;
    }
    // Completed cycles: c × N >= milestone
    let by_completed = ((milestone.max(1) as i64 + stamps_required as i64 - 1)
        / stamps_required as i64)
        .max(1);
    if by_completed < current_cycle as i64 {
        return Some(by_completed as i32);
    }
    let at_current =
        total_stamps_at_cycle(current_cycle, current_cycle, final_stamps, stamps_required);
    (at_current >= milestone as i64).then_some(current_cycle)
}

/// Every `(cycle)` in `[1, current_cycle]` where the milestone is met
pub fn qualifying_cycles(
    milestone: i32,
    current_cycle: i32,
    final_stamps: i32,
    stamps_required: i32,
) -> std::ops::RangeInclusive<i32> {
    match first_qualifying_cycle(milestone, current_cycle, final_stamps, stamps_required) {
        Some(first) => first..=current_cycle,
        #[allow(clippy::reversed_empty_ranges)]
        None => 1..=0,
    }
}

/// Back-fill locked instances for every cycle the card passed through in
/// this event (including the pre-event cycle, which covers cycle 1 lazily).
pub async fn ensure_instances(
    conn: &mut SqliteConnection,
    merchant_id: i64,
    customer_id: i64,
    from_cycle: i32,
    to_cycle: i32,
    now: i64,
) -> LedgerResult<u64> {
    let created = reward_instance::ensure_for_cycles(
        conn,
        merchant_id,
        customer_id,
        from_cycle,
        to_cycle,
        now,
        expires_at_for(now),
    )
    .await?;
    Ok(created)
}

/// Unlock every locked instance whose cycle meets its reward milestone.
///
/// One conditional UPDATE per reward over its qualifying range; instances
/// already resolved are skipped by the status filter.
pub async fn apply_unlocks(
    conn: &mut SqliteConnection,
    customer_id: i64,
    rewards: &[StampReward],
    advance: &CardAdvance,
    stamps_required: i32,
    now: i64,
) -> LedgerResult<Vec<RewardUnlock>> {
    let mut unlocked = Vec::new();
    for reward in rewards {
        let Some(first) = first_qualifying_cycle(
            reward.stamps_required,
            advance.new_cycle,
            advance.final_stamps,
            stamps_required,
        ) else {
            continue;
        };
        let cycles = reward_instance::unlock_range(
            &mut *conn,
            customer_id,
            reward.id,
            first,
            advance.new_cycle,
            now,
        )
        .await?;
        unlocked.extend(cycles.into_iter().map(|card_cycle_number| RewardUnlock {
            stamp_reward_id: reward.id,
            card_cycle_number,
        }));
    }
    Ok(unlocked)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Brute-force reference for the contiguous-range shortcut
    fn scan(milestone: i32, current: i32, final_stamps: i32, n: i32) -> Vec<i32> {
        (1..=current)
            .filter(|&c| total_stamps_at_cycle(c, current, final_stamps, n) >= milestone as i64)
            .collect()
    }

    #[test]
    fn test_total_at_cycle() {
        assert_eq!(total_stamps_at_cycle(1, 2, 3, 5), 5);
        assert_eq!(total_stamps_at_cycle(2, 2, 3, 5), 8);
        assert_eq!(total_stamps_at_cycle(4, 4, 0, 10), 30);
    }

    #[test]
    fn test_small_card_after_rollover() {
        // N = 5, card at (3, cycle 2): totals are 5 then 8
        assert_eq!(first_qualifying_cycle(3, 2, 3, 5), Some(1));
        assert_eq!(first_qualifying_cycle(5, 2, 3, 5), Some(1));
        assert_eq!(first_qualifying_cycle(8, 2, 3, 5), Some(2));
        assert_eq!(first_qualifying_cycle(9, 2, 3, 5), None);
        assert_eq!(qualifying_cycles(3, 2, 3, 5).collect::<Vec<_>>(), vec![1, 2]);
        assert!(qualifying_cycles(9, 2, 3, 5).is_empty());
    }

    #[test]
    fn test_empty_new_card_after_exact_rollover() {
        // 9 + 21 on N = 10 lands on (0, cycle 4); cycle 4 total is 30
        assert_eq!(first_qualifying_cycle(10, 4, 0, 10), Some(1));
        assert_eq!(first_qualifying_cycle(30, 4, 0, 10), Some(3));
        assert_eq!(first_qualifying_cycle(31, 4, 0, 10), None);
    }

    #[test]
    fn test_shortcut_matches_full_scan() {
        for n in 1..=7 {
            for current in 1..=6 {
                for final_stamps in 0..=n {
                    for milestone in 1..=(n * current + 3) {
                        let expected = scan(milestone, current, final_stamps, n);
                        let got: Vec<i32> =
                            qualifying_cycles(milestone, current, final_stamps, n).collect();
                        assert_eq!(got, expected, "n={n} cur={current} s={final_stamps} m={milestone}");
                    }
                }
            }
        }
    }
}
