//! 账本端到端流程测试
//!
//! 每个测试使用独立的临时 SQLite 文件，经由 LoyaltyService 驱动完整事件流程。

use loyalty_server::db::repository::{customer, merchant, transaction};
use loyalty_server::{DbService, ErrorCode, LedgerError, LoyaltyService};
use rust_decimal::Decimal;
use shared::models::{
    BenefitStatus, Customer, CustomerCreate, Merchant, MerchantCreate, ProgramType,
    PurchaseEvent, RewardStatus, RewardUnlock, StampEvent, StampReward, StampRewardCreate,
    TierCreate,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn setup() -> (LoyaltyService, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let db = DbService::new(path.to_str().unwrap()).await.unwrap();
    (LoyaltyService::new(db.pool), dir)
}

async fn stamp_merchant(
    pool: &SqlitePool,
    card_size: i32,
    rewards: &[(i32, &str)],
) -> (Merchant, Vec<StampReward>) {
    let m = merchant::create(
        pool,
        MerchantCreate {
            name: "Stamp Cafe".into(),
            program_type: ProgramType::Stamps,
            stamps_required: Some(card_size),
        },
    )
    .await
    .unwrap();
    let mut defs = Vec::new();
    for (stamps_required, name) in rewards {
        defs.push(
            merchant::create_stamp_reward(
                pool,
                m.id,
                StampRewardCreate {
                    stamps_required: *stamps_required,
                    reward_name: name.to_string(),
                    reward_description: None,
                },
            )
            .await
            .unwrap(),
        );
    }
    (m, defs)
}

/// Bronze(0) / Silver(100) / Gold(500)
async fn points_merchant(pool: &SqlitePool) -> (Merchant, Vec<i64>) {
    let m = merchant::create(
        pool,
        MerchantCreate {
            name: "Points Bistro".into(),
            program_type: ProgramType::Points,
            stamps_required: None,
        },
    )
    .await
    .unwrap();
    let mut tier_ids = Vec::new();
    for (i, (name, points, benefits)) in [
        ("Bronze", 0, vec![]),
        ("Silver", 100, vec!["Free coffee", "Priority seating"]),
        ("Gold", 500, vec!["Lounge"]),
    ]
    .into_iter()
    .enumerate()
    {
        let tier = merchant::create_tier(
            pool,
            m.id,
            TierCreate {
                name: name.into(),
                sort_order: Some(i as i32),
                points_required: points,
                benefits: benefits.into_iter().map(String::from).collect(),
                color: None,
            },
        )
        .await
        .unwrap();
        tier_ids.push(tier.id);
    }
    (m, tier_ids)
}

async fn new_customer(pool: &SqlitePool, merchant_id: i64) -> Customer {
    customer::create(
        pool,
        CustomerCreate {
            merchant_id,
            name: "Grace".into(),
            email: None,
        },
    )
    .await
    .unwrap()
}

fn stamps(n: i32) -> StampEvent {
    StampEvent {
        stamps: n,
        description: None,
    }
}

fn purchase(amount: &str) -> PurchaseEvent {
    PurchaseEvent {
        amount_ex_tax: amount.parse().unwrap(),
        tax_amount: Decimal::ZERO,
        points_multiplier: Decimal::ONE,
        description: Some("Lunch".into()),
    }
}

#[tokio::test]
async fn test_small_card_rollover_unlocks_by_cumulative_total() {
    let (service, _dir) = setup().await;
    let (m, rewards) = stamp_merchant(service.pool(), 5, &[(3, "Cookie"), (8, "Sandwich")]).await;
    let (cookie, sandwich) = (rewards[0].id, rewards[1].id);
    let c = new_customer(service.pool(), m.id).await;

    let first = service.record_stamp_event(m.id, c.id, stamps(3)).await.unwrap();
    assert_eq!((first.stamps, first.card_cycle_number), (3, 1));
    assert!(!first.card_was_reset);
    assert_eq!(
        first.newly_unlocked,
        vec![RewardUnlock {
            stamp_reward_id: cookie,
            card_cycle_number: 1
        }]
    );

    let second = service.record_stamp_event(m.id, c.id, stamps(5)).await.unwrap();
    assert_eq!((second.stamps, second.card_cycle_number), (3, 2));
    assert!(second.card_was_reset);
    assert_eq!(second.cycles_completed, 1);
    assert_eq!(second.display_stamps, 3);
    assert_eq!(second.total_stamps, 8);

    let mut unlocked = second.newly_unlocked.clone();
    unlocked.sort_by_key(|u| (u.card_cycle_number, u.stamp_reward_id));
    let mut expected = vec![
        RewardUnlock {
            stamp_reward_id: cookie,
            card_cycle_number: 2,
        },
        RewardUnlock {
            stamp_reward_id: sandwich,
            card_cycle_number: 2,
        },
    ];
    expected.sort_by_key(|u| (u.card_cycle_number, u.stamp_reward_id));
    assert_eq!(unlocked, expected);

    let available: Vec<&str> = second
        .available_rewards
        .iter()
        .map(|r| r.reward_name.as_str())
        .collect();
    assert_eq!(available, vec!["Cookie", "Sandwich"]);

    // Sandwich on the first card never met its milestone
    let instances = service.list_reward_instances(m.id, c.id).await.unwrap();
    let sandwich_first = instances
        .iter()
        .find(|i| i.stamp_reward_id == sandwich && i.card_cycle_number == 1)
        .unwrap();
    assert_eq!(sandwich_first.status, RewardStatus::Locked);
}

#[tokio::test]
async fn test_one_event_completes_several_cards() {
    let (service, _dir) = setup().await;
    let (m, rewards) = stamp_merchant(service.pool(), 10, &[(10, "Free drink")]).await;
    let c = new_customer(service.pool(), m.id).await;

    service.record_stamp_event(m.id, c.id, stamps(9)).await.unwrap();
    let outcome = service.record_stamp_event(m.id, c.id, stamps(21)).await.unwrap();

    assert_eq!((outcome.stamps, outcome.card_cycle_number), (0, 4));
    assert_eq!(outcome.cycles_completed, 3);
    assert_eq!(outcome.display_stamps, 0);
    assert_eq!(outcome.total_stamps, 30);

    let cycles: Vec<i32> = outcome
        .newly_unlocked
        .iter()
        .filter(|u| u.stamp_reward_id == rewards[0].id)
        .map(|u| u.card_cycle_number)
        .collect();
    assert_eq!(cycles, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_full_card_then_next_stamp() {
    let (service, _dir) = setup().await;
    let (m, _) = stamp_merchant(service.pool(), 10, &[]).await;
    let c = new_customer(service.pool(), m.id).await;

    let full = service.record_stamp_event(m.id, c.id, stamps(10)).await.unwrap();
    assert_eq!((full.stamps, full.card_cycle_number, full.display_stamps), (10, 1, 10));
    assert!(!full.card_was_reset);

    let next = service.record_stamp_event(m.id, c.id, stamps(1)).await.unwrap();
    assert_eq!((next.stamps, next.card_cycle_number, next.display_stamps), (1, 2, 1));
    assert!(next.card_was_reset);

    let summary = service.card_summary(m.id, c.id).await.unwrap();
    assert_eq!(summary.total_stamps, 11);
    assert_eq!(summary.display_stamps, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_redemption_succeeds_once() {
    let (service, _dir) = setup().await;
    let (m, rewards) = stamp_merchant(service.pool(), 5, &[(5, "Free coffee")]).await;
    let c = new_customer(service.pool(), m.id).await;
    service.record_stamp_event(m.id, c.id, stamps(5)).await.unwrap();

    let reward_id = rewards[0].id;
    let (a, b) = tokio::join!(
        service.redeem_reward(m.id, c.id, reward_id, 1),
        service.redeem_reward(m.id, c.id, reward_id, 1),
    );

    let results = [a, b];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(failure, LedgerError::AlreadyRedeemed { .. }));
    assert_eq!(failure.code(), ErrorCode::RewardAlreadyRedeemed);

    let history = service.list_transactions(m.id, c.id, 50).await.unwrap();
    let debits: Vec<i32> = history
        .iter()
        .filter(|t| t.stamps_earned < 0)
        .map(|t| t.stamps_earned)
        .collect();
    assert_eq!(debits, vec![-5]);

    // Redemption never touches the card
    let summary = service.card_summary(m.id, c.id).await.unwrap();
    assert_eq!((summary.stamps, summary.card_cycle_number), (5, 1));
}

#[tokio::test]
async fn test_redeem_locked_or_missing_instance() {
    let (service, _dir) = setup().await;
    let (m, rewards) = stamp_merchant(service.pool(), 10, &[(8, "Muffin")]).await;
    let c = new_customer(service.pool(), m.id).await;
    service.record_stamp_event(m.id, c.id, stamps(2)).await.unwrap();

    let locked = service.redeem_reward(m.id, c.id, rewards[0].id, 1).await.unwrap_err();
    assert_eq!(locked.code(), ErrorCode::RewardLocked);
    assert!(matches!(locked, LedgerError::NotApplicable { .. }));

    let missing = service.redeem_reward(m.id, c.id, rewards[0].id, 7).await.unwrap_err();
    assert_eq!(missing.code(), ErrorCode::RewardNotFound);
}

#[tokio::test]
async fn test_sweep_never_touches_redeemed() {
    let (service, _dir) = setup().await;
    let (m, rewards) = stamp_merchant(service.pool(), 5, &[(2, "Cookie"), (5, "Coffee")]).await;
    let c = new_customer(service.pool(), m.id).await;
    service.record_stamp_event(m.id, c.id, stamps(5)).await.unwrap();
    service.redeem_reward(m.id, c.id, rewards[0].id, 1).await.unwrap();

    // Nothing is stale yet
    assert_eq!(service.sweep_expired().await.unwrap().expired_count, 0);

    let far_future = i64::MAX;
    let swept = service.sweep_expired_at(far_future).await.unwrap();
    assert_eq!(swept.expired_count, 1);
    assert_eq!(service.sweep_expired_at(far_future).await.unwrap().expired_count, 0);

    let instances = service.list_reward_instances(m.id, c.id).await.unwrap();
    let status_of = |id: i64| {
        instances
            .iter()
            .find(|i| i.stamp_reward_id == id)
            .map(|i| i.status)
            .unwrap()
    };
    assert_eq!(status_of(rewards[0].id), RewardStatus::Redeemed);
    assert_eq!(status_of(rewards[1].id), RewardStatus::Expired);

    let err = service.redeem_reward(m.id, c.id, rewards[1].id, 1).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::RewardExpired);
}

#[tokio::test]
async fn test_tier_upgrade_unlocks_benefits_once() {
    let (service, _dir) = setup().await;
    let (m, tier_ids) = points_merchant(service.pool()).await;
    let c = new_customer(service.pool(), m.id).await;
    assert_eq!(c.tier.as_deref(), Some("Bronze"));

    let first = service.record_purchase_event(m.id, c.id, purchase("80")).await.unwrap();
    assert_eq!((first.points, first.points_earned), (80, 80));
    assert!(first.tier_upgrade.is_none());

    let second = service.record_purchase_event(m.id, c.id, purchase("30")).await.unwrap();
    assert_eq!(second.points, 110);
    let upgrade = second.tier_upgrade.unwrap();
    assert_eq!(upgrade.old_tier.as_deref(), Some("Bronze"));
    assert_eq!(upgrade.new_tier, "Silver");
    assert_eq!(upgrade.unlocked_benefits, vec!["Free coffee", "Priority seating"]);

    let third = service.record_purchase_event(m.id, c.id, purchase("10")).await.unwrap();
    assert_eq!(third.points, 120);
    assert!(third.tier_upgrade.is_none());

    let benefits = service.list_benefits(m.id, c.id).await.unwrap();
    assert_eq!(benefits.len(), 2);
    assert!(benefits.iter().all(|b| b.status == BenefitStatus::Available));
    assert!(benefits.iter().all(|b| b.tier_id == tier_ids[1]));

    let used = service
        .redeem_benefit(m.id, c.id, tier_ids[1], "Free coffee")
        .await
        .unwrap();
    assert_eq!(used.status, BenefitStatus::Used);
    assert!(used.used_at.is_some());

    let again = service
        .redeem_benefit(m.id, c.id, tier_ids[1], "Free coffee")
        .await
        .unwrap_err();
    assert!(matches!(again, LedgerError::AlreadyRedeemed { .. }));
    assert_eq!(again.code(), ErrorCode::BenefitAlreadyUsed);
}

#[tokio::test]
async fn test_benefit_redemption_creates_missing_row_as_used() {
    let (service, _dir) = setup().await;
    let (m, tier_ids) = points_merchant(service.pool()).await;
    let c = new_customer(service.pool(), m.id).await;

    let lounge = service.redeem_benefit(m.id, c.id, tier_ids[2], "Lounge").await.unwrap();
    assert_eq!(lounge.status, BenefitStatus::Used);

    let unknown = service
        .redeem_benefit(m.id, c.id, tier_ids[2], "Spa day")
        .await
        .unwrap_err();
    assert_eq!(unknown.code(), ErrorCode::BenefitNotFound);

    let foreign_tier = service.redeem_benefit(m.id, c.id, 12345, "Lounge").await.unwrap_err();
    assert_eq!(foreign_tier.code(), ErrorCode::TierNotFound);

    // Zero-delta ledger row records the use
    let history = service.list_transactions(m.id, c.id, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!((history[0].points, history[0].stamps_earned), (0, 0));
}

#[tokio::test]
async fn test_purchase_that_floors_to_zero_is_recorded() {
    let (service, _dir) = setup().await;
    let (m, _) = points_merchant(service.pool()).await;
    let c = new_customer(service.pool(), m.id).await;

    let mut event = purchase("0.49");
    event.points_multiplier = "1.5".parse().unwrap();
    let outcome = service.record_purchase_event(m.id, c.id, event).await.unwrap();
    assert_eq!((outcome.points, outcome.points_earned), (0, 0));
    assert!(outcome.tier_upgrade.is_none());
    assert_eq!(service.list_transactions(m.id, c.id, 10).await.unwrap().len(), 1);

    let err = service
        .record_purchase_event(m.id, c.id, purchase("0"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
}

#[tokio::test]
async fn test_ownership_and_program_checks() {
    let (service, _dir) = setup().await;
    let (stamp_m, _) = stamp_merchant(service.pool(), 10, &[]).await;
    let (points_m, _) = points_merchant(service.pool()).await;
    let c = new_customer(service.pool(), stamp_m.id).await;
    let p = new_customer(service.pool(), points_m.id).await;

    let err = service.record_stamp_event(points_m.id, c.id, stamps(1)).await.unwrap_err();
    assert!(matches!(err, LedgerError::OwnershipMismatch { .. }));
    assert_eq!(err.code(), ErrorCode::OwnershipMismatch);

    let err = service.record_stamp_event(stamp_m.id, 999, stamps(1)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::CustomerNotFound);

    let err = service.record_stamp_event(points_m.id, p.id, stamps(1)).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotApplicable { .. }));

    let err = service
        .record_purchase_event(stamp_m.id, c.id, purchase("10"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotApplicable { .. }));

    let err = service.record_stamp_event(stamp_m.id, c.id, stamps(0)).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
    assert!(!err.is_retryable());

    let err = service.list_transactions(points_m.id, c.id, 10).await.unwrap_err();
    assert!(matches!(err, LedgerError::OwnershipMismatch { .. }));

    // Rejected events leave no trace
    let summary = service.card_summary(stamp_m.id, c.id).await.unwrap();
    assert_eq!(summary.total_stamps, 0);
    assert!(service.list_transactions(stamp_m.id, c.id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_card_total_matches_ledger() {
    let (service, _dir) = setup().await;
    let (m, rewards) = stamp_merchant(service.pool(), 4, &[(3, "Biscuit")]).await;
    let c = new_customer(service.pool(), m.id).await;

    for n in [1, 3, 7, 4, 2, 9] {
        service.record_stamp_event(m.id, c.id, stamps(n)).await.unwrap();
    }
    service.redeem_reward(m.id, c.id, rewards[0].id, 1).await.unwrap();

    let summary = service.card_summary(m.id, c.id).await.unwrap();
    assert_eq!(summary.total_stamps, 26);

    let mut conn = service.pool().acquire().await.unwrap();
    let ledger_total = transaction::sum_positive_stamps(&mut conn, c.id).await.unwrap();
    assert_eq!(ledger_total, 26);
    drop(conn);

    let reconciled = service.reconcile_rewards(m.id, c.id).await.unwrap();
    assert!(reconciled.is_consistent());
    assert!(reconciled.newly_unlocked.is_empty());
}

#[tokio::test]
async fn test_reconcile_backfills_reward_added_later() {
    let (service, _dir) = setup().await;
    let (m, _) = stamp_merchant(service.pool(), 5, &[]).await;
    let c = new_customer(service.pool(), m.id).await;
    service.record_stamp_event(m.id, c.id, stamps(12)).await.unwrap();

    let late = merchant::create_stamp_reward(
        service.pool(),
        m.id,
        StampRewardCreate {
            stamps_required: 4,
            reward_name: "Late bonus".into(),
            reward_description: None,
        },
    )
    .await
    .unwrap();

    let outcome = service.reconcile_rewards(m.id, c.id).await.unwrap();
    assert_eq!(outcome.instances_created, 3);
    let cycles: Vec<i32> = outcome
        .newly_unlocked
        .iter()
        .filter(|u| u.stamp_reward_id == late.id)
        .map(|u| u.card_cycle_number)
        .collect();
    assert_eq!(cycles, vec![1, 2, 3]);

    let again = service.reconcile_rewards(m.id, c.id).await.unwrap();
    assert_eq!(again.instances_created, 0);
    assert!(again.newly_unlocked.is_empty());
}

#[tokio::test]
async fn test_outcomes_serialize_for_callers() {
    let (service, _dir) = setup().await;
    let (m, _) = stamp_merchant(service.pool(), 10, &[(5, "Cookie")]).await;
    let c = new_customer(service.pool(), m.id).await;

    let outcome = service.record_stamp_event(m.id, c.id, stamps(5)).await.unwrap();
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["display_stamps"], 5);
    assert_eq!(json["available_rewards"][0]["reward_name"], "Cookie");

    let err = service.redeem_reward(m.id, c.id, 1, 1).await.unwrap_err();
    assert_eq!(serde_json::to_value(err.code()).unwrap(), serde_json::json!(2001));
}
