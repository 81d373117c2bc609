//! Loyalty Service
//!
//! Operation surface for the request layer. Every event runs in one SQLite
//! transaction whose first statement claims the customer row, so events for
//! the same customer are serialized by the database write lock.

use rust_decimal::Decimal;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use super::error::{LedgerError, LedgerResult};
use super::stamp_cycle::{self, CardAdvance};
use super::{expiry, ledger, redemption, reward_unlock, tier};
use crate::db::repository::{
    RepoError, customer, customer_benefit, merchant, reward_instance, transaction,
};
use crate::utils::logger::LEDGER_TARGET;
use shared::models::{
    CardSummary, Customer, CustomerBenefit, MerchantConfig, PurchaseEvent, PurchaseOutcome,
    ReconcileOutcome, RewardInstance, StampEvent, StampEventOutcome, SweepOutcome, Transaction,
};

type EventTx = sqlx::Transaction<'static, Sqlite>;

#[derive(Clone)]
pub struct LoyaltyService {
    pool: SqlitePool,
}

impl LoyaltyService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open the event transaction: claim the customer, then load customer and
    /// merchant configuration under the write lock.
    async fn begin_event(
        &self,
        merchant_id: i64,
        customer_id: i64,
        now: i64,
    ) -> LedgerResult<(EventTx, Customer, MerchantConfig)> {
        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;

        if !customer::claim(&mut *tx, customer_id, now).await? {
            return Err(LedgerError::customer_not_found(customer_id));
        }
        let (customer, config) = load_scoped(&mut *tx, merchant_id, customer_id).await?;
        Ok((tx, customer, config))
    }

    async fn commit(tx: EventTx) -> LedgerResult<()> {
        tx.commit()
            .await
            .map_err(RepoError::from)?;
        Ok(())
    }

    /// Credit stamps, roll the card over as often as needed and unlock every
    /// reward whose cumulative milestone is now met.
    pub async fn record_stamp_event(
        &self,
        merchant_id: i64,
        customer_id: i64,
        event: StampEvent,
    ) -> LedgerResult<StampEventOutcome> {
        stamp_cycle::validate_stamps_to_add(event.stamps)?;
        let now = shared::util::now_millis();
        let (mut tx, customer, config) = self.begin_event(merchant_id, customer_id, now).await?;

        if !config.is_stamp_program() {
            return Err(LedgerError::not_applicable(format!(
                "merchant {merchant_id} does not run a stamp program"
            )));
        }
        let stamps_required = config.merchant.stamps_required;

        let advance = stamp_cycle::advance_card(
            customer.stamps,
            customer.card_cycle_number,
            event.stamps,
            stamps_required,
        )?;
        customer::update_card(
            &mut *tx,
            customer_id,
            advance.final_stamps,
            advance.new_cycle,
            now,
        )
        .await?;

        reward_unlock::ensure_instances(
            &mut *tx,
            merchant_id,
            customer_id,
            advance.previous_cycle,
            advance.new_cycle,
            now,
        )
        .await?;
        let newly_unlocked = reward_unlock::apply_unlocks(
            &mut *tx,
            customer_id,
            &config.rewards,
            &advance,
            stamps_required,
            now,
        )
        .await?;

        ledger::record(
            &mut *tx,
            ledger::stamp_entry(merchant_id, customer_id, event.stamps, event.description),
            now,
        )
        .await?;

        let available_rewards =
            reward_instance::find_available_for_cycle(&mut *tx, customer_id, advance.new_cycle)
                .await?;
        Self::commit(tx).await?;

        let card = advance.card(stamps_required);
        tracing::info!(
            customer_id,
            merchant_id,
            stamps_added = event.stamps,
            stamps = card.stamps,
            card_cycle_number = card.card_cycle_number,
            cycles_completed = advance.cycles_completed,
            newly_unlocked = newly_unlocked.len(),
            "Stamp event recorded"
        );

        Ok(StampEventOutcome {
            stamps: card.stamps,
            card_cycle_number: card.card_cycle_number,
            display_stamps: card.display_stamps(),
            total_stamps: card.total_stamps(),
            card_was_reset: advance.card_was_reset,
            cycles_completed: advance.cycles_completed,
            available_rewards,
            newly_unlocked,
        })
    }

    /// Credit points for a purchase and apply any tier upgrade
    pub async fn record_purchase_event(
        &self,
        merchant_id: i64,
        customer_id: i64,
        event: PurchaseEvent,
    ) -> LedgerResult<PurchaseOutcome> {
        let points_earned = tier::compute_points(event.amount_ex_tax, event.points_multiplier)?;
        if event.tax_amount < Decimal::ZERO {
            return Err(LedgerError::InvalidInput(format!(
                "tax_amount must be >= 0, got {}",
                event.tax_amount
            )));
        }
        let now = shared::util::now_millis();
        let (mut tx, customer, config) = self.begin_event(merchant_id, customer_id, now).await?;

        if !config.is_points_program() {
            return Err(LedgerError::not_applicable(format!(
                "merchant {merchant_id} does not run a points program"
            )));
        }

        let points = customer
            .points
            .checked_add(points_earned)
            .ok_or_else(|| LedgerError::InvalidInput("points balance overflow".into()))?;

        let target = if points_earned > 0 {
            tier::evaluate_upgrade(&config.tiers, customer.tier.as_deref(), points)
        } else {
            None
        };
        customer::update_points_and_tier(
            &mut *tx,
            customer_id,
            points,
            target.map(|t| t.name.as_str()),
            now,
        )
        .await?;

        let tier_upgrade = match target {
            Some(target) => {
                Some(tier::apply_upgrade(&mut *tx, customer_id, customer.tier.clone(), target, now).await?)
            }
            None => None,
        };

        ledger::record(
            &mut *tx,
            ledger::purchase_entry(
                merchant_id,
                customer_id,
                points_earned,
                event.amount_ex_tax,
                event.tax_amount,
                event.description,
            ),
            now,
        )
        .await?;
        Self::commit(tx).await?;

        if let Some(upgrade) = &tier_upgrade {
            tracing::info!(
                target: LEDGER_TARGET,
                customer_id,
                merchant_id,
                old_tier = upgrade.old_tier.as_deref().unwrap_or("-"),
                new_tier = %upgrade.new_tier,
                unlocked_benefits = upgrade.unlocked_benefits.len(),
                "Tier upgraded"
            );
        }
        tracing::info!(customer_id, merchant_id, points_earned, points, "Purchase recorded");

        Ok(PurchaseOutcome {
            points,
            points_earned,
            tier_upgrade,
        })
    }

    pub async fn redeem_reward(
        &self,
        merchant_id: i64,
        customer_id: i64,
        stamp_reward_id: i64,
        card_cycle_number: i32,
    ) -> LedgerResult<RewardInstance> {
        let now = shared::util::now_millis();
        let (mut tx, customer, config) = self.begin_event(merchant_id, customer_id, now).await?;

        let instance = redemption::redeem_reward(
            &mut *tx,
            &config,
            &customer,
            stamp_reward_id,
            card_cycle_number,
            now,
        )
        .await?;
        Self::commit(tx).await?;

        tracing::info!(
            target: LEDGER_TARGET,
            customer_id,
            merchant_id,
            stamp_reward_id,
            card_cycle_number,
            "Reward redeemed"
        );
        Ok(instance)
    }

    pub async fn redeem_benefit(
        &self,
        merchant_id: i64,
        customer_id: i64,
        tier_id: i64,
        benefit_name: &str,
    ) -> LedgerResult<CustomerBenefit> {
        let now = shared::util::now_millis();
        let (mut tx, customer, config) = self.begin_event(merchant_id, customer_id, now).await?;

        let benefit =
            redemption::redeem_benefit(&mut *tx, &config, &customer, tier_id, benefit_name, now)
                .await?;
        Self::commit(tx).await?;

        tracing::info!(
            target: LEDGER_TARGET,
            customer_id,
            merchant_id,
            tier_id,
            benefit = %benefit.benefit_name,
            "Benefit used"
        );
        Ok(benefit)
    }

    pub async fn sweep_expired(&self) -> LedgerResult<SweepOutcome> {
        self.sweep_expired_at(shared::util::now_millis()).await
    }

    /// Sweep as of an explicit instant (catch-up and tests)
    pub async fn sweep_expired_at(&self, now: i64) -> LedgerResult<SweepOutcome> {
        expiry::sweep(&self.pool, now).await
    }

    /// Re-derive instance back-fill and unlocks from stored balances.
    ///
    /// Idempotent; also reports whether the card agrees with the ledger.
    pub async fn reconcile_rewards(
        &self,
        merchant_id: i64,
        customer_id: i64,
    ) -> LedgerResult<ReconcileOutcome> {
        let now = shared::util::now_millis();
        let (mut tx, customer, config) = self.begin_event(merchant_id, customer_id, now).await?;

        if !config.is_stamp_program() {
            return Err(LedgerError::not_applicable(format!(
                "merchant {merchant_id} does not run a stamp program"
            )));
        }
        let stamps_required = config.merchant.stamps_required;
        let current = CardAdvance {
            final_stamps: customer.stamps,
            previous_cycle: customer.card_cycle_number,
            new_cycle: customer.card_cycle_number,
            cycles_completed: 0,
            card_was_reset: false,
        };

        let instances_created = reward_unlock::ensure_instances(
            &mut *tx,
            merchant_id,
            customer_id,
            1,
            current.new_cycle,
            now,
        )
        .await?;
        let newly_unlocked = reward_unlock::apply_unlocks(
            &mut *tx,
            customer_id,
            &config.rewards,
            &current,
            stamps_required,
            now,
        )
        .await?;
        let ledger_stamps = transaction::sum_positive_stamps(&mut *tx, customer_id).await?;
        Self::commit(tx).await?;

        let outcome = ReconcileOutcome {
            instances_created,
            newly_unlocked,
            ledger_stamps,
            card_stamps: current.card(stamps_required).total_stamps(),
        };
        if !outcome.is_consistent() {
            tracing::warn!(
                customer_id,
                merchant_id,
                ledger_stamps = outcome.ledger_stamps,
                card_stamps = outcome.card_stamps,
                "Stamp card disagrees with ledger"
            );
        }
        tracing::info!(
            customer_id,
            instances_created = outcome.instances_created,
            newly_unlocked = outcome.newly_unlocked.len(),
            "Rewards reconciled"
        );
        Ok(outcome)
    }

    pub async fn card_summary(&self, merchant_id: i64, customer_id: i64) -> LedgerResult<CardSummary> {
        let mut conn = self.acquire().await?;
        let (customer, config) = load_scoped(&mut conn, merchant_id, customer_id).await?;
        let card = customer.stamp_card(config.merchant.stamps_required);
        let available_rewards =
            reward_instance::find_available_for_cycle(&mut conn, customer_id, card.card_cycle_number)
                .await?;
        Ok(CardSummary {
            customer_id,
            stamps: card.stamps,
            card_cycle_number: card.card_cycle_number,
            stamps_required: card.stamps_required,
            display_stamps: card.display_stamps(),
            total_stamps: card.total_stamps(),
            available_rewards,
        })
    }

    pub async fn list_reward_instances(
        &self,
        merchant_id: i64,
        customer_id: i64,
    ) -> LedgerResult<Vec<RewardInstance>> {
        self.ensure_owned(merchant_id, customer_id).await?;
        Ok(reward_instance::list_by_customer(&self.pool, customer_id).await?)
    }

    pub async fn list_benefits(
        &self,
        merchant_id: i64,
        customer_id: i64,
    ) -> LedgerResult<Vec<CustomerBenefit>> {
        self.ensure_owned(merchant_id, customer_id).await?;
        Ok(customer_benefit::list_by_customer(&self.pool, customer_id).await?)
    }

    /// Ledger history, newest first
    pub async fn list_transactions(
        &self,
        merchant_id: i64,
        customer_id: i64,
        limit: i64,
    ) -> LedgerResult<Vec<Transaction>> {
        self.ensure_owned(merchant_id, customer_id).await?;
        Ok(transaction::list_by_customer(&self.pool, customer_id, limit.clamp(1, 1000)).await?)
    }

    async fn acquire(&self) -> LedgerResult<sqlx::pool::PoolConnection<Sqlite>> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(RepoError::from)?;
        Ok(conn)
    }

    async fn ensure_owned(&self, merchant_id: i64, customer_id: i64) -> LedgerResult<Customer> {
        let mut conn = self.acquire().await?;
        find_owned(&mut conn, merchant_id, customer_id).await
    }
}

/// Load the customer and its merchant configuration, rejecting a customer
/// that belongs to another merchant.
async fn load_scoped(
    conn: &mut SqliteConnection,
    merchant_id: i64,
    customer_id: i64,
) -> LedgerResult<(Customer, MerchantConfig)> {
    let customer = find_owned(&mut *conn, merchant_id, customer_id).await?;
    let config = merchant::load_config(&mut *conn, merchant_id)
        .await?
        .ok_or_else(|| LedgerError::merchant_not_found(merchant_id))?;
    Ok((customer, config))
}

async fn find_owned(
    conn: &mut SqliteConnection,
    merchant_id: i64,
    customer_id: i64,
) -> LedgerResult<Customer> {
    let customer = customer::find_by_id(conn, customer_id)
        .await?
        .ok_or_else(|| LedgerError::customer_not_found(customer_id))?;
    if customer.merchant_id != merchant_id {
        return Err(LedgerError::OwnershipMismatch {
            customer_id,
            merchant_id,
        });
    }
    Ok(customer)
}
