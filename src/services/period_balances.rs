use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    db::DbPool,
    entities::{
        inventory_period_balance::{self, Entity as InventoryPeriodBalance},
        inventory_transaction::{self, Entity as InventoryTransaction, TransactionType},
        product::{self, Entity as Product},
    },
    errors::{from_transaction_error, ServiceError},
    events::{Event, EventSender},
    services::locks::AggregateLocks,
};

/// Month-end rollup of the transaction log into per-product period
/// balances. Each product rolls in its own transaction, so a failure
/// leaves earlier products' balances committed.
#[derive(Clone)]
pub struct PeriodBalanceService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    locks: Arc<AggregateLocks>,
}

impl PeriodBalanceService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>, locks: Arc<AggregateLocks>) -> Self {
        Self {
            db,
            event_sender,
            locks,
        }
    }

    /// Roll the given `yyyy-MM` period for every product: prior-period
    /// ending carries into beginning (zeros when no prior balance exists),
    /// inbound/outbound sums come from the transaction log over the whole
    /// calendar month, and the result upserts keyed (product, period).
    /// Regenerating a period overwrites its previous rollup.
    #[instrument(skip(self))]
    pub async fn generate_monthly_report(&self, period: &str) -> Result<usize, ServiceError> {
        let (start, end) = period_bounds(period)?;
        let prior = prior_period(period)?;

        let products = Product::find()
            .order_by_asc(product::Column::Id)
            .all(self.db.as_ref())
            .await?;

        let mut rolled = 0;
        for prod in &products {
            self.roll_product(prod.id, period, &prior, start, end)
                .await?;
            rolled += 1;
        }

        info!(period, products = rolled, "Generated monthly report");
        self.event_sender
            .send(Event::MonthlyReportGenerated {
                period: period.to_string(),
                products: rolled,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(rolled)
    }

    /// Balances for the period, ordered by product inventory code.
    pub async fn get_monthly_report(
        &self,
        period: &str,
    ) -> Result<Vec<inventory_period_balance::Model>, ServiceError> {
        period_bounds(period)?;
        Ok(InventoryPeriodBalance::find()
            .filter(inventory_period_balance::Column::Period.eq(period))
            .inner_join(Product)
            .order_by_asc(product::Column::InventoryCode)
            .all(self.db.as_ref())
            .await?)
    }

    pub async fn get_product_balance(
        &self,
        product_id: i64,
        period: &str,
    ) -> Result<Option<inventory_period_balance::Model>, ServiceError> {
        Ok(InventoryPeriodBalance::find()
            .filter(inventory_period_balance::Column::ProductId.eq(product_id))
            .filter(inventory_period_balance::Column::Period.eq(period))
            .one(self.db.as_ref())
            .await?)
    }

    async fn roll_product(
        &self,
        product_id: i64,
        period: &str,
        prior: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let _guard = self
            .locks
            .acquire(AggregateLocks::period_key(product_id, period))
            .await;

        let period = period.to_string();
        let prior = prior.to_string();

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    let prior_balance = InventoryPeriodBalance::find()
                        .filter(inventory_period_balance::Column::ProductId.eq(product_id))
                        .filter(inventory_period_balance::Column::Period.eq(prior))
                        .one(txn)
                        .await?;

                    let (beginning_quantity, beginning_amount) = match &prior_balance {
                        Some(b) => (b.ending_quantity, b.ending_amount),
                        None => (Decimal::ZERO, Decimal::ZERO),
                    };
                    let beginning_unit_price = unit_price_of(beginning_amount, beginning_quantity);

                    let rows = InventoryTransaction::find()
                        .filter(inventory_transaction::Column::ProductId.eq(product_id))
                        .filter(inventory_transaction::Column::TransactionDate.gte(start))
                        .filter(inventory_transaction::Column::TransactionDate.lte(end))
                        .all(txn)
                        .await?;

                    let mut inbound_quantity = Decimal::ZERO;
                    let mut inbound_amount = Decimal::ZERO;
                    let mut outbound_quantity = Decimal::ZERO;
                    let mut outbound_cost_amount = Decimal::ZERO;
                    for row in &rows {
                        match row.transaction_type() {
                            Some(TransactionType::Inbound) => {
                                inbound_quantity += row.quantity;
                                inbound_amount += row.amount;
                            }
                            Some(TransactionType::Outbound) => {
                                outbound_quantity += row.quantity;
                                outbound_cost_amount +=
                                    row.cost_amount.unwrap_or(Decimal::ZERO);
                            }
                            None => {}
                        }
                    }

                    let inbound_unit_price = if inbound_quantity.is_zero() {
                        None
                    } else {
                        Some(unit_price_of(inbound_amount, inbound_quantity))
                    };
                    let outbound_cost_unit_price = if outbound_quantity.is_zero() {
                        None
                    } else {
                        Some(unit_price_of(outbound_cost_amount, outbound_quantity))
                    };

                    let ending_quantity = beginning_quantity + inbound_quantity - outbound_quantity;
                    let ending_amount = beginning_amount + inbound_amount - outbound_cost_amount;
                    let ending_unit_price = unit_price_of(ending_amount, ending_quantity);

                    let existing = InventoryPeriodBalance::find()
                        .filter(inventory_period_balance::Column::ProductId.eq(product_id))
                        .filter(inventory_period_balance::Column::Period.eq(period.clone()))
                        .one(txn)
                        .await?;

                    let mut balance = match existing {
                        Some(model) => inventory_period_balance::ActiveModel::from(model),
                        None => inventory_period_balance::ActiveModel {
                            product_id: Set(product_id),
                            period: Set(period),
                            ..Default::default()
                        },
                    };
                    balance.beginning_quantity = Set(beginning_quantity);
                    balance.beginning_unit_price = Set(beginning_unit_price);
                    balance.beginning_amount = Set(beginning_amount);
                    balance.inbound_quantity = Set(inbound_quantity);
                    balance.inbound_unit_price = Set(inbound_unit_price);
                    balance.inbound_amount = Set(inbound_amount);
                    balance.outbound_quantity = Set(outbound_quantity);
                    balance.outbound_cost_unit_price = Set(outbound_cost_unit_price);
                    balance.outbound_cost_amount = Set(outbound_cost_amount);
                    balance.ending_quantity = Set(ending_quantity);
                    balance.ending_unit_price = Set(ending_unit_price);
                    balance.ending_amount = Set(ending_amount);
                    balance.save(txn).await?;

                    Ok(())
                })
            })
            .await
            .map_err(from_transaction_error)
    }
}

/// amount / quantity rounded half-up to two decimals; zero for any
/// non-positive quantity (ending quantities can go negative when periods
/// are generated out of order).
fn unit_price_of(amount: Decimal, quantity: Decimal) -> Decimal {
    if quantity <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        (amount / quantity).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// [first day 00:00:00, last day 23:59:59] UTC for a `yyyy-MM` period.
fn period_bounds(period: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
    use chrono::Datelike;
    let first = NaiveDate::parse_from_str(&format!("{}-01", period), "%Y-%m-%d")
        .map_err(|_| ServiceError::ValidationError(format!("invalid period: {}", period)))?;
    let (year, month) = (first.year(), first.month());
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| ServiceError::ValidationError(format!("invalid period: {}", period)))?;
    let last = first_of_next.pred_opt().ok_or_else(|| {
        ServiceError::ValidationError(format!("invalid period: {}", period))
    })?;

    let start = Utc.from_utc_datetime(
        &first
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ServiceError::InternalError("invalid time".into()))?,
    );
    let end = Utc.from_utc_datetime(
        &last
            .and_hms_opt(23, 59, 59)
            .ok_or_else(|| ServiceError::InternalError("invalid time".into()))?,
    );
    Ok((start, end))
}

/// The `yyyy-MM` immediately before `period`.
fn prior_period(period: &str) -> Result<String, ServiceError> {
    use chrono::Datelike;
    let first = NaiveDate::parse_from_str(&format!("{}-01", period), "%Y-%m-%d")
        .map_err(|_| ServiceError::ValidationError(format!("invalid period: {}", period)))?;
    let (year, month) = if first.month() == 1 {
        (first.year() - 1, 12)
    } else {
        (first.year(), first.month() - 1)
    };
    Ok(format!("{:04}-{:02}", year, month))
}

#[cfg(test)]
mod tests {
    use super::{period_bounds, prior_period, unit_price_of};
    use chrono::{Datelike, Timelike};
    use rust_decimal_macros::dec;

    #[test]
    fn prior_period_rolls_over_year_boundary() {
        assert_eq!(prior_period("2025-01").unwrap(), "2024-12");
        assert_eq!(prior_period("2025-07").unwrap(), "2025-06");
    }

    #[test]
    fn period_bounds_cover_the_whole_month() {
        let (start, end) = period_bounds("2025-02").unwrap();
        assert_eq!((start.month(), start.day(), start.hour()), (2, 1, 0));
        assert_eq!((end.month(), end.day()), (2, 28));
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
    }

    #[test]
    fn invalid_period_is_rejected() {
        assert!(period_bounds("2025-13").is_err());
        assert!(period_bounds("garbage").is_err());
    }

    #[test]
    fn unit_price_rounds_half_up() {
        assert_eq!(unit_price_of(dec!(10), dec!(3)), dec!(3.33));
        // midpoint rounds away from zero
        assert_eq!(unit_price_of(dec!(0.05), dec!(2)), dec!(0.03));
    }

    #[test]
    fn nonpositive_quantity_yields_zero_price() {
        assert_eq!(unit_price_of(dec!(1), dec!(0)), dec!(0));
        assert_eq!(unit_price_of(dec!(-100), dec!(-10)), dec!(0));
        assert_eq!(unit_price_of(dec!(100), dec!(-10)), dec!(0));
    }
}
