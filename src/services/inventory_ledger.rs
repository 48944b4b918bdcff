use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    db::DbPool,
    entities::{
        inventory_transaction::{self, Entity as InventoryTransaction, TransactionType},
        product::{self, Entity as Product},
    },
    errors::{from_transaction_error, ServiceError},
    events::{Event, EventSender},
    services::locks::AggregateLocks,
};

/// Inbound movement to append to the log.
#[derive(Debug, Clone)]
pub struct RecordInboundInput {
    pub product_id: i64,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub reference_id: Option<String>,
    pub warehouse: Option<String>,
    pub remarks: Option<String>,
}

/// Outbound movement to append to the log. The sale price comes from the
/// product record; `cost_unit_price` is the FIFO cost the caller computed
/// from the batches it consumed.
#[derive(Debug, Clone)]
pub struct RecordOutboundInput {
    pub product_id: i64,
    pub quantity: Decimal,
    pub cost_unit_price: Decimal,
    pub reference_id: Option<String>,
    pub warehouse: Option<String>,
    pub remarks: Option<String>,
}

/// Append-only transaction log plus the product stock cache it keeps in
/// step. Recorded rows are never updated or deleted; corrections are new
/// compensating rows.
#[derive(Clone)]
pub struct InventoryLedgerService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    locks: Arc<AggregateLocks>,
}

impl InventoryLedgerService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>, locks: Arc<AggregateLocks>) -> Self {
        Self {
            db,
            event_sender,
            locks,
        }
    }

    /// Appends an INBOUND row and raises the stock cache by the truncated
    /// quantity, in one transaction under the product lock.
    #[instrument(skip(self, input), fields(product_id = input.product_id))]
    pub async fn record_inbound_transaction(
        &self,
        input: RecordInboundInput,
    ) -> Result<inventory_transaction::Model, ServiceError> {
        if input.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "inbound quantity must be greater than zero".into(),
            ));
        }
        if input.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "unit price cannot be negative".into(),
            ));
        }

        let _guard = self
            .locks
            .acquire(AggregateLocks::product_key(input.product_id))
            .await;

        let recorded = self
            .db
            .transaction::<_, inventory_transaction::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let product = Product::find_by_id(input.product_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Product {} not found",
                                input.product_id
                            ))
                        })?;

                    let row = append_inbound_row(
                        txn,
                        input.product_id,
                        input.quantity,
                        input.unit_price,
                        input.reference_id,
                        input.warehouse,
                        input.remarks,
                    )
                    .await?;

                    let delta = quantity_as_units(input.quantity);
                    let new_stock = product.stock + delta;
                    let mut update: product::ActiveModel = product.into();
                    update.stock = Set(new_stock);
                    update.update(txn).await?;

                    Ok(row)
                })
            })
            .await
            .map_err(from_transaction_error)?;

        info!(
            transaction_id = recorded.id,
            quantity = %recorded.quantity,
            amount = %recorded.amount,
            "Recorded inbound transaction"
        );
        self.event_sender
            .send(Event::InboundRecorded {
                transaction_id: recorded.id,
                product_id: recorded.product_id,
                quantity: recorded.quantity,
                amount: recorded.amount,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(recorded)
    }

    /// Appends an OUTBOUND row and lowers the stock cache, in one
    /// transaction under the product lock. A decrement that would drive
    /// the cache negative is rejected outright.
    #[instrument(skip(self, input), fields(product_id = input.product_id))]
    pub async fn record_outbound_transaction(
        &self,
        input: RecordOutboundInput,
    ) -> Result<inventory_transaction::Model, ServiceError> {
        if input.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "outbound quantity must be greater than zero".into(),
            ));
        }
        if input.cost_unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "cost unit price cannot be negative".into(),
            ));
        }

        let _guard = self
            .locks
            .acquire(AggregateLocks::product_key(input.product_id))
            .await;

        let recorded = self
            .db
            .transaction::<_, inventory_transaction::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let product = Product::find_by_id(input.product_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Product {} not found",
                                input.product_id
                            ))
                        })?;

                    let delta = quantity_as_units(input.quantity);
                    let new_stock = product.stock - delta;
                    if new_stock < 0 {
                        return Err(ServiceError::InsufficientStock {
                            shortfall: Decimal::from(-i64::from(new_stock)),
                        });
                    }

                    let sale_price = product.price.unwrap_or(Decimal::ZERO);
                    let row = append_outbound_row(
                        txn,
                        input.product_id,
                        input.quantity,
                        sale_price,
                        input.cost_unit_price,
                        input.reference_id,
                        input.warehouse,
                        input.remarks,
                    )
                    .await?;

                    let mut update: product::ActiveModel = product.into();
                    update.stock = Set(new_stock);
                    update.update(txn).await?;

                    Ok(row)
                })
            })
            .await
            .map_err(from_transaction_error)?;

        info!(
            transaction_id = recorded.id,
            quantity = %recorded.quantity,
            cost_amount = ?recorded.cost_amount,
            "Recorded outbound transaction"
        );
        self.event_sender
            .send(Event::OutboundRecorded {
                transaction_id: recorded.id,
                product_id: recorded.product_id,
                quantity: recorded.quantity,
                cost_amount: recorded.cost_amount.unwrap_or(Decimal::ZERO),
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(recorded)
    }

    pub async fn get_product_transactions(
        &self,
        product_id: i64,
    ) -> Result<Vec<inventory_transaction::Model>, ServiceError> {
        Ok(InventoryTransaction::find()
            .filter(inventory_transaction::Column::ProductId.eq(product_id))
            .order_by_asc(inventory_transaction::Column::TransactionDate)
            .order_by_asc(inventory_transaction::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }

    /// All transactions with `transaction_date` in `[start, end]`.
    pub async fn get_transactions_by_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<inventory_transaction::Model>, ServiceError> {
        Ok(InventoryTransaction::find()
            .filter(inventory_transaction::Column::TransactionDate.gte(start))
            .filter(inventory_transaction::Column::TransactionDate.lte(end))
            .order_by_asc(inventory_transaction::Column::TransactionDate)
            .order_by_asc(inventory_transaction::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }
}

/// Stock cache units are whole integers; fractional movement quantities
/// contribute their truncated part.
pub(crate) fn quantity_as_units(quantity: Decimal) -> i32 {
    use rust_decimal::prelude::ToPrimitive;
    quantity.trunc().to_i32().unwrap_or(0)
}

/// Inserts an INBOUND row without touching the stock cache. Used inside a
/// caller-owned transaction when the stock side is applied separately.
pub(crate) async fn append_inbound_row<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    quantity: Decimal,
    unit_price: Decimal,
    reference_id: Option<String>,
    warehouse: Option<String>,
    remarks: Option<String>,
) -> Result<inventory_transaction::Model, ServiceError> {
    let row = inventory_transaction::ActiveModel {
        product_id: Set(product_id),
        r#type: Set(TransactionType::Inbound.as_str().to_string()),
        transaction_date: Set(Utc::now()),
        quantity: Set(quantity),
        unit_price: Set(unit_price),
        amount: Set(quantity * unit_price),
        cost_unit_price: Set(None),
        cost_amount: Set(None),
        reference_id: Set(reference_id),
        warehouse: Set(warehouse),
        remarks: Set(remarks),
        ..Default::default()
    };
    Ok(row.insert(conn).await?)
}

/// Inserts an OUTBOUND row without touching the stock cache.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn append_outbound_row<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    quantity: Decimal,
    sale_price: Decimal,
    cost_unit_price: Decimal,
    reference_id: Option<String>,
    warehouse: Option<String>,
    remarks: Option<String>,
) -> Result<inventory_transaction::Model, ServiceError> {
    let row = inventory_transaction::ActiveModel {
        product_id: Set(product_id),
        r#type: Set(TransactionType::Outbound.as_str().to_string()),
        transaction_date: Set(Utc::now()),
        quantity: Set(quantity),
        unit_price: Set(sale_price),
        amount: Set(quantity * sale_price),
        cost_unit_price: Set(Some(cost_unit_price)),
        cost_amount: Set(Some(quantity * cost_unit_price)),
        reference_id: Set(reference_id),
        warehouse: Set(warehouse),
        remarks: Set(remarks),
        ..Default::default()
    };
    Ok(row.insert(conn).await?)
}
