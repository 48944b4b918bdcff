use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        inventory_batch::{self, BatchStatus, Entity as InventoryBatch},
        product::Entity as Product,
    },
    errors::{from_transaction_error, ServiceError},
    events::{Event, EventSender},
    services::locks::AggregateLocks,
    services::sequences::{self, BATCH_PREFIX},
};

/// Batch creation request. `batch_number` is generated when absent;
/// `inbound_date` defaults to today and `remaining_quantity` to
/// `initial_quantity`.
#[derive(Debug, Clone, Validate)]
pub struct CreateBatchInput {
    pub product_id: i64,
    #[validate(length(min = 1, max = 64))]
    pub batch_number: Option<String>,
    pub warehouse: Option<String>,
    pub location: Option<String>,
    pub purchase_reference: Option<String>,
    pub production_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub inbound_date: Option<NaiveDate>,
    pub initial_quantity: Decimal,
    pub remaining_quantity: Option<Decimal>,
    pub unit_cost: Decimal,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

/// Metadata update; `None` fields are left unchanged. Quantities are not
/// editable here — they only move through FIFO deduction and
/// reconciliation adjustments.
#[derive(Debug, Clone, Default)]
pub struct UpdateBatchInput {
    pub batch_number: Option<String>,
    pub production_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub unit_cost: Option<Decimal>,
    pub status: Option<BatchStatus>,
    pub remarks: Option<String>,
}

/// One batch's share of a FIFO deduction, oldest first. Callers use the
/// unit costs for FIFO costing of the movement.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConsumption {
    pub batch_id: i64,
    pub batch_number: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
}

/// Service owning batch records, their status lifecycle and FIFO
/// retrieval/consumption.
#[derive(Clone)]
pub struct InventoryBatchService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    locks: Arc<AggregateLocks>,
}

impl InventoryBatchService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>, locks: Arc<AggregateLocks>) -> Self {
        Self {
            db,
            event_sender,
            locks,
        }
    }

    pub async fn get_all_batches(&self) -> Result<Vec<inventory_batch::Model>, ServiceError> {
        Ok(InventoryBatch::find()
            .order_by_asc(inventory_batch::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }

    pub async fn get_batch_by_id(&self, id: i64) -> Result<inventory_batch::Model, ServiceError> {
        InventoryBatch::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", id)))
    }

    pub async fn get_batches_by_product(
        &self,
        product_id: i64,
    ) -> Result<Vec<inventory_batch::Model>, ServiceError> {
        self.ensure_product_exists(product_id).await?;
        Ok(InventoryBatch::find()
            .filter(inventory_batch::Column::ProductId.eq(product_id))
            .order_by_asc(inventory_batch::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }

    /// AVAILABLE batches with stock left, ordered (inbound_date, id)
    /// ascending. The id tie-break keeps FIFO costing reproducible for
    /// batches received the same day.
    pub async fn get_available_batches_fifo(
        &self,
        product_id: i64,
    ) -> Result<Vec<inventory_batch::Model>, ServiceError> {
        self.ensure_product_exists(product_id).await?;
        Ok(InventoryBatch::find()
            .filter(inventory_batch::Column::ProductId.eq(product_id))
            .filter(inventory_batch::Column::Status.eq(BatchStatus::Available.as_str()))
            .filter(inventory_batch::Column::RemainingQuantity.gt(Decimal::ZERO))
            .order_by_asc(inventory_batch::Column::InboundDate)
            .order_by_asc(inventory_batch::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }

    #[instrument(skip(self, input), fields(product_id = input.product_id))]
    pub async fn create_batch(
        &self,
        input: CreateBatchInput,
    ) -> Result<inventory_batch::Model, ServiceError> {
        input.validate()?;
        if input.initial_quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "initial quantity must be greater than zero".into(),
            ));
        }
        if input.unit_cost < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "unit cost cannot be negative".into(),
            ));
        }
        if let Some(remaining) = input.remaining_quantity {
            if remaining < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "remaining quantity cannot be negative".into(),
                ));
            }
        }

        let created = self
            .db
            .transaction::<_, inventory_batch::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    Product::find_by_id(input.product_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Product {} not found",
                                input.product_id
                            ))
                        })?;

                    let batch_number = match input.batch_number {
                        Some(number) => {
                            let exists = InventoryBatch::find()
                                .filter(inventory_batch::Column::BatchNumber.eq(number.clone()))
                                .one(txn)
                                .await?;
                            if exists.is_some() {
                                return Err(ServiceError::Conflict(format!(
                                    "Batch number {} already exists",
                                    number
                                )));
                            }
                            number
                        }
                        None => sequences::next_document_number(txn, BATCH_PREFIX).await?,
                    };

                    let inbound_date = input
                        .inbound_date
                        .unwrap_or_else(|| Local::now().date_naive());
                    let remaining = input.remaining_quantity.unwrap_or(input.initial_quantity);

                    let batch = inventory_batch::ActiveModel {
                        batch_number: Set(batch_number),
                        product_id: Set(input.product_id),
                        warehouse: Set(input.warehouse),
                        location: Set(input.location),
                        purchase_reference: Set(input.purchase_reference),
                        production_date: Set(input.production_date),
                        expiration_date: Set(input.expiration_date),
                        inbound_date: Set(inbound_date),
                        initial_quantity: Set(input.initial_quantity),
                        remaining_quantity: Set(remaining),
                        unit_cost: Set(input.unit_cost),
                        status: Set(BatchStatus::Available.as_str().to_string()),
                        remarks: Set(input.remarks),
                        ..Default::default()
                    };

                    Ok(batch.insert(txn).await?)
                })
            })
            .await
            .map_err(from_transaction_error)?;

        info!(
            batch_id = created.id,
            batch_number = %created.batch_number,
            "Created inventory batch"
        );
        self.event_sender
            .send(Event::BatchCreated {
                batch_id: created.id,
                product_id: created.product_id,
                batch_number: created.batch_number.clone(),
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(created)
    }

    /// Consume `quantity` from the product's batches oldest-first, inside
    /// one transaction under the product lock. Expired batches encountered
    /// along the walk are reclassified EXPIRED and skipped. Feasibility is
    /// checked against the eligible total before anything is mutated, and
    /// an `InsufficientStock` failure rolls the whole transaction back.
    #[instrument(skip(self))]
    pub async fn deduct_from_batches_fifo(
        &self,
        product_id: i64,
        quantity: Decimal,
    ) -> Result<Vec<BatchConsumption>, ServiceError> {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "deduction quantity must be greater than zero".into(),
            ));
        }

        let _guard = self
            .locks
            .acquire(AggregateLocks::product_key(product_id))
            .await;

        let consumptions = self
            .db
            .transaction::<_, Vec<BatchConsumption>, ServiceError>(move |txn| {
                Box::pin(async move {
                    Product::find_by_id(product_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Product {} not found", product_id))
                        })?;

                    let batches = InventoryBatch::find()
                        .filter(inventory_batch::Column::ProductId.eq(product_id))
                        .filter(inventory_batch::Column::Status.eq(BatchStatus::Available.as_str()))
                        .filter(inventory_batch::Column::RemainingQuantity.gt(Decimal::ZERO))
                        .order_by_asc(inventory_batch::Column::InboundDate)
                        .order_by_asc(inventory_batch::Column::Id)
                        .all(txn)
                        .await?;

                    // Feasibility before any mutation: only non-expired
                    // batches can cover the request.
                    let eligible_total: Decimal = batches
                        .iter()
                        .filter(|b| !b.is_expired())
                        .map(|b| b.remaining_quantity)
                        .sum();
                    if eligible_total < quantity {
                        return Err(ServiceError::InsufficientStock {
                            shortfall: quantity - eligible_total,
                        });
                    }

                    let mut still_needed = quantity;
                    let mut consumptions = Vec::new();

                    for batch in batches {
                        if still_needed <= Decimal::ZERO {
                            break;
                        }

                        if batch.is_expired() {
                            warn!(
                                batch_id = batch.id,
                                batch_number = %batch.batch_number,
                                "Skipping expired batch during FIFO deduction"
                            );
                            let mut expired: inventory_batch::ActiveModel = batch.into();
                            expired.status = Set(BatchStatus::Expired.as_str().to_string());
                            expired.update(txn).await?;
                            continue;
                        }

                        let taken = batch.remaining_quantity.min(still_needed);
                        let new_remaining = batch.remaining_quantity - taken;
                        still_needed -= taken;

                        consumptions.push(BatchConsumption {
                            batch_id: batch.id,
                            batch_number: batch.batch_number.clone(),
                            quantity: taken,
                            unit_cost: batch.unit_cost,
                        });

                        let mut consumed: inventory_batch::ActiveModel = batch.into();
                        consumed.remaining_quantity = Set(new_remaining);
                        if new_remaining <= Decimal::ZERO {
                            consumed.status = Set(BatchStatus::Depleted.as_str().to_string());
                        }
                        consumed.update(txn).await?;
                    }

                    Ok(consumptions)
                })
            })
            .await
            .map_err(from_transaction_error)?;

        info!(
            product_id,
            %quantity,
            batches_touched = consumptions.len(),
            "Deducted stock from batches FIFO"
        );
        self.event_sender
            .send(Event::BatchesConsumed {
                product_id,
                quantity,
                batches_touched: consumptions.len(),
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(consumptions)
    }

    /// Sum of remaining quantity over the product's AVAILABLE batches.
    pub async fn get_total_available_quantity(
        &self,
        product_id: i64,
    ) -> Result<Decimal, ServiceError> {
        let batches = self.get_available_batches_fifo(product_id).await?;
        Ok(batches.iter().map(|b| b.remaining_quantity).sum())
    }

    #[instrument(skip(self, input))]
    pub async fn update_batch(
        &self,
        id: i64,
        input: UpdateBatchInput,
    ) -> Result<inventory_batch::Model, ServiceError> {
        let existing = self.get_batch_by_id(id).await?;

        if let Some(ref number) = input.batch_number {
            if *number != existing.batch_number {
                let taken = InventoryBatch::find()
                    .filter(inventory_batch::Column::BatchNumber.eq(number.clone()))
                    .one(self.db.as_ref())
                    .await?;
                if taken.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "Batch number {} already exists",
                        number
                    )));
                }
            }
        }

        let mut batch: inventory_batch::ActiveModel = existing.into();
        if let Some(number) = input.batch_number {
            batch.batch_number = Set(number);
        }
        if let Some(date) = input.production_date {
            batch.production_date = Set(Some(date));
        }
        if let Some(date) = input.expiration_date {
            batch.expiration_date = Set(Some(date));
        }
        if let Some(cost) = input.unit_cost {
            batch.unit_cost = Set(cost);
        }
        if let Some(status) = input.status {
            batch.status = Set(status.as_str().to_string());
        }
        if let Some(remarks) = input.remarks {
            batch.remarks = Set(Some(remarks));
        }

        Ok(batch.update(self.db.as_ref()).await?)
    }

    /// Batches are never deleted while stock remains in them.
    #[instrument(skip(self))]
    pub async fn delete_batch(&self, id: i64) -> Result<(), ServiceError> {
        let batch = self.get_batch_by_id(id).await?;

        if batch.remaining_quantity > Decimal::ZERO {
            return Err(ServiceError::Conflict(format!(
                "Batch {} still has {} remaining and cannot be deleted",
                batch.batch_number, batch.remaining_quantity
            )));
        }

        batch.delete(self.db.as_ref()).await?;
        self.event_sender
            .send(Event::BatchDeleted { batch_id: id })
            .await
            .map_err(ServiceError::EventError)?;
        Ok(())
    }

    /// Batches expiring within the next 30 days that still hold stock.
    pub async fn get_expiring_soon_batches(
        &self,
    ) -> Result<Vec<inventory_batch::Model>, ServiceError> {
        let today = Local::now().date_naive();
        let horizon = today + chrono::Duration::days(30);
        Ok(InventoryBatch::find()
            .filter(inventory_batch::Column::ExpirationDate.gte(today))
            .filter(inventory_batch::Column::ExpirationDate.lt(horizon))
            .filter(inventory_batch::Column::RemainingQuantity.gt(Decimal::ZERO))
            .order_by_asc(inventory_batch::Column::ExpirationDate)
            .all(self.db.as_ref())
            .await?)
    }

    /// Batches past their expiration date that still hold stock.
    pub async fn get_expired_batches(&self) -> Result<Vec<inventory_batch::Model>, ServiceError> {
        let today = Local::now().date_naive();
        Ok(InventoryBatch::find()
            .filter(inventory_batch::Column::ExpirationDate.lt(today))
            .filter(inventory_batch::Column::RemainingQuantity.gt(Decimal::ZERO))
            .order_by_asc(inventory_batch::Column::ExpirationDate)
            .all(self.db.as_ref())
            .await?)
    }

    /// Reclassification sweep: flip every expired batch that is not yet
    /// marked EXPIRED. Returns the number reclassified. Expiry is otherwise
    /// applied lazily as batches are touched by FIFO deduction.
    #[instrument(skip(self))]
    pub async fn update_expired_batch_status(&self) -> Result<usize, ServiceError> {
        let expired = self.get_expired_batches().await?;
        let mut count = 0;

        for batch in expired {
            if batch.status() != Some(BatchStatus::Expired) {
                let mut model: inventory_batch::ActiveModel = batch.into();
                model.status = Set(BatchStatus::Expired.as_str().to_string());
                model.update(self.db.as_ref()).await?;
                count += 1;
            }
        }

        if count > 0 {
            info!(count, "Reclassified expired batches");
            self.event_sender
                .send(Event::ExpiredBatchesReclassified { count })
                .await
                .map_err(ServiceError::EventError)?;
        }
        Ok(count)
    }

    async fn ensure_product_exists(&self, product_id: i64) -> Result<(), ServiceError> {
        Product::find_by_id(product_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        Ok(())
    }
}
