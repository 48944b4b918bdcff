use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        inventory_batch::Entity as InventoryBatch,
        inventory_check::{self, CheckStatus, CheckType, Entity as InventoryCheck},
        inventory_check_item::{
            self, compute_discrepancy, Entity as InventoryCheckItem, ProcessAction,
        },
        product::{self, Entity as Product},
    },
    errors::{from_transaction_error, ServiceError},
    events::{Event, EventSender},
    services::inventory_ledger::{append_inbound_row, append_outbound_row, quantity_as_units},
    services::locks::AggregateLocks,
    services::sequences::{self, CHECK_PREFIX},
};

#[derive(Debug, Clone, Validate)]
pub struct CreateCheckInput {
    #[validate(length(min = 1, max = 64))]
    pub check_number: Option<String>,
    pub check_date: Option<DateTime<Utc>>,
    pub warehouse: Option<String>,
    pub check_type: CheckType,
    pub checker: Option<String>,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

/// Header metadata update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateCheckInput {
    pub check_date: Option<DateTime<Utc>>,
    pub warehouse: Option<String>,
    pub check_type: Option<CheckType>,
    pub checker: Option<String>,
    pub remarks: Option<String>,
}

/// New count line. `book_quantity` snapshots the product's stock cache
/// when not given explicitly.
#[derive(Debug, Clone)]
pub struct AddCheckItemInput {
    pub product_id: i64,
    pub batch_id: Option<i64>,
    pub location: Option<String>,
    pub book_quantity: Option<Decimal>,
    pub actual_quantity: Option<Decimal>,
    pub unit_cost: Option<Decimal>,
    pub discrepancy_reason: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCheckItemInput {
    pub actual_quantity: Option<Decimal>,
    pub unit_cost: Option<Decimal>,
    pub discrepancy_reason: Option<String>,
    pub process_action: Option<ProcessAction>,
    pub remarks: Option<String>,
}

/// Physical-count reconciliation: counting sessions walk DRAFT →
/// IN_PROGRESS → COMPLETED → APPROVED, then approved discrepancies are
/// applied to stock in one all-or-nothing pass.
#[derive(Clone)]
pub struct InventoryCheckService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    locks: Arc<AggregateLocks>,
}

impl InventoryCheckService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>, locks: Arc<AggregateLocks>) -> Self {
        Self {
            db,
            event_sender,
            locks,
        }
    }

    #[instrument(skip(self, input))]
    pub async fn create_check(
        &self,
        input: CreateCheckInput,
    ) -> Result<inventory_check::Model, ServiceError> {
        input.validate()?;

        let created = self
            .db
            .transaction::<_, inventory_check::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let check_number = match input.check_number {
                        Some(number) => {
                            let exists = InventoryCheck::find()
                                .filter(inventory_check::Column::CheckNumber.eq(number.clone()))
                                .one(txn)
                                .await?;
                            if exists.is_some() {
                                return Err(ServiceError::Conflict(format!(
                                    "Check number {} already exists",
                                    number
                                )));
                            }
                            number
                        }
                        None => sequences::next_document_number(txn, CHECK_PREFIX).await?,
                    };

                    let check = inventory_check::ActiveModel {
                        check_number: Set(check_number),
                        check_date: Set(input.check_date.unwrap_or_else(Utc::now)),
                        warehouse: Set(input.warehouse),
                        check_type: Set(input.check_type.as_str().to_string()),
                        status: Set(CheckStatus::Draft.as_str().to_string()),
                        checker: Set(input.checker),
                        remarks: Set(input.remarks),
                        ..Default::default()
                    };
                    Ok(check.insert(txn).await?)
                })
            })
            .await
            .map_err(from_transaction_error)?;

        info!(
            check_id = created.id,
            check_number = %created.check_number,
            "Created inventory check"
        );
        self.event_sender
            .send(Event::CheckCreated {
                check_id: created.id,
                check_number: created.check_number.clone(),
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(created)
    }

    pub async fn get_check_by_id(&self, id: i64) -> Result<inventory_check::Model, ServiceError> {
        InventoryCheck::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Check {} not found", id)))
    }

    pub async fn get_checks_by_status(
        &self,
        status: CheckStatus,
    ) -> Result<Vec<inventory_check::Model>, ServiceError> {
        Ok(InventoryCheck::find()
            .filter(inventory_check::Column::Status.eq(status.as_str()))
            .order_by_asc(inventory_check::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }

    /// Checks having at least one counted line that disagrees with the
    /// book quantity.
    pub async fn get_checks_with_discrepancies(
        &self,
    ) -> Result<Vec<inventory_check::Model>, ServiceError> {
        let items = InventoryCheckItem::find()
            .filter(inventory_check_item::Column::DiscrepancyQuantity.ne(Decimal::ZERO))
            .all(self.db.as_ref())
            .await?;
        let ids: BTreeSet<i64> = items.iter().map(|i| i.check_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(InventoryCheck::find()
            .filter(inventory_check::Column::Id.is_in(ids))
            .order_by_asc(inventory_check::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }

    /// Header metadata can change only while the check is DRAFT or
    /// IN_PROGRESS.
    #[instrument(skip(self, input))]
    pub async fn update_check(
        &self,
        id: i64,
        input: UpdateCheckInput,
    ) -> Result<inventory_check::Model, ServiceError> {
        let _guard = self.locks.acquire(AggregateLocks::check_key(id)).await;

        let existing = self.get_check_by_id(id).await?;
        self.ensure_editable(&existing)?;

        let mut check: inventory_check::ActiveModel = existing.into();
        if let Some(date) = input.check_date {
            check.check_date = Set(date);
        }
        if let Some(warehouse) = input.warehouse {
            check.warehouse = Set(Some(warehouse));
        }
        if let Some(check_type) = input.check_type {
            check.check_type = Set(check_type.as_str().to_string());
        }
        if let Some(checker) = input.checker {
            check.checker = Set(Some(checker));
        }
        if let Some(remarks) = input.remarks {
            check.remarks = Set(Some(remarks));
        }
        Ok(check.update(self.db.as_ref()).await?)
    }

    /// Only a DRAFT check can be deleted; its items go with it.
    #[instrument(skip(self))]
    pub async fn delete_check(&self, id: i64) -> Result<(), ServiceError> {
        let _guard = self.locks.acquire(AggregateLocks::check_key(id)).await;

        let check = self.get_check_by_id(id).await?;
        if check.status() != Some(CheckStatus::Draft) {
            return Err(ServiceError::InvalidOperation(format!(
                "Check {} is {} and only DRAFT checks can be deleted",
                check.check_number, check.status
            )));
        }
        check.delete(self.db.as_ref()).await?;
        Ok(())
    }

    pub async fn start_check(&self, id: i64) -> Result<inventory_check::Model, ServiceError> {
        self.transition(id, CheckStatus::InProgress, |_| Ok(())).await
    }

    /// Completing requires at least one line and every line counted. The
    /// check lock is held across the item read and the transition, so a
    /// concurrent `add_check_item` cannot slip an uncounted line in
    /// between the validation and the status change.
    pub async fn complete_check(&self, id: i64) -> Result<inventory_check::Model, ServiceError> {
        let _guard = self.locks.acquire(AggregateLocks::check_key(id)).await;

        self.get_check_by_id(id).await?;
        let items = InventoryCheckItem::find()
            .filter(inventory_check_item::Column::CheckId.eq(id))
            .all(self.db.as_ref())
            .await?;
        if items.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "cannot complete a check with no items".into(),
            ));
        }
        if let Some(uncounted) = items.iter().find(|i| i.actual_quantity.is_none()) {
            return Err(ServiceError::InvalidOperation(format!(
                "item {} has no actual quantity recorded",
                uncounted.id
            )));
        }

        self.transition_locked(id, CheckStatus::Completed, |_| Ok(())).await
    }

    pub async fn approve_check(
        &self,
        id: i64,
        approver: &str,
    ) -> Result<inventory_check::Model, ServiceError> {
        if approver.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "approver must not be empty".into(),
            ));
        }
        let approver = approver.to_string();
        self.transition(id, CheckStatus::Approved, move |check| {
            check.approver = Set(Some(approver));
            check.approval_date = Set(Some(Utc::now()));
            Ok(())
        })
        .await
    }

    /// Apply every unprocessed ADJUST line of an APPROVED check: stock
    /// moves by the truncated discrepancy and a compensating ledger row is
    /// appended at the line's unit cost, all in one transaction. Any
    /// failure (including a would-be negative stock) rolls the whole run
    /// back. IGNORE lines and zero discrepancies are never processed.
    #[instrument(skip(self))]
    pub async fn process_discrepancies(&self, id: i64) -> Result<usize, ServiceError> {
        let _check_guard = self.locks.acquire(AggregateLocks::check_key(id)).await;

        let check = self.get_check_by_id(id).await?;
        if check.status() != Some(CheckStatus::Approved) {
            return Err(ServiceError::InvalidStatus(format!(
                "Check {} is {}; only APPROVED checks can be processed",
                check.check_number, check.status
            )));
        }

        let pending = InventoryCheckItem::find()
            .filter(inventory_check_item::Column::CheckId.eq(id))
            .filter(inventory_check_item::Column::Processed.eq(false))
            .filter(inventory_check_item::Column::ProcessAction.eq(ProcessAction::Adjust.as_str()))
            .filter(inventory_check_item::Column::DiscrepancyQuantity.ne(Decimal::ZERO))
            .order_by_asc(inventory_check_item::Column::Id)
            .all(self.db.as_ref())
            .await?;
        if pending.is_empty() {
            return Ok(0);
        }

        // Product locks in id order, consistent with every other
        // multi-lock acquirer.
        let product_ids: BTreeSet<i64> = pending.iter().map(|i| i.product_id).collect();
        let keys: Vec<String> = product_ids
            .iter()
            .map(|pid| AggregateLocks::product_key(*pid))
            .collect();
        let _product_guards = self.locks.acquire_all(&keys).await;

        let check_number = check.check_number.clone();
        let warehouse = check.warehouse.clone();
        let adjusted = self
            .db
            .transaction::<_, usize, ServiceError>(move |txn| {
                Box::pin(async move {
                    let mut adjusted = 0;
                    for item in pending {
                        let prod = Product::find_by_id(item.product_id)
                            .one(txn)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Product {} not found",
                                    item.product_id
                                ))
                            })?;

                        let delta = quantity_as_units(item.discrepancy_quantity);
                        let new_stock = prod.stock + delta;
                        if new_stock < 0 {
                            return Err(ServiceError::NegativeStockResult {
                                resulting: i64::from(new_stock),
                            });
                        }

                        let unit_cost = item.unit_cost.unwrap_or(Decimal::ZERO);
                        let remark = format!(
                            "Count adjustment for check {}",
                            check_number
                        );
                        if item.is_surplus() {
                            append_inbound_row(
                                txn,
                                item.product_id,
                                item.discrepancy_quantity,
                                unit_cost,
                                Some(check_number.clone()),
                                warehouse.clone(),
                                Some(remark),
                            )
                            .await?;
                        } else {
                            append_outbound_row(
                                txn,
                                item.product_id,
                                -item.discrepancy_quantity,
                                prod.price.unwrap_or(Decimal::ZERO),
                                unit_cost,
                                Some(check_number.clone()),
                                warehouse.clone(),
                                Some(remark),
                            )
                            .await?;
                        }

                        let mut prod_update: product::ActiveModel = prod.into();
                        prod_update.stock = Set(new_stock);
                        prod_update.update(txn).await?;

                        let mut item_update: inventory_check_item::ActiveModel = item.into();
                        item_update.processed = Set(true);
                        item_update.processed_at = Set(Some(Utc::now()));
                        item_update.update(txn).await?;

                        adjusted += 1;
                    }
                    Ok(adjusted)
                })
            })
            .await
            .map_err(from_transaction_error)?;

        info!(check_id = id, items_adjusted = adjusted, "Processed check discrepancies");
        self.event_sender
            .send(Event::DiscrepanciesProcessed {
                check_id: id,
                items_adjusted: adjusted,
                occurred_at: Utc::now(),
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(adjusted)
    }

    #[instrument(skip(self, input), fields(product_id = input.product_id))]
    pub async fn add_check_item(
        &self,
        check_id: i64,
        input: AddCheckItemInput,
    ) -> Result<inventory_check_item::Model, ServiceError> {
        let _guard = self.locks.acquire(AggregateLocks::check_key(check_id)).await;

        let check = self.get_check_by_id(check_id).await?;
        self.ensure_editable(&check)?;

        let product = Product::find_by_id(input.product_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;
        if let Some(batch_id) = input.batch_id {
            InventoryBatch::find_by_id(batch_id)
                .one(self.db.as_ref())
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))?;
        }

        let book_quantity = input
            .book_quantity
            .unwrap_or_else(|| Decimal::from(product.stock));
        let (discrepancy_quantity, discrepancy_amount) =
            compute_discrepancy(book_quantity, input.actual_quantity, input.unit_cost);

        let item = inventory_check_item::ActiveModel {
            check_id: Set(check_id),
            product_id: Set(input.product_id),
            batch_id: Set(input.batch_id),
            location: Set(input.location),
            book_quantity: Set(book_quantity),
            actual_quantity: Set(input.actual_quantity),
            discrepancy_quantity: Set(discrepancy_quantity),
            unit_cost: Set(input.unit_cost),
            discrepancy_amount: Set(discrepancy_amount),
            discrepancy_reason: Set(input.discrepancy_reason),
            process_action: Set(None),
            processed: Set(false),
            remarks: Set(input.remarks),
            ..Default::default()
        };
        Ok(item.insert(self.db.as_ref()).await?)
    }

    /// Every write recomputes the discrepancy from the stored book
    /// quantity and the new actual/cost values.
    #[instrument(skip(self, input))]
    pub async fn update_check_item(
        &self,
        item_id: i64,
        input: UpdateCheckItemInput,
    ) -> Result<inventory_check_item::Model, ServiceError> {
        let check_id = InventoryCheckItem::find_by_id(item_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Check item {} not found", item_id)))?
            .check_id;

        let _guard = self.locks.acquire(AggregateLocks::check_key(check_id)).await;

        // Re-read under the lock; the pre-lock row may be stale.
        let existing = InventoryCheckItem::find_by_id(item_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Check item {} not found", item_id)))?;

        let check = self.get_check_by_id(existing.check_id).await?;
        self.ensure_editable(&check)?;
        if existing.processed {
            return Err(ServiceError::InvalidOperation(format!(
                "Check item {} is already processed",
                item_id
            )));
        }

        let actual = input.actual_quantity.or(existing.actual_quantity);
        let unit_cost = input.unit_cost.or(existing.unit_cost);
        let (discrepancy_quantity, discrepancy_amount) =
            compute_discrepancy(existing.book_quantity, actual, unit_cost);

        let mut item: inventory_check_item::ActiveModel = existing.into();
        item.actual_quantity = Set(actual);
        item.unit_cost = Set(unit_cost);
        item.discrepancy_quantity = Set(discrepancy_quantity);
        item.discrepancy_amount = Set(discrepancy_amount);
        if let Some(reason) = input.discrepancy_reason {
            item.discrepancy_reason = Set(Some(reason));
        }
        if let Some(action) = input.process_action {
            item.process_action = Set(Some(action.as_str().to_string()));
        }
        if let Some(remarks) = input.remarks {
            item.remarks = Set(Some(remarks));
        }
        Ok(item.update(self.db.as_ref()).await?)
    }

    pub async fn get_check_items(
        &self,
        check_id: i64,
    ) -> Result<Vec<inventory_check_item::Model>, ServiceError> {
        self.get_check_by_id(check_id).await?;
        Ok(InventoryCheckItem::find()
            .filter(inventory_check_item::Column::CheckId.eq(check_id))
            .order_by_asc(inventory_check_item::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }

    pub async fn get_discrepancy_items(
        &self,
        check_id: i64,
    ) -> Result<Vec<inventory_check_item::Model>, ServiceError> {
        self.get_check_by_id(check_id).await?;
        Ok(InventoryCheckItem::find()
            .filter(inventory_check_item::Column::CheckId.eq(check_id))
            .filter(inventory_check_item::Column::DiscrepancyQuantity.ne(Decimal::ZERO))
            .order_by_asc(inventory_check_item::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }

    /// Shared status-move path: every transition funnels through
    /// `CheckStatus::can_transition_to`, with `mutate` applying any
    /// transition-specific fields.
    async fn transition<F>(
        &self,
        id: i64,
        next: CheckStatus,
        mutate: F,
    ) -> Result<inventory_check::Model, ServiceError>
    where
        F: FnOnce(&mut inventory_check::ActiveModel) -> Result<(), ServiceError>,
    {
        let _guard = self.locks.acquire(AggregateLocks::check_key(id)).await;
        self.transition_locked(id, next, mutate).await
    }

    /// Transition body for callers that already hold the check lock.
    async fn transition_locked<F>(
        &self,
        id: i64,
        next: CheckStatus,
        mutate: F,
    ) -> Result<inventory_check::Model, ServiceError>
    where
        F: FnOnce(&mut inventory_check::ActiveModel) -> Result<(), ServiceError>,
    {
        let existing = self.get_check_by_id(id).await?;
        let current = existing.status().ok_or_else(|| {
            ServiceError::InternalError(format!("Check {} has unknown status {}", id, existing.status))
        })?;
        if !current.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "Check {} cannot move from {} to {}",
                existing.check_number,
                current.as_str(),
                next.as_str()
            )));
        }

        let old_status = existing.status.clone();
        let mut check: inventory_check::ActiveModel = existing.into();
        mutate(&mut check)?;
        check.status = Set(next.as_str().to_string());
        let updated = check.update(self.db.as_ref()).await?;

        info!(
            check_id = updated.id,
            from = %old_status,
            to = %updated.status,
            "Check status changed"
        );
        self.event_sender
            .send(Event::CheckStatusChanged {
                check_id: updated.id,
                old_status,
                new_status: updated.status.clone(),
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(updated)
    }

    fn ensure_editable(&self, check: &inventory_check::Model) -> Result<(), ServiceError> {
        let editable = check.status().map(CheckStatus::is_editable).unwrap_or(false);
        if !editable {
            return Err(ServiceError::InvalidOperation(format!(
                "Check {} is {} and can no longer be edited",
                check.check_number, check.status
            )));
        }
        Ok(())
    }
}
