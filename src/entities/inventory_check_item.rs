use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One counted line of a counting session. `discrepancy_quantity` is
/// actual - book, recomputed on every write; positive means surplus.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_check_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub check_id: i64,
    pub product_id: i64,
    pub batch_id: Option<i64>,
    pub location: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub book_quantity: Decimal,
    /// None until the counter has recorded a result; completion requires
    /// every item to have one.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub actual_quantity: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub discrepancy_quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub unit_cost: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub discrepancy_amount: Option<Decimal>,
    pub discrepancy_reason: Option<String>,
    pub process_action: Option<String>,
    /// Write-once: flipped to true by discrepancy processing, never back.
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_check::Entity",
        from = "Column::CheckId",
        to = "super::inventory_check::Column::Id"
    )]
    Check,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::inventory_batch::Entity",
        from = "Column::BatchId",
        to = "super::inventory_batch::Column::Id"
    )]
    Batch,
}

impl Related<super::inventory_check::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Check.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::inventory_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut model = self;
        let now = Utc::now();
        if insert {
            if let ActiveValue::NotSet = model.created_at {
                model.created_at = Set(now);
            }
        }
        model.updated_at = Set(now);
        Ok(model)
    }
}

/// What to do with a confirmed discrepancy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessAction {
    Adjust,
    Ignore,
}

impl ProcessAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessAction::Adjust => "ADJUST",
            ProcessAction::Ignore => "IGNORE",
        }
    }
}

impl Model {
    pub fn process_action(&self) -> Option<ProcessAction> {
        self.process_action.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn is_surplus(&self) -> bool {
        self.discrepancy_quantity > Decimal::ZERO
    }

    pub fn is_shortage(&self) -> bool {
        self.discrepancy_quantity < Decimal::ZERO
    }

    pub fn has_discrepancy(&self) -> bool {
        self.discrepancy_quantity != Decimal::ZERO
    }
}

/// Discrepancy figures derived from current book/actual/cost values.
/// Every item write goes through this so the stored columns never go stale.
pub fn compute_discrepancy(
    book_quantity: Decimal,
    actual_quantity: Option<Decimal>,
    unit_cost: Option<Decimal>,
) -> (Decimal, Option<Decimal>) {
    match actual_quantity {
        Some(actual) => {
            let quantity = actual - book_quantity;
            let amount = unit_cost.map(|cost| quantity * cost);
            (quantity, amount)
        }
        None => (Decimal::ZERO, None),
    }
}

#[cfg(test)]
mod tests {
    use super::compute_discrepancy;
    use rust_decimal_macros::dec;

    #[test]
    fn surplus_and_shortage_arithmetic() {
        let (qty, amount) = compute_discrepancy(dec!(10), Some(dec!(12)), Some(dec!(5)));
        assert_eq!(qty, dec!(2));
        assert_eq!(amount, Some(dec!(10)));

        let (qty, amount) = compute_discrepancy(dec!(10), Some(dec!(7)), Some(dec!(4)));
        assert_eq!(qty, dec!(-3));
        assert_eq!(amount, Some(dec!(-12)));
    }

    #[test]
    fn uncounted_item_has_no_discrepancy() {
        let (qty, amount) = compute_discrepancy(dec!(10), None, Some(dec!(5)));
        assert_eq!(qty, rust_decimal::Decimal::ZERO);
        assert_eq!(amount, None);
    }

    #[test]
    fn missing_cost_leaves_amount_unset() {
        let (qty, amount) = compute_discrepancy(dec!(3), Some(dec!(5)), None);
        assert_eq!(qty, dec!(2));
        assert_eq!(amount, None);
    }
}
