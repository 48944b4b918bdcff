use chrono::{DateTime, Local, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A discrete inbound lot of a product with its own quantity, cost and
/// optional expiration date. Consumed oldest-first (FIFO by inbound date).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_batches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub batch_number: String,
    pub product_id: i64,
    pub warehouse: Option<String>,
    pub location: Option<String>,
    pub purchase_reference: Option<String>,
    pub production_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub inbound_date: NaiveDate,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub initial_quantity: rust_decimal::Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub remaining_quantity: rust_decimal::Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub unit_cost: rust_decimal::Decimal,
    pub status: String,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
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

/// Batch lifecycle. Stored as its SCREAMING_SNAKE_CASE string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Available,
    Locked,
    Expired,
    Depleted,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Available => "AVAILABLE",
            BatchStatus::Locked => "LOCKED",
            BatchStatus::Expired => "EXPIRED",
            BatchStatus::Depleted => "DEPLETED",
        }
    }
}

impl Model {
    pub fn status(&self) -> Option<BatchStatus> {
        self.status.parse().ok()
    }

    /// Expiration date strictly before today (local calendar date).
    pub fn is_expired(&self) -> bool {
        match self.expiration_date {
            Some(expiration) => expiration < Local::now().date_naive(),
            None => false,
        }
    }

    /// Expiration date within [today, today + 30 days).
    pub fn is_expiring_soon(&self) -> bool {
        match self.expiration_date {
            Some(expiration) => {
                let today = Local::now().date_naive();
                expiration >= today && expiration < today + chrono::Duration::days(30)
            }
            None => false,
        }
    }
}
