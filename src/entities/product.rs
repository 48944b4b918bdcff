use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Product master record. Owned by the product catalog outside this core;
/// the ledger reads it and maintains the `stock` cache.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub inventory_code: String,
    pub name: String,
    pub specification: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    /// Current sale price, used for OUTBOUND transaction amounts.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub price: Option<rust_decimal::Decimal>,
    /// Cached on-hand quantity. Projection of the transaction log, not a
    /// source of truth; the batch-level figure lives in inventory_batches.
    pub stock: i32,
    pub safety_stock: Option<i32>,
    pub max_stock: Option<i32>,
    pub alert_enabled: bool,
    pub shelf_life_days: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_batch::Entity")]
    InventoryBatches,
    #[sea_orm(has_many = "super::inventory_transaction::Entity")]
    InventoryTransactions,
    #[sea_orm(has_many = "super::inventory_period_balance::Entity")]
    InventoryPeriodBalances,
}

impl Related<super::inventory_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryBatches.def()
    }
}

impl Related<super::inventory_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryTransactions.def()
    }
}

impl Related<super::inventory_period_balance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryPeriodBalances.def()
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

impl Model {
    /// Stock at or below the safety threshold.
    pub fn is_low_stock(&self) -> bool {
        match self.safety_stock {
            Some(safety) => self.stock <= safety,
            None => false,
        }
    }

    /// Stock at or above the configured maximum.
    pub fn is_over_stock(&self) -> bool {
        match self.max_stock {
            Some(max) => self.stock >= max,
            None => false,
        }
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.stock <= 0
    }
}
