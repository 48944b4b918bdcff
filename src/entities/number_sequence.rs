use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-day counter row backing document number generation. Rows are only
/// ever touched through `services::sequences::next_document_number`, which
/// reserves a value atomically inside the caller's transaction.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "number_sequences")]
pub struct Model {
    /// Prefix plus day, e.g. "BATCH-20250829".
    #[sea_orm(primary_key, auto_increment = false)]
    pub sequence_key: String,
    pub last_value: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
