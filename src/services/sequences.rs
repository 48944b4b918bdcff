use chrono::{Local, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::entities::number_sequence::{self, Entity as NumberSequence};
use crate::errors::ServiceError;

/// Prefix for batch numbers: `BATCH-<yyyyMMdd>-<NNNN>`.
pub const BATCH_PREFIX: &str = "BATCH";
/// Prefix for counting-session numbers: `CHK-<yyyyMMdd>-<NNNN>`.
pub const CHECK_PREFIX: &str = "CHK";

/// Reserve the next per-day sequence value for `prefix` and format the
/// document number. Must run inside the transaction that inserts the
/// numbered row so the reservation commits or rolls back with it; the
/// counter row stays locked until that transaction ends, which makes the
/// reservation an atomic check-and-reserve rather than scan-then-insert.
pub async fn next_document_number<C>(conn: &C, prefix: &str) -> Result<String, ServiceError>
where
    C: ConnectionTrait,
{
    let key = format!("{}-{}", prefix, Local::now().format("%Y%m%d"));

    // Increment-first: the common case once the day's row exists.
    for _ in 0..2 {
        let update = NumberSequence::update_many()
            .col_expr(
                number_sequence::Column::LastValue,
                Expr::col(number_sequence::Column::LastValue).add(1),
            )
            .col_expr(number_sequence::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(number_sequence::Column::SequenceKey.eq(key.clone()))
            .exec(conn)
            .await?;

        if update.rows_affected > 0 {
            let row = NumberSequence::find_by_id(key.clone())
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::InternalError(format!("sequence row {} missing", key))
                })?;
            return Ok(format!("{}-{:04}", key, row.last_value));
        }

        let seed = number_sequence::ActiveModel {
            sequence_key: Set(key.clone()),
            last_value: Set(1),
            updated_at: Set(Utc::now()),
        };
        match NumberSequence::insert(seed).exec(conn).await {
            Ok(_) => return Ok(format!("{}-0001", key)),
            Err(err) => match err.sql_err() {
                // Lost the first-use insert race; take the update path.
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => continue,
                _ => return Err(ServiceError::DatabaseError(err)),
            },
        }
    }

    Err(ServiceError::Conflict(format!(
        "could not reserve a document number for {}",
        key
    )))
}
