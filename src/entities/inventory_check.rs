use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Physical counting session. Status only ever moves forward:
/// DRAFT -> IN_PROGRESS -> COMPLETED -> APPROVED.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_checks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub check_number: String,
    pub check_date: DateTime<Utc>,
    pub warehouse: Option<String>,
    pub check_type: String,
    pub status: String,
    pub checker: Option<String>,
    pub approver: Option<String>,
    pub approval_date: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_check_item::Entity")]
    Items,
}

impl Related<super::inventory_check_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
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

/// Counting scope: everything, a sample, or a rotating cycle count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckType {
    Full,
    Partial,
    Cycle,
}

impl CheckType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::Full => "FULL",
            CheckType::Partial => "PARTIAL",
            CheckType::Cycle => "CYCLE",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Draft,
    InProgress,
    Completed,
    Approved,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Draft => "DRAFT",
            CheckStatus::InProgress => "IN_PROGRESS",
            CheckStatus::Completed => "COMPLETED",
            CheckStatus::Approved => "APPROVED",
        }
    }

    /// Single transition table consulted by every status-changing
    /// operation. Transitions are one-directional; there is no cancel or
    /// reopen path.
    pub fn can_transition_to(self, next: CheckStatus) -> bool {
        matches!(
            (self, next),
            (CheckStatus::Draft, CheckStatus::InProgress)
                | (CheckStatus::InProgress, CheckStatus::Completed)
                | (CheckStatus::Completed, CheckStatus::Approved)
        )
    }

    /// Items may only be added or edited before the count is completed.
    pub fn is_editable(self) -> bool {
        matches!(self, CheckStatus::Draft | CheckStatus::InProgress)
    }
}

impl Model {
    pub fn status(&self) -> Option<CheckStatus> {
        self.status.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::CheckStatus;

    #[test]
    fn transitions_move_forward_only() {
        use CheckStatus::*;
        assert!(Draft.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Approved));

        for from in [Draft, InProgress, Completed, Approved] {
            // No self-loops, no regression.
            assert!(!from.can_transition_to(from));
            assert!(!from.can_transition_to(Draft));
        }
        assert!(!Draft.can_transition_to(Completed));
        assert!(!Draft.can_transition_to(Approved));
        assert!(!InProgress.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Completed));
    }

    #[test]
    fn editable_only_before_completion() {
        assert!(CheckStatus::Draft.is_editable());
        assert!(CheckStatus::InProgress.is_editable());
        assert!(!CheckStatus::Completed.is_editable());
        assert!(!CheckStatus::Approved.is_editable());
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            CheckStatus::Draft,
            CheckStatus::InProgress,
            CheckStatus::Completed,
            CheckStatus::Approved,
        ] {
            let parsed: CheckStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert_eq!(CheckStatus::InProgress.as_str(), "IN_PROGRESS");
    }
}
