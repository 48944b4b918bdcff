use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Atomic check-and-reserve counters for per-day document numbers
        // (batch and check numbers). One row per prefix+day.
        manager
            .create_table(
                Table::create()
                    .table(NumberSequences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NumberSequences::SequenceKey)
                            .string()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NumberSequences::LastValue)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NumberSequences::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NumberSequences::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum NumberSequences {
    Table,
    SequenceKey,
    LastValue,
    UpdatedAt,
}
