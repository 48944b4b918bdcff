use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryChecks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryChecks::Id)
                            .big_integer()
                            .primary_key()
                            .auto_increment()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryChecks::CheckNumber)
                            .string()
                            .unique_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryChecks::CheckDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryChecks::Warehouse).string().null())
                    .col(
                        ColumnDef::new(InventoryChecks::CheckType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryChecks::Status).string().not_null())
                    .col(ColumnDef::new(InventoryChecks::Checker).string().null())
                    .col(ColumnDef::new(InventoryChecks::Approver).string().null())
                    .col(
                        ColumnDef::new(InventoryChecks::ApprovalDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(InventoryChecks::Remarks).string().null())
                    .col(
                        ColumnDef::new(InventoryChecks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryChecks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_checks_status")
                    .table(InventoryChecks::Table)
                    .col(InventoryChecks::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryCheckItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryCheckItems::Id)
                            .big_integer()
                            .primary_key()
                            .auto_increment()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::CheckId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::BatchId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(InventoryCheckItems::Location).string().null())
                    .col(
                        ColumnDef::new(InventoryCheckItems::BookQuantity)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::ActualQuantity)
                            .decimal_len(16, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::DiscrepancyQuantity)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::UnitCost)
                            .decimal_len(16, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::DiscrepancyAmount)
                            .decimal_len(16, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::DiscrepancyReason)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::ProcessAction)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::Processed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(InventoryCheckItems::Remarks).string().null())
                    .col(
                        ColumnDef::new(InventoryCheckItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryCheckItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_check_items_check")
                            .from(InventoryCheckItems::Table, InventoryCheckItems::CheckId)
                            .to(InventoryChecks::Table, InventoryChecks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_check_items_product")
                            .from(InventoryCheckItems::Table, InventoryCheckItems::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_check_items_check")
                    .table(InventoryCheckItems::Table)
                    .col(InventoryCheckItems::CheckId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryCheckItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryChecks::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum InventoryChecks {
    Table,
    Id,
    CheckNumber,
    CheckDate,
    Warehouse,
    CheckType,
    Status,
    Checker,
    Approver,
    ApprovalDate,
    Remarks,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum InventoryCheckItems {
    Table,
    Id,
    CheckId,
    ProductId,
    BatchId,
    Location,
    BookQuantity,
    ActualQuantity,
    DiscrepancyQuantity,
    UnitCost,
    DiscrepancyAmount,
    DiscrepancyReason,
    ProcessAction,
    Processed,
    ProcessedAt,
    Remarks,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
}
