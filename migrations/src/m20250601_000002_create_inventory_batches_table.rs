use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryBatches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryBatches::Id)
                            .big_integer()
                            .primary_key()
                            .auto_increment()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::BatchNumber)
                            .string()
                            .unique_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryBatches::Warehouse).string().null())
                    .col(ColumnDef::new(InventoryBatches::Location).string().null())
                    .col(
                        ColumnDef::new(InventoryBatches::PurchaseReference)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::ProductionDate)
                            .date()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::ExpirationDate)
                            .date()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::InboundDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::InitialQuantity)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::RemainingQuantity)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::UnitCost)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::Status)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryBatches::Remarks).string().null())
                    .col(
                        ColumnDef::new(InventoryBatches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_batches_product")
                            .from(InventoryBatches::Table, InventoryBatches::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // FIFO retrieval scans (product, status) then orders by inbound date.
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_batches_product_status")
                    .table(InventoryBatches::Table)
                    .col(InventoryBatches::ProductId)
                    .col(InventoryBatches::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_batches_expiration")
                    .table(InventoryBatches::Table)
                    .col(InventoryBatches::ExpirationDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryBatches::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum InventoryBatches {
    Table,
    Id,
    BatchNumber,
    ProductId,
    Warehouse,
    Location,
    PurchaseReference,
    ProductionDate,
    ExpirationDate,
    InboundDate,
    InitialQuantity,
    RemainingQuantity,
    UnitCost,
    Status,
    Remarks,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
}
