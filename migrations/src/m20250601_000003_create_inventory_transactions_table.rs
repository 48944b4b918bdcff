use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryTransactions::Id)
                            .big_integer()
                            .primary_key()
                            .auto_increment()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::Type)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::TransactionDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::Quantity)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::UnitPrice)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::Amount)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::CostUnitPrice)
                            .decimal_len(16, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::CostAmount)
                            .decimal_len(16, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::ReferenceId)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::Warehouse)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(InventoryTransactions::Remarks).string().null())
                    .col(
                        ColumnDef::new(InventoryTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_transactions_product")
                            .from(
                                InventoryTransactions::Table,
                                InventoryTransactions::ProductId,
                            )
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Period rollups filter by (product, type) over a date range.
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_transactions_product_type_date")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::ProductId)
                    .col(InventoryTransactions::Type)
                    .col(InventoryTransactions::TransactionDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_transactions_date")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::TransactionDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryTransactions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum InventoryTransactions {
    Table,
    Id,
    ProductId,
    Type,
    TransactionDate,
    Quantity,
    UnitPrice,
    Amount,
    CostUnitPrice,
    CostAmount,
    ReferenceId,
    Warehouse,
    Remarks,
    CreatedAt,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
}
