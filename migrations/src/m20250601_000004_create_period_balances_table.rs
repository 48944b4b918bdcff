use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryPeriodBalances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::Id)
                            .big_integer()
                            .primary_key()
                            .auto_increment()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::Period)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::BeginningQuantity)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::BeginningUnitPrice)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::BeginningAmount)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::InboundQuantity)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::InboundUnitPrice)
                            .decimal_len(16, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::InboundAmount)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::OutboundQuantity)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::OutboundCostUnitPrice)
                            .decimal_len(16, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::OutboundCostAmount)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::EndingQuantity)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::EndingUnitPrice)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::EndingAmount)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::Warehouse)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::Remarks)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryPeriodBalances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_period_balances_product")
                            .from(
                                InventoryPeriodBalances::Table,
                                InventoryPeriodBalances::ProductId,
                            )
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_inventory_period_balances_product_period")
                    .table(InventoryPeriodBalances::Table)
                    .col(InventoryPeriodBalances::ProductId)
                    .col(InventoryPeriodBalances::Period)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_period_balances_period")
                    .table(InventoryPeriodBalances::Table)
                    .col(InventoryPeriodBalances::Period)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(InventoryPeriodBalances::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum InventoryPeriodBalances {
    Table,
    Id,
    ProductId,
    Period,
    BeginningQuantity,
    BeginningUnitPrice,
    BeginningAmount,
    InboundQuantity,
    InboundUnitPrice,
    InboundAmount,
    OutboundQuantity,
    OutboundCostUnitPrice,
    OutboundCostAmount,
    EndingQuantity,
    EndingUnitPrice,
    EndingAmount,
    Warehouse,
    Remarks,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
}
