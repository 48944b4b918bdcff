pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_products_table;
mod m20250601_000002_create_inventory_batches_table;
mod m20250601_000003_create_inventory_transactions_table;
mod m20250601_000004_create_period_balances_table;
mod m20250601_000005_create_inventory_checks_table;
mod m20250601_000006_create_number_sequences_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_products_table::Migration),
            Box::new(m20250601_000002_create_inventory_batches_table::Migration),
            Box::new(m20250601_000003_create_inventory_transactions_table::Migration),
            Box::new(m20250601_000004_create_period_balances_table::Migration),
            Box::new(m20250601_000005_create_inventory_checks_table::Migration),
            Box::new(m20250601_000006_create_number_sequences_table::Migration),
        ]
    }
}
