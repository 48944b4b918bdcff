//! SeaORM entities for the inventory ledger core.

pub mod inventory_batch;
pub mod inventory_check;
pub mod inventory_check_item;
pub mod inventory_period_balance;
pub mod inventory_transaction;
pub mod number_sequence;
pub mod product;

pub mod prelude {
    pub use super::inventory_batch::Entity as InventoryBatch;
    pub use super::inventory_check::Entity as InventoryCheck;
    pub use super::inventory_check_item::Entity as InventoryCheckItem;
    pub use super::inventory_period_balance::Entity as InventoryPeriodBalance;
    pub use super::inventory_transaction::Entity as InventoryTransaction;
    pub use super::number_sequence::Entity as NumberSequence;
    pub use super::product::Entity as Product;
}
