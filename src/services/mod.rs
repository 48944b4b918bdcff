pub mod inventory_batches;
pub mod inventory_checks;
pub mod inventory_ledger;
pub mod locks;
pub mod period_balances;
pub mod sequences;

pub use inventory_batches::{
    BatchConsumption, CreateBatchInput, InventoryBatchService, UpdateBatchInput,
};
pub use inventory_checks::{
    AddCheckItemInput, CreateCheckInput, InventoryCheckService, UpdateCheckInput,
    UpdateCheckItemInput,
};
pub use inventory_ledger::{InventoryLedgerService, RecordInboundInput, RecordOutboundInput};
pub use locks::AggregateLocks;
pub use period_balances::PeriodBalanceService;
