//! Inventory ledger core: batch-level FIFO stock tracking, an append-only
//! transaction log, month-end period balance rollups and physical-count
//! reconciliation. Outer layers (HTTP, auth, documents, analytics) sit on
//! top of the service types exported here.

#![forbid(unsafe_code)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod services;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    AggregateLocks, InventoryBatchService, InventoryCheckService, InventoryLedgerService,
    PeriodBalanceService,
};

/// The four ledger services wired over one pool, one event channel and one
/// shared lock table.
#[derive(Clone)]
pub struct LedgerServices {
    pub batches: InventoryBatchService,
    pub ledger: InventoryLedgerService,
    pub balances: PeriodBalanceService,
    pub checks: InventoryCheckService,
}

impl LedgerServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let locks = Arc::new(AggregateLocks::new());
        Self {
            batches: InventoryBatchService::new(db.clone(), event_sender.clone(), locks.clone()),
            ledger: InventoryLedgerService::new(db.clone(), event_sender.clone(), locks.clone()),
            balances: PeriodBalanceService::new(db.clone(), event_sender.clone(), locks.clone()),
            checks: InventoryCheckService::new(db, event_sender, locks),
        }
    }
}
