use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use stockledger::{
    db::{establish_connection_with_config, run_migrations, DbConfig, DbPool},
    entities::{inventory_batch, product},
    events::{self, EventSender},
    LedgerServices,
};
use tokio::sync::mpsc;

/// Test harness over an in-memory SQLite database. The pool is capped at a
/// single connection so every session sees the same in-memory database.
pub struct TestContext {
    pub db: Arc<DbPool>,
    pub services: LedgerServices,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestContext {
    pub async fn new() -> Self {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let db = Arc::new(
            establish_connection_with_config(&config)
                .await
                .expect("failed to open in-memory database"),
        );
        run_migrations(db.as_ref())
            .await
            .expect("failed to run migrations");

        let (tx, rx) = mpsc::channel(100);
        let event_sender = Arc::new(EventSender::new(tx));
        let event_task = tokio::spawn(events::process_events(rx));

        let services = LedgerServices::new(db.clone(), event_sender);
        Self {
            db,
            services,
            _event_task: event_task,
        }
    }

    /// Insert a product with the given sale price and starting stock cache.
    pub async fn seed_product(
        &self,
        inventory_code: &str,
        name: &str,
        price: Option<Decimal>,
        stock: i32,
    ) -> product::Model {
        product::ActiveModel {
            inventory_code: Set(inventory_code.to_string()),
            name: Set(name.to_string()),
            price: Set(price),
            stock: Set(stock),
            alert_enabled: Set(false),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .expect("failed to seed product")
    }

    /// Insert a batch directly with explicit dates, bypassing the service.
    #[allow(dead_code)]
    pub async fn seed_batch(
        &self,
        product_id: i64,
        batch_number: &str,
        quantity: Decimal,
        unit_cost: Decimal,
        inbound_date: NaiveDate,
        expiration_date: Option<NaiveDate>,
    ) -> inventory_batch::Model {
        inventory_batch::ActiveModel {
            batch_number: Set(batch_number.to_string()),
            product_id: Set(product_id),
            inbound_date: Set(inbound_date),
            expiration_date: Set(expiration_date),
            initial_quantity: Set(quantity),
            remaining_quantity: Set(quantity),
            unit_cost: Set(unit_cost),
            status: Set(inventory_batch::BatchStatus::Available.as_str().to_string()),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .expect("failed to seed batch")
    }
}

#[allow(dead_code)]
pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}
