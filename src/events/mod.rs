use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

/// Domain notifications emitted by the ledger services after a successful
/// mutation. Consumers (alerting, sync, audit) live outside this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Batch events
    BatchCreated {
        batch_id: i64,
        product_id: i64,
        batch_number: String,
    },
    BatchDeleted {
        batch_id: i64,
    },
    BatchesConsumed {
        product_id: i64,
        quantity: Decimal,
        batches_touched: usize,
    },
    ExpiredBatchesReclassified {
        count: usize,
    },

    // Ledger events
    InboundRecorded {
        transaction_id: i64,
        product_id: i64,
        quantity: Decimal,
        amount: Decimal,
    },
    OutboundRecorded {
        transaction_id: i64,
        product_id: i64,
        quantity: Decimal,
        cost_amount: Decimal,
    },

    // Period balance events
    MonthlyReportGenerated {
        period: String,
        products: usize,
    },

    // Counting events
    CheckCreated {
        check_id: i64,
        check_number: String,
    },
    CheckStatusChanged {
        check_id: i64,
        old_status: String,
        new_status: String,
    },
    DiscrepanciesProcessed {
        check_id: i64,
        items_adjusted: usize,
        occurred_at: DateTime<Utc>,
    },
}

/// Cloneable handle for emitting events into the application channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event. Suitable as a default
/// consumer when no outer layer subscribes.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!("Processing event: {:?}", event);
    }
}
