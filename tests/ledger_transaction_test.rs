mod common;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use stockledger::{
    entities::{
        inventory_transaction::{Entity as InventoryTransaction, TransactionType},
        product::Entity as Product,
    },
    errors::ServiceError,
    services::{RecordInboundInput, RecordOutboundInput},
};

use common::{ymd, TestContext};

fn inbound(product_id: i64, quantity: Decimal, unit_price: Decimal) -> RecordInboundInput {
    RecordInboundInput {
        product_id,
        quantity,
        unit_price,
        reference_id: None,
        warehouse: None,
        remarks: None,
    }
}

fn outbound(product_id: i64, quantity: Decimal, cost: Decimal) -> RecordOutboundInput {
    RecordOutboundInput {
        product_id,
        quantity,
        cost_unit_price: cost,
        reference_id: None,
        warehouse: None,
        remarks: None,
    }
}

#[tokio::test]
async fn inbound_appends_a_row_and_raises_the_stock_cache() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-100", "Widget", None, 3).await;

    let row = ctx
        .services
        .ledger
        .record_inbound_transaction(inbound(product.id, dec!(5), dec!(2.5)))
        .await
        .unwrap();

    assert_eq!(row.transaction_type(), Some(TransactionType::Inbound));
    assert_eq!(row.quantity, dec!(5));
    assert_eq!(row.unit_price, dec!(2.5));
    assert_eq!(row.amount, dec!(12.5));
    assert_eq!(row.cost_unit_price, None);

    let after = Product::find_by_id(product.id)
        .one(ctx.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 8);
}

#[tokio::test]
async fn outbound_prices_at_sale_price_and_costs_at_fifo_cost() {
    let ctx = TestContext::new().await;
    let product = ctx
        .seed_product("P-101", "Widget", Some(dec!(15)), 10)
        .await;

    let row = ctx
        .services
        .ledger
        .record_outbound_transaction(outbound(product.id, dec!(4), dec!(10)))
        .await
        .unwrap();

    assert_eq!(row.transaction_type(), Some(TransactionType::Outbound));
    assert_eq!(row.unit_price, dec!(15));
    assert_eq!(row.amount, dec!(60));
    assert_eq!(row.cost_unit_price, Some(dec!(10)));
    assert_eq!(row.cost_amount, Some(dec!(40)));

    let after = Product::find_by_id(product.id)
        .one(ctx.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 6);
}

#[tokio::test]
async fn outbound_without_a_sale_price_books_zero_revenue() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-102", "Widget", None, 10).await;

    let row = ctx
        .services
        .ledger
        .record_outbound_transaction(outbound(product.id, dec!(4), dec!(10)))
        .await
        .unwrap();
    assert_eq!(row.unit_price, dec!(0));
    assert_eq!(row.amount, dec!(0));
    assert_eq!(row.cost_amount, Some(dec!(40)));
}

#[tokio::test]
async fn outbound_that_would_go_negative_is_rejected_whole() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-103", "Widget", None, 3).await;

    let err = ctx
        .services
        .ledger
        .record_outbound_transaction(outbound(product.id, dec!(5), dec!(1)))
        .await
        .unwrap_err();
    match err {
        ServiceError::InsufficientStock { shortfall } => assert_eq!(shortfall, dec!(2)),
        other => panic!("expected InsufficientStock, got {other}"),
    }

    // No row was appended and the cache is untouched.
    let rows = ctx
        .services
        .ledger
        .get_product_transactions(product.id)
        .await
        .unwrap();
    assert!(rows.is_empty());
    let after = Product::find_by_id(product.id)
        .one(ctx.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 3);
}

#[tokio::test]
async fn fractional_quantities_move_the_cache_by_their_truncated_part() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-104", "Bulk Goods", None, 0).await;

    ctx.services
        .ledger
        .record_inbound_transaction(inbound(product.id, dec!(2.7), dec!(4)))
        .await
        .unwrap();

    let after = Product::find_by_id(product.id)
        .one(ctx.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 2);

    // The ledger row keeps the exact fractional quantity.
    let rows = ctx
        .services
        .ledger
        .get_product_transactions(product.id)
        .await
        .unwrap();
    assert_eq!(rows[0].quantity, dec!(2.7));
    assert_eq!(rows[0].amount, dec!(10.8));
}

#[tokio::test]
async fn nonpositive_quantities_are_rejected() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-105", "Widget", None, 10).await;

    let err = ctx
        .services
        .ledger
        .record_inbound_transaction(inbound(product.id, dec!(0), dec!(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let err = ctx
        .services
        .ledger
        .record_outbound_transaction(outbound(product.id, dec!(-1), dec!(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn unknown_product_is_a_not_found() {
    let ctx = TestContext::new().await;
    let err = ctx
        .services
        .ledger
        .record_inbound_transaction(inbound(9999, dec!(1), dec!(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn period_query_bounds_are_inclusive() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-106", "Widget", None, 0).await;

    ctx.services
        .ledger
        .record_inbound_transaction(inbound(product.id, dec!(1), dec!(1)))
        .await
        .unwrap();

    let now = Utc::now();
    let hit = ctx
        .services
        .ledger
        .get_transactions_by_period(now - Duration::hours(1), now + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(hit.len(), 1);

    let miss = ctx
        .services
        .ledger
        .get_transactions_by_period(now - Duration::hours(2), now - Duration::hours(1))
        .await
        .unwrap();
    assert!(miss.is_empty());
}

#[tokio::test]
async fn stock_cache_matches_batch_totals_through_a_full_flow() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-107", "Widget", Some(dec!(20)), 0).await;

    // Goods receipt: one batch plus matching inbound ledger entry.
    ctx.seed_batch(product.id, "R1", dec!(100), dec!(10), ymd(2025, 1, 1), None)
        .await;
    ctx.services
        .ledger
        .record_inbound_transaction(inbound(product.id, dec!(100), dec!(10)))
        .await
        .unwrap();

    // Sale: FIFO-consume batches, then book the outbound at the FIFO cost.
    let consumptions = ctx
        .services
        .batches
        .deduct_from_batches_fifo(product.id, dec!(40))
        .await
        .unwrap();
    let cost_amount: Decimal = consumptions
        .iter()
        .map(|c| c.quantity * c.unit_cost)
        .sum();
    let quantity: Decimal = consumptions.iter().map(|c| c.quantity).sum();
    ctx.services
        .ledger
        .record_outbound_transaction(outbound(product.id, quantity, cost_amount / quantity))
        .await
        .unwrap();

    let stock = Product::find_by_id(product.id)
        .one(ctx.db.as_ref())
        .await
        .unwrap()
        .unwrap()
        .stock;
    let batch_total = ctx
        .services
        .batches
        .get_total_available_quantity(product.id)
        .await
        .unwrap();
    assert_eq!(Decimal::from(stock), batch_total);
    assert_eq!(stock, 60);

    let all = InventoryTransaction::find().all(ctx.db.as_ref()).await.unwrap();
    assert_eq!(all.len(), 2);
}
