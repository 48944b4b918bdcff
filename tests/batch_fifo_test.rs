mod common;

use chrono::{Duration, Local};
use rust_decimal_macros::dec;
use stockledger::{
    entities::inventory_batch::BatchStatus,
    errors::ServiceError,
    services::CreateBatchInput,
};

use common::{ymd, TestContext};

fn create_input(product_id: i64) -> CreateBatchInput {
    CreateBatchInput {
        product_id,
        batch_number: None,
        warehouse: None,
        location: None,
        purchase_reference: None,
        production_date: None,
        expiration_date: None,
        inbound_date: None,
        initial_quantity: dec!(10),
        remaining_quantity: None,
        unit_cost: dec!(1),
        remarks: None,
    }
}

#[tokio::test]
async fn fifo_deduction_consumes_oldest_batches_first() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-001", "Widget", None, 150).await;

    let a = ctx
        .seed_batch(product.id, "A", dec!(100), dec!(10), ymd(2025, 1, 1), None)
        .await;
    let b = ctx
        .seed_batch(product.id, "B", dec!(50), dec!(12), ymd(2025, 1, 5), None)
        .await;

    let consumptions = ctx
        .services
        .batches
        .deduct_from_batches_fifo(product.id, dec!(120))
        .await
        .unwrap();

    assert_eq!(consumptions.len(), 2);
    assert_eq!(consumptions[0].batch_id, a.id);
    assert_eq!(consumptions[0].quantity, dec!(100));
    assert_eq!(consumptions[0].unit_cost, dec!(10));
    assert_eq!(consumptions[1].batch_id, b.id);
    assert_eq!(consumptions[1].quantity, dec!(20));
    assert_eq!(consumptions[1].unit_cost, dec!(12));

    let a_after = ctx.services.batches.get_batch_by_id(a.id).await.unwrap();
    assert_eq!(a_after.remaining_quantity, dec!(0));
    assert_eq!(a_after.status(), Some(BatchStatus::Depleted));

    let b_after = ctx.services.batches.get_batch_by_id(b.id).await.unwrap();
    assert_eq!(b_after.remaining_quantity, dec!(30));
    assert_eq!(b_after.status(), Some(BatchStatus::Available));

    let available = ctx
        .services
        .batches
        .get_total_available_quantity(product.id)
        .await
        .unwrap();
    assert_eq!(available, dec!(30));
}

#[tokio::test]
async fn same_day_batches_consume_in_id_order() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-015", "Widget", None, 40).await;

    // Same inbound date; the lower id was received first.
    let first = ctx
        .seed_batch(product.id, "SAME-1", dec!(20), dec!(5), ymd(2025, 2, 1), None)
        .await;
    let second = ctx
        .seed_batch(product.id, "SAME-2", dec!(20), dec!(6), ymd(2025, 2, 1), None)
        .await;
    assert!(first.id < second.id);

    let consumptions = ctx
        .services
        .batches
        .deduct_from_batches_fifo(product.id, dec!(25))
        .await
        .unwrap();

    assert_eq!(consumptions.len(), 2);
    assert_eq!(consumptions[0].batch_id, first.id);
    assert_eq!(consumptions[0].quantity, dec!(20));
    assert_eq!(consumptions[1].batch_id, second.id);
    assert_eq!(consumptions[1].quantity, dec!(5));

    let first_after = ctx.services.batches.get_batch_by_id(first.id).await.unwrap();
    assert_eq!(first_after.status(), Some(BatchStatus::Depleted));
    let second_after = ctx.services.batches.get_batch_by_id(second.id).await.unwrap();
    assert_eq!(second_after.remaining_quantity, dec!(15));
}

#[tokio::test]
async fn insufficient_stock_rolls_the_whole_deduction_back() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-002", "Widget", None, 150).await;

    ctx.seed_batch(product.id, "A", dec!(100), dec!(10), ymd(2025, 1, 1), None)
        .await;
    ctx.seed_batch(product.id, "B", dec!(50), dec!(12), ymd(2025, 1, 5), None)
        .await;

    let err = ctx
        .services
        .batches
        .deduct_from_batches_fifo(product.id, dec!(200))
        .await
        .unwrap_err();
    match err {
        ServiceError::InsufficientStock { shortfall } => assert_eq!(shortfall, dec!(50)),
        other => panic!("expected InsufficientStock, got {other}"),
    }

    // Nothing moved.
    for batch in ctx
        .services
        .batches
        .get_batches_by_product(product.id)
        .await
        .unwrap()
    {
        assert_eq!(batch.remaining_quantity, batch.initial_quantity);
        assert_eq!(batch.status(), Some(BatchStatus::Available));
    }
}

#[tokio::test]
async fn expired_batches_are_skipped_and_reclassified_during_deduction() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-003", "Perishable", None, 80).await;

    let today = Local::now().date_naive();
    let stale = ctx
        .seed_batch(
            product.id,
            "STALE",
            dec!(30),
            dec!(5),
            today - Duration::days(60),
            Some(today - Duration::days(1)),
        )
        .await;
    let fresh = ctx
        .seed_batch(
            product.id,
            "FRESH",
            dec!(50),
            dec!(6),
            today - Duration::days(10),
            Some(today + Duration::days(90)),
        )
        .await;

    let consumptions = ctx
        .services
        .batches
        .deduct_from_batches_fifo(product.id, dec!(40))
        .await
        .unwrap();
    assert_eq!(consumptions.len(), 1);
    assert_eq!(consumptions[0].batch_id, fresh.id);
    assert_eq!(consumptions[0].quantity, dec!(40));

    let stale_after = ctx.services.batches.get_batch_by_id(stale.id).await.unwrap();
    assert_eq!(stale_after.status(), Some(BatchStatus::Expired));
    assert_eq!(stale_after.remaining_quantity, dec!(30));
}

#[tokio::test]
async fn expired_stock_cannot_cover_a_deduction() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-004", "Perishable", None, 30).await;

    let today = Local::now().date_naive();
    ctx.seed_batch(
        product.id,
        "STALE",
        dec!(30),
        dec!(5),
        today - Duration::days(60),
        Some(today - Duration::days(1)),
    )
    .await;

    let err = ctx
        .services
        .batches
        .deduct_from_batches_fifo(product.id, dec!(10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InsufficientStock { shortfall } if shortfall == dec!(10)
    ));
}

#[tokio::test]
async fn generated_batch_numbers_are_sequential_per_day() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-005", "Widget", None, 0).await;

    let first = ctx
        .services
        .batches
        .create_batch(create_input(product.id))
        .await
        .unwrap();
    let second = ctx
        .services
        .batches
        .create_batch(create_input(product.id))
        .await
        .unwrap();

    let prefix = format!("BATCH-{}", Local::now().format("%Y%m%d"));
    assert_eq!(first.batch_number, format!("{prefix}-0001"));
    assert_eq!(second.batch_number, format!("{prefix}-0002"));
    assert_eq!(first.status(), Some(BatchStatus::Available));
    assert_eq!(first.remaining_quantity, first.initial_quantity);
}

#[tokio::test]
async fn explicit_batch_numbers_must_be_unique() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-006", "Widget", None, 0).await;

    let mut input = create_input(product.id);
    input.batch_number = Some("LOT-7".to_string());
    ctx.services.batches.create_batch(input.clone()).await.unwrap();

    let err = ctx.services.batches.create_batch(input).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn create_batch_rejects_nonpositive_quantity() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-007", "Widget", None, 0).await;

    let mut input = create_input(product.id);
    input.initial_quantity = dec!(0);
    let err = ctx.services.batches.create_batch(input).await.unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn batches_with_remaining_stock_cannot_be_deleted() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-008", "Widget", None, 10).await;

    let live = ctx
        .seed_batch(product.id, "LIVE", dec!(10), dec!(2), ymd(2025, 3, 1), None)
        .await;
    let err = ctx.services.batches.delete_batch(live.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    ctx.services
        .batches
        .deduct_from_batches_fifo(product.id, dec!(10))
        .await
        .unwrap();
    ctx.services.batches.delete_batch(live.id).await.unwrap();
    assert!(matches!(
        ctx.services.batches.get_batch_by_id(live.id).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn expiring_soon_window_is_thirty_days() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-009", "Perishable", None, 60).await;

    let today = Local::now().date_naive();
    let soon = ctx
        .seed_batch(
            product.id,
            "SOON",
            dec!(20),
            dec!(3),
            today,
            Some(today + Duration::days(10)),
        )
        .await;
    ctx.seed_batch(
        product.id,
        "LATER",
        dec!(20),
        dec!(3),
        today,
        Some(today + Duration::days(45)),
    )
    .await;
    ctx.seed_batch(
        product.id,
        "PAST",
        dec!(20),
        dec!(3),
        today - Duration::days(20),
        Some(today - Duration::days(2)),
    )
    .await;

    let expiring = ctx.services.batches.get_expiring_soon_batches().await.unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0].id, soon.id);

    let reclassified = ctx
        .services
        .batches
        .update_expired_batch_status()
        .await
        .unwrap();
    assert_eq!(reclassified, 1);
    // Sweep is idempotent.
    assert_eq!(
        ctx.services.batches.update_expired_batch_status().await.unwrap(),
        0
    );
}
