mod common;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use stockledger::{
    entities::inventory_transaction::{self, TransactionType},
    errors::ServiceError,
};

use common::TestContext;

async fn seed_transaction(
    ctx: &TestContext,
    product_id: i64,
    kind: TransactionType,
    date: (i32, u32, u32),
    quantity: Decimal,
    unit_price: Decimal,
) {
    let when = Utc
        .with_ymd_and_hms(date.0, date.1, date.2, 12, 0, 0)
        .unwrap();
    let (cost_unit_price, cost_amount) = match kind {
        TransactionType::Inbound => (None, None),
        TransactionType::Outbound => (Some(unit_price), Some(quantity * unit_price)),
    };
    inventory_transaction::ActiveModel {
        product_id: Set(product_id),
        r#type: Set(kind.as_str().to_string()),
        transaction_date: Set(when),
        quantity: Set(quantity),
        unit_price: Set(unit_price),
        amount: Set(quantity * unit_price),
        cost_unit_price: Set(cost_unit_price),
        cost_amount: Set(cost_amount),
        ..Default::default()
    }
    .insert(ctx.db.as_ref())
    .await
    .expect("failed to seed transaction");
}

#[tokio::test]
async fn rollup_sums_the_month_and_derives_unit_prices() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-200", "Widget", None, 0).await;

    seed_transaction(&ctx, product.id, TransactionType::Inbound, (2025, 1, 5), dec!(100), dec!(10)).await;
    seed_transaction(&ctx, product.id, TransactionType::Inbound, (2025, 1, 20), dec!(50), dec!(13)).await;
    seed_transaction(&ctx, product.id, TransactionType::Outbound, (2025, 1, 25), dec!(40), dec!(10)).await;
    // Outside the month, must not count.
    seed_transaction(&ctx, product.id, TransactionType::Inbound, (2025, 2, 1), dec!(999), dec!(1)).await;

    let rolled = ctx
        .services
        .balances
        .generate_monthly_report("2025-01")
        .await
        .unwrap();
    assert_eq!(rolled, 1);

    let balance = ctx
        .services
        .balances
        .get_product_balance(product.id, "2025-01")
        .await
        .unwrap()
        .expect("balance row");

    assert_eq!(balance.beginning_quantity, dec!(0));
    assert_eq!(balance.inbound_quantity, dec!(150));
    assert_eq!(balance.inbound_amount, dec!(1650));
    // 1650 / 150 = 11.00
    assert_eq!(balance.inbound_unit_price, Some(dec!(11)));
    assert_eq!(balance.outbound_quantity, dec!(40));
    assert_eq!(balance.outbound_cost_amount, dec!(400));
    assert_eq!(balance.ending_quantity, dec!(110));
    assert_eq!(balance.ending_amount, dec!(1250));
    // 1250 / 110 = 11.3636… → 11.36
    assert_eq!(balance.ending_unit_price, dec!(11.36));
}

#[tokio::test]
async fn prior_period_ending_chains_into_the_next_beginning() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-201", "Widget", None, 0).await;

    seed_transaction(&ctx, product.id, TransactionType::Inbound, (2025, 1, 5), dec!(100), dec!(10)).await;
    seed_transaction(&ctx, product.id, TransactionType::Outbound, (2025, 1, 25), dec!(40), dec!(10)).await;
    seed_transaction(&ctx, product.id, TransactionType::Outbound, (2025, 2, 10), dec!(20), dec!(10)).await;

    ctx.services.balances.generate_monthly_report("2025-01").await.unwrap();
    ctx.services.balances.generate_monthly_report("2025-02").await.unwrap();

    let feb = ctx
        .services
        .balances
        .get_product_balance(product.id, "2025-02")
        .await
        .unwrap()
        .expect("february balance");
    assert_eq!(feb.beginning_quantity, dec!(60));
    assert_eq!(feb.beginning_amount, dec!(600));
    assert_eq!(feb.beginning_unit_price, dec!(10));
    assert_eq!(feb.ending_quantity, dec!(40));
    assert_eq!(feb.ending_amount, dec!(400));
}

#[tokio::test]
async fn regenerating_a_period_overwrites_its_previous_rollup() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product("P-202", "Widget", None, 0).await;

    seed_transaction(&ctx, product.id, TransactionType::Inbound, (2025, 3, 5), dec!(10), dec!(5)).await;
    ctx.services.balances.generate_monthly_report("2025-03").await.unwrap();

    seed_transaction(&ctx, product.id, TransactionType::Inbound, (2025, 3, 6), dec!(10), dec!(5)).await;
    ctx.services.balances.generate_monthly_report("2025-03").await.unwrap();

    let report = ctx.services.balances.get_monthly_report("2025-03").await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].inbound_quantity, dec!(20));
}

#[tokio::test]
async fn products_without_activity_still_get_a_zero_row() {
    let ctx = TestContext::new().await;
    ctx.seed_product("P-203", "Dormant", None, 0).await;

    let rolled = ctx
        .services
        .balances
        .generate_monthly_report("2025-04")
        .await
        .unwrap();
    assert_eq!(rolled, 1);

    let report = ctx.services.balances.get_monthly_report("2025-04").await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].inbound_quantity, dec!(0));
    assert_eq!(report[0].inbound_unit_price, None);
    assert_eq!(report[0].ending_quantity, dec!(0));
    assert_eq!(report[0].ending_unit_price, dec!(0));
}

#[tokio::test]
async fn report_is_ordered_by_inventory_code() {
    let ctx = TestContext::new().await;
    let zulu = ctx.seed_product("Z-900", "Zulu", None, 0).await;
    let alpha = ctx.seed_product("A-100", "Alpha", None, 0).await;

    ctx.services.balances.generate_monthly_report("2025-05").await.unwrap();

    let report = ctx.services.balances.get_monthly_report("2025-05").await.unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report[0].product_id, alpha.id);
    assert_eq!(report[1].product_id, zulu.id);
}

#[tokio::test]
async fn malformed_periods_are_rejected() {
    let ctx = TestContext::new().await;
    for bad in ["2025-13", "2025", "abcd-ef", ""] {
        let err = ctx
            .services
            .balances
            .generate_monthly_report(bad)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)), "{bad}");
    }
}
