//! Coupon redemption and admin-update behavior against a real
//! (in-memory SQLite) database.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use sea_orm::{Database, DatabaseConnection, EntityTrait};
use sea_orm_migration::MigratorTrait;
use storefront_api::entities::{coupon, DiscountType};
use storefront_api::errors::ServiceError;
use storefront_api::events::{Event, EventSender};
use storefront_api::migrator::Migrator;
use storefront_api::services::promotions::{
    CreateCouponInput, PromotionService, UpdateCouponInput,
};
use tokio::sync::mpsc;

async fn setup() -> (Arc<DatabaseConnection>, PromotionService, mpsc::Receiver<Event>) {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect to in-memory sqlite");
    Migrator::up(&db, None).await.expect("run migrations");

    let db = Arc::new(db);
    let (tx, rx) = mpsc::channel(16);
    let service = PromotionService::new(db.clone(), Arc::new(EventSender::new(tx)));
    (db, service, rx)
}

fn coupon_input(code: &str, usage_limit: Option<i32>) -> CreateCouponInput {
    let now = Utc::now();
    CreateCouponInput {
        code: code.to_string(),
        description: None,
        discount_type: DiscountType::Fixed,
        discount_value: dec!(5),
        min_purchase: Some(dec!(20)),
        max_discount: None,
        usage_limit,
        is_active: true,
        starts_at: now - Duration::days(1),
        ends_at: now + Duration::days(1),
    }
}

#[tokio::test]
async fn usage_increment_stops_at_the_limit() {
    let (db, service, _rx) = setup().await;
    let created = service
        .create_coupon(coupon_input("LASTONE", Some(1)))
        .await
        .unwrap();

    service.increment_usage(&*db, created.id).await.unwrap();

    // The guard makes the second redemption a zero-row update, so a
    // concurrent checkout racing past the limit fails instead of
    // over-redeeming.
    let err = service.increment_usage(&*db, created.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::CouponRejected(_)));

    let stored = coupon::Entity::find_by_id(created.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.used_count, 1);
}

#[tokio::test]
async fn unlimited_coupon_increments_freely() {
    let (db, service, _rx) = setup().await;
    let created = service
        .create_coupon(coupon_input("EVERGREEN", None))
        .await
        .unwrap();

    for _ in 0..3 {
        service.increment_usage(&*db, created.id).await.unwrap();
    }

    let stored = coupon::Entity::find_by_id(created.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.used_count, 3);
}

#[tokio::test]
async fn explicit_null_clears_nullable_coupon_fields() {
    let (db, service, _rx) = setup().await;
    let created = service
        .create_coupon(coupon_input("SPRING", Some(100)))
        .await
        .unwrap();
    assert_eq!(created.min_purchase, Some(dec!(20)));

    // The admin PATCH body sends an explicit null to drop the minimum
    // purchase while leaving the untouched fields alone.
    let input: UpdateCouponInput =
        serde_json::from_str(r#"{"min_purchase": null, "usage_limit": null}"#).unwrap();
    let updated = service.update_coupon(created.id, input).await.unwrap();
    assert_eq!(updated.min_purchase, None);
    assert_eq!(updated.usage_limit, None);
    assert_eq!(updated.discount_value, dec!(5));

    let stored = coupon::Entity::find_by_id(created.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.min_purchase, None);
    assert_eq!(stored.usage_limit, None);
}
