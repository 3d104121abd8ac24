//! Discount arithmetic tests for coupons and flash sales.
//!
//! These exercise the pure pricing functions directly so the invariants
//! hold across a wide range of inputs, not just the handful a unit test
//! would pick.

use chrono::{Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use storefront_api::entities::coupon::{self, DiscountType};
use storefront_api::entities::{flash_sale, flash_sale_item};
use storefront_api::services::promotions::{
    coupon_discount, flash_sale_unit_discount, PromotionRejection, RunningFlashSale,
};
use uuid::Uuid;

fn coupon_fixture(discount_type: DiscountType, discount_value: Decimal) -> coupon::Model {
    let now = Utc::now();
    coupon::Model {
        id: Uuid::new_v4(),
        code: "SAVE10".into(),
        description: None,
        discount_type,
        discount_value,
        min_purchase: None,
        max_discount: None,
        usage_limit: None,
        used_count: 0,
        is_active: true,
        starts_at: now - Duration::hours(1),
        ends_at: now + Duration::hours(1),
        created_at: now,
        updated_at: now,
    }
}

fn sale_item_fixture(
    product_id: Uuid,
    discount_type: DiscountType,
    discount_value: Decimal,
) -> flash_sale_item::Model {
    flash_sale_item::Model {
        id: Uuid::new_v4(),
        flash_sale_id: Uuid::new_v4(),
        product_id,
        discount_type,
        discount_value,
        quantity_cap: None,
        sold_count: 0,
    }
}

#[test]
fn percentage_coupon_takes_percent_of_subtotal() {
    let coupon = coupon_fixture(DiscountType::Percentage, dec!(10));
    let discount = coupon_discount(&coupon, dec!(200.00), Utc::now()).unwrap();
    assert_eq!(discount, dec!(20.00));
}

#[test]
fn percentage_coupon_respects_max_discount_cap() {
    // $200 order, 20% off capped at $30: the cap wins, final total $170
    let mut coupon = coupon_fixture(DiscountType::Percentage, dec!(20));
    coupon.max_discount = Some(dec!(30.00));
    let discount = coupon_discount(&coupon, dec!(200.00), Utc::now()).unwrap();
    assert_eq!(discount, dec!(30.00));
    assert_eq!(dec!(200.00) - discount, dec!(170.00));
}

#[test]
fn fixed_coupon_never_exceeds_subtotal() {
    let coupon = coupon_fixture(DiscountType::Fixed, dec!(100.00));
    let discount = coupon_discount(&coupon, dec!(30.00), Utc::now()).unwrap();
    assert_eq!(discount, dec!(30.00));
}

#[test]
fn inactive_coupon_is_rejected() {
    let mut coupon = coupon_fixture(DiscountType::Fixed, dec!(5.00));
    coupon.is_active = false;
    assert_eq!(
        coupon_discount(&coupon, dec!(100.00), Utc::now()),
        Err(PromotionRejection::Inactive)
    );
}

#[test]
fn coupon_outside_its_window_is_rejected() {
    let coupon = coupon_fixture(DiscountType::Fixed, dec!(5.00));

    let before = coupon.starts_at - Duration::minutes(1);
    assert_eq!(
        coupon_discount(&coupon, dec!(100.00), before),
        Err(PromotionRejection::NotYetActive)
    );

    let after = coupon.ends_at + Duration::minutes(1);
    assert_eq!(
        coupon_discount(&coupon, dec!(100.00), after),
        Err(PromotionRejection::Expired)
    );
}

#[test]
fn exhausted_usage_limit_is_rejected() {
    let mut coupon = coupon_fixture(DiscountType::Fixed, dec!(5.00));
    coupon.usage_limit = Some(3);
    coupon.used_count = 3;
    assert_eq!(
        coupon_discount(&coupon, dec!(100.00), Utc::now()),
        Err(PromotionRejection::UsageLimitReached)
    );
}

#[test]
fn min_purchase_gates_the_coupon() {
    // $10 off a $40 order with a $50 minimum purchase: rejected
    let mut coupon = coupon_fixture(DiscountType::Fixed, dec!(10.00));
    coupon.min_purchase = Some(dec!(50.00));

    assert_eq!(
        coupon_discount(&coupon, dec!(40.00), Utc::now()),
        Err(PromotionRejection::MinPurchaseNotMet {
            required: dec!(50.00)
        })
    );
    assert!(coupon_discount(&coupon, dec!(50.00), Utc::now()).is_ok());
}

#[test]
fn flash_sale_discount_is_clamped_to_unit_price() {
    let item = sale_item_fixture(Uuid::new_v4(), DiscountType::Fixed, dec!(15.00));
    assert_eq!(flash_sale_unit_discount(&item, dec!(9.99)), dec!(9.99));
}

#[test]
fn flash_sale_item_with_exhausted_cap_grants_nothing() {
    let mut item = sale_item_fixture(Uuid::new_v4(), DiscountType::Percentage, dec!(50));
    item.quantity_cap = Some(100);
    item.sold_count = 100;
    assert_eq!(flash_sale_unit_discount(&item, dec!(40.00)), Decimal::ZERO);
}

#[test]
fn effective_price_falls_back_to_list_price_for_other_products() {
    let discounted = Uuid::new_v4();
    let other = Uuid::new_v4();
    let now = Utc::now();
    let running = RunningFlashSale {
        sale: flash_sale::Model {
            id: Uuid::new_v4(),
            name: "Summer Clearance".into(),
            slug: "summer-clearance".into(),
            starts_at: now - Duration::hours(1),
            ends_at: now + Duration::hours(1),
            is_active: true,
            created_at: now,
            updated_at: now,
        },
        items: vec![sale_item_fixture(
            discounted,
            DiscountType::Percentage,
            dec!(25),
        )],
    };

    assert_eq!(running.effective_price(discounted, dec!(40.00)), dec!(30.00));
    assert_eq!(running.effective_price(other, dec!(40.00)), dec!(40.00));
}

fn money_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_00).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #[test]
    fn coupon_discount_never_exceeds_subtotal(
        subtotal in money_strategy(),
        value in money_strategy(),
        percentage in any::<bool>(),
    ) {
        let discount_type = if percentage {
            DiscountType::Percentage
        } else {
            DiscountType::Fixed
        };
        let coupon = coupon_fixture(discount_type, value);
        if let Ok(discount) = coupon_discount(&coupon, subtotal, Utc::now()) {
            prop_assert!(discount >= Decimal::ZERO);
            prop_assert!(discount <= subtotal);
        }
    }

    #[test]
    fn flash_sale_price_never_goes_negative(
        unit_price in money_strategy(),
        value in money_strategy(),
        percentage in any::<bool>(),
    ) {
        let discount_type = if percentage {
            DiscountType::Percentage
        } else {
            DiscountType::Fixed
        };
        let item = sale_item_fixture(Uuid::new_v4(), discount_type, value);
        let discount = flash_sale_unit_discount(&item, unit_price);
        prop_assert!(discount >= Decimal::ZERO);
        prop_assert!(unit_price - discount >= Decimal::ZERO);
    }
}
