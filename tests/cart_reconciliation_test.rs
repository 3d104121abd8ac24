//! Wire-format tests for cart reconciliation and the order lifecycle.
//!
//! Reconciliation responses are consumed by storefront JavaScript that
//! keys off the tagged `change` field, so the serialized shape is part
//! of the API contract.

use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::entities::OrderStatus;
use storefront_api::services::carts::{
    ReconcileCartInput, ReconciliationChange, RemovalReason,
};
use test_case::test_case;
use uuid::Uuid;

#[test]
fn reconcile_input_accepts_minimal_guest_payload() {
    let payload = json!({
        "session_id": "guest-4f2a",
        "items": [
            { "product_id": Uuid::new_v4(), "quantity": 2 },
            {
                "product_id": Uuid::new_v4(),
                "variant_id": Uuid::new_v4(),
                "quantity": 1,
                "unit_price": "19.99",
                "selected_options": { "size": "M" }
            }
        ]
    });

    let input: ReconcileCartInput = serde_json::from_value(payload).unwrap();
    assert!(input.cart_id.is_none());
    assert!(input.customer_id.is_none());
    assert_eq!(input.items.len(), 2);
    assert_eq!(input.items[0].quantity, 2);
    assert!(input.items[0].unit_price.is_none());
    assert_eq!(input.items[1].unit_price, Some(dec!(19.99)));
}

#[test]
fn removal_reasons_serialize_snake_case() {
    assert_eq!(
        serde_json::to_value(RemovalReason::Unknown).unwrap(),
        json!("unknown")
    );
    assert_eq!(
        serde_json::to_value(RemovalReason::Unavailable).unwrap(),
        json!("unavailable")
    );
    assert_eq!(
        serde_json::to_value(RemovalReason::OutOfStock).unwrap(),
        json!("out_of_stock")
    );
}

#[test]
fn change_entries_round_trip_through_json() {
    let changes = vec![
        ReconciliationChange::ProductRemoved {
            product_id: Uuid::new_v4(),
            reason: RemovalReason::Unavailable,
        },
        ReconciliationChange::QuantityReduced {
            product_id: Uuid::new_v4(),
            requested: 10,
            available: 3,
        },
        ReconciliationChange::PriceUpdated {
            product_id: Uuid::new_v4(),
            submitted: dec!(24.99),
            unit_price: dec!(21.99),
        },
    ];

    let json = serde_json::to_value(&changes).unwrap();
    assert_eq!(json[0]["change"], "product_removed");
    assert_eq!(json[1]["change"], "quantity_reduced");
    assert_eq!(json[2]["change"], "price_updated");

    let parsed: Vec<ReconciliationChange> = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, changes);
}

#[test_case(OrderStatus::Pending, OrderStatus::Paid => true)]
#[test_case(OrderStatus::Paid, OrderStatus::Processing => true)]
#[test_case(OrderStatus::Processing, OrderStatus::Shipped => true)]
#[test_case(OrderStatus::Shipped, OrderStatus::Delivered => true)]
#[test_case(OrderStatus::Pending, OrderStatus::Cancelled => true)]
#[test_case(OrderStatus::Shipped, OrderStatus::Cancelled => true)]
#[test_case(OrderStatus::Delivered, OrderStatus::Cancelled => false; "delivered is terminal")]
#[test_case(OrderStatus::Cancelled, OrderStatus::Paid => false; "cancelled is terminal")]
#[test_case(OrderStatus::Pending, OrderStatus::Shipped => false; "no skipping states")]
#[test_case(OrderStatus::Paid, OrderStatus::Pending => false; "no going backwards")]
fn order_status_transition(from: OrderStatus, to: OrderStatus) -> bool {
    from.can_transition_to(to)
}

#[test]
fn order_statuses_serialize_lowercase() {
    assert_eq!(
        serde_json::to_value(OrderStatus::Processing).unwrap(),
        json!("processing")
    );
    assert_eq!(
        serde_json::to_value(OrderStatus::Cancelled).unwrap(),
        json!("cancelled")
    );
}
