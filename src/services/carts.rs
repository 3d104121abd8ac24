use crate::{
    config::AppConfig,
    entities::{
        cart::{self, CartStatus},
        cart_item,
        product::ProductStatus,
        Cart, CartItem, CartModel, Product, ProductVariant,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::promotions::{coupon_discount, PromotionRejection, PromotionService},
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Shopping cart service.
///
/// Owns the cart lifecycle: creation, item mutations, totals, and the
/// client-cart reconciliation used by storefronts that persist carts
/// locally. Every recalculation re-validates the applied coupon; a
/// coupon that no longer qualifies is dropped from the cart and the
/// reason is returned to the caller.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
    promotions: PromotionService,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
        promotions: PromotionService,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
            promotions,
        }
    }

    /// Creates a new cart with zero totals and the configured expiry.
    #[instrument(skip(self))]
    pub async fn create_cart(&self, input: CreateCartInput) -> Result<CartModel, ServiceError> {
        let cart_id = Uuid::new_v4();
        let now = Utc::now();
        let expires_at = now + Duration::days(self.config.cart_ttl_days as i64);

        let cart = cart::ActiveModel {
            id: Set(cart_id),
            session_id: Set(input.session_id),
            customer_id: Set(input.customer_id),
            currency: Set(input
                .currency
                .unwrap_or_else(|| self.config.default_currency.clone())),
            subtotal: Set(Decimal::ZERO),
            discount_total: Set(Decimal::ZERO),
            total: Set(Decimal::ZERO),
            coupon_code: Set(None),
            status: Set(CartStatus::Active),
            expires_at: Set(expires_at),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let cart = cart.insert(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::CartCreated(cart_id))
            .await;

        info!(%cart_id, "created cart");
        Ok(cart)
    }

    /// Adds a product (optionally a specific variant) to an active cart.
    /// Merges with an existing line for the same product/variant. The
    /// unit price is always the current server-side effective price.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: Uuid,
        input: AddToCartInput,
    ) -> Result<RecalculatedCart, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::InvalidInput(
                "Quantity must be positive".to_string(),
            ));
        }

        let flash_sale = self.promotions.current_flash_sale().await?;
        let txn = self.db.begin().await?;

        let cart = self.active_cart(&txn, cart_id).await?;

        let listed = Product::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .filter(|p| p.status == ProductStatus::Active)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not available", input.product_id))
            })?;

        let variant = match input.variant_id {
            Some(variant_id) => Some(
                ProductVariant::find_by_id(variant_id)
                    .one(&txn)
                    .await?
                    .filter(|v| v.product_id == listed.id)
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Variant {} not found", variant_id))
                    })?,
            ),
            None => None,
        };

        let available = variant.as_ref().map(|v| v.stock).unwrap_or(listed.stock);
        let base_price = variant
            .as_ref()
            .and_then(|v| v.price_override)
            .unwrap_or(listed.price);
        let unit_price = match &flash_sale {
            Some(sale) => sale.effective_price(listed.id, base_price),
            None => base_price,
        };

        // Merge with an existing line for the same product/variant
        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .filter(match input.variant_id {
                Some(v) => cart_item::Column::VariantId.eq(v),
                None => cart_item::Column::VariantId.is_null(),
            })
            .one(&txn)
            .await?;

        let requested = existing.as_ref().map(|i| i.quantity).unwrap_or(0) + input.quantity;
        if requested > available {
            return Err(ServiceError::InsufficientStock(format!(
                "Only {} of {} in stock",
                available.max(0),
                listed.name
            )));
        }

        if let Some(item) = existing {
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(requested);
            item.unit_price = Set(unit_price);
            item.line_total = Set(unit_price * Decimal::from(requested));
            item.updated_at = Set(Utc::now());
            item.update(&txn).await?;
        } else {
            let item = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart_id),
                product_id: Set(input.product_id),
                variant_id: Set(input.variant_id),
                quantity: Set(input.quantity),
                unit_price: Set(unit_price),
                line_total: Set(unit_price * Decimal::from(input.quantity)),
                selected_options: Set(input.selected_options),
                created_at: Set(Utc::now()),
                updated_at: Set(Utc::now()),
            };
            item.insert(&txn).await?;
        }

        let recalculated = self.recalculate_totals(&txn, cart.id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id,
                product_id: input.product_id,
            })
            .await;

        Ok(recalculated)
    }

    /// Updates a line's quantity; zero or below removes the line.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<RecalculatedCart, ServiceError> {
        let txn = self.db.begin().await?;
        self.active_cart(&txn, cart_id).await?;

        let item = CartItem::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;
        if item.cart_id != cart_id {
            return Err(ServiceError::InvalidOperation(
                "Item does not belong to this cart".to_string(),
            ));
        }

        if quantity <= 0 {
            CartItem::delete_by_id(item_id).exec(&txn).await?;
        } else {
            let unit_price = item.unit_price;
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(quantity);
            item.line_total = Set(unit_price * Decimal::from(quantity));
            item.updated_at = Set(Utc::now());
            item.update(&txn).await?;
        }

        let recalculated = self.recalculate_totals(&txn, cart_id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartUpdated(cart_id))
            .await;
        Ok(recalculated)
    }

    /// Removes a line from the cart.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
    ) -> Result<RecalculatedCart, ServiceError> {
        let recalculated = self.update_item_quantity(cart_id, item_id, 0).await?;
        self.event_sender
            .send_or_log(Event::CartItemRemoved { cart_id, item_id })
            .await;
        Ok(recalculated)
    }

    /// Deletes all items and resets totals; the coupon is dropped too.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, cart_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(&txn)
            .await?;

        let mut cart: cart::ActiveModel = Cart::find_by_id(cart_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?
            .into();
        cart.subtotal = Set(Decimal::ZERO);
        cart.discount_total = Set(Decimal::ZERO);
        cart.total = Set(Decimal::ZERO);
        cart.coupon_code = Set(None);
        cart.updated_at = Set(Utc::now());
        cart.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartCleared(cart_id))
            .await;
        info!(%cart_id, "cleared cart");
        Ok(())
    }

    /// Retrieves a cart with all its items.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, cart_id: Uuid) -> Result<CartWithItems, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;
        let items = cart.find_related(CartItem).all(&*self.db).await?;
        Ok(CartWithItems { cart, items })
    }

    /// Applies a coupon code to the cart. The coupon must qualify for
    /// the cart's current subtotal; the precise rejection reason is
    /// returned otherwise.
    #[instrument(skip(self))]
    pub async fn apply_coupon(
        &self,
        cart_id: Uuid,
        code: &str,
    ) -> Result<RecalculatedCart, ServiceError> {
        let coupon = self
            .promotions
            .find_coupon_by_code(code)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", code)))?;

        let txn = self.db.begin().await?;
        let cart = self.active_cart(&txn, cart_id).await?;

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(&txn)
            .await?;
        let subtotal: Decimal = items.iter().map(|i| i.line_total).sum();

        // Reject up front so an unusable code is never persisted
        coupon_discount(&coupon, subtotal, Utc::now()).map_err(ServiceError::from)?;

        let mut active: cart::ActiveModel = cart.into();
        active.coupon_code = Set(Some(coupon.code.clone()));
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        let recalculated = self.recalculate_totals(&txn, cart_id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CouponApplied {
                cart_id,
                code: coupon.code,
            })
            .await;
        Ok(recalculated)
    }

    /// Removes the applied coupon, if any.
    #[instrument(skip(self))]
    pub async fn remove_coupon(&self, cart_id: Uuid) -> Result<RecalculatedCart, ServiceError> {
        let txn = self.db.begin().await?;
        let cart = self.active_cart(&txn, cart_id).await?;

        let mut active: cart::ActiveModel = cart.into();
        active.coupon_code = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        let recalculated = self.recalculate_totals(&txn, cart_id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CouponRemoved { cart_id })
            .await;
        Ok(recalculated)
    }

    /// Reconciles a client-persisted cart against the live catalog.
    ///
    /// Unknown or unlisted products are dropped, quantities above
    /// available stock are reduced, and stale unit prices are replaced
    /// with the server's effective price. Every adjustment is reported
    /// as a [`ReconciliationChange`]. With a `cart_id` the existing
    /// cart's lines are replaced; otherwise a fresh cart is created.
    #[instrument(skip(self, input))]
    pub async fn reconcile(
        &self,
        input: ReconcileCartInput,
    ) -> Result<ReconciledCart, ServiceError> {
        let flash_sale = self.promotions.current_flash_sale().await?;
        let mut changes = Vec::new();

        let cart = match input.cart_id {
            Some(cart_id) => {
                let txn = self.db.begin().await?;
                let cart = self.active_cart(&txn, cart_id).await?;
                CartItem::delete_many()
                    .filter(cart_item::Column::CartId.eq(cart_id))
                    .exec(&txn)
                    .await?;
                txn.commit().await?;
                cart
            }
            None => {
                self.create_cart(CreateCartInput {
                    session_id: input.session_id,
                    customer_id: input.customer_id,
                    currency: None,
                })
                .await?
            }
        };

        let txn = self.db.begin().await?;

        for line in input.items {
            if line.quantity <= 0 {
                continue;
            }

            let Some(listed) = Product::find_by_id(line.product_id).one(&txn).await? else {
                changes.push(ReconciliationChange::ProductRemoved {
                    product_id: line.product_id,
                    reason: RemovalReason::Unknown,
                });
                continue;
            };
            if listed.status != ProductStatus::Active {
                changes.push(ReconciliationChange::ProductRemoved {
                    product_id: listed.id,
                    reason: RemovalReason::Unavailable,
                });
                continue;
            }

            let variant = match line.variant_id {
                Some(variant_id) => {
                    match ProductVariant::find_by_id(variant_id)
                        .one(&txn)
                        .await?
                        .filter(|v| v.product_id == listed.id)
                    {
                        Some(v) => Some(v),
                        None => {
                            changes.push(ReconciliationChange::ProductRemoved {
                                product_id: listed.id,
                                reason: RemovalReason::Unknown,
                            });
                            continue;
                        }
                    }
                }
                None => None,
            };

            let available = variant.as_ref().map(|v| v.stock).unwrap_or(listed.stock);
            if available <= 0 {
                changes.push(ReconciliationChange::ProductRemoved {
                    product_id: listed.id,
                    reason: RemovalReason::OutOfStock,
                });
                continue;
            }

            let quantity = if line.quantity > available {
                changes.push(ReconciliationChange::QuantityReduced {
                    product_id: listed.id,
                    requested: line.quantity,
                    available,
                });
                available
            } else {
                line.quantity
            };

            let base_price = variant
                .as_ref()
                .and_then(|v| v.price_override)
                .unwrap_or(listed.price);
            let unit_price = match &flash_sale {
                Some(sale) => sale.effective_price(listed.id, base_price),
                None => base_price,
            };
            if let Some(submitted) = line.unit_price {
                if submitted != unit_price {
                    changes.push(ReconciliationChange::PriceUpdated {
                        product_id: listed.id,
                        submitted,
                        unit_price,
                    });
                }
            }

            let item = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(listed.id),
                variant_id: Set(line.variant_id),
                quantity: Set(quantity),
                unit_price: Set(unit_price),
                line_total: Set(unit_price * Decimal::from(quantity)),
                selected_options: Set(line.selected_options),
                created_at: Set(Utc::now()),
                updated_at: Set(Utc::now()),
            };
            item.insert(&txn).await?;
        }

        let recalculated = self.recalculate_totals(&txn, cart.id).await?;
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&txn)
            .await?;
        txn.commit().await?;

        info!(cart_id = %cart.id, adjustments = changes.len(), "reconciled cart");
        Ok(ReconciledCart {
            cart: recalculated.cart,
            items,
            dropped_coupon: recalculated.dropped_coupon,
            changes,
        })
    }

    /// Recalculate subtotal, coupon discount and total, re-validating
    /// the applied coupon. A coupon that no longer qualifies is removed
    /// from the cart and its rejection reason is handed back.
    pub(crate) async fn recalculate_totals(
        &self,
        conn: &impl ConnectionTrait,
        cart_id: Uuid,
    ) -> Result<RecalculatedCart, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(conn)
            .await?;
        let subtotal: Decimal = items.iter().map(|i| i.line_total).sum();

        let mut coupon_code = cart.coupon_code.clone();
        let mut dropped_coupon = None;
        let mut discount_total = Decimal::ZERO;

        if let Some(ref code) = cart.coupon_code {
            let coupon = self.promotions.find_coupon_by_code(code).await?;
            match coupon {
                Some(coupon) => match coupon_discount(&coupon, subtotal, Utc::now()) {
                    Ok(discount) => discount_total = discount,
                    Err(rejection) => {
                        warn!(%cart_id, code, %rejection, "dropping coupon from cart");
                        coupon_code = None;
                        dropped_coupon = Some(rejection);
                    }
                },
                None => {
                    warn!(%cart_id, code, "applied coupon no longer exists");
                    coupon_code = None;
                }
            }
        }

        let total = subtotal - discount_total;

        let mut active: cart::ActiveModel = cart.into();
        active.subtotal = Set(subtotal);
        active.discount_total = Set(discount_total);
        active.total = Set(total);
        active.coupon_code = Set(coupon_code);
        active.updated_at = Set(Utc::now());
        let cart = active.update(conn).await?;

        Ok(RecalculatedCart {
            cart,
            dropped_coupon,
        })
    }

    async fn active_cart(
        &self,
        conn: &impl ConnectionTrait,
        cart_id: Uuid,
    ) -> Result<CartModel, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;
        if cart.status != CartStatus::Active {
            return Err(ServiceError::InvalidOperation(
                "Cart is not active".to_string(),
            ));
        }
        if cart.expires_at < Utc::now() {
            return Err(ServiceError::InvalidOperation(
                "Cart has expired".to_string(),
            ));
        }
        Ok(cart)
    }
}

/// Input for creating a cart
#[derive(Debug, Default, Deserialize)]
pub struct CreateCartInput {
    pub session_id: Option<String>,
    pub customer_id: Option<Uuid>,
    pub currency: Option<String>,
}

/// Input for adding an item to a cart
#[derive(Debug, Deserialize)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub selected_options: Option<serde_json::Value>,
}

/// One client-persisted cart line submitted for reconciliation
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileLine {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    pub selected_options: Option<serde_json::Value>,
}

/// Input for cart reconciliation
#[derive(Debug, Deserialize)]
pub struct ReconcileCartInput {
    pub cart_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub customer_id: Option<Uuid>,
    pub items: Vec<ReconcileLine>,
}

/// Why a submitted line was dropped during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    Unknown,
    Unavailable,
    OutOfStock,
}

/// A single adjustment made while reconciling a client cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ReconciliationChange {
    ProductRemoved {
        product_id: Uuid,
        reason: RemovalReason,
    },
    QuantityReduced {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },
    PriceUpdated {
        product_id: Uuid,
        submitted: Decimal,
        unit_price: Decimal,
    },
}

/// Cart with items
#[derive(Debug, Serialize)]
pub struct CartWithItems {
    pub cart: CartModel,
    pub items: Vec<cart_item::Model>,
}

/// Result of a mutation that recalculated totals
#[derive(Debug, Serialize)]
pub struct RecalculatedCart {
    pub cart: CartModel,
    /// Set when the applied coupon stopped qualifying and was removed
    pub dropped_coupon: Option<PromotionRejection>,
}

/// Result of a reconciliation run
#[derive(Debug, Serialize)]
pub struct ReconciledCart {
    pub cart: CartModel,
    pub items: Vec<cart_item::Model>,
    pub dropped_coupon: Option<PromotionRejection>,
    pub changes: Vec<ReconciliationChange>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reconciliation_changes_serialize_with_tags() {
        let change = ReconciliationChange::QuantityReduced {
            product_id: Uuid::nil(),
            requested: 5,
            available: 2,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["change"], "quantity_reduced");
        assert_eq!(json["requested"], 5);
        assert_eq!(json["available"], 2);

        let removed = ReconciliationChange::ProductRemoved {
            product_id: Uuid::nil(),
            reason: RemovalReason::OutOfStock,
        };
        let json = serde_json::to_value(&removed).unwrap();
        assert_eq!(json["change"], "product_removed");
        assert_eq!(json["reason"], "out_of_stock");
    }

    #[test]
    fn price_update_change_carries_both_prices() {
        let change = ReconciliationChange::PriceUpdated {
            product_id: Uuid::nil(),
            submitted: dec!(19.99),
            unit_price: dec!(14.99),
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["change"], "price_updated");
        assert_eq!(json["submitted"], "19.99");
        assert_eq!(json["unit_price"], "14.99");
    }

    #[test]
    fn add_to_cart_input_deserializes() {
        let input: AddToCartInput = serde_json::from_str(
            r#"{"product_id":"00000000-0000-0000-0000-000000000000","quantity":2}"#,
        )
        .unwrap();
        assert_eq!(input.quantity, 2);
        assert!(input.variant_id.is_none());
        assert!(input.selected_options.is_none());
    }
}
