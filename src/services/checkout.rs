use crate::{
    config::AppConfig,
    entities::{
        cart::{self, CartStatus},
        flash_sale_item, order, order_item, product, product_variant, Cart, CartItem,
        OrderModel, OrderStatus, PaymentStatus, Product, ProductVariant,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        payments::PaymentGateway,
        promotions::{coupon_discount, flash_sale_unit_discount, PromotionService},
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, ModelTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Checkout service: converts an active cart into an order.
///
/// The whole conversion runs in one transaction. Stock is taken with a
/// guarded conditional decrement (`stock = stock - qty WHERE stock >=
/// qty`) so two concurrent checkouts can never drive stock negative;
/// the loser sees `InsufficientStock` and its transaction rolls back.
/// A processor rejection rolls the order back too and surfaces as
/// `PaymentFailed`.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
    promotions: PromotionService,
    gateway: PaymentGateway,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
        promotions: PromotionService,
        gateway: PaymentGateway,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
            promotions,
            gateway,
        }
    }

    /// Convert the cart into a pending order and open a payment intent.
    #[instrument(skip(self, input))]
    pub async fn checkout(&self, input: CheckoutInput) -> Result<CheckoutOutcome, ServiceError> {
        let flash_sale = self.promotions.current_flash_sale().await?;

        let txn = self.db.begin().await?;

        // 1. Load the cart and its lines; only active, non-empty carts convert.
        let cart = Cart::find_by_id(input.cart_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", input.cart_id)))?;
        if cart.status != CartStatus::Active {
            return Err(ServiceError::InvalidOperation(
                "Cart is not active".to_string(),
            ));
        }
        let items = cart.find_related(CartItem).all(&txn).await?;
        if items.is_empty() {
            return Err(ServiceError::InvalidOperation("Cart is empty".to_string()));
        }

        self.event_sender
            .send_or_log(Event::CheckoutStarted { cart_id: cart.id })
            .await;

        // 2./3. Re-validate each line against the live catalog: stock,
        // listing status and effective price are all checked server-side
        // regardless of what the cart stored.
        let mut priced_lines = Vec::with_capacity(items.len());
        let mut subtotal = Decimal::ZERO;

        for item in &items {
            let listed = Product::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .filter(|p| p.status == product::ProductStatus::Active)
                .ok_or_else(|| {
                    ServiceError::InvalidOperation(format!(
                        "Product {} is no longer available",
                        item.product_id
                    ))
                })?;

            let variant = match item.variant_id {
                Some(variant_id) => ProductVariant::find_by_id(variant_id).one(&txn).await?,
                None => None,
            };

            let available = variant.as_ref().map(|v| v.stock).unwrap_or(listed.stock);
            if item.quantity > available {
                return Err(ServiceError::InsufficientStock(format!(
                    "Only {} of {} in stock",
                    available.max(0),
                    listed.name
                )));
            }

            let base_price = variant
                .as_ref()
                .and_then(|v| v.price_override)
                .unwrap_or(listed.price);
            let (unit_price, unit_discount) = match &flash_sale {
                Some(sale) => match sale.items.iter().find(|i| i.product_id == listed.id) {
                    Some(sale_item) => {
                        let d = flash_sale_unit_discount(sale_item, base_price);
                        (base_price - d, d)
                    }
                    None => (base_price, Decimal::ZERO),
                },
                None => (base_price, Decimal::ZERO),
            };

            let line_total = unit_price * Decimal::from(item.quantity);
            subtotal += line_total;

            priced_lines.push(PricedLine {
                product_id: listed.id,
                variant_id: item.variant_id,
                product_name: listed.name.clone(),
                sku: variant.as_ref().map(|v| v.sku.clone()),
                quantity: item.quantity,
                unit_price,
                unit_discount,
                line_total,
                in_flash_sale: unit_discount > Decimal::ZERO,
            });
        }

        // 3. Re-validate the coupon against the checkout subtotal.
        let mut coupon = None;
        let mut discount_total = Decimal::ZERO;
        if let Some(ref code) = cart.coupon_code {
            let found = self
                .promotions
                .find_coupon_by_code(code)
                .await?
                .ok_or_else(|| {
                    ServiceError::CouponRejected(format!("Coupon {} no longer exists", code))
                })?;
            discount_total =
                coupon_discount(&found, subtotal, Utc::now()).map_err(ServiceError::from)?;
            coupon = Some(found);
        }

        let shipping_total = self.shipping_for(subtotal - discount_total);
        let total = subtotal - discount_total + shipping_total;

        // 4. Create the order with its denormalized lines.
        let order_id = Uuid::new_v4();
        let order_number = format!("ORD-{}", &order_id.simple().to_string()[..8].to_uppercase());
        let now = Utc::now();

        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            customer_id: Set(input.customer_id),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            payment_intent_id: Set(None),
            subtotal: Set(subtotal),
            discount_total: Set(discount_total),
            shipping_total: Set(shipping_total),
            total: Set(total),
            coupon_code: Set(coupon.as_ref().map(|c| c.code.clone())),
            shipping_address: Set(input.shipping_address),
            currency: Set(cart.currency.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let order = order.insert(&txn).await?;

        for line in &priced_lines {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(line.product_id),
                variant_id: Set(line.variant_id),
                product_name: Set(line.product_name.clone()),
                sku: Set(line.sku.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                discount: Set(line.unit_discount * Decimal::from(line.quantity)),
                line_total: Set(line.line_total),
            };
            item.insert(&txn).await?;
        }

        // 5. Guarded stock decrement; the filter makes losing a race a
        // zero-row update rather than negative stock.
        for line in &priced_lines {
            self.take_stock(&txn, line).await?;
        }

        // 6. Bump sales counters and record coupon usage.
        for line in &priced_lines {
            Product::update_many()
                .col_expr(
                    product::Column::SalesCount,
                    Expr::col(product::Column::SalesCount).add(i64::from(line.quantity)),
                )
                .filter(product::Column::Id.eq(line.product_id))
                .exec(&txn)
                .await?;

            if line.in_flash_sale {
                if let Some(ref sale) = flash_sale {
                    flash_sale_item::Entity::update_many()
                        .col_expr(
                            flash_sale_item::Column::SoldCount,
                            Expr::col(flash_sale_item::Column::SoldCount).add(line.quantity),
                        )
                        .filter(flash_sale_item::Column::FlashSaleId.eq(sale.sale.id))
                        .filter(flash_sale_item::Column::ProductId.eq(line.product_id))
                        .exec(&txn)
                        .await?;
                }
            }
        }

        if let Some(ref coupon) = coupon {
            self.promotions.increment_usage(&txn, coupon.id).await?;
        }

        // 7. Open the payment intent. A rejection aborts the whole
        // transaction so no order or stock change survives.
        let intent = self
            .gateway
            .create_payment_intent(&order_number, total, &cart.currency)
            .await?;

        let mut order_update: order::ActiveModel = order.clone().into();
        order_update.payment_intent_id = Set(Some(intent.id.clone()));
        order_update.updated_at = Set(Utc::now());
        let order = order_update.update(&txn).await?;

        // 8. Retire the cart.
        let mut cart_update: cart::ActiveModel = cart.into();
        cart_update.status = Set(CartStatus::Converted);
        cart_update.updated_at = Set(Utc::now());
        cart_update.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order.id))
            .await;
        info!(order_id = %order.id, order_number, %total, "checkout completed");

        Ok(CheckoutOutcome {
            order,
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
        })
    }

    /// Decrement the stock row for a line, failing when the guarded
    /// update matches nothing.
    async fn take_stock(
        &self,
        conn: &impl ConnectionTrait,
        line: &PricedLine,
    ) -> Result<(), ServiceError> {
        let result = match line.variant_id {
            Some(variant_id) => {
                ProductVariant::update_many()
                    .col_expr(
                        product_variant::Column::Stock,
                        Expr::col(product_variant::Column::Stock).sub(line.quantity),
                    )
                    .filter(product_variant::Column::Id.eq(variant_id))
                    .filter(product_variant::Column::Stock.gte(line.quantity))
                    .exec(conn)
                    .await?
            }
            None => {
                Product::update_many()
                    .col_expr(
                        product::Column::Stock,
                        Expr::col(product::Column::Stock).sub(line.quantity),
                    )
                    .filter(product::Column::Id.eq(line.product_id))
                    .filter(product::Column::Stock.gte(line.quantity))
                    .exec(conn)
                    .await?
            }
        };

        if result.rows_affected == 0 {
            warn!(product_id = %line.product_id, "lost stock race during checkout");
            return Err(ServiceError::InsufficientStock(format!(
                "{} sold out during checkout",
                line.product_name
            )));
        }
        Ok(())
    }

    fn shipping_for(&self, goods_total: Decimal) -> Decimal {
        if goods_total <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        if goods_total >= self.config.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.config.flat_shipping_rate
        }
    }
}

struct PricedLine {
    product_id: Uuid,
    variant_id: Option<Uuid>,
    product_name: String,
    sku: Option<String>,
    quantity: i32,
    unit_price: Decimal,
    unit_discount: Decimal,
    line_total: Decimal,
    in_flash_sale: bool,
}

/// Input for converting a cart into an order
#[derive(Debug, Deserialize)]
pub struct CheckoutInput {
    pub cart_id: Uuid,
    pub customer_id: Uuid,
    pub shipping_address: Option<serde_json::Value>,
}

/// Result of a successful checkout
#[derive(Debug, Serialize)]
pub struct CheckoutOutcome {
    pub order: OrderModel,
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
}
