use crate::{
    entities::{
        order, product, product_variant, Order, OrderItem, OrderItemModel, OrderModel,
        OrderStatus, PaymentStatus, Product, ProductVariant,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Order lifecycle service.
///
/// Orders are created by checkout; this service covers everything after
/// that: customer history, admin fulfillment transitions, cancellation
/// with restock, and payment status updates driven by processor
/// webhooks.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub items: Vec<OrderModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// A customer's own orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
        query: OrderQuery,
    ) -> Result<OrderPage, ServiceError> {
        let mut finder = Order::find().filter(order::Column::CustomerId.eq(customer_id));
        if let Some(status) = query.status {
            finder = finder.filter(order::Column::Status.eq(status));
        }
        self.page(finder, query).await
    }

    /// All orders, optionally filtered by status (admin surface).
    #[instrument(skip(self))]
    pub async fn list_all(&self, query: OrderQuery) -> Result<OrderPage, ServiceError> {
        let mut finder = Order::find();
        if let Some(status) = query.status {
            finder = finder.filter(order::Column::Status.eq(status));
        }
        self.page(finder, query).await
    }

    async fn page(
        &self,
        finder: sea_orm::Select<Order>,
        query: OrderQuery,
    ) -> Result<OrderPage, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let paginator = finder
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let total_pages = paginator.num_pages().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(OrderPage {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    /// Fetch an order with its lines. When `customer_id` is given the
    /// order must belong to that customer; admins pass `None`.
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        order_id: Uuid,
        customer_id: Option<Uuid>,
    ) -> Result<OrderWithItems, ServiceError> {
        let found = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if let Some(customer_id) = customer_id {
            // Hide other customers' orders behind the same 404.
            if found.customer_id != customer_id {
                return Err(ServiceError::NotFound(format!(
                    "Order {} not found",
                    order_id
                )));
            }
        }

        let items = found.find_related(OrderItem).all(&*self.db).await?;
        Ok(OrderWithItems { order: found, items })
    }

    /// Move an order along the fulfillment graph. Illegal transitions
    /// are rejected; cancellation goes through [`cancel`](Self::cancel)
    /// so restocking happens.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        if next == OrderStatus::Cancelled {
            return self.cancel(order_id).await;
        }

        let found = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let current = found.status;
        if !current.can_transition_to(next) {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot move order from {} to {}",
                current, next
            )));
        }

        let mut model: order::ActiveModel = found.into();
        model.status = Set(next);
        if next == OrderStatus::Paid {
            model.payment_status = Set(PaymentStatus::Paid);
        }
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: current.to_string(),
                new_status: next.to_string(),
            })
            .await;
        info!(%order_id, from = %current, to = %next, "order status changed");
        Ok(updated)
    }

    /// Cancel an order: restock every line and, when the order was
    /// already paid, flag the payment for refund.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;

        let found = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let current = found.status;
        if !current.can_transition_to(OrderStatus::Cancelled) {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot cancel an order in status {}",
                current
            )));
        }

        let items = found.find_related(OrderItem).all(&txn).await?;
        for item in &items {
            match item.variant_id {
                Some(variant_id) => {
                    ProductVariant::update_many()
                        .col_expr(
                            product_variant::Column::Stock,
                            Expr::col(product_variant::Column::Stock).add(item.quantity),
                        )
                        .filter(product_variant::Column::Id.eq(variant_id))
                        .exec(&txn)
                        .await?;
                }
                None => {
                    Product::update_many()
                        .col_expr(
                            product::Column::Stock,
                            Expr::col(product::Column::Stock).add(item.quantity),
                        )
                        .filter(product::Column::Id.eq(item.product_id))
                        .exec(&txn)
                        .await?;
                }
            }
        }

        let was_paid = found.payment_status == PaymentStatus::Paid;
        let mut model: order::ActiveModel = found.into();
        model.status = Set(OrderStatus::Cancelled);
        if was_paid {
            model.payment_status = Set(PaymentStatus::RefundDue);
        }
        model.updated_at = Set(Utc::now());
        let updated = model.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCancelled(order_id))
            .await;
        info!(%order_id, restocked_lines = items.len(), was_paid, "order cancelled");
        Ok(updated)
    }

    /// Processor webhook: the payment intent succeeded.
    #[instrument(skip(self))]
    pub async fn mark_paid_by_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<OrderModel, ServiceError> {
        let found = self.find_by_intent(payment_intent_id).await?;

        if found.payment_status == PaymentStatus::Paid {
            // Webhooks redeliver; a repeat success is a no-op.
            return Ok(found);
        }

        let old_status = found.status;
        let mut model: order::ActiveModel = found.into();
        model.payment_status = Set(PaymentStatus::Paid);
        if old_status == OrderStatus::Pending {
            model.status = Set(OrderStatus::Paid);
        }
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderPaid(updated.id))
            .await;
        info!(order_id = %updated.id, payment_intent_id, "payment confirmed");
        Ok(updated)
    }

    /// Processor webhook: the payment intent failed.
    #[instrument(skip(self))]
    pub async fn mark_payment_failed_by_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<OrderModel, ServiceError> {
        let found = self.find_by_intent(payment_intent_id).await?;

        if found.payment_status == PaymentStatus::Paid {
            // A failure arriving after a success is stale; keep the paid state.
            warn!(order_id = %found.id, payment_intent_id, "ignoring stale payment failure");
            return Ok(found);
        }

        let mut model: order::ActiveModel = found.into();
        model.payment_status = Set(PaymentStatus::Failed);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderPaymentFailed(updated.id))
            .await;
        Ok(updated)
    }

    async fn find_by_intent(&self, payment_intent_id: &str) -> Result<OrderModel, ServiceError> {
        Order::find()
            .filter(order::Column::PaymentIntentId.eq(payment_intent_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "No order for payment intent {}",
                    payment_intent_id
                ))
            })
    }
}
