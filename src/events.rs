use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Domain events emitted by the services. Consumed by the background
/// processor for logging and follow-up side effects (e.g. notification
/// fan-out); failures to deliver an event never fail the originating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductArchived(Uuid),
    ProductDeleted(Uuid),
    CategoryCreated(Uuid),
    CategoryUpdated(Uuid),
    CategoryDeleted(Uuid),

    // Cart events
    CartCreated(Uuid),
    CartUpdated(Uuid),
    CartItemAdded { cart_id: Uuid, product_id: Uuid },
    CartItemRemoved { cart_id: Uuid, item_id: Uuid },
    CartCleared(Uuid),
    CouponApplied { cart_id: Uuid, code: String },
    CouponRemoved { cart_id: Uuid },

    // Checkout / order events
    CheckoutStarted { cart_id: Uuid },
    OrderCreated(Uuid),
    OrderPaid(Uuid),
    OrderPaymentFailed(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderCancelled(Uuid),

    // Promotion events
    CouponCreated(Uuid),
    CouponUpdated(Uuid),
    CouponUsageRecorded { coupon_id: Uuid, used_count: i32 },
    FlashSaleCreated(Uuid),
    FlashSaleDeleted(Uuid),

    // Review / wishlist events
    ReviewSubmitted { product_id: Uuid, review_id: Uuid },
    ReviewApproved(Uuid),
    ReviewDeleted(Uuid),
    WishlistCreated(Uuid),

    // Customer events
    CustomerRegistered(Uuid),
    CustomerDeactivated(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging (rather than propagating) delivery failures.
    /// Event delivery is best-effort; the originating request has already
    /// committed its transaction by the time this runs.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event.clone()).await {
            warn!("Dropping event {:?}: {}", event, e);
        }
    }
}

/// Background loop draining the event channel.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(order_id = %order_id, "Order created");
            }
            Event::OrderPaid(order_id) => {
                info!(order_id = %order_id, "Order payment confirmed");
            }
            Event::OrderPaymentFailed(order_id) => {
                error!(order_id = %order_id, "Order payment failed");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    order_id = %order_id,
                    from = %old_status,
                    to = %new_status,
                    "Order status changed"
                );
            }
            Event::CouponUsageRecorded {
                coupon_id,
                used_count,
            } => {
                info!(coupon_id = %coupon_id, used_count, "Coupon usage recorded");
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event channel closed; processor exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::CartCreated(Uuid::nil()))
            .await
            .expect("send should succeed");

        match rx.recv().await {
            Some(Event::CartCreated(id)) => assert_eq!(id, Uuid::nil()),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        // Must not panic or error out
        sender.send_or_log(Event::CartCleared(Uuid::nil())).await;
    }
}
