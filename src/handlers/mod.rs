pub mod carts;
pub mod categories;
pub mod checkout;
pub mod common;
pub mod coupons;
pub mod customers;
pub mod flash_sales;
pub mod orders;
pub mod payment_webhooks;
pub mod products;
pub mod reviews;
pub mod settings;
pub mod wishlists;

use crate::{
    config::AppConfig,
    errors::ServiceError,
    events::EventSender,
    services::{
        CartService, CategoryService, CheckoutService, CustomerService, OrderService,
        PaymentGateway, ProductService, PromotionService, ReviewService, SettingsService,
        WishlistService,
    },
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<ProductService>,
    pub categories: Arc<CategoryService>,
    pub carts: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub promotions: Arc<PromotionService>,
    pub orders: Arc<OrderService>,
    pub reviews: Arc<ReviewService>,
    pub wishlists: Arc<WishlistService>,
    pub customers: Arc<CustomerService>,
    pub settings: Arc<SettingsService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Result<Self, ServiceError> {
        let promotions = PromotionService::new(db.clone(), event_sender.clone());
        let gateway = PaymentGateway::from_config(&config)?;
        let carts = CartService::new(
            db.clone(),
            event_sender.clone(),
            config.clone(),
            promotions.clone(),
        );
        let checkout = CheckoutService::new(
            db.clone(),
            event_sender.clone(),
            config.clone(),
            promotions.clone(),
            gateway,
        );

        Ok(Self {
            products: Arc::new(ProductService::new(
                db.clone(),
                event_sender.clone(),
                promotions.clone(),
            )),
            categories: Arc::new(CategoryService::new(db.clone(), event_sender.clone())),
            carts: Arc::new(carts),
            checkout: Arc::new(checkout),
            promotions: Arc::new(promotions),
            orders: Arc::new(OrderService::new(db.clone(), event_sender.clone())),
            reviews: Arc::new(ReviewService::new(db.clone(), event_sender.clone())),
            wishlists: Arc::new(WishlistService::new(db.clone(), event_sender.clone())),
            customers: Arc::new(CustomerService::new(db.clone(), event_sender)),
            settings: Arc::new(SettingsService::new(db)),
        })
    }
}
