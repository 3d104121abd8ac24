//! Business logic services.
//!
//! Each service owns one slice of the domain and holds its own
//! `Arc<DatabaseConnection>` plus the event sender. Handlers stay thin
//! and call into these.

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field from an explicit `null` in
/// PATCH-style update payloads: absent (`None`) leaves the column
/// alone, `null` (`Some(None)`) clears it. Plain serde collapses
/// `null` into the outer `None`, which made nullable columns
/// impossible to clear.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod customers;
pub mod orders;
pub mod payments;
pub mod promotions;
pub mod reviews;
pub mod settings;
pub mod wishlists;

pub use carts::CartService;
pub use catalog::{CategoryService, ProductService};
pub use checkout::CheckoutService;
pub use customers::CustomerService;
pub use orders::OrderService;
pub use payments::PaymentGateway;
pub use promotions::PromotionService;
pub use reviews::ReviewService;
pub use settings::SettingsService;
pub use wishlists::WishlistService;
