//! Storefront entities
pub mod cart;
pub mod cart_item;
pub mod category;
pub mod coupon;
pub mod customer;
pub mod flash_sale;
pub mod flash_sale_item;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_variant;
pub mod review;
pub mod store_setting;
pub mod wishlist;
pub mod wishlist_item;

// Re-export entities
pub use cart::{CartStatus, Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use coupon::{DiscountType, Entity as Coupon, Model as CouponModel};
pub use customer::{Entity as Customer, Model as CustomerModel, Role};
pub use flash_sale::{Entity as FlashSale, Model as FlashSaleModel};
pub use flash_sale_item::{Entity as FlashSaleItem, Model as FlashSaleItemModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus, PaymentStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, Model as ProductModel, ProductStatus};
pub use product_variant::{Entity as ProductVariant, Model as ProductVariantModel};
pub use review::{Entity as Review, Model as ReviewModel};
pub use store_setting::{Entity as StoreSetting, Model as StoreSettingModel};
pub use wishlist::{Entity as Wishlist, Model as WishlistModel};
pub use wishlist_item::{Entity as WishlistItem, Model as WishlistItemModel};
