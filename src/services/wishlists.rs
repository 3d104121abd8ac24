use crate::{
    entities::{
        product, wishlist, wishlist_item, Product, ProductModel, ProductStatus, Wishlist,
        WishlistItem, WishlistModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Wishlist service. Every operation is scoped to the owning customer;
/// a wishlist id belonging to someone else reads as not found.
#[derive(Clone)]
pub struct WishlistService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateWishlistInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateWishlistInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub is_public: Option<bool>,
}

/// A wishlist with its products resolved
#[derive(Debug, Serialize)]
pub struct WishlistWithProducts {
    #[serde(flatten)]
    pub wishlist: WishlistModel,
    pub products: Vec<ProductModel>,
}

impl WishlistService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, customer_id: Uuid) -> Result<Vec<WishlistModel>, ServiceError> {
        Ok(Wishlist::find()
            .filter(wishlist::Column::CustomerId.eq(customer_id))
            .order_by_asc(wishlist::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        customer_id: Uuid,
        wishlist_id: Uuid,
    ) -> Result<WishlistWithProducts, ServiceError> {
        let found = self.owned(customer_id, wishlist_id).await?;

        let entries = WishlistItem::find()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist_id))
            .order_by_asc(wishlist_item::Column::AddedAt)
            .all(&*self.db)
            .await?;
        let product_ids: Vec<Uuid> = entries.iter().map(|e| e.product_id).collect();
        let products = if product_ids.is_empty() {
            Vec::new()
        } else {
            Product::find()
                .filter(product::Column::Id.is_in(product_ids))
                .all(&*self.db)
                .await?
        };

        Ok(WishlistWithProducts {
            wishlist: found,
            products,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        customer_id: Uuid,
        input: CreateWishlistInput,
    ) -> Result<WishlistModel, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let model = wishlist::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            name: Set(input.name),
            is_public: Set(input.is_public.unwrap_or(false)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::WishlistCreated(created.id))
            .await;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        customer_id: Uuid,
        wishlist_id: Uuid,
        input: UpdateWishlistInput,
    ) -> Result<WishlistModel, ServiceError> {
        input.validate()?;
        let found = self.owned(customer_id, wishlist_id).await?;

        let mut model: wishlist::ActiveModel = found.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(is_public) = input.is_public {
            model.is_public = Set(is_public);
        }
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, customer_id: Uuid, wishlist_id: Uuid) -> Result<(), ServiceError> {
        self.owned(customer_id, wishlist_id).await?;

        WishlistItem::delete_many()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist_id))
            .exec(&*self.db)
            .await?;
        Wishlist::delete_by_id(wishlist_id).exec(&*self.db).await?;
        Ok(())
    }

    /// Add a product; re-adding an existing one is a no-op.
    #[instrument(skip(self))]
    pub async fn add_product(
        &self,
        customer_id: Uuid,
        wishlist_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.owned(customer_id, wishlist_id).await?;

        Product::find_by_id(product_id)
            .filter(product::Column::Status.eq(ProductStatus::Active))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let exists = WishlistItem::find()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist_id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .is_some();
        if exists {
            return Ok(());
        }

        let model = wishlist_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            wishlist_id: Set(wishlist_id),
            product_id: Set(product_id),
            added_at: Set(Utc::now()),
        };
        model.insert(&*self.db).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_product(
        &self,
        customer_id: Uuid,
        wishlist_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.owned(customer_id, wishlist_id).await?;

        let result = WishlistItem::delete_many()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist_id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {} is not on this wishlist",
                product_id
            )));
        }
        Ok(())
    }

    async fn owned(
        &self,
        customer_id: Uuid,
        wishlist_id: Uuid,
    ) -> Result<WishlistModel, ServiceError> {
        Wishlist::find_by_id(wishlist_id)
            .filter(wishlist::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Wishlist {} not found", wishlist_id)))
    }
}
