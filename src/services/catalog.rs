use crate::{
    entities::{
        category, product, product_variant, Category, CategoryModel, Product, ProductModel,
        ProductStatus, ProductVariant, ProductVariantModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::promotions::PromotionService,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Derive a URL slug from a display name.
pub fn slugify(name: &str) -> String {
    NON_SLUG_CHARS
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// Catalog read/write service for products.
///
/// Public reads only ever see `active` products and get their prices
/// decorated with the running flash sale. Admin operations see every
/// status.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    promotions: PromotionService,
}

/// Sort orders accepted by the public product listing
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    BestSelling,
    MostViewed,
}

/// Filters for the product listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive match against product names
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    /// Admin only; the public listing is pinned to `active`
    pub status: Option<ProductStatus>,
    pub sort: Option<ProductSort>,
}

/// A product with its flash-sale price applied
#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: ProductModel,
    /// Price after the running flash sale, equal to `price` when none applies
    pub effective_price: Decimal,
    pub on_sale: bool,
}

/// Product detail including variants
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductModel,
    pub effective_price: Decimal,
    pub on_sale: bool,
    pub variants: Vec<ProductVariantModel>,
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub items: Vec<ProductView>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Derived from the name when omitted
    pub slug: Option<String>,
    pub description: String,
    #[validate(custom = "validate_non_negative")]
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: i32,
    pub status: Option<ProductStatus>,
    pub category_id: Option<Uuid>,
    pub attributes: Option<serde_json::Value>,
}

/// Nullable columns use the double-`Option` shape: an absent field
/// leaves the column alone, an explicit `null` clears it.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_optional_non_negative")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "crate::services::double_option")]
    pub compare_at_price: Option<Option<Decimal>>,
    pub status: Option<ProductStatus>,
    #[serde(default, deserialize_with = "crate::services::double_option")]
    pub category_id: Option<Option<Uuid>>,
    pub attributes: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVariantInput {
    #[validate(length(min = 1, max = 100))]
    pub sku: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub price_override: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: i32,
    /// Option map, e.g. {"size": "M", "color": "navy"}
    pub options: Option<serde_json::Value>,
    pub position: Option<i32>,
}

fn validate_non_negative(value: &Decimal) -> Result<(), validator::ValidationError> {
    if *value < Decimal::ZERO {
        return Err(validator::ValidationError::new("negative_amount"));
    }
    Ok(())
}

fn validate_optional_non_negative(value: &Decimal) -> Result<(), validator::ValidationError> {
    validate_non_negative(value)
}

impl ProductService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        promotions: PromotionService,
    ) -> Self {
        Self {
            db,
            event_sender,
            promotions,
        }
    }

    /// Public product listing: active products only, flash-sale prices applied.
    #[instrument(skip(self))]
    pub async fn list_public(&self, mut query: ProductQuery) -> Result<ProductPage, ServiceError> {
        query.status = Some(ProductStatus::Active);
        self.list(query).await
    }

    /// Listing with caller-chosen status filter (admin surface).
    #[instrument(skip(self))]
    pub async fn list(&self, query: ProductQuery) -> Result<ProductPage, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let mut finder = Product::find();
        if let Some(status) = query.status {
            finder = finder.filter(product::Column::Status.eq(status));
        }
        if let Some(category_id) = query.category_id {
            finder = finder.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(ref search) = query.search {
            let term = search.trim();
            if !term.is_empty() {
                finder = finder.filter(product::Column::Name.contains(term));
            }
        }
        finder = match query.sort.unwrap_or_default() {
            ProductSort::Newest => finder.order_by(product::Column::CreatedAt, Order::Desc),
            ProductSort::PriceAsc => finder.order_by(product::Column::Price, Order::Asc),
            ProductSort::PriceDesc => finder.order_by(product::Column::Price, Order::Desc),
            ProductSort::BestSelling => finder.order_by(product::Column::SalesCount, Order::Desc),
            ProductSort::MostViewed => finder.order_by(product::Column::ViewCount, Order::Desc),
        };

        let paginator = finder.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let total_pages = paginator.num_pages().await?;
        let products = paginator.fetch_page(page - 1).await?;

        let flash_sale = self.promotions.current_flash_sale().await?;
        let items = products
            .into_iter()
            .map(|p| {
                let effective_price = flash_sale
                    .as_ref()
                    .map(|sale| sale.effective_price(p.id, p.price))
                    .unwrap_or(p.price);
                ProductView {
                    on_sale: effective_price < p.price,
                    effective_price,
                    product: p,
                }
            })
            .collect();

        Ok(ProductPage {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    /// Public detail lookup by slug. Counts the view.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<ProductDetail, ServiceError> {
        let found = Product::find()
            .filter(product::Column::Slug.eq(slug))
            .filter(product::Column::Status.eq(ProductStatus::Active))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product '{}' not found", slug)))?;

        // Atomic bump; the returned model keeps the pre-bump count, which
        // is fine for a detail page.
        Product::update_many()
            .col_expr(
                product::Column::ViewCount,
                Expr::col(product::Column::ViewCount).add(1),
            )
            .filter(product::Column::Id.eq(found.id))
            .exec(&*self.db)
            .await?;

        self.detail(found).await
    }

    /// Detail lookup by id regardless of status (admin surface).
    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ProductDetail, ServiceError> {
        let found = Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;
        self.detail(found).await
    }

    async fn detail(&self, found: ProductModel) -> Result<ProductDetail, ServiceError> {
        let variants = ProductVariant::find()
            .filter(product_variant::Column::ProductId.eq(found.id))
            .all(&*self.db)
            .await?;
        let flash_sale = self.promotions.current_flash_sale().await?;
        let effective_price = flash_sale
            .as_ref()
            .map(|sale| sale.effective_price(found.id, found.price))
            .unwrap_or(found.price);

        Ok(ProductDetail {
            on_sale: effective_price < found.price,
            effective_price,
            variants,
            product: found,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CreateProductInput) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        let slug = input
            .slug
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| slugify(&input.name));
        if slug.is_empty() {
            return Err(ServiceError::ValidationError(
                "Product slug cannot be empty".to_string(),
            ));
        }
        if self.slug_taken(&slug, None).await? {
            return Err(ServiceError::Conflict(format!(
                "Product slug '{}' is already in use",
                slug
            )));
        }

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(slug),
            description: Set(input.description),
            price: Set(input.price),
            compare_at_price: Set(input.compare_at_price),
            stock: Set(input.stock),
            status: Set(input.status.unwrap_or(ProductStatus::Draft)),
            category_id: Set(input.category_id),
            attributes: Set(input.attributes),
            view_count: Set(0),
            sales_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(created.id))
            .await;
        info!(product_id = %created.id, slug = %created.slug, "product created");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        let existing = Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        let mut model: product::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(slug) = input.slug {
            let slug = slugify(&slug);
            if slug.is_empty() {
                return Err(ServiceError::ValidationError(
                    "Product slug cannot be empty".to_string(),
                ));
            }
            if self.slug_taken(&slug, Some(id)).await? {
                return Err(ServiceError::Conflict(format!(
                    "Product slug '{}' is already in use",
                    slug
                )));
            }
            model.slug = Set(slug);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(price) = input.price {
            model.price = Set(price);
        }
        if let Some(compare_at_price) = input.compare_at_price {
            model.compare_at_price = Set(compare_at_price);
        }
        if let Some(status) = input.status {
            model.status = Set(status);
        }
        if let Some(category_id) = input.category_id {
            model.category_id = Set(category_id);
        }
        if let Some(attributes) = input.attributes {
            model.attributes = Set(Some(attributes));
        }
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(updated.id))
            .await;
        Ok(updated)
    }

    /// Take a product off the storefront without deleting its history.
    #[instrument(skip(self))]
    pub async fn archive(&self, id: Uuid) -> Result<ProductModel, ServiceError> {
        let existing = Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        let mut model: product::ActiveModel = existing.into();
        model.status = Set(ProductStatus::Archived);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductArchived(updated.id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Product::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Product {} not found", id)));
        }
        self.event_sender
            .send_or_log(Event::ProductDeleted(id))
            .await;
        Ok(())
    }

    /// Adjust stock by a signed delta. Negative deltas cannot take stock
    /// below zero; the guarded update rejects them atomically.
    #[instrument(skip(self))]
    pub async fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<ProductModel, ServiceError> {
        let mut update = Product::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).add(delta),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(id));
        if delta < 0 {
            update = update.filter(product::Column::Stock.gte(-delta));
        }
        let result = update.exec(&*self.db).await?;
        if result.rows_affected == 0 {
            let exists = Product::find_by_id(id).one(&*self.db).await?.is_some();
            return if exists {
                Err(ServiceError::InvalidOperation(
                    "Stock adjustment would go below zero".to_string(),
                ))
            } else {
                Err(ServiceError::NotFound(format!("Product {} not found", id)))
            };
        }

        let updated = Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;
        self.event_sender
            .send_or_log(Event::ProductUpdated(id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self, input))]
    pub async fn add_variant(
        &self,
        product_id: Uuid,
        input: CreateVariantInput,
    ) -> Result<ProductVariantModel, ServiceError> {
        input.validate()?;
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let sku_taken = ProductVariant::find()
            .filter(product_variant::Column::Sku.eq(input.sku.clone()))
            .one(&*self.db)
            .await?
            .is_some();
        if sku_taken {
            return Err(ServiceError::Conflict(format!(
                "SKU '{}' is already in use",
                input.sku
            )));
        }

        let now = Utc::now();
        let model = product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            sku: Set(input.sku),
            name: Set(input.name),
            price_override: Set(input.price_override),
            stock: Set(input.stock),
            options: Set(input.options.unwrap_or_else(|| serde_json::json!({}))),
            position: Set(input.position.unwrap_or(0)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn remove_variant(&self, product_id: Uuid, variant_id: Uuid) -> Result<(), ServiceError> {
        let result = ProductVariant::delete_many()
            .filter(product_variant::Column::Id.eq(variant_id))
            .filter(product_variant::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Variant {} not found",
                variant_id
            )));
        }
        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;
        Ok(())
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, ServiceError> {
        let mut finder = Product::find().filter(product::Column::Slug.eq(slug));
        if let Some(id) = exclude {
            finder = finder.filter(product::Column::Id.ne(id));
        }
        Ok(finder.one(&*self.db).await?.is_some())
    }
}

/// Category service: flat list, tree assembly and admin CRUD.
#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "crate::services::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::services::double_option")]
    pub parent_id: Option<Option<Uuid>>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// A category with its children, for the storefront navigation tree
#[derive(Debug, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: CategoryModel,
    pub children: Vec<CategoryNode>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Active categories ordered for display.
    #[instrument(skip(self))]
    pub async fn list_public(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Ok(Category::find()
            .filter(category::Column::IsActive.eq(true))
            .order_by(category::Column::SortOrder, Order::Asc)
            .order_by(category::Column::Name, Order::Asc)
            .all(&*self.db)
            .await?)
    }

    /// Every category, including inactive ones (admin surface).
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Ok(Category::find()
            .order_by(category::Column::SortOrder, Order::Asc)
            .order_by(category::Column::Name, Order::Asc)
            .all(&*self.db)
            .await?)
    }

    /// Active categories assembled into a parent/child tree.
    #[instrument(skip(self))]
    pub async fn tree(&self) -> Result<Vec<CategoryNode>, ServiceError> {
        let flat = self.list_public().await?;
        Ok(build_tree(flat, None))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<CategoryModel, ServiceError> {
        Category::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CreateCategoryInput) -> Result<CategoryModel, ServiceError> {
        input.validate()?;
        let slug = input
            .slug
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| slugify(&input.name));

        if let Some(parent_id) = input.parent_id {
            self.get(parent_id).await?;
        }

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(slug),
            description: Set(input.description),
            parent_id: Set(input.parent_id),
            sort_order: Set(input.sort_order.unwrap_or(0)),
            is_active: Set(true),
        };
        let created = model.insert(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::CategoryCreated(created.id))
            .await;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;
        let existing = self.get(id).await?;

        if let Some(Some(parent_id)) = input.parent_id {
            if parent_id == id {
                return Err(ServiceError::InvalidOperation(
                    "Category cannot be its own parent".to_string(),
                ));
            }
            self.get(parent_id).await?;
        }

        let mut model: category::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(slug) = input.slug {
            model.slug = Set(slugify(&slug));
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(parent_id) = input.parent_id {
            model.parent_id = Set(parent_id);
        }
        if let Some(sort_order) = input.sort_order {
            model.sort_order = Set(sort_order);
        }
        if let Some(is_active) = input.is_active {
            model.is_active = Set(is_active);
        }
        let updated = model.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::CategoryUpdated(updated.id))
            .await;
        Ok(updated)
    }

    /// Delete a category. Products it held are re-parented to none and
    /// child categories become roots.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        use sea_orm::TransactionTrait;

        self.get(id).await?;
        let txn = self.db.begin().await?;

        Product::update_many()
            .col_expr(product::Column::CategoryId, Expr::value(Option::<Uuid>::None))
            .filter(product::Column::CategoryId.eq(id))
            .exec(&txn)
            .await?;
        Category::update_many()
            .col_expr(category::Column::ParentId, Expr::value(Option::<Uuid>::None))
            .filter(category::Column::ParentId.eq(id))
            .exec(&txn)
            .await?;
        Category::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        self.event_sender
            .send_or_log(Event::CategoryDeleted(id))
            .await;
        Ok(())
    }
}

fn build_tree(flat: Vec<CategoryModel>, parent: Option<Uuid>) -> Vec<CategoryNode> {
    let (mine, rest): (Vec<_>, Vec<_>) = flat.into_iter().partition(|c| c.parent_id == parent);
    mine.into_iter()
        .map(|category| {
            let children = build_tree(rest.clone(), Some(category.id));
            CategoryNode { category, children }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_normalizes_names() {
        assert_eq!(slugify("Ceramic Mug"), "ceramic-mug");
        assert_eq!(slugify("  Fancy -- Lamp!  "), "fancy-lamp");
        assert_eq!(slugify("Déjà Vu 2.0"), "d-j-vu-2-0");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn product_update_distinguishes_null_from_absent() {
        let absent: UpdateProductInput = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.compare_at_price, None);
        assert_eq!(absent.category_id, None);

        let cleared: UpdateProductInput =
            serde_json::from_str(r#"{"compare_at_price": null, "category_id": null}"#).unwrap();
        assert_eq!(cleared.compare_at_price, Some(None));
        assert_eq!(cleared.category_id, Some(None));

        let id = Uuid::new_v4();
        let set: UpdateProductInput =
            serde_json::from_str(&format!(r#"{{"category_id": "{}"}}"#, id)).unwrap();
        assert_eq!(set.category_id, Some(Some(id)));
    }

    #[test]
    fn category_update_distinguishes_null_from_absent() {
        let cleared: UpdateCategoryInput =
            serde_json::from_str(r#"{"description": null, "parent_id": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));
        assert_eq!(cleared.parent_id, Some(None));

        let absent: UpdateCategoryInput = serde_json::from_str(r#"{"name": "Decor"}"#).unwrap();
        assert_eq!(absent.description, None);
        assert_eq!(absent.parent_id, None);
    }

    #[test]
    fn build_tree_nests_children_under_parents() {
        let root_id = Uuid::new_v4();
        let child_id = Uuid::new_v4();
        let make = |id, parent_id, name: &str| CategoryModel {
            id,
            name: name.to_string(),
            slug: slugify(name),
            description: None,
            parent_id,
            sort_order: 0,
            is_active: true,
        };

        let tree = build_tree(
            vec![
                make(root_id, None, "Home"),
                make(child_id, Some(root_id), "Kitchen"),
                make(Uuid::new_v4(), Some(child_id), "Mugs"),
            ],
            None,
        );

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].category.name, "Home");
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].category.name, "Kitchen");
        assert_eq!(tree[0].children[0].children.len(), 1);
    }

    #[test]
    fn product_query_defaults() {
        let query: ProductQuery = serde_json::from_str("{}").unwrap();
        assert!(query.page.is_none());
        assert!(matches!(
            query.sort.unwrap_or_default(),
            ProductSort::Newest
        ));
    }

    #[test]
    fn create_product_input_rejects_negative_price() {
        let input = CreateProductInput {
            name: "Mug".to_string(),
            slug: None,
            description: String::new(),
            price: Decimal::from(-1),
            compare_at_price: None,
            stock: 0,
            status: None,
            category_id: None,
            attributes: None,
        };
        assert!(input.validate().is_err());
    }
}
