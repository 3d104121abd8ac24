use crate::{
    entities::{review, product, Product, Review, ReviewModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Review service: customer submissions, moderated publication.
///
/// A customer gets one review per product. Submissions land unapproved
/// and stay off the storefront until an admin approves them.
#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitReviewInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: i16,
    #[validate(length(max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub body: Option<String>,
}

/// Approved reviews for a product plus the aggregate rating
#[derive(Debug, Serialize)]
pub struct ProductReviews {
    pub items: Vec<ReviewModel>,
    pub total: u64,
    /// Mean of approved ratings, absent when there are none
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReviewQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Admin moderation queue filter
    pub approved: Option<bool>,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Submit a review for a product the customer has not reviewed yet.
    #[instrument(skip(self, input))]
    pub async fn submit(
        &self,
        customer_id: Uuid,
        input: SubmitReviewInput,
    ) -> Result<ReviewModel, ServiceError> {
        input.validate()?;

        Product::find_by_id(input.product_id)
            .filter(product::Column::Status.eq(product::ProductStatus::Active))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        let already = Review::find()
            .filter(review::Column::ProductId.eq(input.product_id))
            .filter(review::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .is_some();
        if already {
            return Err(ServiceError::Conflict(
                "You have already reviewed this product".to_string(),
            ));
        }

        let now = Utc::now();
        let model = review::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(input.product_id),
            customer_id: Set(customer_id),
            rating: Set(input.rating),
            title: Set(input.title),
            body: Set(input.body),
            is_approved: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ReviewSubmitted {
                product_id: created.product_id,
                review_id: created.id,
            })
            .await;
        info!(review_id = %created.id, product_id = %created.product_id, "review submitted");
        Ok(created)
    }

    /// Approved reviews for a product with the aggregate rating.
    #[instrument(skip(self))]
    pub async fn list_for_product(
        &self,
        product_id: Uuid,
        query: ReviewQuery,
    ) -> Result<ProductReviews, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let approved = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .filter(review::Column::IsApproved.eq(true));

        // Mean rating aggregated in the database rather than by pulling
        // every approved row into memory.
        let average_rating: Option<f64> = approved
            .clone()
            .select_only()
            .expr_as(
                Expr::cust("AVG(CAST(rating AS DOUBLE PRECISION))"),
                "average_rating",
            )
            .into_tuple::<Option<f64>>()
            .one(&*self.db)
            .await?
            .flatten();

        let paginator = approved
            .order_by_desc(review::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(ProductReviews {
            items,
            total,
            average_rating,
        })
    }

    /// Moderation queue (admin surface).
    #[instrument(skip(self))]
    pub async fn list_all(&self, query: ReviewQuery) -> Result<Vec<ReviewModel>, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let mut finder = Review::find();
        if let Some(approved) = query.approved {
            finder = finder.filter(review::Column::IsApproved.eq(approved));
        }
        Ok(finder
            .order_by_desc(review::Column::CreatedAt)
            .paginate(&*self.db, per_page)
            .fetch_page(page - 1)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn approve(&self, review_id: Uuid) -> Result<ReviewModel, ServiceError> {
        let found = Review::find_by_id(review_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Review {} not found", review_id)))?;

        let mut model: review::ActiveModel = found.into();
        model.is_approved = Set(true);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ReviewApproved(updated.id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, review_id: Uuid) -> Result<(), ServiceError> {
        let result = Review::delete_by_id(review_id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Review {} not found",
                review_id
            )));
        }
        self.event_sender
            .send_or_log(Event::ReviewDeleted(review_id))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_are_enforced() {
        let base = |rating| SubmitReviewInput {
            product_id: Uuid::new_v4(),
            rating,
            title: None,
            body: None,
        };
        assert!(base(0).validate().is_err());
        assert!(base(6).validate().is_err());
        assert!(base(1).validate().is_ok());
        assert!(base(5).validate().is_ok());
    }
}
