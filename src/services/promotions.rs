use crate::{
    entities::{
        coupon::{self, DiscountType},
        flash_sale, flash_sale_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Reason a coupon cannot be applied
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PromotionRejection {
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not yet active")]
    NotYetActive,
    #[error("coupon has expired")]
    Expired,
    #[error("coupon usage limit has been reached")]
    UsageLimitReached,
    #[error("order subtotal is below the minimum purchase of {required}")]
    MinPurchaseNotMet { required: Decimal },
}

impl From<PromotionRejection> for ServiceError {
    fn from(rejection: PromotionRejection) -> Self {
        ServiceError::CouponRejected(rejection.to_string())
    }
}

/// Compute the discount a coupon grants on a subtotal.
///
/// Percentage coupons take `discount_value` percent of the subtotal,
/// clamped to `max_discount` when one is set. Fixed coupons take
/// `discount_value` flat. Either way the result is clamped to
/// `[0, subtotal]` so a discount can never exceed what is being bought.
pub fn coupon_discount(
    coupon: &coupon::Model,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<Decimal, PromotionRejection> {
    if !coupon.is_active {
        return Err(PromotionRejection::Inactive);
    }
    if now < coupon.starts_at {
        return Err(PromotionRejection::NotYetActive);
    }
    if now > coupon.ends_at {
        return Err(PromotionRejection::Expired);
    }
    if let Some(limit) = coupon.usage_limit {
        if coupon.used_count >= limit {
            return Err(PromotionRejection::UsageLimitReached);
        }
    }
    if let Some(min_purchase) = coupon.min_purchase {
        if subtotal < min_purchase {
            return Err(PromotionRejection::MinPurchaseNotMet {
                required: min_purchase,
            });
        }
    }

    let raw = match coupon.discount_type {
        DiscountType::Percentage => {
            let pct = coupon.discount_value * subtotal / Decimal::from(100);
            match coupon.max_discount {
                Some(cap) => pct.min(cap),
                None => pct,
            }
        }
        DiscountType::Fixed => coupon.discount_value,
    };

    Ok(raw.max(Decimal::ZERO).min(subtotal))
}

/// Per-unit discount a flash-sale item grants, clamped to `[0, unit_price]`.
/// Returns zero once the item's quantity cap is exhausted.
pub fn flash_sale_unit_discount(item: &flash_sale_item::Model, unit_price: Decimal) -> Decimal {
    if let Some(cap) = item.quantity_cap {
        if item.sold_count >= cap {
            return Decimal::ZERO;
        }
    }

    let raw = match item.discount_type {
        DiscountType::Percentage => item.discount_value * unit_price / Decimal::from(100),
        DiscountType::Fixed => item.discount_value,
    };

    raw.max(Decimal::ZERO).min(unit_price)
}

/// A running flash sale with its per-product discounts
#[derive(Debug, Clone)]
pub struct RunningFlashSale {
    pub sale: flash_sale::Model,
    pub items: Vec<flash_sale_item::Model>,
}

impl RunningFlashSale {
    /// Effective unit price of a product under this sale
    pub fn effective_price(&self, product_id: Uuid, unit_price: Decimal) -> Decimal {
        match self.items.iter().find(|i| i.product_id == product_id) {
            Some(item) => unit_price - flash_sale_unit_discount(item, unit_price),
            None => unit_price,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCouponInput {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_purchase: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub is_active: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Nullable columns use the double-`Option` shape: an absent field
/// leaves the column alone, an explicit `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCouponInput {
    pub description: Option<String>,
    pub discount_value: Option<Decimal>,
    #[serde(default, deserialize_with = "crate::services::double_option")]
    pub min_purchase: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "crate::services::double_option")]
    pub max_discount: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "crate::services::double_option")]
    pub usage_limit: Option<Option<i32>>,
    pub is_active: Option<bool>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFlashSaleInput {
    pub name: String,
    pub slug: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_active: bool,
    pub items: Vec<FlashSaleItemInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlashSaleItemInput {
    pub product_id: Uuid,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub quantity_cap: Option<i32>,
}

#[derive(Clone)]
pub struct PromotionService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl PromotionService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Look up a coupon by code regardless of state, for validation paths
    /// that need the precise rejection reason.
    pub async fn find_coupon_by_code(
        &self,
        code: &str,
    ) -> Result<Option<coupon::Model>, ServiceError> {
        let normalized = code.trim().to_uppercase();
        Ok(coupon::Entity::find()
            .filter(coupon::Column::Code.eq(normalized))
            .one(&*self.db)
            .await?)
    }

    pub async fn get_coupon(&self, id: Uuid) -> Result<coupon::Model, ServiceError> {
        coupon::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", id)))
    }

    pub async fn list_coupons(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<coupon::Model>, u64), ServiceError> {
        let paginator = coupon::Entity::find()
            .order_by_desc(coupon::Column::CreatedAt)
            .paginate(&*self.db, per_page.clamp(1, 100));
        let total = paginator.num_items().await?;
        let coupons = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((coupons, total))
    }

    pub async fn create_coupon(
        &self,
        input: CreateCouponInput,
    ) -> Result<coupon::Model, ServiceError> {
        if input.ends_at <= input.starts_at {
            return Err(ServiceError::InvalidInput(
                "Coupon window must end after it starts".to_string(),
            ));
        }
        if input.discount_value <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Discount value must be positive".to_string(),
            ));
        }

        let code = input.code.trim().to_uppercase();
        if self.find_coupon_by_code(&code).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Coupon code {} already exists",
                code
            )));
        }

        let now = Utc::now();
        let model = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            description: Set(input.description),
            discount_type: Set(input.discount_type),
            discount_value: Set(input.discount_value),
            min_purchase: Set(input.min_purchase),
            max_discount: Set(input.max_discount),
            usage_limit: Set(input.usage_limit),
            used_count: Set(0),
            is_active: Set(input.is_active),
            starts_at: Set(input.starts_at),
            ends_at: Set(input.ends_at),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&*self.db).await?;
        info!(coupon_id = %created.id, code = %created.code, "created coupon");
        self.event_sender
            .send_or_log(Event::CouponCreated(created.id))
            .await;
        Ok(created)
    }

    pub async fn update_coupon(
        &self,
        id: Uuid,
        input: UpdateCouponInput,
    ) -> Result<coupon::Model, ServiceError> {
        let existing = self.get_coupon(id).await?;
        let mut model: coupon::ActiveModel = existing.into();

        if let Some(description) = input.description {
            model.description = Set(Some(description));
        }
        if let Some(value) = input.discount_value {
            if value <= Decimal::ZERO {
                return Err(ServiceError::InvalidInput(
                    "Discount value must be positive".to_string(),
                ));
            }
            model.discount_value = Set(value);
        }
        if let Some(min_purchase) = input.min_purchase {
            model.min_purchase = Set(min_purchase);
        }
        if let Some(max_discount) = input.max_discount {
            model.max_discount = Set(max_discount);
        }
        if let Some(usage_limit) = input.usage_limit {
            model.usage_limit = Set(usage_limit);
        }
        if let Some(is_active) = input.is_active {
            model.is_active = Set(is_active);
        }
        if let Some(starts_at) = input.starts_at {
            model.starts_at = Set(starts_at);
        }
        if let Some(ends_at) = input.ends_at {
            model.ends_at = Set(ends_at);
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::CouponUpdated(updated.id))
            .await;
        Ok(updated)
    }

    pub async fn delete_coupon(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_coupon(id).await?;
        coupon::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    /// Record one redemption inside the checkout transaction.
    ///
    /// The increment is guarded (`used_count < usage_limit` unless the
    /// coupon is unlimited) so concurrent checkouts cannot redeem past
    /// the limit; the loser gets `UsageLimitReached` and rolls back.
    pub async fn increment_usage(
        &self,
        conn: &impl ConnectionTrait,
        coupon_id: Uuid,
    ) -> Result<(), ServiceError> {
        let result = coupon::Entity::update_many()
            .col_expr(
                coupon::Column::UsedCount,
                Expr::col(coupon::Column::UsedCount).add(1),
            )
            .col_expr(coupon::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(coupon::Column::Id.eq(coupon_id))
            .filter(
                Condition::any()
                    .add(coupon::Column::UsageLimit.is_null())
                    .add(
                        Expr::col(coupon::Column::UsedCount)
                            .lt(Expr::col(coupon::Column::UsageLimit)),
                    ),
            )
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(PromotionRejection::UsageLimitReached.into());
        }

        let used_count = coupon::Entity::find_by_id(coupon_id)
            .one(conn)
            .await?
            .map(|c| c.used_count)
            .unwrap_or_default();

        debug!(%coupon_id, used_count, "recorded coupon redemption");
        self.event_sender
            .send_or_log(Event::CouponUsageRecorded {
                coupon_id,
                used_count,
            })
            .await;
        Ok(())
    }

    /// The currently running flash sale, if any, with its items.
    /// When windows overlap the most recently started sale wins.
    pub async fn current_flash_sale(&self) -> Result<Option<RunningFlashSale>, ServiceError> {
        let now = Utc::now();

        let sale = flash_sale::Entity::find()
            .filter(flash_sale::Column::IsActive.eq(true))
            .filter(flash_sale::Column::StartsAt.lte(now))
            .filter(flash_sale::Column::EndsAt.gte(now))
            .order_by_desc(flash_sale::Column::StartsAt)
            .one(&*self.db)
            .await?;

        let Some(sale) = sale else {
            return Ok(None);
        };

        let items = flash_sale_item::Entity::find()
            .filter(flash_sale_item::Column::FlashSaleId.eq(sale.id))
            .all(&*self.db)
            .await?;

        Ok(Some(RunningFlashSale { sale, items }))
    }

    pub async fn get_flash_sale(
        &self,
        id: Uuid,
    ) -> Result<(flash_sale::Model, Vec<flash_sale_item::Model>), ServiceError> {
        let sale = flash_sale::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Flash sale {} not found", id)))?;
        let items = flash_sale_item::Entity::find()
            .filter(flash_sale_item::Column::FlashSaleId.eq(sale.id))
            .all(&*self.db)
            .await?;
        Ok((sale, items))
    }

    pub async fn list_flash_sales(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<flash_sale::Model>, u64), ServiceError> {
        let paginator = flash_sale::Entity::find()
            .order_by_desc(flash_sale::Column::StartsAt)
            .paginate(&*self.db, per_page.clamp(1, 100));
        let total = paginator.num_items().await?;
        let sales = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((sales, total))
    }

    pub async fn create_flash_sale(
        &self,
        input: CreateFlashSaleInput,
    ) -> Result<flash_sale::Model, ServiceError> {
        if input.ends_at <= input.starts_at {
            return Err(ServiceError::InvalidInput(
                "Flash sale window must end after it starts".to_string(),
            ));
        }

        let now = Utc::now();
        let sale = flash_sale::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(input.slug),
            starts_at: Set(input.starts_at),
            ends_at: Set(input.ends_at),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = sale.insert(&*self.db).await?;

        for item in input.items {
            let model = flash_sale_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                flash_sale_id: Set(created.id),
                product_id: Set(item.product_id),
                discount_type: Set(item.discount_type),
                discount_value: Set(item.discount_value),
                quantity_cap: Set(item.quantity_cap),
                sold_count: Set(0),
            };
            model.insert(&*self.db).await?;
        }

        info!(flash_sale_id = %created.id, "created flash sale");
        self.event_sender
            .send_or_log(Event::FlashSaleCreated(created.id))
            .await;
        Ok(created)
    }

    pub async fn delete_flash_sale(&self, id: Uuid) -> Result<(), ServiceError> {
        let (sale, _) = self.get_flash_sale(id).await?;
        flash_sale_item::Entity::delete_many()
            .filter(flash_sale_item::Column::FlashSaleId.eq(sale.id))
            .exec(&*self.db)
            .await?;
        flash_sale::Entity::delete_by_id(sale.id)
            .exec(&*self.db)
            .await?;

        self.event_sender
            .send_or_log(Event::FlashSaleDeleted(sale.id))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn coupon(discount_type: DiscountType, value: Decimal) -> coupon::Model {
        let now = Utc::now();
        coupon::Model {
            id: Uuid::new_v4(),
            code: "TEST".to_string(),
            description: None,
            discount_type,
            discount_value: value,
            min_purchase: None,
            max_discount: None,
            usage_limit: None,
            used_count: 0,
            is_active: true,
            starts_at: now - chrono::Duration::days(1),
            ends_at: now + chrono::Duration::days(1),
            created_at: now,
            updated_at: now,
        }
    }

    fn sale_item(discount_type: DiscountType, value: Decimal) -> flash_sale_item::Model {
        flash_sale_item::Model {
            id: Uuid::new_v4(),
            flash_sale_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            discount_type,
            discount_value: value,
            quantity_cap: None,
            sold_count: 0,
        }
    }

    #[test]
    fn percentage_discount_is_proportional() {
        let c = coupon(DiscountType::Percentage, dec!(10));
        let discount = coupon_discount(&c, dec!(100), Utc::now()).unwrap();
        assert_eq!(discount, dec!(10));
    }

    #[test]
    fn percentage_discount_respects_cap() {
        // Subtotal 200, 20% capped at 30: min(40, 30) = 30, final total 170.
        let mut c = coupon(DiscountType::Percentage, dec!(20));
        c.max_discount = Some(dec!(30));
        let discount = coupon_discount(&c, dec!(200), Utc::now()).unwrap();
        assert_eq!(discount, dec!(30));
        assert_eq!(dec!(200) - discount, dec!(170));
    }

    #[test]
    fn fixed_discount_never_exceeds_subtotal() {
        let c = coupon(DiscountType::Fixed, dec!(50));
        assert_eq!(coupon_discount(&c, dec!(100), Utc::now()).unwrap(), dec!(50));
        assert_eq!(coupon_discount(&c, dec!(30), Utc::now()).unwrap(), dec!(30));
    }

    #[test]
    fn inactive_coupon_is_rejected() {
        let mut c = coupon(DiscountType::Fixed, dec!(5));
        c.is_active = false;
        assert_eq!(
            coupon_discount(&c, dec!(100), Utc::now()),
            Err(PromotionRejection::Inactive)
        );
    }

    #[test]
    fn coupon_outside_window_is_rejected() {
        let now = Utc::now();

        let mut early = coupon(DiscountType::Fixed, dec!(5));
        early.starts_at = now + chrono::Duration::hours(1);
        assert_eq!(
            coupon_discount(&early, dec!(100), now),
            Err(PromotionRejection::NotYetActive)
        );

        let mut late = coupon(DiscountType::Fixed, dec!(5));
        late.ends_at = now - chrono::Duration::hours(1);
        assert_eq!(
            coupon_discount(&late, dec!(100), now),
            Err(PromotionRejection::Expired)
        );
    }

    #[test]
    fn exhausted_usage_limit_is_rejected() {
        let mut c = coupon(DiscountType::Fixed, dec!(5));
        c.usage_limit = Some(3);
        c.used_count = 3;
        assert_eq!(
            coupon_discount(&c, dec!(100), Utc::now()),
            Err(PromotionRejection::UsageLimitReached)
        );
    }

    #[test]
    fn min_purchase_below_threshold_is_rejected() {
        // Subtotal 40, $10 coupon with min purchase 50: rejected.
        let mut c = coupon(DiscountType::Fixed, dec!(10));
        c.min_purchase = Some(dec!(50));
        assert_eq!(
            coupon_discount(&c, dec!(40), Utc::now()),
            Err(PromotionRejection::MinPurchaseNotMet {
                required: dec!(50)
            })
        );
        // At the threshold it applies.
        assert_eq!(coupon_discount(&c, dec!(50), Utc::now()).unwrap(), dec!(10));
    }

    #[test]
    fn update_payload_distinguishes_null_from_absent() {
        let absent: UpdateCouponInput = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.min_purchase, None);
        assert_eq!(absent.max_discount, None);
        assert_eq!(absent.usage_limit, None);

        let cleared: UpdateCouponInput = serde_json::from_str(
            r#"{"min_purchase": null, "max_discount": null, "usage_limit": null}"#,
        )
        .unwrap();
        assert_eq!(cleared.min_purchase, Some(None));
        assert_eq!(cleared.max_discount, Some(None));
        assert_eq!(cleared.usage_limit, Some(None));

        let set: UpdateCouponInput =
            serde_json::from_str(r#"{"min_purchase": "25.00", "usage_limit": 5}"#).unwrap();
        assert_eq!(set.min_purchase, Some(Some(dec!(25.00))));
        assert_eq!(set.usage_limit, Some(Some(5)));
    }

    #[test]
    fn flash_sale_percentage_discount_per_unit() {
        let item = sale_item(DiscountType::Percentage, dec!(25));
        assert_eq!(flash_sale_unit_discount(&item, dec!(80)), dec!(20));
    }

    #[test]
    fn flash_sale_fixed_discount_clamped_to_unit_price() {
        let item = sale_item(DiscountType::Fixed, dec!(15));
        assert_eq!(flash_sale_unit_discount(&item, dec!(10)), dec!(10));
    }

    #[test]
    fn flash_sale_cap_exhausted_gives_no_discount() {
        let mut item = sale_item(DiscountType::Percentage, dec!(50));
        item.quantity_cap = Some(100);
        item.sold_count = 100;
        assert_eq!(flash_sale_unit_discount(&item, dec!(40)), Decimal::ZERO);
    }

    #[test]
    fn effective_price_only_applies_to_listed_products() {
        let item = sale_item(DiscountType::Fixed, dec!(5));
        let listed = item.product_id;
        let now = Utc::now();
        let running = RunningFlashSale {
            sale: flash_sale::Model {
                id: item.flash_sale_id,
                name: "Weekend".to_string(),
                slug: "weekend".to_string(),
                starts_at: now - chrono::Duration::hours(1),
                ends_at: now + chrono::Duration::hours(1),
                is_active: true,
                created_at: now,
                updated_at: now,
            },
            items: vec![item],
        };

        assert_eq!(running.effective_price(listed, dec!(20)), dec!(15));
        assert_eq!(running.effective_price(Uuid::new_v4(), dec!(20)), dec!(20));
    }
}
