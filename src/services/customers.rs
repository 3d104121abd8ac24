use crate::{
    entities::{customer, Customer, CustomerModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Customer directory for the admin back office. Registration and
/// login live in the auth module; this service covers listing and
/// account administration.
#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CustomerQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive match against email and name
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CustomerPage {
    pub items: Vec<CustomerModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl CustomerService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: CustomerQuery) -> Result<CustomerPage, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let mut finder = Customer::find();
        if let Some(ref search) = query.search {
            let term = search.trim();
            if !term.is_empty() {
                finder = finder.filter(
                    customer::Column::Email
                        .contains(term)
                        .or(customer::Column::Name.contains(term)),
                );
            }
        }
        if let Some(is_active) = query.is_active {
            finder = finder.filter(customer::Column::IsActive.eq(is_active));
        }

        let paginator = finder
            .order_by_desc(customer::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let total_pages = paginator.num_pages().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(CustomerPage {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<CustomerModel, ServiceError> {
        Customer::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))
    }

    /// Deactivate an account. Existing sessions die on their next
    /// request since token validation re-checks `is_active`.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> Result<CustomerModel, ServiceError> {
        let found = self.get(id).await?;
        if !found.is_active {
            return Ok(found);
        }

        let mut model: customer::ActiveModel = found.into();
        model.is_active = Set(false);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CustomerDeactivated(updated.id))
            .await;
        info!(customer_id = %updated.id, "customer deactivated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn reactivate(&self, id: Uuid) -> Result<CustomerModel, ServiceError> {
        let found = self.get(id).await?;
        if found.is_active {
            return Ok(found);
        }

        let mut model: customer::ActiveModel = found.into();
        model.is_active = Set(true);
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db).await?)
    }
}
