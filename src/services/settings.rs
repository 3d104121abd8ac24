use crate::{
    entities::{store_setting, StoreSetting, StoreSettingModel},
    errors::ServiceError,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use std::sync::Arc;
use tracing::instrument;

static SETTING_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)*$").unwrap());

/// Store settings: namespaced JSON values keyed like `storefront.banner`.
#[derive(Clone)]
pub struct SettingsService {
    db: Arc<DatabaseConnection>,
}

impl SettingsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<StoreSettingModel>, ServiceError> {
        Ok(StoreSetting::find()
            .order_by_asc(store_setting::Column::Key)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<StoreSettingModel, ServiceError> {
        StoreSetting::find_by_id(key.to_string())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Setting '{}' not found", key)))
    }

    /// Upsert a setting.
    #[instrument(skip(self, value))]
    pub async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<StoreSettingModel, ServiceError> {
        if !SETTING_KEY.is_match(key) {
            return Err(ServiceError::ValidationError(format!(
                "Invalid setting key '{}'",
                key
            )));
        }

        let existing = StoreSetting::find_by_id(key.to_string())
            .one(&*self.db)
            .await?;
        let updated = match existing {
            Some(found) => {
                let mut model: store_setting::ActiveModel = found.into();
                model.value = Set(value);
                model.updated_at = Set(Utc::now());
                model.update(&*self.db).await?
            }
            None => {
                let model = store_setting::ActiveModel {
                    key: Set(key.to_string()),
                    value: Set(value),
                    updated_at: Set(Utc::now()),
                };
                model.insert(&*self.db).await?
            }
        };
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let result = StoreSetting::delete_by_id(key.to_string())
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Setting '{}' not found",
                key
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_keys_are_namespaced_lowercase() {
        assert!(SETTING_KEY.is_match("storefront.banner"));
        assert!(SETTING_KEY.is_match("checkout.free_shipping_copy"));
        assert!(SETTING_KEY.is_match("theme"));
        assert!(!SETTING_KEY.is_match("Storefront.Banner"));
        assert!(!SETTING_KEY.is_match(".leading"));
        assert!(!SETTING_KEY.is_match("trailing."));
        assert!(!SETTING_KEY.is_match("spa ces"));
    }
}
