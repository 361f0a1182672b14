//! # Category Service
//!
//! Creating, renaming, deleting, listing and reordering a business's
//! categories.
//!
//! ## Reorder
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    lock_business       UPDATE ... SET updated_at = updated_at           │
//! │    list_in             current order                                    │
//! │    plan_category_order listed first, rest after, 0..n-1                 │
//! │    shift_to_negative   sort_order = -1 - sort_order                     │
//! │    apply_sort_orders   one CASE statement                               │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The negative detour keeps UNIQUE(business_id, sort_order) satisfied at
//! every statement: old and new values never share a range.

use std::sync::Arc;

use tracing::{debug, info};

use qlaris_core::validation::validate_category_name;
use qlaris_core::{plan_category_order, Category, Clock, CoreError, SystemClock};
use qlaris_db::repository::category;
use qlaris_db::{Database, DbError};

use crate::error::{ServiceError, ServiceResult};

/// Category service.
#[derive(Clone)]
pub struct CategoryService {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl CategoryService {
    pub fn new(db: Database) -> Self {
        CategoryService {
            db,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Creates a category after the business's last one.
    pub async fn create_category(&self, business_id: &str, name: &str) -> ServiceResult<Category> {
        validate_category_name(name)?;

        let created = self
            .db
            .categories()
            .create(business_id, name.trim(), self.clock.now())
            .await?;

        info!(id = %created.id, sort_order = created.sort_order, "Category created");
        Ok(created)
    }

    /// Gets one category of the business.
    pub async fn get_category(&self, business_id: &str, category_id: &str) -> ServiceResult<Category> {
        self.db
            .categories()
            .get_by_id_and_business(category_id, business_id)
            .await?
            .ok_or_else(|| CoreError::CategoryNotFound(category_id.to_string()).into())
    }

    /// Renames a category, keeping its position.
    pub async fn rename_category(
        &self,
        business_id: &str,
        category_id: &str,
        name: &str,
    ) -> ServiceResult<Category> {
        validate_category_name(name)?;

        let renamed = self
            .db
            .categories()
            .rename(category_id, business_id, name.trim(), self.clock.now())
            .await
            .map_err(|e| category_error(e, category_id))?;

        info!(id = %renamed.id, name = %renamed.name, "Category renamed");
        Ok(renamed)
    }

    /// Deletes a category. Its products stay, uncategorized.
    pub async fn delete_category(&self, business_id: &str, category_id: &str) -> ServiceResult<()> {
        self.db
            .categories()
            .delete(category_id, business_id)
            .await
            .map_err(|e| category_error(e, category_id))?;

        info!(id = %category_id, business_id = %business_id, "Category deleted");
        Ok(())
    }

    /// Lists a business's categories in display order.
    pub async fn list_categories(&self, business_id: &str) -> ServiceResult<Vec<Category>> {
        Ok(self.db.categories().list_by_business(business_id).await?)
    }

    /// Moves `category_ids` to the front, in the given order.
    ///
    /// Categories left out keep their relative order after the listed ones.
    /// Every category ends up with a sort_order in `0..n`. An empty list
    /// changes nothing.
    ///
    /// ## Errors
    /// * `Validation(Duplicate)` - an id is listed twice
    /// * `CategoryNotFound` - an id doesn't belong to the business; nothing
    ///   is reordered
    pub async fn sort_categories(
        &self,
        business_id: &str,
        category_ids: &[String],
    ) -> ServiceResult<()> {
        if category_ids.is_empty() {
            debug!(business_id = %business_id, "Empty reorder, nothing to do");
            return Ok(());
        }

        let now = self.clock.now();

        let mut uow = self.db.begin().await?;
        category::lock_business(uow.conn(), business_id).await?;

        let existing = category::list_in(uow.conn(), business_id).await?;
        let plan = plan_category_order(&existing, category_ids)?;

        category::shift_to_negative(uow.conn(), business_id).await?;
        let updated = category::apply_sort_orders(uow.conn(), business_id, &plan, now).await?;
        uow.commit().await?;

        info!(
            business_id = %business_id,
            listed = category_ids.len(),
            updated,
            "Categories reordered"
        );
        Ok(())
    }
}

fn category_error(err: DbError, category_id: &str) -> ServiceError {
    match err {
        DbError::NotFound { .. } => CoreError::CategoryNotFound(category_id.to_string()).into(),
        other => other.into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::Utc;
    use qlaris_core::Product;
    use qlaris_db::repository::product;
    use qlaris_db::DbConfig;

    const BUSINESS: &str = "b-1";

    async fn service_with(names: &[&str]) -> (CategoryService, Vec<Category>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let service = CategoryService::new(db);

        let mut created = Vec::new();
        for name in names {
            created.push(service.create_category(BUSINESS, name).await.unwrap());
        }
        (service, created)
    }

    async fn order(service: &CategoryService) -> Vec<(String, i64)> {
        service
            .list_categories(BUSINESS)
            .await
            .unwrap()
            .into_iter()
            .map(|c| (c.name, c.sort_order))
            .collect()
    }

    fn ids(categories: &[&Category]) -> Vec<String> {
        categories.iter().map(|c| c.id.clone()).collect()
    }

    fn named(pairs: &[(&str, i64)]) -> Vec<(String, i64)> {
        pairs.iter().map(|(n, o)| (n.to_string(), *o)).collect()
    }

    #[tokio::test]
    async fn test_create_appends_and_trims() {
        let (service, created) = service_with(&["Drinks", "  Food  "]).await;

        assert_eq!(created[1].name, "Food");
        assert_eq!(order(&service).await, named(&[("Drinks", 1), ("Food", 2)]));

        let err = service.create_category(BUSINESS, "   ").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_full_reorder() {
        let (service, c) = service_with(&["A", "B", "C"]).await;

        service
            .sort_categories(BUSINESS, &ids(&[&c[2], &c[0], &c[1]]))
            .await
            .unwrap();
        assert_eq!(order(&service).await, named(&[("C", 0), ("A", 1), ("B", 2)]));

        // Same request again is a no-op
        service
            .sort_categories(BUSINESS, &ids(&[&c[2], &c[0], &c[1]]))
            .await
            .unwrap();
        assert_eq!(order(&service).await, named(&[("C", 0), ("A", 1), ("B", 2)]));
    }

    #[tokio::test]
    async fn test_partial_reorder_appends_rest() {
        let (service, c) = service_with(&["A", "B", "C", "D"]).await;

        service.sort_categories(BUSINESS, &ids(&[&c[3]])).await.unwrap();

        assert_eq!(
            order(&service).await,
            named(&[("D", 0), ("A", 1), ("B", 2), ("C", 3)])
        );
    }

    #[tokio::test]
    async fn test_unknown_id_changes_nothing() {
        let (service, c) = service_with(&["A", "B"]).await;
        let mut request = ids(&[&c[1]]);
        request.push("not-a-category".to_string());

        let err = service.sort_categories(BUSINESS, &request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::CategoryNotFound(ref id)) if id == "not-a-category"));

        assert_eq!(order(&service).await, named(&[("A", 1), ("B", 2)]));
    }

    #[tokio::test]
    async fn test_foreign_category_is_unknown() {
        let (service, c) = service_with(&["A", "B"]).await;
        let foreign = service.create_category("b-2", "Other").await.unwrap();

        let err = service
            .sort_categories(BUSINESS, &[foreign.id.clone(), c[0].id.clone()])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let others = service.list_categories("b-2").await.unwrap();
        assert_eq!(others[0].sort_order, 1);
    }

    #[tokio::test]
    async fn test_duplicates_rejected() {
        let (service, c) = service_with(&["A", "B"]).await;

        let err = service
            .sort_categories(BUSINESS, &ids(&[&c[1], &c[1]]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(order(&service).await, named(&[("A", 1), ("B", 2)]));
    }

    #[tokio::test]
    async fn test_empty_request_is_noop() {
        let (service, _) = service_with(&["A", "B"]).await;

        service.sort_categories(BUSINESS, &[]).await.unwrap();
        assert_eq!(order(&service).await, named(&[("A", 1), ("B", 2)]));
    }

    #[tokio::test]
    async fn test_create_after_reorder_goes_last() {
        let (service, c) = service_with(&["A", "B"]).await;
        service
            .sort_categories(BUSINESS, &ids(&[&c[1], &c[0]]))
            .await
            .unwrap();

        service.create_category(BUSINESS, "C").await.unwrap();
        assert_eq!(order(&service).await, named(&[("B", 0), ("A", 1), ("C", 2)]));
    }

    #[tokio::test]
    async fn test_get_and_rename() {
        let (service, c) = service_with(&["Drinks", "Food"]).await;

        let renamed = service
            .rename_category(BUSINESS, &c[0].id, "  Beverages ")
            .await
            .unwrap();
        assert_eq!(renamed.name, "Beverages");
        assert_eq!(service.get_category(BUSINESS, &c[0].id).await.unwrap(), renamed);
        assert_eq!(order(&service).await, named(&[("Beverages", 1), ("Food", 2)]));

        let err = service.rename_category(BUSINESS, &c[0].id, "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = service.rename_category("b-2", &c[0].id, "Mine").await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::CategoryNotFound(ref id)) if *id == c[0].id));

        let err = service.get_category("b-2", &c[0].id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_delete_uncategorizes_products() {
        let (service, c) = service_with(&["Drinks", "Food", "Snacks"]).await;

        let now = Utc::now();
        let coffee = service
            .db
            .products()
            .insert(&Product {
                id: product::generate_product_id(),
                business_id: BUSINESS.to_string(),
                name: "Coffee".to_string(),
                price_cents: 1000,
                cost_cents: None,
                enable_stock: false,
                stock_qty: None,
                is_active: true,
                category_id: Some(c[0].id.clone()),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let err = service.delete_category("b-2", &c[0].id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        service.delete_category(BUSINESS, &c[0].id).await.unwrap();
        assert_eq!(order(&service).await, named(&[("Food", 2), ("Snacks", 3)]));

        let stored = service
            .db
            .products()
            .get_by_id_and_business(&coffee.id, BUSINESS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.category_id, None);

        let err = service.delete_category(BUSINESS, &c[0].id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::CategoryNotFound(_))));

        // Remaining categories still reorder into 0..n
        service.sort_categories(BUSINESS, &ids(&[&c[2]])).await.unwrap();
        assert_eq!(order(&service).await, named(&[("Snacks", 0), ("Food", 1)]));
    }
}
