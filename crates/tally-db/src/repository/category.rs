//! # Category Repository
//!
//! Categories are a weak reference from products: a category that any
//! product (active or not) still points at cannot be deleted.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::validation::validate_category_name;
use tally_core::Category;

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Inserts a new category.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - name already taken
    pub async fn insert(&self, name: &str, description: Option<&str>) -> DbResult<Category> {
        validate_category_name(name)?;

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };

        debug!(id = %category.id, name = %category.name, "Inserting category");

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .execute(&self.pool)
        .await?;

        Ok(category)
    }

    /// Gets a category by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, created_at
            FROM categories
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Checks whether a category exists.
    pub async fn exists(&self, id: &str) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    /// Lists all categories by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Deletes a category.
    ///
    /// ## Returns
    /// * `Err(DbError::InUse)` - products still reference it (never cascaded)
    /// * `Err(DbError::NotFound)` - no such category
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting category");

        let referencing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if referencing > 0 {
            return Err(DbError::in_use("Category", id));
        }

        // The FK is ON DELETE RESTRICT, so a product inserted since the
        // count above still blocks the delete.
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => DbError::in_use("Category", id),
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::NewProduct;
    use crate::{Database, DbConfig};
    use tally_core::Money;

    #[tokio::test]
    async fn test_insert_get_exists() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.categories();

        let cat = repo.insert("Minuman", Some("Drinks")).await.unwrap();
        assert!(repo.exists(&cat.id).await.unwrap());
        assert!(!repo.exists("missing").await.unwrap());

        let fetched = repo.get(&cat.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Minuman");
        assert_eq!(fetched.description.as_deref(), Some("Drinks"));
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.categories().insert("Snacks", None).await.unwrap();

        let err = db.categories().insert("Snacks", None).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_delete_blocked_while_referenced() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cat = db.categories().insert("Snacks", None).await.unwrap();

        let product = db
            .products()
            .insert(&NewProduct {
                category_id: Some(cat.id.clone()),
                ..NewProduct::new("Chitato", Money::from_cents(1200), 10)
            })
            .await
            .unwrap();

        let err = db.categories().delete(&cat.id).await.unwrap_err();
        assert!(matches!(err, DbError::InUse { .. }));

        // deactivating the product does not release the category
        db.products().set_active(&product.id, false).await.unwrap();
        assert!(matches!(
            db.categories().delete(&cat.id).await,
            Err(DbError::InUse { .. })
        ));
        assert!(db.categories().exists(&cat.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_unreferenced() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cat = db.categories().insert("Seasonal", None).await.unwrap();

        db.categories().delete(&cat.id).await.unwrap();
        assert!(!db.categories().exists(&cat.id).await.unwrap());
        assert!(matches!(
            db.categories().delete(&cat.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
