//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! Stock is deliberately absent from the write methods here: only the
//! [`crate::ledger`] mutates `stock_quantity`, always with a single
//! relative UPDATE.
//!
//! ## Low Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock_quantity <= low_stock_threshold  →  shows up in list_low_stock  │
//! │                                                                         │
//! │  Kopi Susu   stock 3   threshold 5   ← LOW                             │
//! │  Teh Botol   stock 40  threshold 10                                    │
//! │  Chitato     stock 0   threshold 0   ← LOW (sold out)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::category::CategoryRepository;
use tally_core::validation::{validate_non_negative, validate_product_name};
use tally_core::{Money, Product, ValidationError};

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub purchase_price: Money,
    pub selling_price: Money,
    pub stock_quantity: i64,
    pub low_stock_threshold: i64,
}

impl NewProduct {
    /// A product with only the required fields set.
    pub fn new(name: impl Into<String>, selling_price: Money, stock_quantity: i64) -> Self {
        NewProduct {
            name: name.into(),
            barcode: None,
            description: None,
            category_id: None,
            purchase_price: Money::zero(),
            selling_price,
            stock_quantity,
            low_stock_threshold: 0,
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let product = repo.get("uuid-here").await?;
/// let running_low = repo.list_low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::Invalid)` - bad name, negative price or stock
    /// * `Err(DbError::NotFound)` - `category_id` names no category
    /// * `Err(DbError::UniqueViolation)` - barcode already exists
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_product_name(&new.name)?;
        validate_non_negative("purchase_price", new.purchase_price)?;
        validate_non_negative("selling_price", new.selling_price)?;
        if new.stock_quantity < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "stock_quantity".to_string(),
            }
            .into());
        }

        if let Some(category_id) = &new.category_id {
            let categories = CategoryRepository::new(self.pool.clone());
            if !categories.exists(category_id).await? {
                return Err(DbError::not_found("Category", category_id));
            }
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            barcode: new.barcode.clone(),
            description: new.description.clone(),
            category_id: new.category_id.clone(),
            purchase_price: new.purchase_price,
            selling_price: new.selling_price,
            stock_quantity: new.stock_quantity,
            low_stock_threshold: new.low_stock_threshold,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, barcode, description, category_id,
                purchase_price, selling_price,
                stock_quantity, low_stock_threshold,
                is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(&product.description)
        .bind(&product.category_id)
        .bind(product.purchase_price)
        .bind(product.selling_price)
        .bind(product.stock_quantity)
        .bind(product.low_stock_threshold)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, barcode, description, category_id,
                purchase_price, selling_price,
                stock_quantity, low_stock_threshold,
                is_active, created_at, updated_at
            FROM products
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products at or below their low-stock threshold,
    /// emptiest first.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, barcode, description, category_id,
                purchase_price, selling_price,
                stock_quantity, low_stock_threshold,
                is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1 AND stock_quantity <= low_stock_threshold
            ORDER BY stock_quantity, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Low stock products");
        Ok(products)
    }

    /// Changes purchase and selling price.
    ///
    /// Past transaction items keep the price they were sold at.
    pub async fn update_prices(
        &self,
        id: &str,
        purchase_price: Money,
        selling_price: Money,
    ) -> DbResult<()> {
        validate_non_negative("purchase_price", purchase_price)?;
        validate_non_negative("selling_price", selling_price)?;

        debug!(id = %id, %selling_price, "Updating product prices");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET purchase_price = ?, selling_price = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(purchase_price)
        .bind(selling_price)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Activates or deactivates (soft-deletes) a product.
    ///
    /// ## Why Soft Delete?
    /// Historical transaction items still reference this product.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active, "Setting product active flag");

        let result = sqlx::query("UPDATE products SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrips_money() {
        let db = db().await;
        let inserted = db
            .products()
            .insert(&NewProduct {
                purchase_price: "12.50".parse().unwrap(),
                barcode: Some("8991234567890".into()),
                ..NewProduct::new("Kopi Susu", "19.99".parse().unwrap(), 12)
            })
            .await
            .unwrap();

        let fetched = db.products().get(&inserted.id).await.unwrap().unwrap();
        assert_eq!(fetched.selling_price.to_string(), "19.99");
        assert_eq!(fetched.purchase_price.to_string(), "12.50");
        assert_eq!(fetched.stock_quantity, 12);
        assert!(fetched.is_active);
        assert!(fetched.category_id.is_none());
    }

    #[tokio::test]
    async fn test_insert_with_unknown_category() {
        let db = db().await;
        let err = db
            .products()
            .insert(&NewProduct {
                category_id: Some(Uuid::new_v4().to_string()),
                ..NewProduct::new("Ghost", Money::from_cents(100), 1)
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Category"));
    }

    #[tokio::test]
    async fn test_insert_rejects_negative_values() {
        let db = db().await;
        let err = db
            .products()
            .insert(&NewProduct::new("Bad", Money::from_cents(-1), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));

        let err = db
            .products()
            .insert(&NewProduct::new("Bad", Money::from_cents(1), -1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_low_stock_listing() {
        let db = db().await;
        let low = db
            .products()
            .insert(&NewProduct {
                low_stock_threshold: 5,
                ..NewProduct::new("Kopi Susu", Money::from_cents(1500), 3)
            })
            .await
            .unwrap();
        db.products()
            .insert(&NewProduct {
                low_stock_threshold: 10,
                ..NewProduct::new("Teh Botol", Money::from_cents(500), 40)
            })
            .await
            .unwrap();

        let listed = db.products().list_low_stock().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, low.id);
        assert!(listed[0].is_low_stock());

        db.products().set_active(&low.id, false).await.unwrap();
        assert!(db.products().list_low_stock().await.unwrap().is_empty());
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_prices() {
        let db = db().await;
        let p = db
            .products()
            .insert(&NewProduct::new("Roti", Money::from_cents(800), 5))
            .await
            .unwrap();

        db.products()
            .update_prices(&p.id, Money::from_cents(500), Money::from_cents(950))
            .await
            .unwrap();

        let fetched = db.products().get(&p.id).await.unwrap().unwrap();
        assert_eq!(fetched.selling_price, Money::from_cents(950));

        assert!(matches!(
            db.products()
                .update_prices("missing", Money::zero(), Money::zero())
                .await,
            Err(DbError::NotFound { .. })
        ));
    }
}
