//! Product catalog: products, categories and barcode lookup
//!
//! Stock quantity is read-only here. Initial stock on creation goes through
//! the ledger so even the first units leave an audit trail; later changes
//! belong to the inventory and sales services.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ChangeType, PageData, Pagination, ProductStatus, StockStatus};
use crate::services::inventory;
use crate::services::stock_ledger::{self, DeltaInput};
use shared::validation;

/// Product catalog service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// A catalog product, with its category name joined in
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub barcode: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub brand: Option<String>,
    pub unit: String,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    pub stock_quantity: i32,
    pub min_stock: i32,
    pub max_stock: i32,
    pub shelf_life_days: Option<i32>,
    pub supplier: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub status: ProductStatus,
    #[sqlx(skip)]
    pub stock_status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    fn derive_stock_status(&mut self) {
        self.stock_status =
            StockStatus::evaluate(self.stock_quantity, self.min_stock, self.max_stock);
    }
}

/// A product category
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub sort_order: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Filters for the product list
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub keyword: Option<String>,
    pub category_id: Option<Uuid>,
    pub status: Option<String>,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    pub barcode: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub brand: Option<String>,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    /// Initial units on hand, recorded as an inbound ledger entry
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub min_stock: i32,
    #[serde(default)]
    pub max_stock: i32,
    pub shelf_life_days: Option<i32>,
    pub supplier: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

fn default_unit() -> String {
    "件".to_string()
}

/// Input for updating a product; stock quantity is deliberately absent
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductInput {
    pub barcode: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub brand: Option<String>,
    pub unit: String,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    pub min_stock: i32,
    pub max_stock: i32,
    pub shelf_life_days: Option<i32>,
    pub supplier: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub status: ProductStatus,
}

const PRODUCT_COLUMNS: &str = r#"
    p.id, p.barcode, p.name, p.category_id, c.name AS category_name, p.brand,
    p.unit, p.purchase_price, p.sale_price, p.stock_quantity, p.min_stock,
    p.max_stock, p.shelf_life_days, p.supplier, p.description, p.image_url,
    p.status, p.created_at, p.updated_at
"#;

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    fn validate_pricing(
        barcode: &str,
        purchase_price: Decimal,
        sale_price: Decimal,
    ) -> AppResult<()> {
        validation::validate_barcode(barcode).map_err(|e| AppError::Validation {
            field: "barcode".to_string(),
            message: e.to_string(),
            message_zh: "商品条码格式无效".to_string(),
        })?;
        validation::validate_price(purchase_price).map_err(|e| AppError::Validation {
            field: "purchasePrice".to_string(),
            message: e.to_string(),
            message_zh: "进货价不能为负".to_string(),
        })?;
        validation::validate_price(sale_price).map_err(|e| AppError::Validation {
            field: "salePrice".to_string(),
            message: e.to_string(),
            message_zh: "售价不能为负".to_string(),
        })?;
        Ok(())
    }

    /// List products with keyword, category and status filters
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        pagination: Pagination,
    ) -> AppResult<PageData<Product>> {
        let query = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE ($1::text IS NULL OR p.name ILIKE '%' || $1 || '%' OR p.barcode ILIKE '%' || $1 || '%')
              AND ($2::uuid IS NULL OR p.category_id = $2)
              AND ($3::text IS NULL OR p.status::text = $3)
            ORDER BY p.created_at DESC
            LIMIT $4 OFFSET $5
            "#
        );

        let mut products = sqlx::query_as::<_, Product>(&query)
            .bind(&filter.keyword)
            .bind(filter.category_id)
            .bind(&filter.status)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.db)
            .await?;

        for product in &mut products {
            product.derive_stock_status();
        }

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM products p
            WHERE ($1::text IS NULL OR p.name ILIKE '%' || $1 || '%' OR p.barcode ILIKE '%' || $1 || '%')
              AND ($2::uuid IS NULL OR p.category_id = $2)
              AND ($3::text IS NULL OR p.status::text = $3)
            "#,
        )
        .bind(&filter.keyword)
        .bind(filter.category_id)
        .bind(&filter.status)
        .fetch_one(&self.db)
        .await?;

        Ok(PageData::new(products, total, pagination))
    }

    /// Get one product by id
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let query = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.id = $1
            "#
        );

        let mut product = sqlx::query_as::<_, Product>(&query)
            .bind(product_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        product.derive_stock_status();
        Ok(product)
    }

    /// Point-of-sale barcode lookup; only sellable products match
    pub async fn find_by_barcode(&self, barcode: &str) -> AppResult<Product> {
        let query = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.barcode = $1 AND p.status = 'active'
            "#
        );

        let mut product = sqlx::query_as::<_, Product>(&query)
            .bind(barcode)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        product.derive_stock_status();
        Ok(product)
    }

    /// Create a product; initial stock enters through the ledger
    pub async fn create_product(
        &self,
        operator_id: Uuid,
        input: CreateProductInput,
    ) -> AppResult<Product> {
        Self::validate_pricing(&input.barcode, input.purchase_price, input.sale_price)?;

        if input.stock_quantity < 0 {
            return Err(AppError::Validation {
                field: "stockQuantity".to_string(),
                message: "Initial stock cannot be negative".to_string(),
                message_zh: "初始库存不能为负".to_string(),
            });
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE barcode = $1)",
        )
        .bind(&input.barcode)
        .fetch_one(&self.db)
        .await?;

        if exists {
            return Err(AppError::DuplicateEntry {
                field: "barcode".to_string(),
                message: "A product with this barcode already exists".to_string(),
                message_zh: "商品条码已存在".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let product_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO products (
                barcode, name, category_id, brand, unit, purchase_price,
                sale_price, stock_quantity, min_stock, max_stock,
                shelf_life_days, supplier, description, image_url, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $10, $11, $12, $13, 'active')
            RETURNING id
            "#,
        )
        .bind(&input.barcode)
        .bind(&input.name)
        .bind(input.category_id)
        .bind(&input.brand)
        .bind(&input.unit)
        .bind(input.purchase_price)
        .bind(input.sale_price)
        .bind(input.min_stock)
        .bind(input.max_stock)
        .bind(input.shelf_life_days)
        .bind(&input.supplier)
        .bind(&input.description)
        .bind(&input.image_url)
        .fetch_one(&mut *tx)
        .await?;

        if input.stock_quantity > 0 {
            stock_ledger::apply_delta(
                &mut tx,
                DeltaInput {
                    product_id,
                    delta: input.stock_quantity,
                    change_type: ChangeType::In,
                    reason: "商品入库",
                    operator_id,
                    reference_id: None,
                },
            )
            .await?;
        }

        inventory::raise_alert_if_breached(&mut tx, product_id).await?;

        tx.commit().await?;

        self.get_product(product_id).await
    }

    /// Update a product's catalog fields; never touches stock quantity
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        Self::validate_pricing(&input.barcode, input.purchase_price, input.sale_price)?;

        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(product_id)
                .fetch_one(&self.db)
                .await?;
        if !exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let barcode_taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE barcode = $1 AND id <> $2)",
        )
        .bind(&input.barcode)
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        if barcode_taken {
            return Err(AppError::DuplicateEntry {
                field: "barcode".to_string(),
                message: "A product with this barcode already exists".to_string(),
                message_zh: "商品条码已存在".to_string(),
            });
        }

        sqlx::query(
            r#"
            UPDATE products SET
                barcode = $1, name = $2, category_id = $3, brand = $4, unit = $5,
                purchase_price = $6, sale_price = $7, min_stock = $8, max_stock = $9,
                shelf_life_days = $10, supplier = $11, description = $12,
                image_url = $13, status = $14, updated_at = NOW()
            WHERE id = $15
            "#,
        )
        .bind(&input.barcode)
        .bind(&input.name)
        .bind(input.category_id)
        .bind(&input.brand)
        .bind(&input.unit)
        .bind(input.purchase_price)
        .bind(input.sale_price)
        .bind(input.min_stock)
        .bind(input.max_stock)
        .bind(input.shelf_life_days)
        .bind(&input.supplier)
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(input.status)
        .bind(product_id)
        .execute(&self.db)
        .await?;

        self.get_product(product_id).await
    }

    /// Delete a product
    ///
    /// Sale items keep their snapshot fields, so order history survives the
    /// delete; inventory restore on later cancellation skips the product.
    pub async fn delete_product(&self, product_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        Ok(())
    }

    /// List categories in display order
    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, sort_order, status, created_at
            FROM categories
            WHERE status = 'active'
            ORDER BY sort_order, name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(categories)
    }
}
