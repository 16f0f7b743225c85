//! Inventory views, manual stock adjustments and stock alerts
//!
//! Reads derive stock status from thresholds at query time; nothing about
//! alert state is stored on the product row. Manual adjustments are the only
//! operator-initiated write here and they go through the stock ledger like
//! every other mutation.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{AlertType, ChangeType, PageData, Pagination, StockStatus};
use crate::services::stock_ledger::{self, DeltaInput, DeltaOutcome};
use shared::validation;

/// Inventory service for stock views, adjustments and alerts
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// One product in the inventory overview
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: Uuid,
    pub barcode: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub unit: String,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    pub stock_quantity: i32,
    pub min_stock: i32,
    pub max_stock: i32,
    /// Derived from thresholds at read time, never stored
    #[sqlx(skip)]
    pub stock_status: StockStatus,
}

/// One inventory log entry, with product and operator names joined in
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLogEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub change_type: ChangeType,
    pub quantity: i32,
    pub before_quantity: i32,
    pub after_quantity: i32,
    pub reason: String,
    pub operator_id: Option<Uuid>,
    pub operator_name: Option<String>,
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A stored stock alert
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub barcode: String,
    pub current_stock: i32,
    pub alert_type: AlertType,
    pub alert_value: i32,
    pub message: String,
    pub is_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Filters for the inventory overview
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryFilter {
    pub keyword: Option<String>,
    pub category_id: Option<Uuid>,
    /// "low" or "high" restricts the view to products breaching that threshold
    pub alert_type: Option<String>,
}

/// Filters for the inventory log
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    pub product_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub change_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Filters for the alert list
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertFilter {
    pub alert_type: Option<String>,
    pub is_resolved: Option<bool>,
}

/// Manual stock adjustment request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustInput {
    pub product_id: Uuid,
    /// "in", "out" or "adjust"
    pub adjust_type: String,
    /// For "in"/"out": units moved, must be positive.
    /// For "adjust": signed correction.
    pub quantity: i32,
    pub reason: String,
}

/// Result of a low-stock sweep
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockSweep {
    pub count: i64,
    pub products: Vec<InventoryItem>,
}

/// Keep only the two known threshold directions as a filter value;
/// anything else means no filtering
fn known_alert_filter(alert_type: Option<&str>) -> Option<&str> {
    alert_type.filter(|t| matches!(*t, "low" | "high"))
}

/// Map an adjustment request to a signed ledger delta
///
/// "in" adds stock, "out" removes it (both require a positive quantity),
/// "adjust" applies the signed quantity as-is.
pub fn adjustment_delta(adjust_type: &str, quantity: i32) -> Result<(i32, ChangeType), &'static str> {
    match adjust_type {
        "in" => {
            if quantity <= 0 {
                return Err("Quantity must be positive");
            }
            Ok((quantity, ChangeType::In))
        }
        "out" => {
            if quantity <= 0 {
                return Err("Quantity must be positive");
            }
            Ok((-quantity, ChangeType::Out))
        }
        "adjust" => {
            if quantity == 0 {
                return Err("Adjustment quantity cannot be zero");
            }
            Ok((quantity, ChangeType::Adjust))
        }
        _ => Err("Adjustment type must be in, out or adjust"),
    }
}

/// Record a threshold breach for a product, if one exists
///
/// At most one unresolved alert per (product, direction) is kept; the
/// partial unique index makes re-raising a breach a no-op. Alerts are never
/// auto-resolved, recovery is confirmed by an operator.
pub async fn raise_alert_if_breached(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> AppResult<()> {
    let row = sqlx::query_as::<_, (String, String, i32, i32, i32)>(
        "SELECT name, barcode, stock_quantity, min_stock, max_stock FROM products WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await?;

    let Some((name, barcode, stock_quantity, min_stock, max_stock)) = row else {
        return Ok(());
    };

    let (alert_type, alert_value, message) =
        match StockStatus::evaluate(stock_quantity, min_stock, max_stock) {
            StockStatus::Low => (
                AlertType::Low,
                min_stock,
                format!(
                    "商品 {} 库存不足，当前库存: {}，最小库存: {}",
                    name, stock_quantity, min_stock
                ),
            ),
            StockStatus::High => (
                AlertType::High,
                max_stock,
                format!(
                    "商品 {} 库存积压，当前库存: {}，最大库存: {}",
                    name, stock_quantity, max_stock
                ),
            ),
            StockStatus::Normal => return Ok(()),
        };

    sqlx::query(
        r#"
        INSERT INTO stock_alerts (
            product_id, product_name, barcode, current_stock,
            alert_type, alert_value, message
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (product_id, alert_type) WHERE NOT is_resolved DO NOTHING
        "#,
    )
    .bind(product_id)
    .bind(&name)
    .bind(&barcode)
    .bind(stock_quantity)
    .bind(alert_type)
    .bind(alert_value)
    .bind(&message)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Inventory overview, most critical stock first
    pub async fn list_inventory(
        &self,
        filter: InventoryFilter,
        pagination: Pagination,
    ) -> AppResult<PageData<InventoryItem>> {
        let alert_type = known_alert_filter(filter.alert_type.as_deref());

        let where_clause = r#"
            WHERE ($1::text IS NULL OR p.name ILIKE '%' || $1 || '%' OR p.barcode ILIKE '%' || $1 || '%')
              AND ($2::uuid IS NULL OR p.category_id = $2)
              AND ($3::text IS NULL
                   OR ($3 = 'low' AND p.stock_quantity <= p.min_stock)
                   OR ($3 = 'high' AND p.stock_quantity >= p.max_stock))
        "#;

        let query = format!(
            r#"
            SELECT p.id, p.barcode, p.name, p.category_id, c.name AS category_name,
                   p.unit, p.purchase_price, p.sale_price, p.stock_quantity,
                   p.min_stock, p.max_stock
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            {}
            ORDER BY p.stock_quantity ASC, p.name
            LIMIT $4 OFFSET $5
            "#,
            where_clause
        );

        let mut items = sqlx::query_as::<_, InventoryItem>(&query)
            .bind(&filter.keyword)
            .bind(filter.category_id)
            .bind(alert_type)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.db)
            .await?;

        for item in &mut items {
            item.stock_status =
                StockStatus::evaluate(item.stock_quantity, item.min_stock, item.max_stock);
        }

        let count_query = format!(
            "SELECT COUNT(*) FROM products p LEFT JOIN categories c ON c.id = p.category_id {}",
            where_clause
        );
        let total = sqlx::query_scalar::<_, i64>(&count_query)
            .bind(&filter.keyword)
            .bind(filter.category_id)
            .bind(alert_type)
            .fetch_one(&self.db)
            .await?;

        Ok(PageData::new(items, total, pagination))
    }

    /// Inventory log, newest first
    pub async fn list_logs(
        &self,
        filter: LogFilter,
        pagination: Pagination,
    ) -> AppResult<PageData<InventoryLogEntry>> {
        let logs = sqlx::query_as::<_, InventoryLogEntry>(
            r#"
            SELECT l.id, l.product_id, p.name AS product_name, l.change_type,
                   l.quantity, l.before_quantity, l.after_quantity, l.reason,
                   l.operator_id, u.real_name AS operator_name, l.reference_id,
                   l.created_at
            FROM inventory_logs l
            LEFT JOIN products p ON p.id = l.product_id
            LEFT JOIN users u ON u.id = l.operator_id
            WHERE ($1::uuid IS NULL OR l.product_id = $1)
              AND ($2::text IS NULL OR l.change_type::text = $2)
              AND ($3::date IS NULL OR l.created_at::date >= $3)
              AND ($4::date IS NULL OR l.created_at::date <= $4)
            ORDER BY l.created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.product_id)
        .bind(&filter.change_type)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM inventory_logs l
            WHERE ($1::uuid IS NULL OR l.product_id = $1)
              AND ($2::text IS NULL OR l.change_type::text = $2)
              AND ($3::date IS NULL OR l.created_at::date >= $3)
              AND ($4::date IS NULL OR l.created_at::date <= $4)
            "#,
        )
        .bind(filter.product_id)
        .bind(&filter.change_type)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_one(&self.db)
        .await?;

        Ok(PageData::new(logs, total, pagination))
    }

    /// Apply a manual stock adjustment through the ledger
    pub async fn adjust(&self, operator_id: Uuid, input: AdjustInput) -> AppResult<DeltaOutcome> {
        validation::validate_reason(&input.reason).map_err(|e| AppError::Validation {
            field: "reason".to_string(),
            message: e.to_string(),
            message_zh: "调整原因不能为空".to_string(),
        })?;

        let (delta, change_type) = adjustment_delta(&input.adjust_type, input.quantity)
            .map_err(|e| AppError::Validation {
                field: "adjustType".to_string(),
                message: e.to_string(),
                message_zh: "调整类型或数量无效".to_string(),
            })?;

        let mut tx = self.db.begin().await?;

        let outcome = stock_ledger::apply_delta(
            &mut tx,
            DeltaInput {
                product_id: input.product_id,
                delta,
                change_type,
                reason: input.reason.trim(),
                operator_id,
                reference_id: None,
            },
        )
        .await?;

        raise_alert_if_breached(&mut tx, input.product_id).await?;

        tx.commit().await?;

        Ok(outcome)
    }

    /// List stock alerts, newest first
    pub async fn list_alerts(
        &self,
        filter: AlertFilter,
        pagination: Pagination,
    ) -> AppResult<PageData<StockAlert>> {
        let alerts = sqlx::query_as::<_, StockAlert>(
            r#"
            SELECT id, product_id, product_name, barcode, current_stock,
                   alert_type, alert_value, message, is_resolved, resolved_at,
                   created_at
            FROM stock_alerts
            WHERE ($1::text IS NULL OR alert_type::text = $1)
              AND ($2::boolean IS NULL OR is_resolved = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&filter.alert_type)
        .bind(filter.is_resolved)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM stock_alerts
            WHERE ($1::text IS NULL OR alert_type::text = $1)
              AND ($2::boolean IS NULL OR is_resolved = $2)
            "#,
        )
        .bind(&filter.alert_type)
        .bind(filter.is_resolved)
        .fetch_one(&self.db)
        .await?;

        Ok(PageData::new(alerts, total, pagination))
    }

    /// Mark an alert resolved
    pub async fn resolve_alert(&self, alert_id: Uuid) -> AppResult<()> {
        let resolved = sqlx::query_scalar::<_, bool>(
            "SELECT is_resolved FROM stock_alerts WHERE id = $1",
        )
        .bind(alert_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Alert".to_string()))?;

        if resolved {
            return Err(AppError::InvalidStateTransition {
                message: "Alert is already resolved".to_string(),
                message_zh: "该预警已处理".to_string(),
            });
        }

        sqlx::query(
            "UPDATE stock_alerts SET is_resolved = TRUE, resolved_at = NOW() WHERE id = $1",
        )
        .bind(alert_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Sweep active products for low stock and raise alerts for the breaches
    ///
    /// Returns the products currently at or under their minimum so the
    /// caller can display the sweep result directly.
    pub async fn check_low_stock(&self) -> AppResult<LowStockSweep> {
        let mut tx = self.db.begin().await?;

        let mut products = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT p.id, p.barcode, p.name, p.category_id, c.name AS category_name,
                   p.unit, p.purchase_price, p.sale_price, p.stock_quantity,
                   p.min_stock, p.max_stock
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.status = 'active' AND p.stock_quantity <= p.min_stock
            ORDER BY p.stock_quantity ASC
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        for product in &mut products {
            product.stock_status = StockStatus::Low;

            sqlx::query(
                r#"
                INSERT INTO stock_alerts (
                    product_id, product_name, barcode, current_stock,
                    alert_type, alert_value, message
                )
                VALUES ($1, $2, $3, $4, 'low', $5, $6)
                ON CONFLICT (product_id, alert_type) WHERE NOT is_resolved DO NOTHING
                "#,
            )
            .bind(product.id)
            .bind(&product.name)
            .bind(&product.barcode)
            .bind(product.stock_quantity)
            .bind(product.min_stock)
            .bind(format!(
                "商品 {} 库存不足，当前库存: {}，最小库存: {}",
                product.name, product.stock_quantity, product.min_stock
            ))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(LowStockSweep {
            count: products.len() as i64,
            products,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjustment_delta_directions() {
        assert_eq!(adjustment_delta("in", 10), Ok((10, ChangeType::In)));
        assert_eq!(adjustment_delta("out", 10), Ok((-10, ChangeType::Out)));
        assert_eq!(adjustment_delta("adjust", -3), Ok((-3, ChangeType::Adjust)));
        assert_eq!(adjustment_delta("adjust", 7), Ok((7, ChangeType::Adjust)));
    }

    #[test]
    fn test_unknown_alert_filter_is_ignored() {
        assert_eq!(known_alert_filter(Some("low")), Some("low"));
        assert_eq!(known_alert_filter(Some("high")), Some("high"));
        // Unrecognized values fall back to an unfiltered view
        assert_eq!(known_alert_filter(Some("medium")), None);
        assert_eq!(known_alert_filter(Some("")), None);
        assert_eq!(known_alert_filter(None), None);
    }

    #[test]
    fn test_adjustment_delta_rejects_bad_input() {
        assert!(adjustment_delta("in", 0).is_err());
        assert!(adjustment_delta("in", -5).is_err());
        assert!(adjustment_delta("out", -5).is_err());
        assert!(adjustment_delta("adjust", 0).is_err());
        assert!(adjustment_delta("sale", 5).is_err());
        assert!(adjustment_delta("", 5).is_err());
    }
}
