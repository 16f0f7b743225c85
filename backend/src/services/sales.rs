//! Sales transaction engine
//!
//! Converts a cart into a persisted order with consistent totals and stock
//! decrements, or rejects the whole operation atomically. Cancellation is a
//! compensating action: it restores exactly the quantities sold and marks
//! the order cancelled in the same transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ChangeType, OrderStatus, PageData, Pagination};
use crate::services::inventory;
use crate::services::stock_ledger::{self, DeltaInput};
use shared::validation;

/// Sales service for order entry, cancellation and reporting
#[derive(Clone)]
pub struct SalesService {
    db: PgPool,
}

/// One line of a cart
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub discount: Option<Decimal>,
}

/// Input for creating a sale
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleInput {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub items: Vec<SaleLineInput>,
    pub payment_method: String,
    pub remark: Option<String>,
}

/// Result of a successful sale
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleOutcome {
    pub order_id: Uuid,
    pub order_no: String,
    pub total_amount: Decimal,
}

/// A persisted sales order, with operator name joined in
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SalesOrder {
    pub id: Uuid,
    pub order_no: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub total_amount: Decimal,
    pub payment_method: String,
    pub status: OrderStatus,
    pub operator_id: Option<Uuid>,
    pub operator_name: Option<String>,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted sale line with its point-of-sale snapshot fields
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub barcode: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub discount: Decimal,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Order with its line items
#[derive(Debug, Serialize)]
pub struct SaleDetail {
    pub order: SalesOrder,
    pub items: Vec<SaleItem>,
}

/// Filters for listing orders
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<String>,
}

/// Aggregate sales summary
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub order_count: i64,
    pub total_amount: Decimal,
    pub avg_amount: Decimal,
}

/// Best-selling product over the reporting window
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_quantity: i64,
    pub total_sales: Decimal,
}

/// Per-day sales aggregate
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailySales {
    pub date: NaiveDate,
    pub order_count: i64,
    pub total_amount: Decimal,
}

/// Combined statistics payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesStatistics {
    pub summary: SalesSummary,
    pub top_products: Vec<TopProduct>,
    pub daily_sales: Vec<DailySales>,
}

/// Line subtotal: live unit price times quantity, minus discount
pub fn compute_subtotal(unit_price: Decimal, quantity: i32, discount: Decimal) -> Decimal {
    unit_price * Decimal::from(quantity) - discount
}

/// Generate an order number: `SO` + UTC timestamp + random suffix
///
/// Uniqueness is ultimately enforced by the `order_no` unique constraint;
/// creation retries on conflict.
pub fn generate_order_no() -> String {
    let ts = Utc::now().format("%Y%m%d%H%M%S");
    let uid = Uuid::new_v4().simple().to_string();
    format!("SO{}{}", ts, uid[..6].to_uppercase())
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.constraint() == Some(constraint))
}

/// Validated, priced cart line ready for persistence
struct PricedLine {
    product_id: Uuid,
    product_name: String,
    barcode: String,
    unit_price: Decimal,
    quantity: i32,
    discount: Decimal,
    subtotal: Decimal,
}

impl SalesService {
    /// Create a new SalesService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a sale: validate and price every line, persist the order and
    /// its items, and decrement stock through the ledger — all in one
    /// transaction
    pub async fn create_sale(
        &self,
        operator_id: Uuid,
        input: CreateSaleInput,
    ) -> AppResult<CreateSaleOutcome> {
        if input.items.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "Cart is empty".to_string(),
                message_zh: "购物车为空".to_string(),
            });
        }

        if input.payment_method.trim().is_empty() {
            return Err(AppError::Validation {
                field: "paymentMethod".to_string(),
                message: "Payment method is required".to_string(),
                message_zh: "支付方式不能为空".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        // Validate and price lines in caller-supplied order, locking each
        // product row so the stock check holds until commit
        let mut lines: Vec<PricedLine> = Vec::with_capacity(input.items.len());
        let mut total_amount = Decimal::ZERO;

        for item in &input.items {
            validation::validate_sale_quantity(item.quantity).map_err(|e| {
                AppError::Validation {
                    field: "quantity".to_string(),
                    message: e.to_string(),
                    message_zh: "商品数量必须大于0".to_string(),
                }
            })?;

            let row = sqlx::query_as::<_, (String, String, Decimal, i32, String)>(
                r#"
                SELECT name, barcode, sale_price, stock_quantity, status::text
                FROM products WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(item.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

            let (name, barcode, sale_price, stock_quantity, status) = row;

            if status != "active" {
                return Err(AppError::Validation {
                    field: "productId".to_string(),
                    message: format!("Product {} is not for sale", name),
                    message_zh: format!("商品 {} 已下架", name),
                });
            }

            if stock_quantity < item.quantity {
                return Err(AppError::InsufficientStock {
                    message: format!(
                        "Insufficient stock for {}: current {}, requested {}",
                        name, stock_quantity, item.quantity
                    ),
                    message_zh: format!(
                        "商品 {} 库存不足，当前库存: {}",
                        name, stock_quantity
                    ),
                });
            }

            let discount = item.discount.unwrap_or(Decimal::ZERO);
            let gross = sale_price * Decimal::from(item.quantity);
            validation::validate_discount(discount, gross).map_err(|e| AppError::Validation {
                field: "discount".to_string(),
                message: e.to_string(),
                message_zh: "折扣金额无效".to_string(),
            })?;

            let subtotal = compute_subtotal(sale_price, item.quantity, discount);
            total_amount += subtotal;

            lines.push(PricedLine {
                product_id: item.product_id,
                product_name: name,
                barcode,
                unit_price: sale_price,
                quantity: item.quantity,
                discount,
                subtotal,
            });
        }

        // Persist the order; order numbers are unique-constrained, retry a
        // fresh candidate on conflict (savepoint keeps the outer tx alive)
        let mut allocated: Option<(Uuid, String)> = None;
        for _ in 0..3 {
            let candidate = generate_order_no();
            let mut sp = tx.begin().await?;

            let inserted = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO sales_orders (
                    order_no, customer_name, customer_phone, total_amount,
                    payment_method, status, operator_id, remark
                )
                VALUES ($1, $2, $3, $4, $5, 'completed', $6, $7)
                RETURNING id
                "#,
            )
            .bind(&candidate)
            .bind(&input.customer_name)
            .bind(&input.customer_phone)
            .bind(total_amount)
            .bind(&input.payment_method)
            .bind(operator_id)
            .bind(&input.remark)
            .fetch_one(&mut *sp)
            .await;

            match inserted {
                Ok(id) => {
                    sp.commit().await?;
                    allocated = Some((id, candidate));
                    break;
                }
                Err(ref e) if is_unique_violation(e, "sales_orders_order_no_key") => {
                    sp.rollback().await?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let (order_id, order_no) = allocated
            .ok_or_else(|| AppError::Internal("Could not allocate a unique order number".into()))?;

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    order_id, product_id, product_name, barcode, unit_price,
                    quantity, discount, subtotal
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(&line.barcode)
            .bind(line.unit_price)
            .bind(line.quantity)
            .bind(line.discount)
            .bind(line.subtotal)
            .execute(&mut *tx)
            .await?;
        }

        // Decrement stock through the ledger, one log entry per line, and
        // raise a threshold alert if the decrement breached one
        for line in &lines {
            stock_ledger::apply_delta(
                &mut tx,
                DeltaInput {
                    product_id: line.product_id,
                    delta: -line.quantity,
                    change_type: ChangeType::Sale,
                    reason: "销售",
                    operator_id,
                    reference_id: Some(order_id),
                },
            )
            .await?;

            inventory::raise_alert_if_breached(&mut tx, line.product_id).await?;
        }

        tx.commit().await?;

        Ok(CreateSaleOutcome {
            order_id,
            order_no,
            total_amount,
        })
    }

    /// Cancel a completed sale, restoring exactly the quantities sold
    ///
    /// This is a compensating action, not a ledger rollback: stock changes
    /// made since the sale are unaffected, and products deleted since the
    /// sale are skipped.
    pub async fn cancel_sale(&self, operator_id: Uuid, order_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let status = sqlx::query_scalar::<_, OrderStatus>(
            "SELECT status FROM sales_orders WHERE id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        match status {
            OrderStatus::Cancelled => {
                return Err(AppError::InvalidStateTransition {
                    message: "Order is already cancelled".to_string(),
                    message_zh: "订单已取消".to_string(),
                });
            }
            OrderStatus::Completed => {}
            _ => {
                return Err(AppError::InvalidStateTransition {
                    message: "Only completed orders can be cancelled".to_string(),
                    message_zh: "只有已完成的订单才能取消".to_string(),
                });
            }
        }

        let items = sqlx::query_as::<_, (Uuid, i32)>(
            "SELECT product_id, quantity FROM sale_items WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;

        for (product_id, quantity) in items {
            let exists =
                sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                    .bind(product_id)
                    .fetch_one(&mut *tx)
                    .await?;

            // Product deleted since the sale: nothing to restore
            if !exists {
                continue;
            }

            stock_ledger::apply_delta(
                &mut tx,
                DeltaInput {
                    product_id,
                    delta: quantity,
                    change_type: ChangeType::Return,
                    reason: "取消订单",
                    operator_id,
                    reference_id: Some(order_id),
                },
            )
            .await?;

            // The restore can overshoot the maximum threshold
            inventory::raise_alert_if_breached(&mut tx, product_id).await?;
        }

        sqlx::query(
            "UPDATE sales_orders SET status = 'cancelled', updated_at = NOW() WHERE id = $1",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Get one order with its items
    pub async fn get_sale(&self, order_id: Uuid) -> AppResult<SaleDetail> {
        let order = sqlx::query_as::<_, SalesOrder>(
            r#"
            SELECT so.id, so.order_no, so.customer_name, so.customer_phone,
                   so.total_amount, so.payment_method, so.status, so.operator_id,
                   u.real_name AS operator_name, so.remark, so.created_at, so.updated_at
            FROM sales_orders so
            LEFT JOIN users u ON u.id = so.operator_id
            WHERE so.id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, order_id, product_id, product_name, barcode, unit_price,
                   quantity, discount, subtotal, created_at
            FROM sale_items
            WHERE order_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        Ok(SaleDetail { order, items })
    }

    /// List orders, newest first, with date and status filters
    pub async fn list_sales(
        &self,
        filter: SalesFilter,
        pagination: Pagination,
    ) -> AppResult<PageData<SalesOrder>> {
        let orders = sqlx::query_as::<_, SalesOrder>(
            r#"
            SELECT so.id, so.order_no, so.customer_name, so.customer_phone,
                   so.total_amount, so.payment_method, so.status, so.operator_id,
                   u.real_name AS operator_name, so.remark, so.created_at, so.updated_at
            FROM sales_orders so
            LEFT JOIN users u ON u.id = so.operator_id
            WHERE ($1::date IS NULL OR so.created_at::date >= $1)
              AND ($2::date IS NULL OR so.created_at::date <= $2)
              AND ($3::text IS NULL OR so.status::text = $3)
            ORDER BY so.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(&filter.status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM sales_orders so
            WHERE ($1::date IS NULL OR so.created_at::date >= $1)
              AND ($2::date IS NULL OR so.created_at::date <= $2)
              AND ($3::text IS NULL OR so.status::text = $3)
            "#,
        )
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(&filter.status)
        .fetch_one(&self.db)
        .await?;

        Ok(PageData::new(orders, total, pagination))
    }

    /// Sales statistics over completed orders: summary, top products and a
    /// daily series
    pub async fn statistics(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> AppResult<SalesStatistics> {
        let summary = sqlx::query_as::<_, SalesSummary>(
            r#"
            SELECT COUNT(*) AS order_count,
                   COALESCE(SUM(total_amount), 0) AS total_amount,
                   COALESCE(AVG(total_amount), 0) AS avg_amount
            FROM sales_orders
            WHERE status = 'completed'
              AND ($1::date IS NULL OR created_at::date >= $1)
              AND ($2::date IS NULL OR created_at::date <= $2)
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.db)
        .await?;

        let top_products = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT si.product_id, si.product_name,
                   SUM(si.quantity)::bigint AS total_quantity,
                   COALESCE(SUM(si.subtotal), 0) AS total_sales
            FROM sale_items si
            JOIN sales_orders so ON so.id = si.order_id
            WHERE so.status = 'completed'
              AND ($1::date IS NULL OR so.created_at::date >= $1)
              AND ($2::date IS NULL OR so.created_at::date <= $2)
            GROUP BY si.product_id, si.product_name
            ORDER BY total_sales DESC
            LIMIT 10
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.db)
        .await?;

        let daily_sales = sqlx::query_as::<_, DailySales>(
            r#"
            SELECT created_at::date AS date,
                   COUNT(*) AS order_count,
                   COALESCE(SUM(total_amount), 0) AS total_amount
            FROM sales_orders
            WHERE status = 'completed'
              AND ($1::date IS NULL OR created_at::date >= $1)
              AND ($2::date IS NULL OR created_at::date <= $2)
            GROUP BY created_at::date
            ORDER BY date DESC
            LIMIT 30
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.db)
        .await?;

        Ok(SalesStatistics {
            summary,
            top_products,
            daily_sales,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_subtotal_applies_discount() {
        assert_eq!(compute_subtotal(dec("12.50"), 3, dec("2.50")), dec("35.00"));
        assert_eq!(compute_subtotal(dec("12.50"), 3, Decimal::ZERO), dec("37.50"));
    }

    #[test]
    fn test_order_no_format() {
        let order_no = generate_order_no();
        assert!(order_no.starts_with("SO"));
        // "SO" + 14-digit timestamp + 6-char suffix
        assert_eq!(order_no.len(), 22);
        assert!(order_no[2..16].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_order_no_varies() {
        let a = generate_order_no();
        let b = generate_order_no();
        assert_ne!(a, b);
    }
}
