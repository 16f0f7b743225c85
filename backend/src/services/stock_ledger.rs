//! Stock ledger: the single write path for product stock quantities
//!
//! Every mutation of `products.stock_quantity` goes through [`apply_delta`],
//! which pairs the quantity change with exactly one append-only
//! `inventory_logs` row. The product row is locked (`FOR UPDATE`) for the
//! whole read-check-write span, so concurrent transactions cannot oversell.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::ChangeType;

/// One requested stock mutation
#[derive(Debug)]
pub struct DeltaInput<'a> {
    pub product_id: Uuid,
    /// Signed change; negative values remove stock
    pub delta: i32,
    pub change_type: ChangeType,
    pub reason: &'a str,
    pub operator_id: Uuid,
    /// Originating sales order, when applicable
    pub reference_id: Option<Uuid>,
}

/// Before/after snapshot of the applied mutation
#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaOutcome {
    pub before_quantity: i32,
    pub after_quantity: i32,
}

/// Quantity that would result from applying `delta`, or `None` if the
/// result would be negative (or overflow)
pub fn next_quantity(current: i32, delta: i32) -> Option<i32> {
    current.checked_add(delta).filter(|q| *q >= 0)
}

/// Apply a signed stock delta to a product inside the caller's transaction
///
/// Fails with `InsufficientStock` (and writes nothing) when the delta would
/// drive the quantity negative. On success the product quantity is updated
/// and one inventory log entry is appended; committing or rolling back is
/// the caller's responsibility.
pub async fn apply_delta(
    tx: &mut Transaction<'_, Postgres>,
    input: DeltaInput<'_>,
) -> AppResult<DeltaOutcome> {
    // Lock the product row for the whole read-check-write span
    let row = sqlx::query_as::<_, (String, i32)>(
        "SELECT name, stock_quantity FROM products WHERE id = $1 FOR UPDATE",
    )
    .bind(input.product_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let (name, before_quantity) = row;

    let after_quantity = next_quantity(before_quantity, input.delta).ok_or_else(|| {
        AppError::InsufficientStock {
            message: format!(
                "Insufficient stock for {}: current {}, requested change {}",
                name, before_quantity, input.delta
            ),
            message_zh: format!("商品 {} 库存不足，当前库存: {}", name, before_quantity),
        }
    })?;

    sqlx::query("UPDATE products SET stock_quantity = $1, updated_at = NOW() WHERE id = $2")
        .bind(after_quantity)
        .bind(input.product_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO inventory_logs (
            product_id, change_type, quantity, before_quantity, after_quantity,
            reason, operator_id, reference_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(input.product_id)
    .bind(input.change_type)
    .bind(input.delta)
    .bind(before_quantity)
    .bind(after_quantity)
    .bind(input.reason)
    .bind(input.operator_id)
    .bind(input.reference_id)
    .execute(&mut **tx)
    .await?;

    Ok(DeltaOutcome {
        before_quantity,
        after_quantity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_quantity_adds_and_subtracts() {
        assert_eq!(next_quantity(10, 5), Some(15));
        assert_eq!(next_quantity(10, -5), Some(5));
        assert_eq!(next_quantity(10, -10), Some(0));
    }

    #[test]
    fn test_next_quantity_rejects_negative_result() {
        assert_eq!(next_quantity(10, -11), None);
        assert_eq!(next_quantity(0, -1), None);
    }

    #[test]
    fn test_next_quantity_rejects_overflow() {
        assert_eq!(next_quantity(i32::MAX, 1), None);
    }
}
