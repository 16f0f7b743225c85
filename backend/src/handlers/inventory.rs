//! Inventory and stock alert handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::capability::{self, Capability};
use crate::middleware::CurrentUser;
use crate::models::{ApiResponse, PageData, Pagination};
use crate::services::inventory::{
    AdjustInput, AlertFilter, InventoryFilter, InventoryItem, InventoryLogEntry, LogFilter,
    LowStockSweep, StockAlert,
};
use crate::services::stock_ledger::DeltaOutcome;
use crate::services::InventoryService;
use crate::AppState;

/// GET /api/inventory
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(filter): Query<InventoryFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PageData<InventoryItem>>>> {
    let page = InventoryService::new(state.db.clone())
        .list_inventory(filter, pagination)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/inventory/logs
pub async fn list_logs(
    State(state): State<AppState>,
    Query(filter): Query<LogFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PageData<InventoryLogEntry>>>> {
    let page = InventoryService::new(state.db.clone())
        .list_logs(filter, pagination)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// POST /api/inventory/adjust
pub async fn adjust_inventory(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AdjustInput>,
) -> AppResult<Json<ApiResponse<DeltaOutcome>>> {
    capability::require(&user, Capability::AdjustInventory)?;
    let outcome = InventoryService::new(state.db.clone())
        .adjust(user.user_id, input)
        .await?;
    Ok(Json(ApiResponse::ok_with_message("库存调整成功", outcome)))
}

/// GET /api/inventory/alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PageData<StockAlert>>>> {
    let page = InventoryService::new(state.db.clone())
        .list_alerts(filter, pagination)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// PUT /api/inventory/alerts/:id/resolve
pub async fn resolve_alert(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    capability::require(&user, Capability::ManageAlerts)?;
    InventoryService::new(state.db.clone())
        .resolve_alert(alert_id)
        .await?;
    Ok(Json(ApiResponse::message("预警已处理")))
}

/// POST /api/inventory/check-low-stock
pub async fn check_low_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<ApiResponse<LowStockSweep>>> {
    capability::require(&user, Capability::ManageAlerts)?;
    let sweep = InventoryService::new(state.db.clone()).check_low_stock().await?;
    Ok(Json(ApiResponse::ok_with_message("库存检查完成", sweep)))
}
