//! Point-of-sale handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::capability::{self, Capability};
use crate::middleware::CurrentUser;
use crate::models::{ApiResponse, PageData, Pagination};
use crate::services::sales::{
    CreateSaleInput, CreateSaleOutcome, SaleDetail, SalesFilter, SalesOrder, SalesStatistics,
};
use crate::services::SalesService;
use crate::AppState;

/// POST /api/sales
pub async fn create_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<Json<ApiResponse<CreateSaleOutcome>>> {
    let outcome = SalesService::new(state.db.clone())
        .create_sale(user.user_id, input)
        .await?;
    Ok(Json(ApiResponse::ok_with_message("结算成功", outcome)))
}

/// GET /api/sales
pub async fn list_sales(
    State(state): State<AppState>,
    Query(filter): Query<SalesFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PageData<SalesOrder>>>> {
    let page = SalesService::new(state.db.clone())
        .list_sales(filter, pagination)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// GET /api/sales/statistics
pub async fn sales_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> AppResult<Json<ApiResponse<SalesStatistics>>> {
    let stats = SalesService::new(state.db.clone())
        .statistics(query.start_date, query.end_date)
        .await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/sales/:id
pub async fn get_sale(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SaleDetail>>> {
    let detail = SalesService::new(state.db.clone()).get_sale(order_id).await?;
    Ok(Json(ApiResponse::ok(detail)))
}

/// PUT /api/sales/:id/cancel
pub async fn cancel_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    capability::require(&user, Capability::CancelSales)?;
    SalesService::new(state.db.clone())
        .cancel_sale(user.user_id, order_id)
        .await?;
    Ok(Json(ApiResponse::message("订单取消成功")))
}
