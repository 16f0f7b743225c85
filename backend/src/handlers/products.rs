//! Product catalog handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::capability::{self, Capability};
use crate::middleware::CurrentUser;
use crate::models::{ApiResponse, PageData, Pagination};
use crate::services::catalog::{
    Category, CreateProductInput, Product, ProductFilter, UpdateProductInput,
};
use crate::services::ProductService;
use crate::AppState;

/// GET /api/products
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PageData<Product>>>> {
    let page = ProductService::new(state.db.clone())
        .list_products(filter, pagination)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/products/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Category>>>> {
    let categories = ProductService::new(state.db.clone()).list_categories().await?;
    Ok(Json(ApiResponse::ok(categories)))
}

/// GET /api/products/barcode/:barcode
pub async fn get_by_barcode(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = ProductService::new(state.db.clone())
        .find_by_barcode(&barcode)
        .await?;
    Ok(Json(ApiResponse::ok(product)))
}

/// GET /api/products/:id
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = ProductService::new(state.db.clone())
        .get_product(product_id)
        .await?;
    Ok(Json(ApiResponse::ok(product)))
}

/// POST /api/products
pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<ApiResponse<Product>>> {
    capability::require(&user, Capability::ManageProducts)?;
    let product = ProductService::new(state.db.clone())
        .create_product(user.user_id, input)
        .await?;
    Ok(Json(ApiResponse::ok_with_message("商品创建成功", product)))
}

/// PUT /api/products/:id
pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<ApiResponse<Product>>> {
    capability::require(&user, Capability::ManageProducts)?;
    let product = ProductService::new(state.db.clone())
        .update_product(product_id, input)
        .await?;
    Ok(Json(ApiResponse::ok_with_message("商品更新成功", product)))
}

/// DELETE /api/products/:id
pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    capability::require(&user, Capability::DeleteProducts)?;
    ProductService::new(state.db.clone())
        .delete_product(product_id)
        .await?;
    Ok(Json(ApiResponse::message("商品删除成功")))
}
