//! Authentication and user administration handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::capability::{self, Capability};
use crate::middleware::CurrentUser;
use crate::models::{ApiResponse, PageData, Pagination, UserStatus};
use crate::services::auth::{
    ChangePasswordInput, CreateUserInput, LoginInput, LoginOutcome, RegisterInput,
    UpdateUserInput, UserFilter, UserInfo,
};
use crate::services::AuthService;
use crate::AppState;

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<ApiResponse<LoginOutcome>>> {
    let outcome = AuthService::new(state.db.clone())
        .login(&state.config.jwt, input)
        .await?;
    Ok(Json(ApiResponse::ok_with_message("登录成功", outcome)))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    let user = AuthService::new(state.db.clone()).register(input).await?;
    Ok(Json(ApiResponse::ok_with_message("注册成功", user)))
}

/// GET /api/auth/profile
pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    let info = AuthService::new(state.db.clone())
        .get_profile(user.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(info)))
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ChangePasswordInput>,
) -> AppResult<Json<ApiResponse<()>>> {
    AuthService::new(state.db.clone())
        .change_password(user.user_id, input)
        .await?;
    Ok(Json(ApiResponse::message("密码修改成功")))
}

/// GET /api/auth/users
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<UserFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PageData<UserInfo>>>> {
    capability::require(&user, Capability::ManageUsers)?;
    let page = AuthService::new(state.db.clone())
        .list_users(user.role, filter, pagination)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// POST /api/auth/users
pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    capability::require(&user, Capability::ManageUsers)?;
    let created = AuthService::new(state.db.clone())
        .create_user(user.role, input)
        .await?;
    Ok(Json(ApiResponse::ok_with_message("用户创建成功", created)))
}

/// PUT /api/auth/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    capability::require(&user, Capability::ManageUsers)?;
    let updated = AuthService::new(state.db.clone())
        .update_user(user.role, user_id, input)
        .await?;
    Ok(Json(ApiResponse::ok_with_message("用户更新成功", updated)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: UserStatus,
}

/// PUT /api/auth/users/:id/status
pub async fn update_user_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateStatusBody>,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    capability::require(&user, Capability::ManageUsers)?;
    let updated = AuthService::new(state.db.clone())
        .update_status(user.user_id, user.role, user_id, body.status)
        .await?;
    Ok(Json(ApiResponse::ok_with_message("用户状态更新成功", updated)))
}

/// DELETE /api/auth/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    capability::require(&user, Capability::ManageUsers)?;
    AuthService::new(state.db.clone())
        .delete_user(user.user_id, user.role, user_id)
        .await?;
    Ok(Json(ApiResponse::message("用户删除成功")))
}
