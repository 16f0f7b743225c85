//! JWT authentication middleware
//!
//! Verifies the bearer token, then confirms the account still exists and is
//! active against the database, so a disabled or deleted user is locked out
//! immediately rather than when the token expires.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{UserRole, UserStatus};
use crate::services::auth::decode_token;
use crate::AppState;

/// The authenticated user, injected as a request extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub real_name: String,
    pub role: UserRole,
}

/// Extractor for handlers that need the authenticated user
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AppError::InvalidToken)
    }
}

fn bearer_token(request: &Request) -> AppResult<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized {
            message: "Missing authentication token".to_string(),
            message_zh: "未提供认证令牌".to_string(),
        })
}

/// Authenticate the request and attach [`AuthUser`] for downstream handlers
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?;
    let claims = decode_token(&state.config.jwt.secret, token)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

    // Live lookup: the token may outlive the account or its active status
    let row = sqlx::query_as::<_, (String, String, UserRole, UserStatus)>(
        "SELECT username, real_name, role, status FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::Unauthorized {
        message: "Account no longer exists".to_string(),
        message_zh: "用户不存在".to_string(),
    })?;

    let (username, real_name, role, status) = row;

    if status != UserStatus::Active {
        return Err(AppError::Forbidden {
            message: "Account is disabled".to_string(),
            message_zh: "账号已被禁用".to_string(),
        });
    }

    request.extensions_mut().insert(AuthUser {
        user_id,
        username,
        real_name,
        role,
    });

    Ok(next.run(request).await)
}
