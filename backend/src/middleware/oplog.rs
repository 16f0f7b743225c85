//! Operation log middleware
//!
//! Records every authenticated write request (anything but GET) in the
//! `operation_logs` table. Logging failures are reported but never fail the
//! request itself.

use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::Response,
};

use crate::middleware::auth::AuthUser;
use crate::AppState;

/// Record the request in the operation log after the handler has run
pub async fn oplog_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let user = request.extensions().get::<AuthUser>().cloned();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let ip_address = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());

    let response = next.run(request).await;

    if method == Method::GET {
        return response;
    }

    let Some(user) = user else {
        return response;
    };

    let module = path
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or("unknown")
        .to_string();
    let action = format!("{} {}", method, path);
    let description = format!("{} 执行了 {} {}", user.real_name, method, path);
    let status = if response.status().is_success() {
        "success"
    } else {
        "failure"
    };

    let result = sqlx::query(
        r#"
        INSERT INTO operation_logs (
            user_id, username, action, module, description,
            ip_address, user_agent, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(user.user_id)
    .bind(&user.username)
    .bind(&action)
    .bind(&module)
    .bind(&description)
    .bind(&ip_address)
    .bind(&user_agent)
    .bind(status)
    .execute(&state.db)
    .await;

    if let Err(e) = result {
        tracing::warn!("Failed to write operation log for {}: {}", action, e);
    }

    response
}
