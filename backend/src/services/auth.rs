//! Authentication and user administration
//!
//! Passwords are stored as bcrypt hashes and sessions are stateless JWTs.
//! Role rules enforced here: at most one admin account exists, managers
//! never see or touch the admin account, and nobody disables or deletes
//! themselves.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};
use crate::models::{PageData, Pagination, UserRole, UserStatus};
use shared::validation;

/// JWT claims carried in every access token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Issue an access token for a user
pub fn generate_token(
    jwt: &JwtConfig,
    user_id: Uuid,
    username: &str,
    role: UserRole,
) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        role: role.as_str().to_string(),
        iat: now,
        exp: now + jwt.access_token_expiry,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

/// Verify and decode an access token
pub fn decode_token(secret: &str, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Authentication and user administration service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
}

/// A user account as exposed to clients; the password hash never leaves
/// this module
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub real_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct UserAuthRow {
    id: Uuid,
    username: String,
    password_hash: String,
    role: UserRole,
    status: UserStatus,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// Successful login payload
#[derive(Debug, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub username: String,
    pub password: String,
    pub real_name: String,
    pub phone: Option<String>,
    /// Defaults to staff; admin is accepted only while no admin exists
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    pub username: String,
    pub password: String,
    pub real_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    pub real_name: String,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
    /// When present, resets the account password
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    pub keyword: Option<String>,
    pub role: Option<String>,
}

const USER_COLUMNS: &str = r#"
    id, username, real_name, phone, role, status, last_login_at,
    created_at, updated_at
"#;

fn validate_credentials(username: &str, password: &str) -> AppResult<()> {
    validation::validate_username(username).map_err(|e| AppError::Validation {
        field: "username".to_string(),
        message: e.to_string(),
        message_zh: "用户名格式无效".to_string(),
    })?;
    validation::validate_password(password).map_err(|e| AppError::Validation {
        field: "password".to_string(),
        message: e.to_string(),
        message_zh: "密码长度至少为6位".to_string(),
    })?;
    Ok(())
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn admin_exists(&self) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')",
        )
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }

    async fn username_taken(&self, username: &str) -> AppResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(&self.db)
        .await?;
        Ok(taken)
    }

    async fn fetch_user(&self, user_id: Uuid) -> AppResult<UserInfo> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserInfo>(&query)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    /// Verify credentials and issue a token
    pub async fn login(&self, jwt: &JwtConfig, input: LoginInput) -> AppResult<LoginOutcome> {
        let row = sqlx::query_as::<_, UserAuthRow>(
            "SELECT id, username, password_hash, role, status FROM users WHERE username = $1",
        )
        .bind(&input.username)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let valid = bcrypt::verify(&input.password, &row.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        if row.status != UserStatus::Active {
            return Err(AppError::Forbidden {
                message: "Account is disabled".to_string(),
                message_zh: "账号已被禁用".to_string(),
            });
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(row.id)
            .execute(&self.db)
            .await?;

        let token = generate_token(jwt, row.id, &row.username, row.role)?;
        let user = self.fetch_user(row.id).await?;

        Ok(LoginOutcome { token, user })
    }

    /// Self-service registration
    ///
    /// The requested role is honored for staff and manager; an admin
    /// registration succeeds only while no admin account exists yet.
    pub async fn register(&self, input: RegisterInput) -> AppResult<UserInfo> {
        validate_credentials(&input.username, &input.password)?;

        if self.username_taken(&input.username).await? {
            return Err(AppError::DuplicateEntry {
                field: "username".to_string(),
                message: "Username already exists".to_string(),
                message_zh: "用户名已存在".to_string(),
            });
        }

        let role = input.role.unwrap_or(UserRole::Staff);
        if role == UserRole::Admin && self.admin_exists().await? {
            return Err(AppError::Conflict {
                resource: "role".to_string(),
                message: "An admin account already exists".to_string(),
                message_zh: "管理员账号已存在".to_string(),
            });
        }

        self.insert_user(&input.username, &input.password, &input.real_name, input.phone.as_deref(), role)
            .await
    }

    async fn insert_user(
        &self,
        username: &str,
        password: &str,
        real_name: &str,
        phone: Option<&str>,
        role: UserRole,
    ) -> AppResult<UserInfo> {
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let query = format!(
            r#"
            INSERT INTO users (username, password_hash, real_name, phone, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, UserInfo>(&query)
            .bind(username)
            .bind(&password_hash)
            .bind(real_name)
            .bind(phone)
            .bind(role)
            .fetch_one(&self.db)
            .await
            .map_err(|e| match &e {
                // Single-admin partial unique index; lost race with a
                // concurrent admin registration
                sqlx::Error::Database(db) if db.constraint() == Some("uq_users_single_admin") => {
                    AppError::Conflict {
                        resource: "role".to_string(),
                        message: "An admin account already exists".to_string(),
                        message_zh: "管理员账号已存在".to_string(),
                    }
                }
                sqlx::Error::Database(db) if db.constraint() == Some("users_username_key") => {
                    AppError::DuplicateEntry {
                        field: "username".to_string(),
                        message: "Username already exists".to_string(),
                        message_zh: "用户名已存在".to_string(),
                    }
                }
                _ => e.into(),
            })?;

        Ok(user)
    }

    /// Change the caller's own password
    pub async fn change_password(
        &self,
        user_id: Uuid,
        input: ChangePasswordInput,
    ) -> AppResult<()> {
        validation::validate_password(&input.new_password).map_err(|e| AppError::Validation {
            field: "newPassword".to_string(),
            message: e.to_string(),
            message_zh: "新密码长度至少为6位".to_string(),
        })?;

        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let valid = bcrypt::verify(&input.old_password, &hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::Validation {
                field: "oldPassword".to_string(),
                message: "Old password is incorrect".to_string(),
                message_zh: "原密码错误".to_string(),
            });
        }

        let new_hash = bcrypt::hash(&input.new_password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&new_hash)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// The caller's own profile
    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<UserInfo> {
        self.fetch_user(user_id).await
    }

    /// List user accounts
    ///
    /// Managers never see the admin account.
    pub async fn list_users(
        &self,
        requester_role: UserRole,
        filter: UserFilter,
        pagination: Pagination,
    ) -> AppResult<PageData<UserInfo>> {
        let hide_admin = requester_role != UserRole::Admin;

        let query = format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::text IS NULL OR username ILIKE '%' || $1 || '%' OR real_name ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR role::text = $2)
              AND (NOT $3 OR role <> 'admin')
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        );

        let users = sqlx::query_as::<_, UserInfo>(&query)
            .bind(&filter.keyword)
            .bind(&filter.role)
            .bind(hide_admin)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.db)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL OR username ILIKE '%' || $1 || '%' OR real_name ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR role::text = $2)
              AND (NOT $3 OR role <> 'admin')
            "#,
        )
        .bind(&filter.keyword)
        .bind(&filter.role)
        .bind(hide_admin)
        .fetch_one(&self.db)
        .await?;

        Ok(PageData::new(users, total, pagination))
    }

    /// Create a user account on someone's behalf
    pub async fn create_user(
        &self,
        requester_role: UserRole,
        input: CreateUserInput,
    ) -> AppResult<UserInfo> {
        validate_credentials(&input.username, &input.password)?;

        if input.role == UserRole::Admin {
            if requester_role != UserRole::Admin {
                return Err(AppError::Forbidden {
                    message: "Only the admin can create admin accounts".to_string(),
                    message_zh: "无权创建管理员账号".to_string(),
                });
            }
            if self.admin_exists().await? {
                return Err(AppError::Conflict {
                    resource: "role".to_string(),
                    message: "An admin account already exists".to_string(),
                    message_zh: "管理员账号已存在".to_string(),
                });
            }
        }

        if self.username_taken(&input.username).await? {
            return Err(AppError::DuplicateEntry {
                field: "username".to_string(),
                message: "Username already exists".to_string(),
                message_zh: "用户名已存在".to_string(),
            });
        }

        self.insert_user(&input.username, &input.password, &input.real_name, input.phone.as_deref(), input.role)
            .await
    }

    /// Update a user's profile and, optionally, role
    pub async fn update_user(
        &self,
        requester_role: UserRole,
        user_id: Uuid,
        input: UpdateUserInput,
    ) -> AppResult<UserInfo> {
        let target = self.fetch_user(user_id).await?;

        if target.role == UserRole::Admin && requester_role != UserRole::Admin {
            return Err(AppError::Forbidden {
                message: "Only the admin can modify the admin account".to_string(),
                message_zh: "无权修改管理员账号".to_string(),
            });
        }

        if let Some(new_role) = input.role {
            if new_role == UserRole::Admin && target.role != UserRole::Admin {
                if requester_role != UserRole::Admin {
                    return Err(AppError::Forbidden {
                        message: "Only the admin can grant the admin role".to_string(),
                        message_zh: "无权授予管理员角色".to_string(),
                    });
                }
                if self.admin_exists().await? {
                    return Err(AppError::Conflict {
                        resource: "role".to_string(),
                        message: "An admin account already exists".to_string(),
                        message_zh: "管理员账号已存在".to_string(),
                    });
                }
            }
        }

        let role = input.role.unwrap_or(target.role);

        sqlx::query(
            "UPDATE users SET real_name = $1, phone = $2, role = $3, updated_at = NOW() WHERE id = $4",
        )
        .bind(&input.real_name)
        .bind(&input.phone)
        .bind(role)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if let Some(password) = &input.password {
            validation::validate_password(password).map_err(|e| AppError::Validation {
                field: "password".to_string(),
                message: e.to_string(),
                message_zh: "密码长度至少为6位".to_string(),
            })?;
            let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
                .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
            sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
                .bind(&password_hash)
                .bind(user_id)
                .execute(&self.db)
                .await?;
        }

        self.fetch_user(user_id).await
    }

    /// Enable or disable an account
    pub async fn update_status(
        &self,
        requester_id: Uuid,
        requester_role: UserRole,
        user_id: Uuid,
        status: UserStatus,
    ) -> AppResult<UserInfo> {
        if requester_id == user_id && status == UserStatus::Inactive {
            return Err(AppError::Validation {
                field: "status".to_string(),
                message: "You cannot disable your own account".to_string(),
                message_zh: "不能禁用自己的账号".to_string(),
            });
        }

        let target = self.fetch_user(user_id).await?;
        if target.role == UserRole::Admin && requester_role != UserRole::Admin {
            return Err(AppError::Forbidden {
                message: "Only the admin can modify the admin account".to_string(),
                message_zh: "无权修改管理员账号".to_string(),
            });
        }

        sqlx::query("UPDATE users SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        self.fetch_user(user_id).await
    }

    /// Delete an account
    pub async fn delete_user(
        &self,
        requester_id: Uuid,
        requester_role: UserRole,
        user_id: Uuid,
    ) -> AppResult<()> {
        if requester_id == user_id {
            return Err(AppError::Validation {
                field: "id".to_string(),
                message: "You cannot delete your own account".to_string(),
                message_zh: "不能删除自己的账号".to_string(),
            });
        }

        let target = self.fetch_user(user_id).await?;
        if target.role == UserRole::Admin && requester_role != UserRole::Admin {
            return Err(AppError::Forbidden {
                message: "Only the admin can delete the admin account".to_string(),
                message_zh: "无权删除管理员账号".to_string(),
            });
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-for-unit-tests".to_string(),
            access_token_expiry: 3600,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let jwt = test_jwt_config();
        let user_id = Uuid::new_v4();

        let token = generate_token(&jwt, user_id, "zhang_wei", UserRole::Manager).unwrap();
        let claims = decode_token(&jwt.secret, &token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.username, "zhang_wei");
        assert_eq!(claims.role, "manager");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_rejects_wrong_secret() {
        let jwt = test_jwt_config();
        let token = generate_token(&jwt, Uuid::new_v4(), "admin", UserRole::Admin).unwrap();

        let result = decode_token("a-different-secret", &token);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_token_rejects_garbage() {
        let result = decode_token("secret", "not.a.token");
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }
}
