use crate::auth::CurrentUser;
use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, RecordId};
use crate::schemas::{AppState, ErrorResponse};
use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use common::{credentials, Envelope};
use model::entities::user;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Registration payload
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    /// Must be unique
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    /// Plaintext, hashed before it is stored
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[validate(length(min = 1, message = "street is required"))]
    pub street: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    /// Postal code
    #[validate(length(min = 1, message = "cp is required"))]
    pub cp: String,
}

/// Login payload
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub name: String,
    pub username: String,
    pub is_admin: bool,
    /// Bearer token for the `Authorization` header
    pub token: String,
}

/// Fields an administrator may change. Unknown keys are rejected.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub username: Option<String>,
    /// New plaintext password, re-hashed before it is stored
    #[validate(length(min = 1))]
    pub password: Option<String>,
    #[validate(length(min = 1))]
    pub street: Option<String>,
    #[validate(length(min = 1))]
    pub city: Option<String>,
    #[validate(length(min = 1))]
    pub cp: Option<String>,
    pub is_admin: Option<bool>,
}

/// User as returned by the API. The password hash is never included.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub username: String,
    pub street: String,
    pub city: String,
    pub cp: String,
    pub is_admin: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            username: model.username,
            street: model.street,
            city: model.city,
            cp: model.cp,
            is_admin: model.is_admin,
            deleted_at: model.deleted_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

async fn find_user(db: &DatabaseConnection, user_id: i32) -> AppResult<user::Model> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("User with ID {} not found", user_id);
            AppError::NotFound(format!("User with id {} not found", user_id))
        })
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/register",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = Envelope<UserResponse>),
        (status = 400, description = "Missing or invalid field", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    request: AppJson<RegisterRequest>,
) -> AppResult<Json<Envelope<UserResponse>>> {
    let request = request.validated()?;
    debug!("Registering user with username: {}", request.username);

    let password_hash = credentials::hash_password(&request.password)?;
    let now = Utc::now();
    let new_user = user::ActiveModel {
        name: Set(request.name),
        username: Set(request.username),
        password_hash: Set(password_hash),
        street: Set(request.street),
        city: Set(request.city),
        cp: Set(request.cp),
        is_admin: Set(false),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let user_model = new_user.insert(&state.db).await?;
    info!(
        "User registered with ID: {}, username: {}",
        user_model.id, user_model.username
    );

    Ok(Json(Envelope::one(
        UserResponse::from(user_model),
        "User registered successfully",
    )))
}

/// Exchange username and password for a bearer token
#[utoipa::path(
    post,
    path = "/api/v1/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = Envelope<LoginResponse>),
        (status = 401, description = "Wrong password", body = ErrorResponse),
        (status = 404, description = "Unknown username", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    request: AppJson<LoginRequest>,
) -> AppResult<Json<Envelope<LoginResponse>>> {
    let request = request.validated()?;
    trace!("Login attempt for username: {}", request.username);

    let user_model = user::Entity::find()
        .filter(user::Column::Username.eq(request.username.as_str()))
        .filter(user::Column::DeletedAt.is_null())
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            warn!("Login for unknown username: {}", request.username);
            AppError::NotFound("User not found".to_string())
        })?;

    if !credentials::verify_password(&request.password, &user_model.password_hash)? {
        warn!("Wrong password for username: {}", user_model.username);
        return Err(AppError::Unauthorized("Incorrect password".to_string()));
    }

    let token = state
        .tokens
        .issue(user_model.id, &user_model.username, user_model.is_admin)?;
    info!("User {} logged in", user_model.username);

    Ok(Json(Envelope::one(
        LoginResponse {
            name: user_model.name,
            username: user_model.username,
            is_admin: user_model.is_admin,
            token,
        },
        "Login successful",
    )))
}

/// List users that have not been soft-deleted
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Users found", body = Envelope<Vec<UserResponse>>),
        (status = 401, description = "Missing token", body = ErrorResponse),
        (status = 403, description = "Invalid or expired token", body = ErrorResponse),
        (status = 404, description = "No users", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_users(
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<Vec<UserResponse>>>> {
    trace!("Entering get_users function");

    let users = user::Entity::find()
        .filter(user::Column::DeletedAt.is_null())
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?;

    if users.is_empty() {
        return Err(AppError::NotFound("No users found".to_string()));
    }

    info!("Successfully retrieved {} users", users.len());
    Ok(Json(Envelope::many(
        users.into_iter().map(UserResponse::from).collect(),
        "Users retrieved successfully",
    )))
}

/// Get a user by ID, soft-deleted or not
#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = Envelope<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_user(
    RecordId(user_id): RecordId,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<UserResponse>>> {
    let user_model = find_user(&state.db, user_id).await?;
    Ok(Json(Envelope::one(
        UserResponse::from(user_model),
        "User retrieved successfully",
    )))
}

/// Partially update a user
#[utoipa::path(
    patch,
    path = "/api/v1/admin/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = Envelope<UserResponse>),
        (status = 400, description = "Invalid or unknown field", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn update_user(
    RecordId(user_id): RecordId,
    current: CurrentUser,
    State(state): State<AppState>,
    request: AppJson<UpdateUserRequest>,
) -> AppResult<Json<Envelope<UserResponse>>> {
    let request = request.validated()?;
    let existing = find_user(&state.db, user_id).await?;

    let mut user_active: user::ActiveModel = existing.into();
    let mut updated_fields = Vec::new();

    if let Some(name) = request.name {
        user_active.name = Set(name);
        updated_fields.push("name");
    }
    if let Some(username) = request.username {
        user_active.username = Set(username);
        updated_fields.push("username");
    }
    if let Some(password) = request.password {
        user_active.password_hash = Set(credentials::hash_password(&password)?);
        updated_fields.push("password");
    }
    if let Some(street) = request.street {
        user_active.street = Set(street);
        updated_fields.push("street");
    }
    if let Some(city) = request.city {
        user_active.city = Set(city);
        updated_fields.push("city");
    }
    if let Some(cp) = request.cp {
        user_active.cp = Set(cp);
        updated_fields.push("cp");
    }
    if let Some(is_admin) = request.is_admin {
        user_active.is_admin = Set(is_admin);
        updated_fields.push("isAdmin");
    }
    user_active.updated_at = Set(Utc::now());

    let updated = user_active.update(&state.db).await?;
    info!(
        actor = %current.username,
        "User with ID {} updated. Updated fields: {}",
        user_id,
        if updated_fields.is_empty() { "none".to_string() } else { updated_fields.join(", ") }
    );

    Ok(Json(Envelope::one(
        UserResponse::from(updated),
        "User updated successfully",
    )))
}

/// Soft-delete a user by stamping `deletedAt`
#[utoipa::path(
    patch,
    path = "/api/v1/admin/users/deletedAt/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User soft-deleted", body = Envelope<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn soft_delete_user(
    RecordId(user_id): RecordId,
    current: CurrentUser,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<UserResponse>>> {
    let existing = find_user(&state.db, user_id).await?;

    let now = Utc::now();
    let mut user_active: user::ActiveModel = existing.into();
    user_active.deleted_at = Set(Some(now));
    user_active.updated_at = Set(now);

    let updated = user_active.update(&state.db).await?;
    info!(actor = %current.username, "User with ID {} soft-deleted", user_id);

    Ok(Json(Envelope::one(
        UserResponse::from(updated),
        format!("User with id {} soft deleted", user_id),
    )))
}

/// Permanently delete a user (and, by cascade, their orders)
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = Envelope<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_user(
    RecordId(user_id): RecordId,
    current: CurrentUser,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<UserResponse>>> {
    let existing = find_user(&state.db, user_id).await?;

    let result = user::Entity::delete_by_id(user_id).exec(&state.db).await?;
    debug!("Delete operation completed. Rows affected: {}", result.rows_affected);
    info!(actor = %current.username, "User with ID {} deleted permanently", user_id);

    Ok(Json(Envelope::one(
        UserResponse::from(existing),
        "User deleted successfully",
    )))
}
