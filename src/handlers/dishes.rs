use crate::auth::CurrentUser;
use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, RecordId};
use crate::helpers::{contains_pattern, money, validate_positive_price};
use crate::schemas::{AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use common::Envelope;
use model::entities::{dish, order_item};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating a dish
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDishRequest {
    /// Menu section, e.g. "starter", "main", "dessert"
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "type is required"))]
    pub dish_type: String,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[validate(custom(function = "validate_positive_price"))]
    pub price: Decimal,
    pub image_url: Option<String>,
}

/// Fields that may be changed on a dish. Unknown keys are rejected.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateDishRequest {
    #[serde(rename = "type")]
    #[validate(length(min = 1))]
    pub dish_type: Option<String>,
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_positive_price"))]
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
}

/// Dish response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DishResponse {
    pub id: i32,
    #[serde(rename = "type")]
    pub dish_type: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<dish::Model> for DishResponse {
    fn from(model: dish::Model) -> Self {
        Self {
            id: model.id,
            dish_type: model.dish_type,
            name: model.name,
            description: model.description,
            price: money(model.price),
            image_url: model.image_url,
            deleted_at: model.deleted_at,
        }
    }
}

async fn find_dish(db: &DatabaseConnection, dish_id: i32) -> AppResult<dish::Model> {
    dish::Entity::find_by_id(dish_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("Dish with ID {} not found", dish_id);
            AppError::NotFound(format!("Dish with id {} not found", dish_id))
        })
}

/// List the menu (soft-deleted dishes excluded)
#[utoipa::path(
    get,
    path = "/api/v1/admin/dishes",
    tag = "dishes",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dishes found", body = Envelope<Vec<DishResponse>>),
        (status = 404, description = "Menu is empty", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_dishes(
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<Vec<DishResponse>>>> {
    trace!("Entering get_dishes function");

    let dishes = dish::Entity::find()
        .filter(dish::Column::DeletedAt.is_null())
        .order_by_asc(dish::Column::Id)
        .all(&state.db)
        .await?;

    if dishes.is_empty() {
        return Err(AppError::NotFound("No dishes found on the menu".to_string()));
    }

    info!("Successfully retrieved {} dishes", dishes.len());
    Ok(Json(Envelope::many(
        dishes.into_iter().map(DishResponse::from).collect(),
        "Dishes retrieved successfully",
    )))
}

/// Get a dish by ID
#[utoipa::path(
    get,
    path = "/api/v1/dishes/id/{id}",
    tag = "dishes",
    params(("id" = i32, Path, description = "Dish ID")),
    responses(
        (status = 200, description = "Dish found", body = Envelope<DishResponse>),
        (status = 404, description = "Dish not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_dish(
    RecordId(dish_id): RecordId,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<DishResponse>>> {
    let dish_model = find_dish(&state.db, dish_id).await?;
    Ok(Json(Envelope::one(
        DishResponse::from(dish_model),
        "Dish retrieved successfully",
    )))
}

/// Dishes whose type contains the given text, ignoring case
#[utoipa::path(
    get,
    path = "/api/v1/dishes/type/{type}",
    tag = "dishes",
    params(("type" = String, Path, description = "Text to look for in the dish type")),
    responses(
        (status = 200, description = "Dishes found", body = Envelope<Vec<DishResponse>>),
        (status = 404, description = "No dish of that type", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_dishes_by_type(
    Path(dish_type): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<Vec<DishResponse>>>> {
    let pattern = contains_pattern(&dish_type);
    debug!("Searching dishes with type pattern: {}", pattern);

    let dishes = dish::Entity::find()
        .filter(dish::Column::DeletedAt.is_null())
        .filter(
            Expr::expr(Func::lower(Expr::col(dish::Column::DishType)))
                .like(LikeExpr::new(pattern).escape('\\')),
        )
        .order_by_asc(dish::Column::Id)
        .all(&state.db)
        .await?;

    if dishes.is_empty() {
        return Err(AppError::NotFound(format!(
            "No dishes of type {}",
            dish_type
        )));
    }

    Ok(Json(Envelope::many(
        dishes.into_iter().map(DishResponse::from).collect(),
        "Dishes retrieved successfully",
    )))
}

/// Add a dish to the menu
#[utoipa::path(
    post,
    path = "/api/v1/admin/dishes",
    tag = "dishes",
    security(("bearer_auth" = [])),
    request_body = CreateDishRequest,
    responses(
        (status = 200, description = "Dish created", body = Envelope<DishResponse>),
        (status = 400, description = "Missing or invalid field", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_dish(
    current: CurrentUser,
    State(state): State<AppState>,
    request: AppJson<CreateDishRequest>,
) -> AppResult<Json<Envelope<DishResponse>>> {
    let request = request.validated()?;

    let new_dish = dish::ActiveModel {
        dish_type: Set(request.dish_type),
        name: Set(request.name),
        description: Set(request.description),
        price: Set(request.price),
        image_url: Set(request.image_url),
        deleted_at: Set(None),
        ..Default::default()
    };

    let dish_model = new_dish.insert(&state.db).await?;
    info!(
        actor = %current.username,
        "Dish created with ID: {}, name: {}",
        dish_model.id, dish_model.name
    );

    Ok(Json(Envelope::one(
        DishResponse::from(dish_model),
        "Dish created successfully",
    )))
}

/// Partially update a dish
#[utoipa::path(
    patch,
    path = "/api/v1/admin/dishes/{id}",
    tag = "dishes",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Dish ID")),
    request_body = UpdateDishRequest,
    responses(
        (status = 200, description = "Dish updated", body = Envelope<DishResponse>),
        (status = 400, description = "Invalid or unknown field", body = ErrorResponse),
        (status = 404, description = "Dish not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_dish(
    RecordId(dish_id): RecordId,
    current: CurrentUser,
    State(state): State<AppState>,
    request: AppJson<UpdateDishRequest>,
) -> AppResult<Json<Envelope<DishResponse>>> {
    let request = request.validated()?;
    let existing = find_dish(&state.db, dish_id).await?;

    let mut dish_active: dish::ActiveModel = existing.into();
    if let Some(dish_type) = request.dish_type {
        dish_active.dish_type = Set(dish_type);
    }
    if let Some(name) = request.name {
        dish_active.name = Set(name);
    }
    if let Some(description) = request.description {
        dish_active.description = Set(description);
    }
    if let Some(price) = request.price {
        dish_active.price = Set(price);
    }
    if let Some(image_url) = request.image_url {
        dish_active.image_url = Set(Some(image_url));
    }

    let updated = dish_active.update(&state.db).await?;
    info!(actor = %current.username, "Dish with ID {} updated", dish_id);

    Ok(Json(Envelope::one(
        DishResponse::from(updated),
        "Dish updated successfully",
    )))
}

/// Take a dish off the menu without removing it
#[utoipa::path(
    patch,
    path = "/api/v1/admin/dishes/deletedAt/{id}",
    tag = "dishes",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Dish ID")),
    responses(
        (status = 200, description = "Dish soft-deleted", body = Envelope<DishResponse>),
        (status = 404, description = "Dish not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn soft_delete_dish(
    RecordId(dish_id): RecordId,
    current: CurrentUser,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<DishResponse>>> {
    let existing = find_dish(&state.db, dish_id).await?;

    let mut dish_active: dish::ActiveModel = existing.into();
    dish_active.deleted_at = Set(Some(Utc::now()));

    let updated = dish_active.update(&state.db).await?;
    info!(actor = %current.username, "Dish with ID {} soft-deleted", dish_id);

    Ok(Json(Envelope::one(
        DishResponse::from(updated),
        format!("Dish with id {} soft deleted", dish_id),
    )))
}

/// Permanently delete a dish. Fails with 409 while an order references it.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/dishes/{id}",
    tag = "dishes",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Dish ID")),
    responses(
        (status = 200, description = "Dish deleted", body = Envelope<DishResponse>),
        (status = 404, description = "Dish not found", body = ErrorResponse),
        (status = 409, description = "Dish is part of an order", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_dish(
    RecordId(dish_id): RecordId,
    current: CurrentUser,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<DishResponse>>> {
    let existing = find_dish(&state.db, dish_id).await?;

    let references = order_item::Entity::find()
        .filter(order_item::Column::DishId.eq(dish_id))
        .count(&state.db)
        .await?;
    if references > 0 {
        warn!("Dish with ID {} is used by {} order items", dish_id, references);
        return Err(AppError::Conflict(format!(
            "Dish with id {} is part of {} order items; soft delete it instead",
            dish_id, references
        )));
    }

    let result = dish::Entity::delete_by_id(dish_id).exec(&state.db).await?;
    debug!("Delete operation completed. Rows affected: {}", result.rows_affected);
    info!(actor = %current.username, "Dish with ID {} deleted permanently", dish_id);

    Ok(Json(Envelope::one(
        DishResponse::from(existing),
        "Dish deleted successfully",
    )))
}
