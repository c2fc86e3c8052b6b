use crate::auth::CurrentUser;
use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, RecordId};
use crate::helpers::{money, validate_non_negative_total, MAX_MONEY};
use crate::schemas::{AppState, ErrorResponse};
use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use common::Envelope;
use model::entities::order::OrderStatus;
use model::entities::{dish, order, order_item, user};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Order status as exchanged over the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusDto {
    Pending,
    Confirmed,
    Preparing,
    Delivered,
    Cancelled,
}

impl From<OrderStatus> for OrderStatusDto {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending => Self::Pending,
            OrderStatus::Confirmed => Self::Confirmed,
            OrderStatus::Preparing => Self::Preparing,
            OrderStatus::Delivered => Self::Delivered,
            OrderStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<OrderStatusDto> for OrderStatus {
    fn from(status: OrderStatusDto) -> Self {
        match status {
            OrderStatusDto::Pending => Self::Pending,
            OrderStatusDto::Confirmed => Self::Confirmed,
            OrderStatusDto::Preparing => Self::Preparing,
            OrderStatusDto::Delivered => Self::Delivered,
            OrderStatusDto::Cancelled => Self::Cancelled,
        }
    }
}

/// One line of an order request
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub dish_id: i32,
    #[validate(range(min = 1, max = 1000, message = "quantity must be between 1 and 1000"))]
    pub quantity: i32,
}

/// Request body for placing an order
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: i32,
    #[validate(length(min = 1, message = "an order needs at least one item"), nested)]
    pub items: Vec<OrderItemRequest>,
    /// Computed from the dish prices when omitted
    #[validate(custom(function = "validate_non_negative_total"))]
    pub total_price: Option<Decimal>,
}

/// Fields that may be changed on an order. Unknown keys are rejected.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateOrderRequest {
    /// Replaces every line item of the order
    #[validate(length(min = 1, message = "an order needs at least one item"), nested)]
    pub items: Option<Vec<OrderItemRequest>>,
    #[validate(custom(function = "validate_non_negative_total"))]
    pub total_price: Option<Decimal>,
    #[serde(alias = "orderStatus")]
    pub status: Option<OrderStatusDto>,
}

/// Owner of an order, as embedded in order reads
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderUser {
    pub id: i32,
    pub name: String,
    pub username: String,
}

/// Dish summary embedded in a line item
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderDish {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub dish_id: i32,
    pub quantity: i32,
    pub dish: Option<OrderDish>,
}

/// Order with its owner and dishes resolved
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: i32,
    pub user_id: i32,
    pub user: Option<OrderUser>,
    pub items: Vec<OrderItemResponse>,
    pub total_price: Decimal,
    pub status: OrderStatusDto,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resolve owners and line items for a batch of orders, keeping their order.
async fn load_orders<C: ConnectionTrait>(
    db: &C,
    orders: Vec<order::Model>,
) -> AppResult<Vec<OrderResponse>> {
    let user_ids: BTreeSet<i32> = orders.iter().map(|o| o.user_id).collect();
    let order_ids: Vec<i32> = orders.iter().map(|o| o.id).collect();

    let users: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut items_by_order: HashMap<i32, Vec<OrderItemResponse>> = HashMap::new();
    let rows = order_item::Entity::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_item::Column::Id)
        .find_also_related(dish::Entity)
        .all(db)
        .await?;
    for (item, dish_model) in rows {
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItemResponse {
                dish_id: item.dish_id,
                quantity: item.quantity,
                dish: dish_model.map(|d| OrderDish {
                    id: d.id,
                    name: d.name,
                    price: money(d.price),
                }),
            });
    }

    Ok(orders
        .into_iter()
        .map(|o| OrderResponse {
            id: o.id,
            user_id: o.user_id,
            user: users.get(&o.user_id).map(|u| OrderUser {
                id: u.id,
                name: u.name.clone(),
                username: u.username.clone(),
            }),
            items: items_by_order.remove(&o.id).unwrap_or_default(),
            total_price: money(o.total_price),
            status: o.status.into(),
            created_at: o.created_at,
            updated_at: o.updated_at,
        })
        .collect())
}

async fn load_order<C: ConnectionTrait>(db: &C, order_model: order::Model) -> AppResult<OrderResponse> {
    load_orders(db, vec![order_model])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Order vanished while loading".to_string()))
}

async fn find_order<C: ConnectionTrait>(db: &C, order_id: i32) -> AppResult<order::Model> {
    order::Entity::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("Order with ID {} not found", order_id);
            AppError::NotFound(format!("Order with id {} not found", order_id))
        })
}

/// Look up every dish referenced by `items`. Unknown dishes are 404, dishes
/// taken off the menu are a validation error.
async fn resolve_dishes<C: ConnectionTrait>(
    db: &C,
    items: &[OrderItemRequest],
) -> AppResult<HashMap<i32, dish::Model>> {
    let dish_ids: BTreeSet<i32> = items.iter().map(|i| i.dish_id).collect();
    let dishes: HashMap<i32, dish::Model> = dish::Entity::find()
        .filter(dish::Column::Id.is_in(dish_ids.iter().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();

    for dish_id in &dish_ids {
        match dishes.get(dish_id) {
            None => {
                return Err(AppError::NotFound(format!(
                    "Dish with id {} not found",
                    dish_id
                )));
            }
            Some(d) if d.deleted_at.is_some() => {
                return Err(AppError::Validation(format!(
                    "Dish with id {} is no longer on the menu",
                    dish_id
                )));
            }
            Some(_) => {}
        }
    }

    Ok(dishes)
}

/// Sum of dish price times quantity. A total that does not fit a money
/// column is a validation error.
fn compute_total(
    items: &[OrderItemRequest],
    dishes: &HashMap<i32, dish::Model>,
) -> AppResult<Decimal> {
    let too_large =
        || AppError::Validation(format!("Order total cannot exceed {}", MAX_MONEY));

    let mut total = Decimal::ZERO;
    for item in items {
        let Some(d) = dishes.get(&item.dish_id) else {
            continue;
        };
        let line = d
            .price
            .checked_mul(Decimal::from(item.quantity))
            .ok_or_else(too_large)?;
        total = total.checked_add(line).ok_or_else(too_large)?;
    }

    if total > MAX_MONEY {
        return Err(too_large());
    }
    Ok(total)
}

async fn insert_items<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
    items: &[OrderItemRequest],
) -> AppResult<()> {
    let models = items.iter().map(|item| order_item::ActiveModel {
        order_id: Set(order_id),
        dish_id: Set(item.dish_id),
        quantity: Set(item.quantity),
        ..Default::default()
    });
    order_item::Entity::insert_many(models).exec(db).await?;
    Ok(())
}

/// List every order
#[utoipa::path(
    get,
    path = "/api/v1/orders/all",
    tag = "orders",
    responses(
        (status = 200, description = "Orders found", body = Envelope<Vec<OrderResponse>>),
        (status = 404, description = "No orders", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_orders(
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<Vec<OrderResponse>>>> {
    trace!("Entering get_orders function");

    let orders = order::Entity::find()
        .order_by_asc(order::Column::Id)
        .all(&state.db)
        .await?;

    if orders.is_empty() {
        return Err(AppError::NotFound("No orders found".to_string()));
    }

    let responses = load_orders(&state.db, orders).await?;
    info!("Successfully retrieved {} orders", responses.len());
    Ok(Json(Envelope::many(responses, "Orders retrieved successfully")))
}

/// Get an order by ID
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    tag = "orders",
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order found", body = Envelope<OrderResponse>),
        (status = 404, description = "Order not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_order(
    RecordId(order_id): RecordId,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<OrderResponse>>> {
    let order_model = find_order(&state.db, order_id).await?;
    let response = load_order(&state.db, order_model).await?;
    Ok(Json(Envelope::one(response, "Order retrieved successfully")))
}

/// Orders placed by one user
#[utoipa::path(
    get,
    path = "/api/v1/orders/user/{user_id}",
    tag = "orders",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Orders found", body = Envelope<Vec<OrderResponse>>),
        (status = 404, description = "User has no orders", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_orders_by_user(
    RecordId(user_id): RecordId,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<Vec<OrderResponse>>>> {
    let orders = order::Entity::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_asc(order::Column::Id)
        .all(&state.db)
        .await?;

    if orders.is_empty() {
        return Err(AppError::NotFound(format!(
            "No orders found for user {}",
            user_id
        )));
    }

    let responses = load_orders(&state.db, orders).await?;
    debug!("User {} has {} orders", user_id, responses.len());
    Ok(Json(Envelope::many(responses, "Orders retrieved successfully")))
}

/// Place an order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = Envelope<OrderResponse>),
        (status = 400, description = "Missing or invalid field", body = ErrorResponse),
        (status = 404, description = "User or dish not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn create_order(
    State(state): State<AppState>,
    request: AppJson<CreateOrderRequest>,
) -> AppResult<Json<Envelope<OrderResponse>>> {
    let request = request.validated()?;
    debug!(
        "Creating order for user {} with {} items",
        request.user_id,
        request.items.len()
    );

    let txn = state.db.begin().await?;

    if user::Entity::find_by_id(request.user_id)
        .one(&txn)
        .await?
        .is_none()
    {
        warn!("Order for unknown user {}", request.user_id);
        return Err(AppError::NotFound(format!(
            "User with id {} not found",
            request.user_id
        )));
    }

    let dishes = resolve_dishes(&txn, &request.items).await?;
    let total_price = match request.total_price {
        Some(total_price) => total_price,
        None => compute_total(&request.items, &dishes)?,
    };

    let now = Utc::now();
    let new_order = order::ActiveModel {
        user_id: Set(request.user_id),
        total_price: Set(total_price),
        status: Set(OrderStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let order_model = new_order.insert(&txn).await?;
    insert_items(&txn, order_model.id, &request.items).await?;

    let response = load_order(&txn, order_model).await?;
    txn.commit().await?;

    info!(
        "Order created with ID: {}, total: {}",
        response.id, response.total_price
    );
    Ok(Json(Envelope::one(response, "Order created successfully")))
}

/// Replace items, total or status of an order
#[utoipa::path(
    patch,
    path = "/api/v1/orders/{id}",
    tag = "orders",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Order ID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = Envelope<OrderResponse>),
        (status = 400, description = "Invalid or unknown field", body = ErrorResponse),
        (status = 404, description = "Order or dish not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn update_order(
    RecordId(order_id): RecordId,
    current: CurrentUser,
    State(state): State<AppState>,
    request: AppJson<UpdateOrderRequest>,
) -> AppResult<Json<Envelope<OrderResponse>>> {
    let request = request.validated()?;

    let txn = state.db.begin().await?;
    let existing = find_order(&txn, order_id).await?;
    let mut order_active: order::ActiveModel = existing.into();

    if let Some(items) = &request.items {
        let dishes = resolve_dishes(&txn, items).await?;
        let removed = order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        debug!(
            "Replacing {} items of order {}",
            removed.rows_affected, order_id
        );
        insert_items(&txn, order_id, items).await?;

        if request.total_price.is_none() {
            order_active.total_price = Set(compute_total(items, &dishes)?);
        }
    }
    if let Some(total_price) = request.total_price {
        order_active.total_price = Set(total_price);
    }
    if let Some(status) = request.status {
        order_active.status = Set(status.into());
    }
    order_active.updated_at = Set(Utc::now());

    let updated = order_active.update(&txn).await?;
    let response = load_order(&txn, updated).await?;
    txn.commit().await?;

    info!(actor = %current.username, "Order with ID {} updated", order_id);
    Ok(Json(Envelope::one(response, "Order updated successfully")))
}

/// Permanently delete an order and its line items
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    tag = "orders",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order deleted", body = Envelope<OrderResponse>),
        (status = 404, description = "Order not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_order(
    RecordId(order_id): RecordId,
    current: CurrentUser,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<OrderResponse>>> {
    let txn = state.db.begin().await?;
    let existing = find_order(&txn, order_id).await?;
    let response = load_order(&txn, existing).await?;

    order_item::Entity::delete_many()
        .filter(order_item::Column::OrderId.eq(order_id))
        .exec(&txn)
        .await?;
    order::Entity::delete_by_id(order_id).exec(&txn).await?;
    txn.commit().await?;

    info!(actor = %current.username, "Order with ID {} deleted permanently", order_id);
    Ok(Json(Envelope::one(response, "Order deleted successfully")))
}
