use crate::auth::CurrentUser;
use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, RecordId};
use crate::schemas::{AppState, ErrorResponse};
use axum::{extract::State, response::Json};
use chrono::{DateTime, NaiveDate, Utc};
use common::Envelope;
use model::entities::event;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Image used when an event is created without one
pub const DEFAULT_EVENT_IMAGE: &str =
    "https://img.freepik.com/vector-gratis/concepto-feliz-cumpleanos_23-2148484501.jpg";

/// Request body for creating an event
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: NaiveDate,
    /// Free-form time of day, e.g. "20:30"
    #[validate(length(min = 1, message = "time is required"))]
    pub time: String,
    pub image: Option<String>,
}

/// Fields that may be changed on an event. Unknown keys are rejected.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1))]
    pub time: Option<String>,
    #[validate(length(min = 1))]
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: String,
    pub image: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<event::Model> for EventResponse {
    fn from(model: event::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            date: model.date,
            time: model.time,
            image: model.image,
            deleted_at: model.deleted_at,
        }
    }
}

async fn find_event(db: &DatabaseConnection, event_id: i32) -> AppResult<event::Model> {
    event::Entity::find_by_id(event_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("Event with ID {} not found", event_id);
            AppError::NotFound(format!("Event with id {} not found", event_id))
        })
}

/// List upcoming and past events (soft-deleted excluded)
///
/// Served both publicly at `/api/v1/events` and under `/api/v1/admin/events`.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "events",
    responses(
        (status = 200, description = "Events found", body = Envelope<Vec<EventResponse>>),
        (status = 404, description = "No events", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_events(
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<Vec<EventResponse>>>> {
    trace!("Entering get_events function");

    let events = event::Entity::find()
        .filter(event::Column::DeletedAt.is_null())
        .order_by_asc(event::Column::Date)
        .order_by_asc(event::Column::Id)
        .all(&state.db)
        .await?;

    if events.is_empty() {
        return Err(AppError::NotFound("No events found".to_string()));
    }

    info!("Successfully retrieved {} events", events.len());
    Ok(Json(Envelope::many(
        events.into_iter().map(EventResponse::from).collect(),
        "Events retrieved successfully",
    )))
}

/// Get an event by ID
#[utoipa::path(
    get,
    path = "/api/v1/admin/events/{id}",
    tag = "events",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event found", body = Envelope<EventResponse>),
        (status = 404, description = "Event not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_event(
    RecordId(event_id): RecordId,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<EventResponse>>> {
    let event_model = find_event(&state.db, event_id).await?;
    Ok(Json(Envelope::one(
        EventResponse::from(event_model),
        "Event retrieved successfully",
    )))
}

/// Create an event
#[utoipa::path(
    post,
    path = "/api/v1/admin/events",
    tag = "events",
    security(("bearer_auth" = [])),
    request_body = CreateEventRequest,
    responses(
        (status = 200, description = "Event created", body = Envelope<EventResponse>),
        (status = 400, description = "Missing or invalid field", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn create_event(
    current: CurrentUser,
    State(state): State<AppState>,
    request: AppJson<CreateEventRequest>,
) -> AppResult<Json<Envelope<EventResponse>>> {
    let request = request.validated()?;
    debug!("Creating event: {} on {}", request.title, request.date);

    let image = request
        .image
        .filter(|image| !image.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EVENT_IMAGE.to_string());

    let new_event = event::ActiveModel {
        title: Set(request.title),
        description: Set(request.description),
        date: Set(request.date),
        time: Set(request.time),
        image: Set(image),
        deleted_at: Set(None),
        ..Default::default()
    };

    let event_model = new_event.insert(&state.db).await?;
    info!(actor = %current.username, "Event created with ID: {}", event_model.id);

    Ok(Json(Envelope::one(
        EventResponse::from(event_model),
        "Event created successfully",
    )))
}

/// Partially update an event
#[utoipa::path(
    patch,
    path = "/api/v1/admin/events/{id}",
    tag = "events",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Event ID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = Envelope<EventResponse>),
        (status = 400, description = "Invalid or unknown field", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn update_event(
    RecordId(event_id): RecordId,
    current: CurrentUser,
    State(state): State<AppState>,
    request: AppJson<UpdateEventRequest>,
) -> AppResult<Json<Envelope<EventResponse>>> {
    let request = request.validated()?;
    let existing = find_event(&state.db, event_id).await?;

    let mut event_active: event::ActiveModel = existing.into();
    if let Some(title) = request.title {
        event_active.title = Set(title);
    }
    if let Some(description) = request.description {
        event_active.description = Set(description);
    }
    if let Some(date) = request.date {
        event_active.date = Set(date);
    }
    if let Some(time) = request.time {
        event_active.time = Set(time);
    }
    if let Some(image) = request.image {
        event_active.image = Set(image);
    }

    let updated = event_active.update(&state.db).await?;
    info!(actor = %current.username, "Event with ID {} updated", event_id);

    Ok(Json(Envelope::one(
        EventResponse::from(updated),
        "Event updated successfully",
    )))
}

#[utoipa::path(
    patch,
    path = "/api/v1/admin/events/deletedAt/{id}",
    tag = "events",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event soft-deleted", body = Envelope<EventResponse>),
        (status = 404, description = "Event not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn soft_delete_event(
    RecordId(event_id): RecordId,
    current: CurrentUser,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<EventResponse>>> {
    let existing = find_event(&state.db, event_id).await?;

    let mut event_active: event::ActiveModel = existing.into();
    event_active.deleted_at = Set(Some(Utc::now()));

    let updated = event_active.update(&state.db).await?;
    info!(actor = %current.username, "Event with ID {} soft-deleted", event_id);

    Ok(Json(Envelope::one(
        EventResponse::from(updated),
        format!("Event with id {} soft deleted", event_id),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/events/{id}",
    tag = "events",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event deleted", body = Envelope<EventResponse>),
        (status = 404, description = "Event not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_event(
    RecordId(event_id): RecordId,
    current: CurrentUser,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<EventResponse>>> {
    let existing = find_event(&state.db, event_id).await?;

    event::Entity::delete_by_id(event_id).exec(&state.db).await?;
    info!(actor = %current.username, "Event with ID {} deleted permanently", event_id);

    Ok(Json(Envelope::one(
        EventResponse::from(existing),
        "Event deleted successfully",
    )))
}
