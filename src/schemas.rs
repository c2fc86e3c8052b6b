use common::{Status, TokenService};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::config::Settings;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Issues and validates bearer tokens
    pub tokens: TokenService,
    /// Immutable runtime settings
    pub settings: Arc<Settings>,
}

/// Error response. Same shape as every envelope, with `data` always null.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always null
    #[schema(value_type = Option<Object>)]
    pub data: Option<()>,
    /// What went wrong
    pub msg: String,
    /// Always 0
    pub count: usize,
    /// Always "error"
    pub status: Status,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::users::register,
        crate::handlers::users::login,
        crate::handlers::users::get_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::soft_delete_user,
        crate::handlers::users::delete_user,
        crate::handlers::dishes::get_dishes,
        crate::handlers::dishes::get_dish,
        crate::handlers::dishes::get_dishes_by_type,
        crate::handlers::dishes::create_dish,
        crate::handlers::dishes::update_dish,
        crate::handlers::dishes::soft_delete_dish,
        crate::handlers::dishes::delete_dish,
        crate::handlers::events::get_events,
        crate::handlers::events::get_event,
        crate::handlers::events::create_event,
        crate::handlers::events::update_event,
        crate::handlers::events::soft_delete_event,
        crate::handlers::events::delete_event,
        crate::handlers::orders::get_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::get_orders_by_user,
        crate::handlers::orders::create_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::delete_order,
        crate::handlers::upload::upload_image,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            Status,
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Registration, login and user administration"),
        (name = "dishes", description = "Menu dishes"),
        (name = "events", description = "Restaurant events"),
        (name = "orders", description = "Customer orders"),
        (name = "upload", description = "Image uploads"),
    ),
    info(
        title = "Restorust API",
        description = "Restaurant backend - users, menu, events and orders",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
