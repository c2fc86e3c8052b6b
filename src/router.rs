use crate::auth::require_auth;
use crate::handlers::{
    dishes::{
        create_dish, delete_dish, get_dish, get_dishes, get_dishes_by_type, soft_delete_dish,
        update_dish,
    },
    events::{
        create_event, delete_event, get_event, get_events, soft_delete_event, update_event,
    },
    health::health_check,
    orders::{
        create_order, delete_order, get_order, get_orders, get_orders_by_user, update_order,
    },
    upload::{upload_image, MAX_UPLOAD_BYTES},
    users::{
        delete_user, get_user, get_users, login, register, soft_delete_user, update_user,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Routes reachable without a token
fn public_routes() -> Router<AppState> {
    Router::new()
        // Users
        .route("/register", post(register))
        .route("/login", post(login))
        // Dishes
        .route("/dishes/type/:type", get(get_dishes_by_type))
        .route("/dishes/id/:id", get(get_dish))
        // Events
        .route("/events", get(get_events))
        // Orders
        .route("/orders", post(create_order))
        .route("/orders/all", get(get_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/user/:user_id", get(get_orders_by_user))
        // Upload
        .route(
            "/upload",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
}

/// Routes behind the bearer token gate
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // User administration
        .route("/admin/users", get(get_users))
        .route(
            "/admin/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/admin/users/deletedAt/:id", patch(soft_delete_user))
        // Dish administration
        .route("/admin/dishes", get(get_dishes).post(create_dish))
        .route(
            "/admin/dishes/:id",
            get(get_dish).patch(update_dish).delete(delete_dish),
        )
        .route("/admin/dishes/deletedAt/:id", patch(soft_delete_dish))
        // Event administration
        .route("/admin/events", get(get_events).post(create_event))
        .route(
            "/admin/events/:id",
            get(get_event).patch(update_event).delete(delete_event),
        )
        .route("/admin/events/deletedAt/:id", patch(soft_delete_event))
        // Order mutations
        .route("/orders/:id", patch(update_order).delete(delete_order))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let api = public_routes().merge(protected_routes(state.clone()));
    let request_timeout = Duration::from_secs(state.settings.request_timeout_secs);

    let router = Router::new()
        // Health check
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        // Uploaded files
        .nest_service("/uploads", ServeDir::new(&state.settings.upload_dir))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // The Prometheus recorder is process-global, so test apps go without it
    #[cfg(not(test))]
    let router = {
        let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();
        router
            .route("/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer)
    };

    router
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
