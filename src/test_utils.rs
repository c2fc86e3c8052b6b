#[cfg(test)]
pub mod test_utils {
    use crate::config::{build_app_state, Settings};
    use crate::router::create_router;
    use crate::schemas::AppState;
    use axum::http::StatusCode;
    use axum::Router;
    use axum_test::TestServer;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    pub const TEST_JWT_SECRET: &str = "test_jwt_secret";

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    pub fn test_settings(upload_dir: &str) -> Settings {
        Settings {
            port: 5000,
            domain: "http://localhost".to_string(),
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: TEST_JWT_SECRET.to_string(),
            jwt_expiration_hours: 1,
            upload_dir: upload_dir.to_string(),
            db_connect_timeout_secs: 8,
            request_timeout_secs: 30,
        }
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state(upload_dir: &str) -> AppState {
        let db = setup_test_db().await;
        build_app_state(db, test_settings(upload_dir))
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is taken from RUST_LOG, defaulting to WARN. Only the
    /// first call in a test binary installs the subscriber.
    fn init_test_tracing() {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| match level.to_uppercase().as_str() {
                "ERROR" => Some(Level::ERROR),
                "WARN" => Some(Level::WARN),
                "INFO" => Some(Level::INFO),
                "DEBUG" => Some(Level::DEBUG),
                "TRACE" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    /// Create axum app for testing. Uploads go to a directory that is never
    /// created unless a test uploads something.
    pub async fn setup_test_app() -> Router {
        init_test_tracing();

        let upload_dir = std::env::temp_dir().join(format!(
            "restorust-test-uploads-{}",
            uuid::Uuid::new_v4().simple()
        ));
        let state = setup_test_app_state(&upload_dir.to_string_lossy()).await;
        create_router(state)
    }

    /// Create axum app whose upload directory is removed when the returned
    /// guard is dropped.
    pub async fn setup_test_app_with_uploads() -> (Router, TempDir) {
        init_test_tracing();

        let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");
        let state = setup_test_app_state(&upload_dir.path().to_string_lossy()).await;
        (create_router(state), upload_dir)
    }

    /// Register a user and return the created record's id
    pub async fn register_user(server: &TestServer, username: &str, password: &str) -> i64 {
        let response = server
            .post("/api/v1/register")
            .json(&json!({
                "name": format!("{} name", username),
                "username": username,
                "password": password,
                "street": "Calle Mayor 1",
                "city": "Madrid",
                "cp": "28013"
            }))
            .await;
        response.assert_status(StatusCode::OK);

        let body: Value = response.json();
        body["data"]["id"].as_i64().expect("registered user has an id")
    }

    /// Log in and return the bearer token
    pub async fn login(server: &TestServer, username: &str, password: &str) -> String {
        let response = server
            .post("/api/v1/login")
            .json(&json!({ "username": username, "password": password }))
            .await;
        response.assert_status(StatusCode::OK);

        let body: Value = response.json();
        body["data"]["token"]
            .as_str()
            .expect("login returns a token")
            .to_string()
    }

    /// Register a fresh user and return a token for it
    pub async fn admin_token(server: &TestServer) -> String {
        register_user(server, "admin", "admin-password").await;
        login(server, "admin", "admin-password").await
    }

    /// Create a dish through the admin API and return its id
    pub async fn create_dish(
        server: &TestServer,
        token: &str,
        dish_type: &str,
        name: &str,
        price: &str,
    ) -> i64 {
        let response = server
            .post("/api/v1/admin/dishes")
            .authorization_bearer(token)
            .json(&json!({
                "type": dish_type,
                "name": name,
                "description": format!("{} description", name),
                "price": price
            }))
            .await;
        response.assert_status(StatusCode::OK);

        let body: Value = response.json();
        body["data"]["id"].as_i64().expect("created dish has an id")
    }
}
