#[cfg(test)]
mod integration_tests {
    use crate::handlers::events::DEFAULT_EVENT_IMAGE;
    use crate::test_utils::test_utils::{
        admin_token, create_dish, login, register_user, setup_test_app,
        setup_test_app_with_uploads, TEST_JWT_SECRET,
    };
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use chrono::Utc;
    use common::{Claims, TokenService};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::str::FromStr;

    fn decimal(value: &Value) -> Decimal {
        match value {
            Value::String(s) => Decimal::from_str(s).unwrap(),
            other => Decimal::from_str(&other.to_string()).unwrap(),
        }
    }

    fn assert_error_envelope(body: &Value) {
        assert_eq!(body["status"], "error");
        assert_eq!(body["count"], 0);
        assert!(body["data"].is_null());
        assert!(body["msg"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_health_check() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        // Send GET request to health endpoint
        let response = server.get("/health").await;

        // Verify response
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_register_login_and_list_users() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        // Register
        let response = server
            .post("/api/v1/register")
            .json(&json!({
                "name": "A",
                "username": "a1",
                "password": "p",
                "street": "s",
                "city": "c",
                "cp": "1"
            }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"]["username"], "a1");
        assert_ne!(body["data"]["password"], "p");
        assert!(body["data"].get("passwordHash").is_none());
        assert!(body["data"].get("password_hash").is_none());

        // Login
        let response = server
            .post("/api/v1/login")
            .json(&json!({ "username": "a1", "password": "p" }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["name"], "A");
        assert_eq!(body["data"]["isAdmin"], false);
        let token = body["data"]["token"].as_str().unwrap().to_string();

        // The token decodes with the configured secret
        let claims = TokenService::new(TEST_JWT_SECRET, 1)
            .validate(&token)
            .unwrap();
        assert_eq!(claims.username, "a1");

        // List users with the token
        let response = server
            .get("/api/v1/admin/users")
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let users = body["data"].as_array().unwrap();
        assert_eq!(body["count"], users.len());
        assert!(users.iter().any(|u| u["username"] == "a1"));
        assert!(users.iter().all(|u| u.get("passwordHash").is_none()));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        register_user(&server, "maria", "correct").await;

        let response = server
            .post("/api/v1/login")
            .json(&json!({ "username": "maria", "password": "wrong" }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_error_envelope(&body);
        assert_eq!(body["msg"], "Incorrect password");
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/login")
            .json(&json!({ "username": "nobody", "password": "p" }))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_error_envelope(&response.json());
    }

    #[tokio::test]
    async fn test_register_missing_field() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/register")
            .json(&json!({ "name": "A", "username": "a1", "password": "p" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_error_envelope(&response.json());

        let response = server
            .post("/api/v1/register")
            .json(&json!({
                "name": "", "username": "a1", "password": "p",
                "street": "s", "city": "c", "cp": "1"
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_gets_envelope() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/login")
            .content_type("application/json")
            .text("{not json")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_error_envelope(&response.json());
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        register_user(&server, "dup", "p").await;

        let response = server
            .post("/api/v1/register")
            .json(&json!({
                "name": "Other", "username": "dup", "password": "q",
                "street": "s", "city": "c", "cp": "1"
            }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        assert_error_envelope(&response.json());
    }

    #[tokio::test]
    async fn test_protected_route_without_token() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api/v1/admin/users").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_error_envelope(&response.json());

        // A non-bearer credential counts as missing
        let response = server
            .get("/api/v1/admin/dishes")
            .add_header(
                axum::http::header::AUTHORIZATION,
                axum::http::HeaderValue::from_static("Basic YWRtaW46YWRtaW4="),
            )
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_protected_route_with_bad_token() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .get("/api/v1/admin/users")
            .authorization_bearer("not-a-token")
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_error_envelope(&response.json());

        // Signed with another secret
        let foreign = TokenService::new("some_other_secret", 1)
            .issue(1, "mallory", true)
            .unwrap();
        let response = server
            .get("/api/v1/admin/users")
            .authorization_bearer(&foreign)
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_protected_route_with_expired_token() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let now = Utc::now().timestamp();
        let expired = TokenService::new(TEST_JWT_SECRET, 1)
            .sign(&Claims {
                sub: "1".to_string(),
                username: "late".to_string(),
                is_admin: true,
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();

        let response = server
            .get("/api/v1/admin/users")
            .authorization_bearer(&expired)
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_error_envelope(&response.json());
    }


    #[tokio::test]
    async fn test_bearer_scheme_ignores_case() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;

        for scheme in ["bearer", "BEARER"] {
            let value = format!("{} {}", scheme, token);
            let response = server
                .get("/api/v1/admin/users")
                .add_header(
                    axum::http::header::AUTHORIZATION,
                    axum::http::HeaderValue::from_str(&value).unwrap(),
                )
                .await;
            response.assert_status(StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_get_user_not_found_and_malformed_id() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;

        let response = server
            .get("/api/v1/admin/users/99999")
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_error_envelope(&response.json());

        let response = server
            .get("/api/v1/admin/users/64f1c2e8a9b3")
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_error_envelope(&response.json());
    }

    #[tokio::test]
    async fn test_update_user() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;
        let user_id = register_user(&server, "pepe", "old-pass").await;

        // Update city and password
        let response = server
            .patch(&format!("/api/v1/admin/users/{}", user_id))
            .authorization_bearer(&token)
            .json(&json!({ "city": "Sevilla", "password": "new-pass", "isAdmin": true }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["city"], "Sevilla");
        assert_eq!(body["data"]["isAdmin"], true);

        // The new password is the one that works
        login(&server, "pepe", "new-pass").await;
        let response = server
            .post("/api/v1/login")
            .json(&json!({ "username": "pepe", "password": "old-pass" }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_user_rejects_unknown_field() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;
        let user_id = register_user(&server, "lola", "p").await;

        let response = server
            .patch(&format!("/api/v1/admin/users/{}", user_id))
            .authorization_bearer(&token)
            .json(&json!({ "passwordHash": "x" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_error_envelope(&response.json());
    }

    #[tokio::test]
    async fn test_soft_delete_user() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;
        let user_id = register_user(&server, "gone", "p").await;

        let response = server
            .patch(&format!("/api/v1/admin/users/deletedAt/{}", user_id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert!(!body["data"]["deletedAt"].is_null());

        // Still retrievable by id
        let response = server
            .get(&format!("/api/v1/admin/users/{}", user_id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert!(!body["data"]["deletedAt"].is_null());

        // Gone from the listing
        let response = server
            .get("/api/v1/admin/users")
            .authorization_bearer(&token)
            .await;
        let body: Value = response.json();
        let users = body["data"].as_array().unwrap();
        assert!(users.iter().all(|u| u["username"] != "gone"));

        // Cannot log in any more
        let response = server
            .post("/api/v1/login")
            .json(&json!({ "username": "gone", "password": "p" }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;
        let user_id = register_user(&server, "temp", "p").await;

        let response = server
            .delete(&format!("/api/v1/admin/users/{}", user_id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["username"], "temp");

        let response = server
            .get(&format!("/api/v1/admin/users/{}", user_id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_user_not_found() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;

        let response = server
            .delete("/api/v1/admin/users/99999")
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        // Nothing was removed
        let response = server
            .get("/api/v1/admin/users")
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["count"], 1);
    }


    #[tokio::test]
    async fn test_delete_user_removes_their_orders() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;
        let user_id = register_user(&server, "cliente", "p").await;
        let paella = create_dish(&server, &token, "Principal", "Paella", "12.50").await;

        let response = server
            .post("/api/v1/orders")
            .json(&json!({ "userId": user_id, "items": [{ "dishId": paella, "quantity": 2 }] }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let order_id = body["data"]["id"].as_i64().unwrap();

        server
            .delete(&format!("/api/v1/admin/users/{}", user_id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::OK);

        server
            .get(&format!("/api/v1/orders/{}", order_id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .get(&format!("/api/v1/orders/user/{}", user_id))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        // The dish is no longer referenced and can go
        server
            .delete(&format!("/api/v1/admin/dishes/{}", paella))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_dish_crud() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;

        // Empty menu
        let response = server
            .get("/api/v1/admin/dishes")
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        let dish_id = create_dish(&server, &token, "Principal", "Paella", "12.50").await;

        // Public read by id
        let response = server.get(&format!("/api/v1/dishes/id/{}", dish_id)).await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["type"], "Principal");
        assert_eq!(decimal(&body["data"]["price"]), Decimal::new(1250, 2));

        // Update
        let response = server
            .patch(&format!("/api/v1/admin/dishes/{}", dish_id))
            .authorization_bearer(&token)
            .json(&json!({ "price": "13.00", "imageUrl": "http://localhost:5000/uploads/p.png" }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(decimal(&body["data"]["price"]), Decimal::new(13, 0));
        assert_eq!(body["data"]["imageUrl"], "http://localhost:5000/uploads/p.png");

        // Unknown key
        let response = server
            .patch(&format!("/api/v1/admin/dishes/{}", dish_id))
            .authorization_bearer(&token)
            .json(&json!({ "calories": 500 }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // List
        let response = server
            .get("/api/v1/admin/dishes")
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["count"], 1);

        // Hard delete returns the removed dish
        let response = server
            .delete(&format!("/api/v1/admin/dishes/{}", dish_id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["name"], "Paella");

        let response = server.get(&format!("/api/v1/dishes/id/{}", dish_id)).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_dish_validation() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;

        let response = server
            .post("/api/v1/admin/dishes")
            .authorization_bearer(&token)
            .json(&json!({
                "type": "Postre", "name": "Flan", "description": "Casero", "price": "0"
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post("/api/v1/admin/dishes")
            .authorization_bearer(&token)
            .json(&json!({ "type": "Postre", "description": "Casero", "price": "4.50" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_error_envelope(&response.json());
    }

    #[tokio::test]
    async fn test_dishes_by_type_is_case_insensitive() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;

        create_dish(&server, &token, "Postre", "Flan", "4.50").await;
        create_dish(&server, &token, "Principal", "Paella", "12.50").await;
        let hidden = create_dish(&server, &token, "Postres caseros", "Natillas", "4.00").await;

        server
            .patch(&format!("/api/v1/admin/dishes/deletedAt/{}", hidden))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::OK);

        let response = server.get("/api/v1/dishes/type/POST").await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["name"], "Flan");

        let response = server.get("/api/v1/dishes/type/bebida").await;
        response.assert_status(StatusCode::NOT_FOUND);

        // LIKE wildcards are matched literally
        let response = server.get("/api/v1/dishes/type/%25").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_soft_deleted_dish_still_readable_by_id() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;
        let dish_id = create_dish(&server, &token, "Entrante", "Croquetas", "7.00").await;

        let response = server
            .patch(&format!("/api/v1/admin/dishes/deletedAt/{}", dish_id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);

        let response = server
            .get(&format!("/api/v1/admin/dishes/{}", dish_id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert!(!body["data"]["deletedAt"].is_null());

        let response = server
            .get("/api/v1/admin/dishes")
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_event_lifecycle() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;

        // Nothing scheduled yet
        server
            .get("/api/v1/events")
            .await
            .assert_status(StatusCode::NOT_FOUND);

        // Create without an image
        let response = server
            .post("/api/v1/admin/events")
            .authorization_bearer(&token)
            .json(&json!({
                "title": "Jazz night",
                "description": "Live quartet",
                "date": "2025-06-21",
                "time": "20:30"
            }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["image"], DEFAULT_EVENT_IMAGE);
        let event_id = body["data"]["id"].as_i64().unwrap();

        // Public listing
        let response = server.get("/api/v1/events").await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["time"], "20:30");

        // Update
        let response = server
            .patch(&format!("/api/v1/admin/events/{}", event_id))
            .authorization_bearer(&token)
            .json(&json!({ "time": "21:00" }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["time"], "21:00");
        assert_eq!(body["data"]["title"], "Jazz night");

        // Soft delete hides it from the listing
        server
            .patch(&format!("/api/v1/admin/events/deletedAt/{}", event_id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::OK);
        server
            .get("/api/v1/events")
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let response = server
            .get(&format!("/api/v1/admin/events/{}", event_id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);

        // Hard delete
        server
            .delete(&format!("/api/v1/admin/events/{}", event_id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::OK);
        server
            .get(&format!("/api/v1/admin/events/{}", event_id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_order_lifecycle() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;
        let user_id = register_user(&server, "cliente", "p").await;
        let paella = create_dish(&server, &token, "Principal", "Paella", "12.50").await;
        let flan = create_dish(&server, &token, "Postre", "Flan", "3.00").await;

        // No orders yet
        server
            .get("/api/v1/orders/all")
            .await
            .assert_status(StatusCode::NOT_FOUND);

        // Place an order without a total
        let response = server
            .post("/api/v1/orders")
            .json(&json!({
                "userId": user_id,
                "items": [
                    { "dishId": paella, "quantity": 2 },
                    { "dishId": flan, "quantity": 1 }
                ]
            }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let order = &body["data"];
        assert_eq!(order["status"], "pending");
        assert_eq!(decimal(&order["totalPrice"]), Decimal::new(2800, 2));
        assert_eq!(order["user"]["username"], "cliente");
        assert_eq!(order["items"].as_array().unwrap().len(), 2);
        assert_eq!(order["items"][0]["dish"]["name"], "Paella");
        let order_id = order["id"].as_i64().unwrap();

        // Public read with joins
        let response = server.get(&format!("/api/v1/orders/{}", order_id)).await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["items"][1]["dish"]["name"], "Flan");
        assert_eq!(body["data"]["user"]["id"], user_id);

        // By user
        let response = server
            .get(&format!("/api/v1/orders/user/{}", user_id))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["count"], 1);

        // Updating needs a token
        server
            .patch(&format!("/api/v1/orders/{}", order_id))
            .json(&json!({ "status": "confirmed" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        // Replace items and status
        let response = server
            .patch(&format!("/api/v1/orders/{}", order_id))
            .authorization_bearer(&token)
            .json(&json!({
                "items": [{ "dishId": flan, "quantity": 4 }],
                "orderStatus": "preparing"
            }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["status"], "preparing");
        assert_eq!(decimal(&body["data"]["totalPrice"]), Decimal::new(12, 0));
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

        // Delete
        let response = server
            .delete(&format!("/api/v1/orders/{}", order_id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);
        server
            .get(&format!("/api/v1/orders/{}", order_id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_order_with_explicit_total() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;
        let user_id = register_user(&server, "cliente", "p").await;
        let paella = create_dish(&server, &token, "Principal", "Paella", "12.50").await;

        let response = server
            .post("/api/v1/orders")
            .json(&json!({
                "userId": user_id,
                "items": [{ "dishId": paella, "quantity": 1 }],
                "totalPrice": "10.00"
            }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(decimal(&body["data"]["totalPrice"]), Decimal::new(10, 0));
    }

    #[tokio::test]
    async fn test_order_validation() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;
        let user_id = register_user(&server, "cliente", "p").await;
        let paella = create_dish(&server, &token, "Principal", "Paella", "12.50").await;

        // No items
        server
            .post("/api/v1/orders")
            .json(&json!({ "userId": user_id, "items": [] }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // Zero quantity
        server
            .post("/api/v1/orders")
            .json(&json!({ "userId": user_id, "items": [{ "dishId": paella, "quantity": 0 }] }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        // Unknown user
        server
            .post("/api/v1/orders")
            .json(&json!({ "userId": 99999, "items": [{ "dishId": paella, "quantity": 1 }] }))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        // Unknown dish
        server
            .post("/api/v1/orders")
            .json(&json!({ "userId": user_id, "items": [{ "dishId": 99999, "quantity": 1 }] }))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        // Nothing was stored along the way
        server
            .get("/api/v1/orders/all")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dish_in_order_cannot_be_hard_deleted() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;
        let user_id = register_user(&server, "cliente", "p").await;
        let paella = create_dish(&server, &token, "Principal", "Paella", "12.50").await;

        server
            .post("/api/v1/orders")
            .json(&json!({ "userId": user_id, "items": [{ "dishId": paella, "quantity": 1 }] }))
            .await
            .assert_status(StatusCode::OK);

        let response = server
            .delete(&format!("/api/v1/admin/dishes/{}", paella))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert_error_envelope(&response.json());
    }


    #[tokio::test]
    async fn test_money_amounts_are_bounded() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;
        let user_id = register_user(&server, "cliente", "p").await;

        // Price beyond DECIMAL(10, 2)
        let response = server
            .post("/api/v1/admin/dishes")
            .authorization_bearer(&token)
            .json(&json!({
                "type": "Principal",
                "name": "Caviar",
                "description": "Caviar description",
                "price": "100000000000000000000"
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_error_envelope(&response.json());

        let caviar = create_dish(&server, &token, "Principal", "Caviar", "99999999.99").await;

        // Quantity far beyond what one line may ask for
        let response = server
            .post("/api/v1/orders")
            .json(&json!({
                "userId": user_id,
                "items": [{ "dishId": caviar, "quantity": 2000000000 }]
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_error_envelope(&response.json());

        // Computed total does not fit a money column
        let response = server
            .post("/api/v1/orders")
            .json(&json!({ "userId": user_id, "items": [{ "dishId": caviar, "quantity": 2 }] }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_error_envelope(&response.json());

        // Explicit total beyond the limit
        server
            .post("/api/v1/orders")
            .json(&json!({
                "userId": user_id,
                "items": [{ "dishId": caviar, "quantity": 1 }],
                "totalPrice": "100000000.00"
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .get("/api/v1/orders/all")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_prices_keep_two_decimals() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();
        let token = admin_token(&server).await;
        let user_id = register_user(&server, "cliente", "p").await;
        let bread = create_dish(&server, &token, "Entrante", "Pan", "5").await;
        let flan = create_dish(&server, &token, "Postre", "Flan", "5.00").await;

        for dish_id in [bread, flan] {
            let response = server
                .get(&format!("/api/v1/dishes/id/{}", dish_id))
                .await;
            response.assert_status(StatusCode::OK);
            let body: Value = response.json();
            assert_eq!(body["data"]["price"], "5.00");
        }

        let response = server
            .post("/api/v1/orders")
            .json(&json!({ "userId": user_id, "items": [{ "dishId": bread, "quantity": 3 }] }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["totalPrice"], "15.00");
        assert_eq!(body["data"]["items"][0]["dish"]["price"], "5.00");
    }

    #[tokio::test]
    async fn test_upload_and_serve_image() {
        let (app, upload_dir) = setup_test_app_with_uploads().await;
        let server = TestServer::new(app).unwrap();

        let form = MultipartForm::new().add_part(
            "image",
            Part::bytes(b"fake png contents".to_vec())
                .file_name("menu.png")
                .mime_type("image/png"),
        );
        let response = server.post("/api/v1/upload").multipart(form).await;
        response.assert_status(StatusCode::OK);

        let body: Value = response.json();
        let filename = body["data"]["filename"].as_str().unwrap().to_string();
        assert!(filename.starts_with("image-"));
        assert!(filename.ends_with(".png"));
        assert_eq!(body["data"]["size"], 17);
        assert_eq!(
            body["data"]["url"],
            format!("http://localhost:5000/uploads/{}", filename)
        );
        assert!(upload_dir.path().join(&filename).exists());

        // Served statically
        let response = server.get(&format!("/uploads/{}", filename)).await;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.text(), "fake png contents");
    }

    #[tokio::test]
    async fn test_upload_without_image_field() {
        let (app, _upload_dir) = setup_test_app_with_uploads().await;
        let server = TestServer::new(app).unwrap();

        let form = MultipartForm::new().add_text("caption", "no file here");
        let response = server.post("/api/v1/upload").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_error_envelope(&response.json());
    }

    #[tokio::test]
    async fn test_prometheus_metrics_endpoint() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        // In test mode the Prometheus layer is not installed
        let response = server.get("/metrics").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}
