use actix_web::{App, http::StatusCode, test, web};
use chrono::{Datelike, Utc};
use shop_katha::domain::user::{CreateUser, LoginRequest};
use shop_katha::infrastructure::config::AppConfig;
use shop_katha::presentation::handlers::AppState;
use shop_katha::presentation::middleware::JwtAuthMiddleware;
use shop_katha::presentation::routes;

async fn token_for(state: &AppState, email: &str) -> String {
    state
        .auth_service
        .register_user(CreateUser {
            email: email.to_string(),
            password: "test123".to_string(),
            full_name: "Geeta Rao".to_string(),
            shop_name: "Rao Stores".to_string(),
            shop_address: "Temple Street".to_string(),
            phone_number: "9123456780".to_string(),
        })
        .await
        .unwrap();
    state
        .auth_service
        .login(LoginRequest {
            email: email.to_string(),
            password: "test123".to_string(),
        })
        .await
        .unwrap()
}

macro_rules! setup_test {
    () => {{
        let uploads = tempfile::tempdir().unwrap();
        let upload_dir = uploads.path().to_string_lossy().to_string();
        let config = AppConfig::from_lookup(|key| match key {
            "JWT_SECRET" => Some("test-secret-key-for-shop-book".to_string()),
            "UPLOAD_DIR" => Some(upload_dir.clone()),
            _ => None,
        })
        .unwrap();
        let state = web::Data::new(AppState::in_memory(&config));
        let token = token_for(&state, "books@example.com").await;
        let other_token = token_for(&state, "neighbour@example.com").await;

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .wrap(JwtAuthMiddleware::new(config.jwt_secret.clone()))
                .configure(routes::configure),
        )
        .await;

        (app, token, other_token, uploads)
    }};
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

macro_rules! dashboard_of {
    ($app:expr, $token:expr) => {{
        let req = test::TestRequest::get()
            .uri("/api/dashboard")
            .insert_header(bearer($token))
            .to_request();
        let summary: serde_json::Value = test::call_and_read_body_json(&$app, req).await;
        summary
    }};
}

#[actix_web::test]
async fn test_sales_and_loans_feed_dashboard() {
    let (app, token, other_token, _uploads) = setup_test!();
    let now = Utc::now();
    let month = now.format("%B").to_string();

    for amount in [1500.0, 500.0] {
        let req = test::TestRequest::post()
            .uri("/api/shop/sales")
            .insert_header(bearer(&token))
            .set_json(serde_json::json!({
                "month": month.to_lowercase(),
                "year": now.year(),
                "amount": amount
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::post()
        .uri("/api/shop/loans")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({ "amount": 10000, "description": "Freezer" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let loan: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(loan["status"], "active");
    let loan_id = loan["id"].as_str().unwrap().to_string();

    let summary = dashboard_of!(app, &token);
    assert_eq!(summary["monthlySales"], 2000.0);
    assert_eq!(summary["activeLoans"], 1);

    let quiet = dashboard_of!(app, &other_token);
    assert_eq!(quiet["monthlySales"], 0.0);
    assert_eq!(quiet["activeLoans"], 0);

    let req = test::TestRequest::put()
        .uri(&format!("/api/shop/loans/{loan_id}"))
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({ "status": "paid" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(dashboard_of!(app, &token)["activeLoans"], 0);

    let req = test::TestRequest::put()
        .uri(&format!("/api/shop/loans/{loan_id}"))
        .insert_header(bearer(&other_token))
        .set_json(serde_json::json!({ "status": "active" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/api/shop/sales")
        .insert_header(bearer(&token))
        .to_request();
    let sales: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(sales.as_array().unwrap().len(), 1);
    assert_eq!(sales[0]["month"], month);
}

#[actix_web::test]
async fn test_billing_and_collection_routes() {
    let (app, token, _other, _uploads) = setup_test!();

    let req = test::TestRequest::post()
        .uri("/api/shop/billings")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({
            "month": "February",
            "year": 2024,
            "items": [
                { "name": "Soap", "quantity": 12, "amount": 240 },
                { "name": "Tea", "quantity": 3, "amount": 360.5 }
            ]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let billing: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(billing["totalAmount"], 600.5);

    let req = test::TestRequest::post()
        .uri("/api/shop/billings")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({ "month": "Febtober", "year": 2024, "items": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/customers")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({
            "name": "Imran",
            "phone": "9000022222",
            "address": "Bus Stand"
        }))
        .to_request();
    let customer: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/shop/collections")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({ "customerId": customer["id"], "amount": 150 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/api/shop/collections")
        .insert_header(bearer(&token))
        .to_request();
    let collections: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(collections.as_array().unwrap().len(), 1);
    assert_eq!(collections[0]["customerId"], customer["id"]);
}

#[actix_web::test]
async fn test_shop_routes_require_token() {
    let (app, _token, _other, _uploads) = setup_test!();
    let req = test::TestRequest::get().uri("/api/shop/loans").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
