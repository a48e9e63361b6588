//! End-to-end flow through the HTTP router against an in-memory database.
#![allow(clippy::unwrap_used)]
#![allow(clippy::float_cmp)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use givplus::{AppState, config::AppConfig, config::database, router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

const WEBHOOK_SECRET: &str = "hook-secret";

async fn test_app() -> Router {
    let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
    database::create_tables(&db).await.unwrap();

    let mut config = AppConfig::default();
    config.auth.jwt_secret = "integration-secret".to_string();
    config.payments.webhook_secret = Some(WEBHOOK_SECRET.to_string());
    router(AppState::new(db, config))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn webhook(app: &Router, secret: &str, event: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/payments/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-webhook-secret", secret)
        .body(Body::from(event.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "first_name": "Camille",
            "last_name": "Martin",
            "email": email,
            "password": "correct horse",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

fn association_body() -> Value {
    json!({
        "name": "Les Restos du Coeur",
        "description": "Food aid",
        "mission": "Feed everyone",
        "email": "contact@restos.example.org",
        "phone_number": "+33 1 00 00 00 00",
        "address": {
            "street": "42 rue de Clichy",
            "city": "Paris",
            "postal_code": "75009",
            "country": "France"
        },
        "legal_status": "association loi 1901",
        "registration_number": "W751000001"
    })
}

#[tokio::test]
async fn health_check_answers() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn donation_flow_from_registration_to_receipt() {
    let app = test_app().await;

    let token = register(&app, "camille@example.org").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "Camille@Example.org", "password": "correct horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["success"].as_bool().unwrap());
    assert!(body["data"]["user"].get("password_hash").is_none());

    let (status, body) = send(&app, "POST", "/api/associations", Some(&token), Some(association_body())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let association_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/campaigns",
        Some(&token),
        Some(json!({
            "title": "Winter meals",
            "description": "Hot meals all winter",
            "association_id": association_id,
            "goal": 1000.0,
            "category": "social"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let campaign_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/donations",
        Some(&token),
        Some(json!({"campaign_id": campaign_id, "amount": 250.0, "payment_method": "card"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    let donation_id = body["data"]["id"].as_str().unwrap().to_string();

    // No receipt before the payment settles
    let receipt_uri = format!("/api/donations/{donation_id}/tax-receipt");
    let (status, _) = send(&app, "POST", &receipt_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let event = json!({"donation_id": donation_id, "outcome": "succeeded"});
    let (status, body) = webhook(&app, "wrong", event.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");

    let (status, body) = webhook(&app, WEBHOOK_SECRET, event.clone()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["changed"].as_bool().unwrap());
    assert_eq!(body["data"]["donation"]["status"], "completed");

    let (status, body) = webhook(&app, WEBHOOK_SECRET, event).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["data"]["changed"].as_bool().unwrap());

    let (status, body) = send(&app, "GET", &format!("/api/campaigns/{campaign_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_amount"].as_f64().unwrap(), 250.0);
    assert_eq!(body["data"]["donor_count"].as_i64().unwrap(), 1);
    assert_eq!(body["data"]["percent_complete"].as_u64().unwrap(), 25);

    let (status, body) = send(&app, "POST", &receipt_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["data"]["issued"].as_bool().unwrap());
    assert!(body["data"]["number"].as_str().unwrap().starts_with("RCPT-"));

    let (status, body) = send(&app, "POST", &receipt_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(!body["success"].as_bool().unwrap());

    let (status, body) = send(&app, "GET", "/api/donations/stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_amount"].as_f64().unwrap(), 250.0);
    assert_eq!(body["data"]["supported_associations"].as_u64().unwrap(), 1);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/associations/{association_id}/dashboard"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stats"]["total_donors"].as_u64().unwrap(), 1);

    let (status, body) = send(&app, "GET", "/api/associations?search=restos", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"].as_u64().unwrap(), 1);

    let (status, body) = send(&app, "GET", "/api/campaigns?sort=goal&order=asc&active=true", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"].as_u64().unwrap(), 1);

    let (status, body) = send(&app, "GET", "/api/donations?status=completed", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"].as_u64().unwrap(), 1);

    let (status, body) = send(&app, "GET", "/api/users/donations", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"].as_u64().unwrap(), 1);
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let app = test_app().await;
    let token = register(&app, "alex@example.org").await;

    let (status, body) = send(&app, "GET", "/api/users/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!body["success"].as_bool().unwrap());

    let (status, _) = send(&app, "GET", "/api/users/profile", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", "/api/users/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "donor");

    let (status, _) = send(&app, "GET", "/api/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/api/campaigns/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = format!("/api/campaigns/{}", Uuid::new_v4());
    let (status, _) = send(&app, "GET", &missing, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/api/campaigns?order=sideways", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "alex@example.org", "password": "wrong password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "first_name": "Alex",
            "last_name": "Again",
            "email": "ALEX@example.org",
            "password": "another pass"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Malformed JSON still answers with the envelope
    let (status, body) = send(&app, "POST", "/api/associations", Some(&token), Some(json!({"name": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["success"].as_bool().unwrap());
}

#[tokio::test]
async fn verify_token_returns_fresh_profile() {
    let app = test_app().await;
    let token = register(&app, "sam@example.org").await;

    let (status, _) = send(
        &app,
        "PUT",
        "/api/users/profile",
        Some(&token),
        Some(json!({"first_name": "Samuel"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", "/api/auth/verify-token", None, Some(json!({"token": token}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["first_name"], "Samuel");

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/verify-token",
        None,
        Some(json!({"token": "garbage"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
