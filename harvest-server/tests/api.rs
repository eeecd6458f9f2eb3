//! HTTP-level tests against the assembled router

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use harvest_server::api::build_app;
use harvest_server::auth::hash_password;
use harvest_server::db::repository::chat as chat_repo;
use harvest_server::db::repository::user::{self as user_repo, NewUser};
use harvest_server::discord::{self, Interaction};
use harvest_server::{AppState, Config};
use shared::models::{Role, User};

async fn test_state() -> AppState {
    let mut state = AppState::new(&Config::for_tests()).await.unwrap();
    state.login_delay = Duration::ZERO;
    state
}

fn app(state: &AppState) -> Router {
    build_app(state.clone(), "*")
}

async fn seed_user(state: &AppState, email: &str, role: Role) -> (User, String) {
    let new_user = NewUser {
        email: email.into(),
        password_hash: hash_password("secret-pass").unwrap(),
        first_name: "Test".into(),
        last_name: "User".into(),
        phone: None,
        address: Some("1 Orchard Lane, Springfield".into()),
        role,
    };
    let user = user_repo::create(state.pool(), &new_user, shared::util::now_millis())
        .await
        .unwrap();
    let token = state.jwt.generate_for(&user).unwrap();
    (user, token)
}

async fn send(
    app: &Router,
    method: Method,
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
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn carrots() -> Value {
    json!({
        "name": "Carrots",
        "category": "vegetable",
        "price": 2.5,
        "description": "Bunch of 1 kg",
        "icon": "🥕",
        "stock": 300
    })
}

#[tokio::test]
async fn test_health_reports_database() {
    let state = test_state().await;
    let (status, body) = send(&app(&state), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_register_then_login() {
    let state = test_state().await;
    let app = app(&state);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users/register",
        None,
        Some(json!({
            "email": "  Jane@Example.com ",
            "password": "hunter22",
            "first_name": "Jane",
            "last_name": "Doe"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "jane@example.com");
    assert_eq!(body["user"]["role"], "customer");
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users/login",
        None,
        Some(json!({"email": "jane@example.com", "password": "hunter22"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_owned();

    let (status, body) = send(&app, Method::GET, "/api/users/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Jane");

    // Wrong password and unknown email look the same
    let (wrong_pw, wrong_body) = send(
        &app,
        Method::POST,
        "/api/users/login",
        None,
        Some(json!({"email": "jane@example.com", "password": "nope-nope"})),
    )
    .await;
    let (unknown, unknown_body) = send(
        &app,
        Method::POST,
        "/api/users/login",
        None,
        Some(json!({"email": "ghost@example.com", "password": "nope-nope"})),
    )
    .await;
    assert_eq!(wrong_pw, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let state = test_state().await;
    let app = app(&state);
    let req = json!({
        "email": "dup@example.com",
        "password": "hunter22",
        "first_name": "Dup",
        "last_name": "Licate"
    });

    let (first, _) = send(&app, Method::POST, "/api/users/register", None, Some(req.clone())).await;
    let (second, _) = send(&app, Method::POST, "/api/users/register", None, Some(req)).await;
    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_product_mutations_require_admin() {
    let state = test_state().await;
    let app = app(&state);
    let (_, customer_token) = seed_user(&state, "customer@example.com", Role::Customer).await;

    let (status, _) = send(&app, Method::POST, "/api/products", None, Some(carrots())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/products",
        Some(&customer_token),
        Some(carrots()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/api/products/1/stock",
        Some("not-a-token"),
        Some(json!({"stock": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Catalog reads stay public
    let (status, body) = send(&app, Method::GET, "/api/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_created_product_reads_back_identically() {
    let state = test_state().await;
    let app = app(&state);
    let (_, admin_token) = seed_user(&state, "admin@example.com", Role::Admin).await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/products",
        Some(&admin_token),
        Some(carrots()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["availability"], "limited");

    let id = created["id"].as_i64().unwrap();
    let (status, fetched) = send(&app, Method::GET, &format!("/api/products/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
    for field in ["name", "category", "price", "description", "icon", "stock"] {
        assert_eq!(fetched[field], carrots()[field], "field {field}");
    }

    let (status, _) = send(&app, Method::GET, "/api/products/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_visible_only_to_owner_and_admin() {
    let state = test_state().await;
    let app = app(&state);
    let (_, admin_token) = seed_user(&state, "admin@example.com", Role::Admin).await;
    let (_, owner_token) = seed_user(&state, "owner@example.com", Role::Customer).await;
    let (_, other_token) = seed_user(&state, "other@example.com", Role::Customer).await;

    let (_, product) = send(
        &app,
        Method::POST,
        "/api/products",
        Some(&admin_token),
        Some(carrots()),
    )
    .await;
    let product_id = product["id"].as_i64().unwrap();

    let (status, order) = send(
        &app,
        Method::POST,
        "/api/orders",
        Some(&owner_token),
        Some(json!({
            "items": [{"product_id": product_id, "quantity": 4}],
            "delivery_address": "1 Orchard Lane, Springfield",
            "delivery_date": "2030-05-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_amount"], 10.0);
    let uri = format!("/api/orders/{}", order["id"]);

    let (status, _) = send(&app, Method::GET, &uri, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The other customer cannot cancel it either
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("{uri}/cancel"),
        Some(&other_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listed) = send(&app, Method::GET, "/api/orders", Some(&other_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_oversized_order_is_rejected() {
    let state = test_state().await;
    let app = app(&state);
    let (_, admin_token) = seed_user(&state, "admin@example.com", Role::Admin).await;
    let (_, token) = seed_user(&state, "buyer@example.com", Role::Customer).await;

    let (_, product) = send(
        &app,
        Method::POST,
        "/api/products",
        Some(&admin_token),
        Some(carrots()),
    )
    .await;
    let product_id = product["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/orders",
        Some(&token),
        Some(json!({
            "items": [{"product_id": product_id, "quantity": 301}],
            "delivery_address": "1 Orchard Lane, Springfield",
            "delivery_date": "2030-05-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["available"], 300);

    let (_, product) = send(&app, Method::GET, &format!("/api/products/{product_id}"), None, None).await;
    assert_eq!(product["stock"], 300);
}

#[tokio::test]
async fn test_interactions_disabled_without_key() {
    let state = test_state().await;
    let (status, _) = send(
        &app(&state),
        Method::POST,
        "/api/discord/interactions",
        None,
        Some(json!({"type": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

/// Password handed out in the `/create-account` reply
fn issued_password(reply: &Value) -> String {
    reply["data"]["embeds"][0]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["name"].as_str().unwrap().contains("Temporary password"))
        .map(|f| f["value"].as_str().unwrap().trim_matches('`').to_owned())
        .unwrap()
}

#[tokio::test]
async fn test_chat_account_signs_in_with_issued_password() {
    let state = test_state().await;
    let app = app(&state);

    let interaction: Interaction = serde_json::from_value(json!({
        "type": 2,
        "data": {
            "name": "create-account",
            "options": [
                {"name": "email", "value": "Rancher@Example.com"},
                {"name": "full-name", "value": "Rita Rancher"}
            ]
        },
        "member": {"user": {"id": "4242", "username": "rita"}}
    }))
    .unwrap();
    let reply = serde_json::to_value(discord::dispatch(state.pool(), &interaction).await).unwrap();
    let password = issued_password(&reply);
    assert_eq!(password.len(), 8);

    let (status, wrong) = send(
        &app,
        Method::POST,
        "/api/discord/login",
        None,
        Some(json!({"email": "rancher@example.com", "password": "wrong-one"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, unknown) = send(
        &app,
        Method::POST,
        "/api/discord/login",
        None,
        Some(json!({"email": "nobody@example.com", "password": "wrong-one"})),
    )
    .await;
    assert_eq!(wrong, unknown);
    let before = chat_repo::find_account_by_discord_id(state.pool(), "4242")
        .await
        .unwrap()
        .unwrap();
    assert!(before.last_login.is_none());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/discord/login",
        None,
        Some(json!({"email": "rancher@example.com", "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["discord_id"], "4242");
    assert!(body.get("password_hash").is_none());
    assert!(body["last_login"].as_i64().is_some());

    let after = chat_repo::find_account_by_discord_id(state.pool(), "4242")
        .await
        .unwrap()
        .unwrap();
    assert!(after.last_login.is_some());
}

#[tokio::test]
async fn test_global_limit_per_ip() {
    let state = test_state().await;
    let app = app(&state);

    for _ in 0..100 {
        let (status, _) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}
