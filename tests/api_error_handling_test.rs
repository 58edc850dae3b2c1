use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use little_lemon::auth;
use little_lemon::config::Config;
use little_lemon::db;
use little_lemon::infrastructure::AppState;
use little_lemon::models::user;
use little_lemon::server::build_router;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::{Value, json};
use tower::util::ServiceExt; // for `oneshot`

async fn setup_test_app() -> (Router, AppState) {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let state = AppState::new(db, Config::default());
    (build_router(state.clone()), state)
}

async fn create_user(db: &DatabaseConnection, username: &str, is_staff: bool) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        password_hash: Set("hash".to_string()),
        is_staff: Set(is_staff),
        token_version: Set(0),
        created_at: Set("2030-01-01 12:00:00".to_string()),
        updated_at: Set("2030-01-01 12:00:00".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create user")
}

// Staff token plus a customer token for the same app
async fn tokens(state: &AppState) -> (String, String) {
    let staff = create_user(state.db(), "chef", true).await;
    let customer = create_user(state.db(), "ana", false).await;
    (
        auth::create_jwt(&staff, &state.config.jwt_secret, 1).unwrap(),
        auth::create_jwt(&customer, &state.config.jwt_secret, 1).unwrap(),
    )
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .uri(uri)
        .method(method)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_not_found() {
    let (app, state) = setup_test_app().await;
    let (staff, customer) = tokens(&state).await;

    for uri in [
        "/api/categories/999/",
        "/api/menu-items/999/",
        "/api/tables/999/",
        "/api/bookings/999/",
        "/api/orders/999/",
    ] {
        let (status, body) = send(&app, "GET", uri, &staff, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["code"], "not_found");
    }

    let (status, body) = send(&app, "POST", "/api/bookings/999/cancel/", &customer, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Booking not found.");
}

#[tokio::test]
async fn test_malformed_json() {
    let (app, state) = setup_test_app().await;
    let (staff, _) = tokens(&state).await;

    let req = Request::builder()
        .uri("/api/categories/")
        .method("POST")
        .header(header::AUTHORIZATION, format!("Bearer {}", staff))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ invalid json }"))
        .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "invalid");

    // Well-formed JSON of the wrong shape is a 400 as well
    let (status, _) = send(
        &app,
        "POST",
        "/api/categories/",
        &staff,
        Some(json!({ "description": "no name" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_validation() {
    let (app, state) = setup_test_app().await;
    let (staff, _) = tokens(&state).await;

    let (status, category) = send(
        &app,
        "POST",
        "/api/categories/",
        &staff,
        Some(json!({ "name": "Desserts" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/categories/",
        &staff,
        Some(json!({ "name": "Desserts" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "name");

    let (status, body) = send(
        &app,
        "POST",
        "/api/menu-items/",
        &staff,
        Some(json!({ "name": "Tiramisu", "price": "7.99", "category": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "category");

    for bad_price in ["7.999", "-1.00", "10000.00"] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/menu-items/",
            &staff,
            Some(json!({ "name": "Tiramisu", "price": bad_price, "category": category["id"] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", bad_price);
        assert_eq!(body["field"], "price");
    }

    let (status, body) = send(
        &app,
        "POST",
        "/api/tables/",
        &staff,
        Some(json!({ "number": 1, "capacity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "capacity");

    send(
        &app,
        "POST",
        "/api/tables/",
        &staff,
        Some(json!({ "number": 1, "capacity": 4 })),
    )
    .await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/tables/",
        &staff,
        Some(json!({ "number": 1, "capacity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "number");
}

#[tokio::test]
async fn test_booking_validation() {
    let (app, state) = setup_test_app().await;
    let (staff, customer) = tokens(&state).await;

    let (_, table) = send(
        &app,
        "POST",
        "/api/tables/",
        &staff,
        Some(json!({ "number": 1, "capacity": 4 })),
    )
    .await;

    let base = json!({
        "table": table["id"],
        "date": "2030-06-01",
        "time_slot": "19:00",
        "number_of_guests": 2,
        "customer_name": "Ana Lima",
        "customer_email": "ana@example.com",
        "customer_phone": "555-0100"
    });

    let cases = [
        ("time_slot", json!("19:30")),
        ("date", json!("June 1st")),
        ("number_of_guests", json!(0)),
        ("number_of_guests", json!(21)),
        ("customer_email", json!("ana-at-example")),
        ("customer_phone", json!("0123456789012345")),
        ("customer_name", json!("  ")),
        ("table", json!(999)),
    ];
    for (field, value) in cases {
        let mut payload = base.clone();
        payload[field] = value.clone();
        let (status, _) = send(&app, "POST", "/api/bookings/", &customer, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} = {}", field, value);
    }

    let (status, _) = send(
        &app,
        "GET",
        "/api/bookings/available-slots/?date=01-06-2030",
        &customer,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "GET",
        "/api/bookings/available-slots/?date=2030-06-01&guests=many",
        &customer,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Customers cannot confirm
    let (_, booking) = send(&app, "POST", "/api/bookings/", &customer, Some(base)).await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/bookings/{}/confirm/", booking["id"]),
        &customer,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_order_validation() {
    let (app, state) = setup_test_app().await;
    let (staff, customer) = tokens(&state).await;

    let (_, category) = send(
        &app,
        "POST",
        "/api/categories/",
        &staff,
        Some(json!({ "name": "Appetizers" })),
    )
    .await;
    let (_, item) = send(
        &app,
        "POST",
        "/api/menu-items/",
        &staff,
        Some(json!({ "name": "Bruschetta", "price": "8.99", "category": category["id"] })),
    )
    .await;

    let bad_orders = [
        json!({ "items": [] }),
        json!({ "items": [{ "menu_item": item["id"], "quantity": 0 }] }),
        json!({ "items": [{ "menu_item": 999, "quantity": 1 }] }),
        json!({ "items": [
            { "menu_item": item["id"], "quantity": 1 },
            { "menu_item": item["id"], "quantity": 2 }
        ] }),
        json!({ "booking": 999, "items": [{ "menu_item": item["id"], "quantity": 1 }] }),
    ];
    for payload in bad_orders {
        let (status, _) = send(&app, "POST", "/api/orders/", &customer, Some(payload.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", payload);
    }

    // Nothing was half-created by the rejected requests
    let (_, orders) = send(&app, "GET", "/api/orders/", &staff, None).await;
    assert!(orders.as_array().unwrap().is_empty());

    let (_, order) = send(
        &app,
        "POST",
        "/api/orders/",
        &customer,
        Some(json!({ "items": [{ "menu_item": item["id"], "quantity": 1 }] })),
    )
    .await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/orders/{}/items/", order["id"]),
        &customer,
        Some(json!({ "menu_item": item["id"], "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/orders/{}/items/{}/", order["id"], order["items"][0]["id"]),
        &customer,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "An order must keep at least one item.");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/orders/{}/items/999/", order["id"]),
        &customer,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
