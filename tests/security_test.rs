use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use little_lemon::auth::{create_jwt, decode_jwt, hash_password, verify_password};
use little_lemon::config::Config;
use little_lemon::db;
use little_lemon::infrastructure::AppState;
use little_lemon::models::user;
use little_lemon::server::build_router;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{Value, json};
use tower::util::ServiceExt; // for `oneshot`

async fn setup_test_app() -> (Router, AppState) {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let state = AppState::new(db, Config::default());
    (build_router(state.clone()), state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().uri(uri).method(method);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
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

async fn register(app: &Router, username: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/auth/register/",
        None,
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "Lemon-Tree-42",
            "password2": "Lemon-Tree-42",
            "first_name": "Test"
        })),
    )
    .await
}

#[tokio::test]
async fn test_password_hashing() {
    let password = "super_secret_password";
    let hash = hash_password(password).expect("Failed to hash password");

    assert_ne!(password, hash);
    assert!(verify_password(password, &hash).unwrap());
    assert!(!verify_password("wrong_password", &hash).unwrap());
}

#[tokio::test]
async fn test_jwt_creation_and_verification() {
    let user = user::Model {
        id: 7,
        username: "test_user".to_string(),
        email: "test@example.com".to_string(),
        first_name: String::new(),
        last_name: String::new(),
        password_hash: String::new(),
        is_staff: true,
        token_version: 3,
        created_at: String::new(),
        updated_at: String::new(),
    };

    let token = create_jwt(&user, "test-secret", 1).expect("Failed to create JWT");
    assert!(!token.is_empty());

    let claims = decode_jwt(&token, "test-secret").expect("Failed to verify JWT");
    assert_eq!(claims.sub, "test_user");
    assert_eq!(claims.uid, 7);
    assert!(claims.staff);
    assert_eq!(claims.ver, 3);

    assert!(decode_jwt(&token, "other-secret").is_err());
}

#[tokio::test]
async fn test_register_and_login_flow() {
    let (app, _) = setup_test_app().await;

    let (status, body) = register(&app, "ana").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["username"], "ana");
    assert_eq!(body["user"]["is_staff"], false);
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["token"].as_str().is_some());

    let (status, body) = register(&app, "ana").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "username");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login/",
        None,
        Some(json!({ "username": "ana", "password": "Lemon-Tree-42" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, profile) = send(&app, "GET", "/api/auth/profile/", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "ana@example.com");
    assert_eq!(profile["first_name"], "Test");

    // Wrong password and unknown user look the same
    let (status, wrong) = send(
        &app,
        "POST",
        "/api/auth/login/",
        None,
        Some(json!({ "username": "ana", "password": "wrong_password" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, unknown) = send(
        &app,
        "POST",
        "/api/auth/login/",
        None,
        Some(json!({ "username": "nobody", "password": "wrong_password" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong, unknown);
    assert_eq!(wrong["error"], "Invalid credentials.");
}

#[tokio::test]
async fn test_register_validation() {
    let (app, _) = setup_test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register/",
        None,
        Some(json!({
            "username": "ben",
            "email": "ben@example.com",
            "password": "Lemon-Tree-42",
            "password2": "Lemon-Tree-43"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password fields didn't match.");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register/",
        None,
        Some(json!({
            "username": "ben",
            "email": "not-an-email",
            "password": "Lemon-Tree-42",
            "password2": "Lemon-Tree-42"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "email");
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let (app, _) = setup_test_app().await;

    let (_, body) = register(&app, "ana").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "POST", "/api/auth/logout/", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/auth/profile/", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A fresh login works again
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login/",
        None,
        Some(json!({ "username": "ana", "password": "Lemon-Tree-42" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        "GET",
        "/api/auth/profile/",
        body["token"].as_str(),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_anonymous_access() {
    let (app, _) = setup_test_app().await;

    // Menu is public
    let (status, body) = send(&app, "GET", "/api/menu-items/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    for uri in ["/api/categories/", "/api/tables/", "/api/bookings/", "/api/orders/"] {
        let (status, _) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let (status, _) = send(&app, "GET", "/api/orders/", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_staff_only_writes() {
    let (app, state) = setup_test_app().await;

    let (_, body) = register(&app, "ana").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/categories/",
        Some(&token),
        Some(json!({ "name": "Specials" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "permission_denied");

    let (status, _) = send(
        &app,
        "POST",
        "/api/tables/",
        Some(&token),
        Some(json!({ "number": 11, "capacity": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/api/dashboard/stats/", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Promote and retry with a fresh token
    let ana = little_lemon::services::auth_service::authenticate(
        state.db(),
        little_lemon::services::auth_service::LoginInput {
            username: "ana".to_string(),
            password: "Lemon-Tree-42".to_string(),
        },
    )
    .await
    .unwrap();
    let mut active: user::ActiveModel = ana.into();
    active.is_staff = Set(true);
    let staff = active.update(state.db()).await.unwrap();
    let staff_token = create_jwt(&staff, &state.config.jwt_secret, 1).unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/categories/",
        Some(&staff_token),
        Some(json!({ "name": "Specials" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["menu_items_count"], 0);
}
