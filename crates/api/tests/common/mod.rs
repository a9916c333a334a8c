//! Shared helpers for the HTTP integration tests.
//!
//! [`build_test_app`] goes through [`build_app_router`], so tests exercise the
//! same middleware stack as the binary.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use casecard_api::auth::jwt::{generate_access_token, JwtConfig};
use casecard_api::config::ServerConfig;
use casecard_api::router::build_app_router;
use casecard_api::state::AppState;
use casecard_core::governance::Actor;
use casecard_core::types::DbId;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        lock_duration_mins: 30,
        jwt: JwtConfig {
            secret: "test-secret-for-integration-tests".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

/// One facility with a user per role and a scheduled surgical case.
pub struct Seed {
    pub facility_id: DbId,
    pub admin: Actor,
    pub surgeon: Actor,
    pub other_surgeon: Actor,
    pub circulator: Actor,
    pub scrub: Actor,
    pub scheduler: Actor,
    pub surgical_case_id: DbId,
}

pub async fn seed(pool: &PgPool) -> Seed {
    let (facility_id,): (DbId,) =
        sqlx::query_as("INSERT INTO facilities (name) VALUES ('Lakeview Surgery Center') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();

    let (surgical_case_id,): (DbId,) = sqlx::query_as(
        "INSERT INTO surgical_cases (facility_id, procedure_name, scheduled_at) \
         VALUES ($1, 'Total Knee Arthroplasty', NOW()) RETURNING id",
    )
    .bind(facility_id)
    .fetch_one(pool)
    .await
    .unwrap();

    Seed {
        facility_id,
        admin: insert_user(pool, facility_id, "Pat Admin", "ADMIN").await,
        surgeon: insert_user(pool, facility_id, "Dr. Okafor", "SURGEON").await,
        other_surgeon: insert_user(pool, facility_id, "Dr. Lindqvist", "SURGEON").await,
        circulator: insert_user(pool, facility_id, "Sam Circulator", "CIRCULATOR").await,
        scrub: insert_user(pool, facility_id, "Jo Scrub", "SCRUB").await,
        scheduler: insert_user(pool, facility_id, "Lee Scheduler", "SCHEDULER").await,
        surgical_case_id,
    }
}

pub async fn insert_user(pool: &PgPool, facility_id: DbId, name: &str, role: &str) -> Actor {
    let (user_id,): (DbId,) = sqlx::query_as(
        "INSERT INTO users (facility_id, name, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(facility_id)
    .bind(name)
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap();

    Actor {
        user_id,
        facility_id,
        name: name.to_string(),
        role: role.to_string(),
    }
}

pub async fn insert_surgical_case(pool: &PgPool, facility_id: DbId) -> DbId {
    let (id,): (DbId,) = sqlx::query_as(
        "INSERT INTO surgical_cases (facility_id, procedure_name, scheduled_at) \
         VALUES ($1, 'Total Knee Arthroplasty', NOW()) RETURNING id",
    )
    .bind(facility_id)
    .fetch_one(pool)
    .await
    .unwrap();
    id
}

pub fn token(actor: &Actor) -> String {
    generate_access_token(actor, &test_config().jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    actor: Option<&Actor>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header("Authorization", format!("Bearer {}", token(actor)));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_as(app: Router, uri: &str, actor: &Actor) -> Response<Body> {
    send(app, Method::GET, uri, Some(actor), None).await
}

pub async fn post_as(app: Router, uri: &str, actor: &Actor, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(actor), Some(body)).await
}

pub async fn post_empty_as(app: Router, uri: &str, actor: &Actor) -> Response<Body> {
    send(app, Method::POST, uri, Some(actor), None).await
}

pub async fn put_as(app: Router, uri: &str, actor: &Actor, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(actor), Some(body)).await
}

pub async fn delete_as(app: Router, uri: &str, actor: &Actor, body: Option<Value>) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(actor), body).await
}

/// Read the full body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Case card shortcuts
// ---------------------------------------------------------------------------

/// Create a DRAFT card through the API and return its `data` object.
pub async fn create_card(pool: &PgPool, actor: &Actor, surgeon_id: DbId, name: &str) -> Value {
    let app = build_test_app(pool.clone());
    let response = post_as(
        app,
        "/api/v1/case-cards",
        actor,
        serde_json::json!({
            "surgeon_id": surgeon_id,
            "procedure_name": name,
            "procedure_codes": ["27447"],
            "default_duration_minutes": 120,
            "content": content(
                serde_json::json!({"trays": ["Knee Major", "Zimmer Persona"]}),
                "Tourniquet at 250",
            ),
        }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

pub async fn activate(pool: &PgPool, actor: &Actor, card_id: i64) -> Response<Body> {
    let app = build_test_app(pool.clone());
    post_empty_as(app, &format!("/api/v1/case-cards/{card_id}/activate"), actor).await
}

/// A complete eight-section snapshot varying only instrumentation and notes.
pub fn content(instrumentation: Value, surgeon_notes: &str) -> Value {
    serde_json::json!({
        "header_info": {"laterality": "right"},
        "patient_flags": {},
        "instrumentation": instrumentation,
        "equipment": {"c_arm": false},
        "supplies": {},
        "medications": {"antibiotic": "cefazolin 2g"},
        "setup_positioning": {"position": "supine"},
        "surgeon_notes": surgeon_notes,
    })
}

/// Full-snapshot update with the given bump and section payload.
pub async fn update_card(
    pool: &PgPool,
    actor: &Actor,
    card_id: i64,
    bump: &str,
    content: Value,
) -> Response<Body> {
    let app = build_test_app(pool.clone());
    put_as(
        app,
        &format!("/api/v1/case-cards/{card_id}"),
        actor,
        serde_json::json!({
            "change_summary": "Updated instrumentation",
            "version_bump": bump,
            "content": content,
        }),
    )
    .await
}

pub async fn edit_log(pool: &PgPool, actor: &Actor, card_id: i64) -> Vec<Value> {
    let app = build_test_app(pool.clone());
    let response = get_as(app, &format!("/api/v1/case-cards/{card_id}/edit-log"), actor).await;
    body_json(response).await["data"]
        .as_array()
        .cloned()
        .unwrap_or_default()
}
