//! Post-case feedback: submission, duplicate guard, admin review, and the
//! review queue.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, create_card, edit_log, get_as, post_as, Seed};
use serde_json::{json, Value};
use sqlx::PgPool;

async fn submit(pool: &PgPool, seed: &Seed, card_id: i64, surgical_case_id: i64) -> Value {
    let app = build_test_app(pool.clone());
    let response = post_as(
        app,
        &format!("/api/v1/case-cards/{card_id}/feedback"),
        &seed.scrub,
        json!({"surgical_case_id": surgical_case_id, "setup_issues": "Bed rotated late"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

async fn review(pool: &PgPool, seed: &Seed, feedback_id: i64, action: &str) -> axum::response::Response {
    let app = build_test_app(pool.clone());
    post_as(
        app,
        &format!("/api/v1/feedback/{feedback_id}/review"),
        &seed.admin,
        json!({"action": action, "notes": "Added to next revision"}),
    )
    .await
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_submit_normalizes_items(pool: PgPool) {
    let seed = common::seed(&pool).await;
    let card = create_card(&pool, &seed.surgeon, seed.surgeon.user_id, "Total Knee").await;
    let card_id = card["id"].as_i64().unwrap();

    let app = build_test_app(pool.clone());
    let response = post_as(
        app,
        &format!("/api/v1/case-cards/{card_id}/feedback"),
        &seed.circulator,
        json!({
            "surgical_case_id": seed.surgical_case_id,
            "items_unused": ["Laparotomy sponges", " Laparotomy sponges ", ""],
            "items_missing": ["Bone wax"],
            "staff_comments": "   ",
            "suggested_changes": "Pull the 4.5 drill bit",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let feedback = body_json(response).await["data"].clone();
    assert_eq!(feedback["case_card_id"], card_id);
    assert_eq!(feedback["submitted_by_user_id"], seed.circulator.user_id);
    assert_eq!(feedback["items_unused"], json!(["Laparotomy sponges"]));
    assert_eq!(feedback["items_missing"], json!(["Bone wax"]));
    assert!(feedback["staff_comments"].is_null());
    assert!(feedback["reviewed_at"].is_null());

    // Feedback does not touch the card's audit trail.
    assert_eq!(edit_log(&pool, &seed.surgeon, card_id).await.len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_second_submission_for_same_case_is_rejected(pool: PgPool) {
    let seed = common::seed(&pool).await;
    let card = create_card(&pool, &seed.surgeon, seed.surgeon.user_id, "Total Knee").await;
    let card_id = card["id"].as_i64().unwrap();

    submit(&pool, &seed, card_id, seed.surgical_case_id).await;

    let app = build_test_app(pool.clone());
    let response = post_as(
        app,
        &format!("/api/v1/case-cards/{card_id}/feedback"),
        &seed.circulator,
        json!({"surgical_case_id": seed.surgical_case_id}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().contains("already been submitted"));

    // A different case for the same card is fine.
    let other_case = common::insert_surgical_case(&pool, seed.facility_id).await;
    submit(&pool, &seed, card_id, other_case).await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_submit_requires_existing_card_and_case(pool: PgPool) {
    let seed = common::seed(&pool).await;
    let card = create_card(&pool, &seed.surgeon, seed.surgeon.user_id, "Total Knee").await;
    let card_id = card["id"].as_i64().unwrap();
    let elsewhere = common::seed(&pool).await;

    for (uri_card, case_id) in [
        (999_999, seed.surgical_case_id),
        (card_id, 999_999),
        (card_id, elsewhere.surgical_case_id),
    ] {
        let app = build_test_app(pool.clone());
        let response = post_as(
            app,
            &format!("/api/v1/case-cards/{uri_card}/feedback"),
            &seed.scrub,
            json!({"surgical_case_id": case_id}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "card {uri_card} case {case_id}");
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_any_role_may_submit(pool: PgPool) {
    let seed = common::seed(&pool).await;
    let card = create_card(&pool, &seed.surgeon, seed.surgeon.user_id, "Total Knee").await;

    let app = build_test_app(pool.clone());
    let response = post_as(
        app,
        &format!("/api/v1/case-cards/{}/feedback", card["id"]),
        &seed.scheduler,
        json!({"surgical_case_id": seed.surgical_case_id}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_review_is_admin_only_and_happens_once(pool: PgPool) {
    let seed = common::seed(&pool).await;
    let card = create_card(&pool, &seed.surgeon, seed.surgeon.user_id, "Total Knee").await;
    let feedback = submit(&pool, &seed, card["id"].as_i64().unwrap(), seed.surgical_case_id).await;
    let feedback_id = feedback["id"].as_i64().unwrap();

    let app = build_test_app(pool.clone());
    let response = post_as(
        app,
        &format!("/api/v1/feedback/{feedback_id}/review"),
        &seed.surgeon,
        json!({"action": "APPLIED"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = review(&pool, &seed, feedback_id, "APPLIED").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["review_action"], "APPLIED");
    assert_eq!(json["data"]["reviewed_by_user_id"], seed.admin.user_id);
    assert_eq!(json["data"]["review_notes"], "Added to next revision");
    assert!(json["data"]["reviewed_at"].is_string());

    let response = review(&pool, &seed, feedback_id, "DISMISSED").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_STATE");
    assert!(json["error"].as_str().unwrap().contains("already been reviewed"));

    let (action,): (String,) =
        sqlx::query_as("SELECT review_action FROM case_card_feedback WHERE id = $1")
            .bind(feedback_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(action, "APPLIED");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_review_unknown_feedback_or_action(pool: PgPool) {
    let seed = common::seed(&pool).await;

    let response = review(&pool, &seed, 999_999, "ACKNOWLEDGED").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let card = create_card(&pool, &seed.surgeon, seed.surgeon.user_id, "Total Knee").await;
    let feedback = submit(&pool, &seed, card["id"].as_i64().unwrap(), seed.surgical_case_id).await;
    let response = review(&pool, &seed, feedback["id"].as_i64().unwrap(), "IGNORED").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_queue_lists_pending_for_admins(pool: PgPool) {
    let seed = common::seed(&pool).await;
    let knee = create_card(&pool, &seed.surgeon, seed.surgeon.user_id, "Total Knee").await;
    let hip = create_card(&pool, &seed.surgeon, seed.surgeon.user_id, "Total Hip").await;
    let first = submit(&pool, &seed, knee["id"].as_i64().unwrap(), seed.surgical_case_id).await;
    let second = submit(&pool, &seed, hip["id"].as_i64().unwrap(), seed.surgical_case_id).await;

    review(&pool, &seed, first["id"].as_i64().unwrap(), "ACKNOWLEDGED").await;

    let app = build_test_app(pool.clone());
    let response = get_as(app, "/api/v1/feedback", &seed.scrub).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = build_test_app(pool.clone());
    let response = get_as(app, "/api/v1/feedback", &seed.admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let all = body_json(response).await["data"].as_array().unwrap().len();
    assert_eq!(all, 2);

    let app = build_test_app(pool.clone());
    let response = get_as(app, "/api/v1/feedback?pending=true", &seed.admin).await;
    let json = body_json(response).await;
    let pending = json["data"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], second["id"]);

    // Per-card listing is open to every role.
    let app = build_test_app(pool.clone());
    let response = get_as(
        app,
        &format!("/api/v1/case-cards/{}/feedback", knee["id"]),
        &seed.scheduler,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["review_action"], "ACKNOWLEDGED");
}
