//! Append-only guarantees for `case_card_versions` and `case_card_edit_log`.

mod common;

use casecard_core::edit_log::{verify_chain, EditAction};
use casecard_db::models::edit_log::NewEditLogEntry;
use casecard_db::repositories::EditLog;
use sqlx::PgPool;

fn entry(case_card_id: i64, editor_user_id: i64, action: EditAction, summary: &str) -> NewEditLogEntry {
    NewEditLogEntry {
        case_card_id,
        editor_user_id,
        editor_name: "Dr. Reyes".to_string(),
        editor_role: "SURGEON".to_string(),
        action,
        change_summary: summary.to_string(),
        reason_for_change: None,
        previous_version_id: None,
        new_version_id: None,
    }
}

/// Assert the error came from `trigger_reject_mutation`.
fn assert_rejected(err: sqlx::Error) {
    let db_err = err.as_database_error().expect("expected a database error");
    assert_eq!(db_err.code().as_deref(), Some("23001"));
    assert!(db_err.message().contains("append-only"));
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_version_update_is_rejected(pool: PgPool) {
    let fx = common::seed(&pool).await;
    let card = common::insert_card(&pool, &fx, "Total Knee").await;

    let err = sqlx::query("UPDATE case_card_versions SET surgeon_notes = 'edited' WHERE case_card_id = $1")
        .bind(card.id)
        .execute(&pool)
        .await
        .unwrap_err();
    assert_rejected(err);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_version_delete_is_rejected(pool: PgPool) {
    let fx = common::seed(&pool).await;
    let card = common::insert_card(&pool, &fx, "Total Knee").await;

    let err = sqlx::query("DELETE FROM case_card_versions WHERE case_card_id = $1")
        .bind(card.id)
        .execute(&pool)
        .await
        .unwrap_err();
    assert_rejected(err);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_version_truncate_is_rejected(pool: PgPool) {
    let fx = common::seed(&pool).await;
    let card = common::insert_card(&pool, &fx, "Total Knee").await;

    // CASCADE gets past the foreign keys; the versions trigger fires first.
    let err = sqlx::query("TRUNCATE case_card_versions CASCADE")
        .execute(&pool)
        .await
        .unwrap_err();
    let db_err = err.as_database_error().expect("expected a database error");
    assert!(db_err.message().starts_with("case_card_versions is append-only"));
    assert_rejected(err);

    let (remaining,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM case_card_versions WHERE case_card_id = $1")
            .bind(card.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_version_number_is_rejected(pool: PgPool) {
    let fx = common::seed(&pool).await;
    let card = common::insert_card(&pool, &fx, "Total Knee").await;

    let err = sqlx::query(
        "INSERT INTO case_card_versions (case_card_id, version_number, created_by_user_id) \
         VALUES ($1, '1.0.0', $2)",
    )
    .bind(card.id)
    .bind(fx.surgeon_id)
    .execute(&pool)
    .await
    .unwrap_err();

    let db_err = err.as_database_error().unwrap();
    assert_eq!(db_err.constraint(), Some("uq_case_card_versions_number"));
}

// ---------------------------------------------------------------------------
// Edit log
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_edit_log_update_delete_truncate_are_rejected(pool: PgPool) {
    let fx = common::seed(&pool).await;
    let card = common::insert_card(&pool, &fx, "Total Knee").await;

    let mut conn = pool.acquire().await.unwrap();
    EditLog::append(&mut conn, &entry(card.id, fx.surgeon_id, EditAction::Create, "Created"))
        .await
        .unwrap();

    let err = sqlx::query("UPDATE case_card_edit_log SET change_summary = 'rewritten'")
        .execute(&pool)
        .await
        .unwrap_err();
    assert_rejected(err);

    let err = sqlx::query("DELETE FROM case_card_edit_log")
        .execute(&pool)
        .await
        .unwrap_err();
    assert_rejected(err);

    let err = sqlx::query("TRUNCATE case_card_edit_log")
        .execute(&pool)
        .await
        .unwrap_err();
    assert_rejected(err);

    assert_eq!(EditLog::list(&pool, card.id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_edit_log_lists_in_append_order_per_card(pool: PgPool) {
    let fx = common::seed(&pool).await;
    let knee = common::insert_card(&pool, &fx, "Total Knee").await;
    let hip = common::insert_card(&pool, &fx, "Total Hip").await;

    let mut conn = pool.acquire().await.unwrap();
    EditLog::append(&mut conn, &entry(knee.id, fx.surgeon_id, EditAction::Create, "one"))
        .await
        .unwrap();
    EditLog::append(&mut conn, &entry(hip.id, fx.surgeon_id, EditAction::Create, "other card"))
        .await
        .unwrap();
    EditLog::append(&mut conn, &entry(knee.id, fx.surgeon_id, EditAction::Activate, "two"))
        .await
        .unwrap();

    let entries = EditLog::list(&pool, knee.id).await.unwrap();
    let summaries: Vec<&str> = entries.iter().map(|e| e.change_summary.as_str()).collect();
    assert_eq!(summaries, ["one", "two"]);
    assert_eq!(entries[1].action_type, "ACTIVATE");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_hash_chain_verifies_and_detects_tampering(pool: PgPool) {
    let fx = common::seed(&pool).await;
    let card = common::insert_card(&pool, &fx, "Total Knee").await;

    let mut conn = pool.acquire().await.unwrap();
    for (action, summary) in [
        (EditAction::Create, "Created"),
        (EditAction::Update, "Added tourniquet"),
        (EditAction::Activate, "Activated"),
    ] {
        EditLog::append(&mut conn, &entry(card.id, fx.surgeon_id, action, summary))
            .await
            .unwrap();
    }

    let entries = EditLog::list(&pool, card.id).await.unwrap();
    let result = verify_chain(
        entries
            .iter()
            .map(|e| (e.id, e.hashed_fields(), e.integrity_hash.as_str())),
    );
    assert!(result.chain_valid);
    assert_eq!(result.verified_entries, 3);

    // Tamper with the middle entry behind the trigger's back.
    let tampered_id = entries[1].id;
    sqlx::query("ALTER TABLE case_card_edit_log DISABLE TRIGGER reject_mutation")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE case_card_edit_log SET change_summary = 'nothing to see' WHERE id = $1")
        .bind(tampered_id)
        .execute(&pool)
        .await
        .unwrap();

    let entries = EditLog::list(&pool, card.id).await.unwrap();
    let result = verify_chain(
        entries
            .iter()
            .map(|e| (e.id, e.hashed_fields(), e.integrity_hash.as_str())),
    );
    assert!(!result.chain_valid);
    assert_eq!(result.verified_entries, 1);
    assert_eq!(result.first_break, Some(tampered_id));
}
