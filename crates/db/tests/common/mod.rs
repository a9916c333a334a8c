//! Fixtures shared by the storage tests.

use casecard_core::content::CaseCardContent;
use casecard_core::types::DbId;
use casecard_core::versioning::SemVer;
use casecard_db::models::case_card::{CaseCard, HeaderPatch, NewCaseCard};
use casecard_db::repositories::{CaseCardRepo, CaseCardVersionRepo};
use sqlx::PgPool;

pub struct Fixture {
    pub facility_id: DbId,
    pub surgeon_id: DbId,
}

/// Insert a facility and one active surgeon.
pub async fn seed(pool: &PgPool) -> Fixture {
    let (facility_id,): (DbId,) =
        sqlx::query_as("INSERT INTO facilities (name) VALUES ('Northside ASC') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
    let (surgeon_id,): (DbId,) = sqlx::query_as(
        "INSERT INTO users (facility_id, name, role) VALUES ($1, 'Dr. Reyes', 'SURGEON') RETURNING id",
    )
    .bind(facility_id)
    .fetch_one(pool)
    .await
    .unwrap();
    Fixture {
        facility_id,
        surgeon_id,
    }
}

/// Insert a DRAFT card with a 1.0.0 snapshot, the way `create` does.
pub async fn insert_card(pool: &PgPool, fx: &Fixture, procedure_name: &str) -> CaseCard {
    let mut tx = pool.begin().await.unwrap();
    let card = CaseCardRepo::insert(
        &mut tx,
        &NewCaseCard {
            facility_id: fx.facility_id,
            surgeon_id: fx.surgeon_id,
            procedure_name: procedure_name.to_string(),
            procedure_codes: vec!["27447".to_string()],
            case_type: None,
            default_duration_minutes: Some(90),
            turnover_notes: None,
            created_by_user_id: fx.surgeon_id,
        },
    )
    .await
    .unwrap();
    let version = CaseCardVersionRepo::insert(
        &mut tx,
        card.id,
        SemVer::INITIAL,
        &CaseCardContent::default(),
        fx.surgeon_id,
    )
    .await
    .unwrap();
    let card = CaseCardRepo::set_current_version(
        &mut tx,
        card.id,
        version.id,
        SemVer::INITIAL,
        &HeaderPatch::default(),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    card
}
