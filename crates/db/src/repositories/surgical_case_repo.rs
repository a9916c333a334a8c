//! Read-only lookups against `surgical_cases`.

use casecard_core::types::DbId;
use sqlx::postgres::PgExecutor;

use crate::models::surgical_case::SurgicalCase;

const COLUMNS: &str = "id, facility_id, procedure_name, scheduled_at, created_at, updated_at";

pub struct SurgicalCaseRepo;

impl SurgicalCaseRepo {
    /// Find a surgical case within a facility.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        facility_id: DbId,
        id: DbId,
    ) -> Result<Option<SurgicalCase>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM surgical_cases WHERE id = $1 AND facility_id = $2");
        sqlx::query_as::<_, SurgicalCase>(&query)
            .bind(id)
            .bind(facility_id)
            .fetch_optional(executor)
            .await
    }
}
