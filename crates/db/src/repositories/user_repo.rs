//! Read-only lookups against `users`.

use casecard_core::types::DbId;
use sqlx::postgres::PgExecutor;

use crate::models::user::User;

const COLUMNS: &str = "id, facility_id, name, role, is_active, created_at, updated_at";

pub struct UserRepo;

impl UserRepo {
    /// Find a user within a facility.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        facility_id: DbId,
        id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1 AND facility_id = $2");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(facility_id)
            .fetch_optional(executor)
            .await
    }
}
