//! Capability-restricted access to append-only tables.
//!
//! [`AppendOnlyLog`] exposes exactly two operations, `append` and `list`.
//! There is no update or delete path in this crate for any table behind it,
//! and the migrations back that up with triggers that reject `UPDATE`,
//! `DELETE`, and `TRUNCATE`.

use std::future::Future;
use std::marker::PhantomData;

use casecard_core::types::DbId;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, PgPool};

/// A record type stored in an append-only table.
pub trait AppendOnlyRecord: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    /// Input for a single append.
    type New: Sync;

    /// Table name.
    const TABLE: &'static str;

    /// Column list for SELECT queries.
    const COLUMNS: &'static str;

    /// Column that scopes a listing (e.g. the owning card id).
    const SCOPE_COLUMN: &'static str;

    /// Insert one record. Implementations must only ever `INSERT`.
    fn insert(
        conn: &mut PgConnection,
        new: &Self::New,
    ) -> impl Future<Output = Result<Self, sqlx::Error>> + Send;
}

/// Zero-sized handle over an append-only table of `T`.
pub struct AppendOnlyLog<T>(PhantomData<fn() -> T>);

impl<T: AppendOnlyRecord> AppendOnlyLog<T> {
    /// Append a record inside the caller's unit of work.
    pub async fn append(conn: &mut PgConnection, new: &T::New) -> Result<T, sqlx::Error> {
        T::insert(conn, new).await
    }

    /// All records for `scope_id`, oldest first.
    pub async fn list(pool: &PgPool, scope_id: DbId) -> Result<Vec<T>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {} WHERE {} = $1 ORDER BY id ASC",
            T::COLUMNS,
            T::TABLE,
            T::SCOPE_COLUMN
        );
        sqlx::query_as::<_, T>(&query)
            .bind(scope_id)
            .fetch_all(pool)
            .await
    }
}
