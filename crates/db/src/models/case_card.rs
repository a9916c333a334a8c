//! Case card header model and request DTOs.

use casecard_core::content::CaseCardContent;
use casecard_core::error::CoreError;
use casecard_core::lifecycle::CardStatus;
use casecard_core::lock::EditLock;
use casecard_core::types::{DbId, Timestamp};
use casecard_core::versioning::{SemVer, VersionBump};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// CaseCard
// ---------------------------------------------------------------------------

/// A row from the `case_cards` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CaseCard {
    pub id: DbId,
    pub facility_id: DbId,
    pub surgeon_id: DbId,
    pub procedure_name: String,
    pub procedure_codes: Vec<String>,
    pub case_type: Option<String>,
    pub default_duration_minutes: Option<i32>,
    pub turnover_notes: Option<String>,
    pub status: String,
    pub version_major: i32,
    pub version_minor: i32,
    pub version_patch: i32,
    pub current_version_id: Option<DbId>,
    pub lock_holder_user_id: Option<DbId>,
    pub locked_at: Option<Timestamp>,
    pub lock_expires_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
    pub deleted_by_user_id: Option<DbId>,
    pub delete_reason: Option<String>,
    pub created_by_user_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CaseCard {
    pub fn card_status(&self) -> Result<CardStatus, CoreError> {
        self.status.parse()
    }

    pub fn version(&self) -> SemVer {
        SemVer::new(self.version_major, self.version_minor, self.version_patch)
    }

    /// The stored lock, whether or not it has expired.
    pub fn lock(&self) -> Option<EditLock> {
        EditLock::from_columns(self.lock_holder_user_id, self.locked_at, self.lock_expires_at)
    }
}

/// Header fields written when inserting a new card.
#[derive(Debug, Clone)]
pub struct NewCaseCard {
    pub facility_id: DbId,
    pub surgeon_id: DbId,
    pub procedure_name: String,
    pub procedure_codes: Vec<String>,
    pub case_type: Option<String>,
    pub default_duration_minutes: Option<i32>,
    pub turnover_notes: Option<String>,
    pub created_by_user_id: DbId,
}

/// Header fields written by an edit. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct HeaderPatch {
    pub procedure_name: Option<String>,
    pub procedure_codes: Option<Vec<String>>,
    pub case_type: Option<String>,
    pub default_duration_minutes: Option<i32>,
    pub turnover_notes: Option<String>,
}

/// Filters for listing a facility's cards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseCardListQuery {
    pub status: Option<String>,
    pub surgeon_id: Option<DbId>,
    /// Case-insensitive substring match on procedure name.
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body for `POST /case-cards`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCaseCard {
    pub surgeon_id: DbId,
    pub procedure_name: String,
    #[serde(default)]
    pub procedure_codes: Vec<String>,
    pub case_type: Option<String>,
    pub default_duration_minutes: Option<i32>,
    pub turnover_notes: Option<String>,
    #[serde(default)]
    pub content: CaseCardContent,
}

/// Body for `PUT /case-cards/{id}`. `content` is a full snapshot; header
/// fields left out keep their stored values.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCaseCard {
    pub change_summary: Option<String>,
    pub reason_for_change: Option<String>,
    #[serde(default)]
    pub version_bump: VersionBump,
    pub procedure_name: Option<String>,
    pub procedure_codes: Option<Vec<String>>,
    pub case_type: Option<String>,
    pub default_duration_minutes: Option<i32>,
    pub turnover_notes: Option<String>,
    pub content: CaseCardContent,
}

/// Body for deactivate and delete, which both require a reason.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

/// Body for `POST /case-cards/{id}/clone`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloneCaseCard {
    pub target_surgeon_id: DbId,
    /// Defaults to the source card's procedure name.
    pub procedure_name: Option<String>,
}

/// Body for `POST /case-cards/{id}/revert`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevertCaseCard {
    pub target_version_id: DbId,
    pub reason: Option<String>,
}
