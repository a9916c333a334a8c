//! Immutable case card content snapshots.

use casecard_core::content::CaseCardContent;
use casecard_core::error::CoreError;
use casecard_core::types::{DbId, Timestamp};
use casecard_core::versioning::SemVer;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `case_card_versions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CaseCardVersion {
    pub id: DbId,
    pub case_card_id: DbId,
    pub version_number: String,
    pub header_info: serde_json::Value,
    pub patient_flags: serde_json::Value,
    pub instrumentation: serde_json::Value,
    pub equipment: serde_json::Value,
    pub supplies: serde_json::Value,
    pub medications: serde_json::Value,
    pub setup_positioning: serde_json::Value,
    pub surgeon_notes: Option<String>,
    pub created_by_user_id: DbId,
    pub created_at: Timestamp,
}

impl CaseCardVersion {
    /// The eight content sections of this snapshot.
    pub fn content(&self) -> CaseCardContent {
        CaseCardContent {
            header_info: self.header_info.clone(),
            patient_flags: self.patient_flags.clone(),
            instrumentation: self.instrumentation.clone(),
            equipment: self.equipment.clone(),
            supplies: self.supplies.clone(),
            medications: self.medications.clone(),
            setup_positioning: self.setup_positioning.clone(),
            surgeon_notes: self.surgeon_notes.clone(),
        }
    }

    /// The stored `MAJOR.MINOR.PATCH` label, parsed.
    pub fn semver(&self) -> Result<SemVer, CoreError> {
        self.version_number.parse()
    }
}

/// Lightweight history row without section payloads.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VersionSummary {
    pub id: DbId,
    pub case_card_id: DbId,
    pub version_number: String,
    pub created_by_user_id: DbId,
    pub created_at: Timestamp,
}

/// Query for `GET /case-cards/{id}/versions/compare`.
#[derive(Debug, Deserialize)]
pub struct CompareVersionsQuery {
    pub from: DbId,
    pub to: DbId,
}
