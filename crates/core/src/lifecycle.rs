//! Case card status state machine.
//!
//! This module lives in `core` (zero internal deps) so the transition guards
//! can be unit tested without a database. The API layer runs each guard
//! against a row it has already locked with `SELECT ... FOR UPDATE`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle status of a case card. Stored as upper-case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardStatus {
    Draft,
    Active,
    Deprecated,
    Deleted,
}

impl CardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Deprecated => "DEPRECATED",
            Self::Deleted => "DELETED",
        }
    }

    /// Content edits, reverts, and locks are refused in these states.
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Deprecated | Self::Deleted)
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "ACTIVE" => Ok(Self::Active),
            "DEPRECATED" => Ok(Self::Deprecated),
            "DELETED" => Ok(Self::Deleted),
            other => Err(CoreError::Validation(format!(
                "Invalid status '{other}'. Must be one of: DRAFT, ACTIVE, DEPRECATED, DELETED"
            ))),
        }
    }
}

/// Guard for `activate`.
///
/// Tombstoned cards are refused along with ACTIVE and DEPRECATED ones: a
/// DELETED card is read-only everywhere.
pub fn validate_activate(status: CardStatus) -> Result<(), CoreError> {
    match status {
        CardStatus::Draft => Ok(()),
        CardStatus::Active => Err(CoreError::InvalidState(
            "Case card is already active".into(),
        )),
        CardStatus::Deprecated => Err(CoreError::InvalidState(
            "Deprecated case cards cannot be reactivated".into(),
        )),
        CardStatus::Deleted => Err(CoreError::InvalidState(
            "Deleted case cards cannot be activated".into(),
        )),
    }
}

/// Guard for `deactivate` (ACTIVE -> DEPRECATED).
pub fn validate_deactivate(status: CardStatus) -> Result<(), CoreError> {
    match status {
        CardStatus::Deprecated => Err(CoreError::InvalidState(
            "Case card is already deprecated".into(),
        )),
        CardStatus::Deleted => Err(CoreError::InvalidState(
            "Deleted case cards cannot be deactivated".into(),
        )),
        CardStatus::Draft => Err(CoreError::InvalidState(
            "Only active case cards can be deactivated".into(),
        )),
        CardStatus::Active => Ok(()),
    }
}

/// Guard for `delete` (any non-DELETED -> DELETED).
pub fn validate_delete(status: CardStatus) -> Result<(), CoreError> {
    if status == CardStatus::Deleted {
        return Err(CoreError::InvalidState(
            "Case card is already deleted".into(),
        ));
    }
    Ok(())
}

/// Guard shared by `update`, `revert`, and lock acquisition.
pub fn validate_editable(status: CardStatus) -> Result<(), CoreError> {
    if status.is_read_only() {
        return Err(CoreError::InvalidState(format!(
            "Case card is {status} and can no longer be edited"
        )));
    }
    Ok(())
}

/// Require a non-blank free-text field such as a reason or change summary.
pub fn require_text(field: &str, value: Option<&str>) -> Result<String, CoreError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CoreError::Validation(format!("{field} is required"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_status() {
        for s in [
            CardStatus::Draft,
            CardStatus::Active,
            CardStatus::Deprecated,
            CardStatus::Deleted,
        ] {
            assert_eq!(s.as_str().parse::<CardStatus>().unwrap(), s);
        }
    }

    #[test]
    fn parse_rejects_lowercase() {
        assert!("active".parse::<CardStatus>().is_err());
    }

    #[test]
    fn draft_can_be_activated() {
        assert!(validate_activate(CardStatus::Draft).is_ok());
    }

    #[test]
    fn active_cannot_be_activated_again() {
        let err = validate_activate(CardStatus::Active).unwrap_err();
        assert!(err.to_string().contains("already active"));
    }

    #[test]
    fn deprecated_cannot_be_reactivated() {
        let err = validate_activate(CardStatus::Deprecated).unwrap_err();
        assert!(err.to_string().contains("reactivated"));
    }

    #[test]
    fn deleted_cannot_be_activated() {
        assert!(validate_activate(CardStatus::Deleted).is_err());
    }

    #[test]
    fn only_active_can_be_deactivated() {
        assert!(validate_deactivate(CardStatus::Active).is_ok());
        assert!(validate_deactivate(CardStatus::Draft).is_err());
        assert!(validate_deactivate(CardStatus::Deprecated).is_err());
        assert!(validate_deactivate(CardStatus::Deleted).is_err());
    }

    #[test]
    fn delete_allowed_until_tombstoned() {
        assert!(validate_delete(CardStatus::Draft).is_ok());
        assert!(validate_delete(CardStatus::Active).is_ok());
        assert!(validate_delete(CardStatus::Deprecated).is_ok());
        assert!(validate_delete(CardStatus::Deleted).is_err());
    }

    #[test]
    fn edits_blocked_on_read_only_statuses() {
        assert!(validate_editable(CardStatus::Draft).is_ok());
        assert!(validate_editable(CardStatus::Active).is_ok());
        assert!(validate_editable(CardStatus::Deprecated).is_err());
        assert!(validate_editable(CardStatus::Deleted).is_err());
    }

    #[test]
    fn require_text_trims_and_rejects_blank() {
        assert_eq!(require_text("reason", Some("  obsolete ")).unwrap(), "obsolete");
        assert!(require_text("reason", Some("   ")).is_err());
        let err = require_text("reason", None).unwrap_err();
        assert!(err.to_string().contains("reason is required"));
    }
}
