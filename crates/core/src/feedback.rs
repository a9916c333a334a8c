//! Post-case feedback review actions and validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::content::normalize_ordered_set;
use crate::error::CoreError;
use crate::types::Timestamp;

/// Maximum number of entries in `items_unused` / `items_missing`.
pub const MAX_FEEDBACK_ITEMS: usize = 200;

/// Maximum length of any free-text feedback field.
pub const MAX_FEEDBACK_TEXT_LEN: usize = 4000;

/// The outcome an admin records when reviewing feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewAction {
    Acknowledged,
    Applied,
    Dismissed,
}

impl ReviewAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::Applied => "APPLIED",
            Self::Dismissed => "DISMISSED",
        }
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize an item list and enforce the size cap.
pub fn validate_items(field: &str, items: &[String]) -> Result<Vec<String>, CoreError> {
    let items = normalize_ordered_set(items);
    if items.len() > MAX_FEEDBACK_ITEMS {
        return Err(CoreError::Validation(format!(
            "{field} may contain at most {MAX_FEEDBACK_ITEMS} entries"
        )));
    }
    Ok(items)
}

/// Trim an optional free-text field; blank becomes `None`.
pub fn validate_text(field: &str, value: Option<&str>) -> Result<Option<String>, CoreError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > MAX_FEEDBACK_TEXT_LEN => Err(CoreError::Validation(
            format!("{field} must be at most {MAX_FEEDBACK_TEXT_LEN} characters"),
        )),
        Some(v) => Ok(Some(v.to_string())),
    }
}

/// Review is at-most-once.
pub fn validate_reviewable(reviewed_at: Option<Timestamp>) -> Result<(), CoreError> {
    if reviewed_at.is_some() {
        return Err(CoreError::InvalidState(
            "Feedback has already been reviewed".into(),
        ));
    }
    Ok(())
}
