//! Case card content sections and header-field validation.
//!
//! A version snapshot always carries all eight sections. Structured sections
//! are free-form JSON objects whose inner shape belongs to the front end;
//! this module only enforces that they are objects.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum length of a procedure name.
pub const MAX_PROCEDURE_NAME_LEN: usize = 255;

/// Maximum length of a single procedure code.
pub const MAX_PROCEDURE_CODE_LEN: usize = 32;

/// Maximum number of procedure codes per card.
pub const MAX_PROCEDURE_CODES: usize = 50;

/// Upper bound for `default_duration_minutes` (24 hours).
pub const MAX_DURATION_MINUTES: i32 = 1440;

/// Section names in display order. Used for comparison output.
pub const SECTION_NAMES: [&str; 8] = [
    "header_info",
    "patient_flags",
    "instrumentation",
    "equipment",
    "supplies",
    "medications",
    "setup_positioning",
    "surgeon_notes",
];

/// The eight content sections of a case card snapshot. Request bodies must
/// carry all eight; there are no partial updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseCardContent {
    pub header_info: serde_json::Value,
    pub patient_flags: serde_json::Value,
    pub instrumentation: serde_json::Value,
    pub equipment: serde_json::Value,
    pub supplies: serde_json::Value,
    pub medications: serde_json::Value,
    pub setup_positioning: serde_json::Value,
    pub surgeon_notes: Option<String>,
}

impl Default for CaseCardContent {
    fn default() -> Self {
        let empty = || serde_json::Value::Object(serde_json::Map::new());
        Self {
            header_info: empty(),
            patient_flags: empty(),
            instrumentation: empty(),
            equipment: empty(),
            supplies: empty(),
            medications: empty(),
            setup_positioning: empty(),
            surgeon_notes: None,
        }
    }
}

impl CaseCardContent {
    fn structured(&self) -> [(&'static str, &serde_json::Value); 7] {
        [
            ("header_info", &self.header_info),
            ("patient_flags", &self.patient_flags),
            ("instrumentation", &self.instrumentation),
            ("equipment", &self.equipment),
            ("supplies", &self.supplies),
            ("medications", &self.medications),
            ("setup_positioning", &self.setup_positioning),
        ]
    }

    /// Every structured section must be a JSON object.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, value) in self.structured() {
            if !value.is_object() {
                return Err(CoreError::Validation(format!(
                    "Section '{name}' must be a JSON object"
                )));
            }
        }
        Ok(())
    }

    /// Names of the sections whose content differs between `self` and `other`.
    pub fn changed_sections(&self, other: &CaseCardContent) -> Vec<&'static str> {
        let mut changed: Vec<&'static str> = self
            .structured()
            .iter()
            .zip(other.structured().iter())
            .filter(|((_, a), (_, b))| a != b)
            .map(|((name, _), _)| *name)
            .collect();
        if self.surgeon_notes != other.surgeon_notes {
            changed.push("surgeon_notes");
        }
        changed
    }
}

// ---------------------------------------------------------------------------
// Header field validation
// ---------------------------------------------------------------------------

/// Validate and trim a procedure name.
pub fn validate_procedure_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("procedure_name is required".into()));
    }
    if trimmed.chars().count() > MAX_PROCEDURE_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "procedure_name must be at most {MAX_PROCEDURE_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate an optional default duration.
pub fn validate_duration(minutes: Option<i32>) -> Result<(), CoreError> {
    match minutes {
        Some(m) if m <= 0 || m > MAX_DURATION_MINUTES => Err(CoreError::Validation(format!(
            "default_duration_minutes must be between 1 and {MAX_DURATION_MINUTES}, got {m}"
        ))),
        _ => Ok(()),
    }
}

/// Normalize an ordered set of strings: trim entries, drop blanks, and keep
/// only the first occurrence of each value.
pub fn normalize_ordered_set(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let trimmed = item.trim();
        if !trimmed.is_empty() && !out.iter().any(|existing| existing == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Normalize and bound-check procedure codes.
pub fn validate_procedure_codes(codes: &[String]) -> Result<Vec<String>, CoreError> {
    let codes = normalize_ordered_set(codes);
    if codes.len() > MAX_PROCEDURE_CODES {
        return Err(CoreError::Validation(format!(
            "At most {MAX_PROCEDURE_CODES} procedure codes are allowed"
        )));
    }
    if let Some(code) = codes.iter().find(|c| c.len() > MAX_PROCEDURE_CODE_LEN) {
        return Err(CoreError::Validation(format!(
            "Procedure code '{code}' exceeds {MAX_PROCEDURE_CODE_LEN} characters"
        )));
    }
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_content_is_valid() {
        assert!(CaseCardContent::default().validate().is_ok());
    }

    #[test]
    fn non_object_section_is_rejected() {
        let content = CaseCardContent {
            equipment: json!(["c-arm"]),
            ..CaseCardContent::default()
        };
        let err = content.validate().unwrap_err();
        assert!(err.to_string().contains("equipment"));
    }

    #[test]
    fn unknown_section_fails_to_deserialize() {
        let mut raw = serde_json::to_value(CaseCardContent::default()).unwrap();
        raw["sterilization"] = json!({});
        assert!(serde_json::from_value::<CaseCardContent>(raw).is_err());
    }

    #[test]
    fn missing_section_fails_to_deserialize() {
        let mut raw = serde_json::to_value(CaseCardContent::default()).unwrap();
        raw.as_object_mut().unwrap().remove("supplies");
        assert!(serde_json::from_value::<CaseCardContent>(raw).is_err());
    }

    #[test]
    fn changed_sections_lists_only_differences() {
        let a = CaseCardContent::default();
        let b = CaseCardContent {
            supplies: json!({"gauze": 10}),
            surgeon_notes: Some("prefers 3-0 vicryl".into()),
            ..CaseCardContent::default()
        };
        assert_eq!(a.changed_sections(&b), vec!["supplies", "surgeon_notes"]);
        assert!(a.changed_sections(&a.clone()).is_empty());
    }

    #[test]
    fn procedure_name_is_trimmed_and_required() {
        assert_eq!(validate_procedure_name("  Lap Chole ").unwrap(), "Lap Chole");
        assert!(validate_procedure_name("   ").is_err());
        assert!(validate_procedure_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn duration_bounds() {
        assert!(validate_duration(None).is_ok());
        assert!(validate_duration(Some(90)).is_ok());
        assert!(validate_duration(Some(0)).is_err());
        assert!(validate_duration(Some(MAX_DURATION_MINUTES + 1)).is_err());
    }

    #[test]
    fn ordered_set_keeps_first_occurrence() {
        let items = vec![
            " 47562 ".to_string(),
            "".to_string(),
            "47563".to_string(),
            "47562".to_string(),
        ];
        assert_eq!(normalize_ordered_set(&items), vec!["47562", "47563"]);
    }

    #[test]
    fn overlong_procedure_code_rejected() {
        assert!(validate_procedure_codes(&["x".repeat(33)]).is_err());
    }
}
