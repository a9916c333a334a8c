//! Edit-log action constants and integrity hashing.
//!
//! Each card's edit log forms its own SHA-256 hash chain: an entry's
//! `integrity_hash` covers the previous entry's hash plus the entry's own
//! canonical content, so any retroactive change is detectable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::hashing;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Action types
// ---------------------------------------------------------------------------

/// What a lifecycle operation did to a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditAction {
    Create,
    Update,
    Activate,
    Deactivate,
    Delete,
    Revert,
    Clone,
}

impl EditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Activate => "ACTIVATE",
            Self::Deactivate => "DEACTIVATE",
            Self::Delete => "DELETE",
            Self::Revert => "REVERT",
            Self::Clone => "CLONE",
        }
    }
}

impl fmt::Display for EditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "ACTIVATE" => Ok(Self::Activate),
            "DEACTIVATE" => Ok(Self::Deactivate),
            "DELETE" => Ok(Self::Delete),
            "REVERT" => Ok(Self::Revert),
            "CLONE" => Ok(Self::Clone),
            other => Err(CoreError::Validation(format!(
                "Unknown edit action '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Integrity hash computation
// ---------------------------------------------------------------------------

/// Known seed value for the first entry in each card's chain.
const CHAIN_SEED: &str = "CASE_CARD_EDIT_LOG_SEED_V1";

/// The fields covered by an entry's integrity hash.
#[derive(Debug, Clone)]
pub struct HashedFields<'a> {
    pub case_card_id: DbId,
    pub editor_user_id: DbId,
    pub action_type: &'a str,
    pub change_summary: &'a str,
    pub reason_for_change: Option<&'a str>,
    pub previous_version_id: Option<DbId>,
    pub new_version_id: Option<DbId>,
    pub edited_at: Timestamp,
}

impl HashedFields<'_> {
    /// Canonical, order-stable serialization of the hashed fields.
    pub fn canonical(&self) -> String {
        let opt = |v: Option<DbId>| v.map(|id| id.to_string()).unwrap_or_default();
        serde_json::json!([
            self.case_card_id,
            self.editor_user_id,
            self.action_type,
            self.change_summary,
            self.reason_for_change,
            opt(self.previous_version_id),
            opt(self.new_version_id),
            self.edited_at.timestamp_micros(),
        ])
        .to_string()
    }
}

/// Compute the SHA-256 integrity hash for an edit-log entry.
///
/// `prev_hash` is the integrity_hash of the card's previous entry, or `None`
/// for the first entry (which chains from a known seed).
pub fn compute_integrity_hash(prev_hash: Option<&str>, entry: &HashedFields<'_>) -> String {
    let prev = prev_hash.unwrap_or(CHAIN_SEED);
    let combined = format!("{prev}|{}", entry.canonical());
    hashing::sha256_hex(combined.as_bytes())
}

/// Result of verifying one card's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainVerification {
    pub verified_entries: usize,
    pub chain_valid: bool,
    /// Id of the first entry whose stored hash does not match.
    pub first_break: Option<DbId>,
}

/// Walk entries in insertion order, recomputing each hash.
pub fn verify_chain<'a, I>(entries: I) -> ChainVerification
where
    I: IntoIterator<Item = (DbId, HashedFields<'a>, &'a str)>,
{
    let mut prev: Option<String> = None;
    let mut verified_entries = 0;

    for (id, fields, stored_hash) in entries {
        let expected = compute_integrity_hash(prev.as_deref(), &fields);
        if expected != stored_hash {
            return ChainVerification {
                verified_entries,
                chain_valid: false,
                first_break: Some(id),
            };
        }
        verified_entries += 1;
        prev = Some(expected);
    }

    ChainVerification {
        verified_entries,
        chain_valid: true,
        first_break: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
