//! Semantic version arithmetic for case card content snapshots.
//!
//! Every snapshot is identified by a `major.minor.patch` triple. New cards
//! (including clones) start at `1.0.0`; edits bump according to
//! [`VersionBump`]; reverts always take a patch bump on top of the current
//! version.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A `major.minor.patch` version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SemVer {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
}

/// Which component of the version an edit increments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
    Major,
    Minor,
    #[default]
    Patch,
}

impl SemVer {
    /// Version assigned to the first snapshot of any new card.
    pub const INITIAL: SemVer = SemVer {
        major: 1,
        minor: 0,
        patch: 0,
    };

    pub fn new(major: i32, minor: i32, patch: i32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The version following `self` under `bump`.
    pub fn bump(self, bump: VersionBump) -> Self {
        match bump {
            VersionBump::Major => Self::new(self.major + 1, 0, 0),
            VersionBump::Minor => Self::new(self.major, self.minor + 1, 0),
            VersionBump::Patch => Self::new(self.major, self.minor, self.patch + 1),
        }
    }

    /// The version produced by reverting while at `self`.
    pub fn for_revert(self) -> Self {
        self.bump(VersionBump::Patch)
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemVer {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::Validation(format!("Invalid version number '{s}'"));

        let mut parts = s.split('.');
        let mut next = || -> Result<i32, CoreError> {
            let part = parts.next().ok_or_else(invalid)?;
            let value: i32 = part.parse().map_err(|_| invalid())?;
            if value < 0 {
                return Err(invalid());
            }
            Ok(value)
        };
        let version = Self::new(next()?, next()?, next()?);

        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}
