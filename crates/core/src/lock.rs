//! Advisory, time-boxed edit lock for case cards.
//!
//! The lock is a plain value stored on the card row. There is no background
//! expiry task: callers evaluate [`EditLock::is_expired`] at the start of
//! each operation and clear the fields when it returns `true`.

use chrono::Duration;
use serde::Serialize;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Lock duration constants
// ---------------------------------------------------------------------------

/// Default lock duration in minutes (30 minutes).
pub const DEFAULT_LOCK_DURATION_MINS: i64 = 30;

/// Maximum allowed lock duration in minutes (4 hours).
pub const MAX_LOCK_DURATION_MINS: i64 = 240;

/// Minimum lock duration in minutes (1 minute).
pub const MIN_LOCK_DURATION_MINS: i64 = 1;

// ---------------------------------------------------------------------------
// Lock value object
// ---------------------------------------------------------------------------

/// A held edit reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditLock {
    pub holder_user_id: DbId,
    pub locked_at: Timestamp,
    pub expires_at: Timestamp,
}

impl EditLock {
    /// Rebuild a lock from the three nullable row columns. A partially
    /// populated triple is treated as unlocked.
    pub fn from_columns(
        holder_user_id: Option<DbId>,
        locked_at: Option<Timestamp>,
        expires_at: Option<Timestamp>,
    ) -> Option<Self> {
        match (holder_user_id, locked_at, expires_at) {
            (Some(holder_user_id), Some(locked_at), Some(expires_at)) => Some(Self {
                holder_user_id,
                locked_at,
                expires_at,
            }),
            _ => None,
        }
    }

    /// Expired strictly after `expires_at`; a lock expiring exactly at `now`
    /// is still live.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Whether this lock prevents `user_id` from editing at `now`.
    pub fn blocks(&self, user_id: DbId, now: Timestamp) -> bool {
        self.holder_user_id != user_id && !self.is_expired(now)
    }
}

/// Drop a lock that has expired by `now`.
pub fn live_lock(current: Option<EditLock>, now: Timestamp) -> Option<EditLock> {
    current.filter(|lock| !lock.is_expired(now))
}

/// Compute the lock resulting from `user_id` acquiring at `now`.
///
/// Re-acquiring as the current holder refreshes the window. Fails with
/// [`CoreError::Locked`] when a different user holds an unexpired lock.
pub fn acquire(
    current: Option<&EditLock>,
    user_id: DbId,
    now: Timestamp,
    duration_mins: i64,
) -> Result<EditLock, CoreError> {
    if let Some(lock) = current {
        if lock.blocks(user_id, now) {
            return Err(CoreError::Locked {
                holder_user_id: lock.holder_user_id,
                holder_name: None,
                expires_at: lock.expires_at,
            });
        }
    }

    Ok(EditLock {
        holder_user_id: user_id,
        locked_at: now,
        expires_at: now + Duration::minutes(duration_mins),
    })
}

/// Outcome of a release request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// The caller held the lock; the fields must be cleared.
    Released,
    /// Nothing to release.
    NotLocked,
}

/// Decide whether `user_id` may release the current lock.
///
/// Only the holder may release a live lock. An absent or expired lock is a
/// no-op success.
pub fn release(
    current: Option<&EditLock>,
    user_id: DbId,
    now: Timestamp,
) -> Result<Release, CoreError> {
    match current {
        Some(lock) if !lock.is_expired(now) => {
            if lock.holder_user_id != user_id {
                return Err(CoreError::Forbidden(format!(
                    "Lock is held by user {}; only the holder can release it",
                    lock.holder_user_id
                )));
            }
            Ok(Release::Released)
        }
        _ => Ok(Release::NotLocked),
    }
}

/// Edit-path check: fail if a different user holds an unexpired lock. The
/// editor itself does not need to hold the lock.
pub fn ensure_not_blocked(
    current: Option<&EditLock>,
    user_id: DbId,
    now: Timestamp,
) -> Result<(), CoreError> {
    match current {
        Some(lock) if lock.blocks(user_id, now) => Err(CoreError::Locked {
            holder_user_id: lock.holder_user_id,
            holder_name: None,
            expires_at: lock.expires_at,
        }),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate a lock duration in minutes. Returns `Ok(())` or an error message.
pub fn validate_lock_duration(minutes: i64) -> Result<(), String> {
    if minutes < MIN_LOCK_DURATION_MINS {
        return Err(format!(
            "Lock duration must be at least {MIN_LOCK_DURATION_MINS} minute(s), got {minutes}"
        ));
    }
    if minutes > MAX_LOCK_DURATION_MINS {
        return Err(format!(
            "Lock duration must be at most {MAX_LOCK_DURATION_MINS} minutes, got {minutes}"
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(minute: u32) -> Timestamp {
        chrono::Utc
            .with_ymd_and_hms(2026, 3, 1, 9, minute, 0)
            .single()
            .unwrap()
    }

    fn held_by(user_id: DbId, at: Timestamp) -> EditLock {
        acquire(None, user_id, at, DEFAULT_LOCK_DURATION_MINS).unwrap()
    }

    // -----------------------------------------------------------------------
    // Expiry
    // -----------------------------------------------------------------------

    #[test]
    fn expiry_is_thirty_minutes_after_acquire() {
        let lock = held_by(1, t(0));
        assert_eq!(lock.locked_at, t(0));
        assert_eq!(lock.expires_at, t(30));
    }

    #[test]
    fn lock_expiring_exactly_now_is_not_expired() {
        let lock = held_by(1, t(0));
        assert!(!lock.is_expired(t(30)));
        assert!(lock.is_expired(t(30) + Duration::seconds(1)));
    }

    #[test]
    fn live_lock_drops_expired() {
        let lock = held_by(1, t(0));
        assert!(live_lock(Some(lock.clone()), t(10)).is_some());
        assert!(live_lock(Some(lock), t(31)).is_none());
    }

    #[test]
    fn from_columns_requires_all_three() {
        assert!(EditLock::from_columns(Some(1), Some(t(0)), None).is_none());
        assert!(EditLock::from_columns(None, None, None).is_none());
        assert!(EditLock::from_columns(Some(1), Some(t(0)), Some(t(30))).is_some());
    }

    // -----------------------------------------------------------------------
    // Acquire
    // -----------------------------------------------------------------------

    #[test]
    fn other_user_gets_locked_error_with_holder_and_expiry() {
        let lock = held_by(1, t(0));
        let err = acquire(Some(&lock), 2, t(10), DEFAULT_LOCK_DURATION_MINS).unwrap_err();
        match err {
            CoreError::Locked {
                holder_user_id,
                expires_at,
                ..
            } => {
                assert_eq!(holder_user_id, 1);
                assert_eq!(expires_at, t(30));
            }
            other => panic!("expected Locked, got {other:?}"),
        }
    }

    #[test]
    fn holder_reacquire_strictly_extends_expiry() {
        let first = held_by(1, t(0));
        let second = acquire(Some(&first), 1, t(5), DEFAULT_LOCK_DURATION_MINS).unwrap();
        assert_eq!(second.holder_user_id, 1);
        assert!(second.expires_at > first.expires_at);
    }

    #[test]
    fn other_user_may_take_over_expired_lock() {
        let lock = held_by(1, t(0));
        let taken = acquire(Some(&lock), 2, t(31), DEFAULT_LOCK_DURATION_MINS).unwrap();
        assert_eq!(taken.holder_user_id, 2);
    }

    #[test]
    fn boundary_instant_still_blocks_other_user() {
        let lock = held_by(1, t(0));
        assert!(acquire(Some(&lock), 2, t(30), DEFAULT_LOCK_DURATION_MINS).is_err());
    }

    // -----------------------------------------------------------------------
    // Release
    // -----------------------------------------------------------------------

    #[test]
    fn holder_releases() {
        let lock = held_by(1, t(0));
        assert_eq!(release(Some(&lock), 1, t(1)).unwrap(), Release::Released);
    }

    #[test]
    fn non_holder_cannot_release() {
        let lock = held_by(1, t(0));
        assert!(matches!(
            release(Some(&lock), 2, t(1)).unwrap_err(),
            CoreError::Forbidden(_)
        ));
    }

    #[test]
    fn releasing_unlocked_card_is_noop() {
        assert_eq!(release(None, 2, t(1)).unwrap(), Release::NotLocked);
        let stale = held_by(1, t(0));
        assert_eq!(release(Some(&stale), 2, t(45)).unwrap(), Release::NotLocked);
    }

    // -----------------------------------------------------------------------
    // Edit path
    // -----------------------------------------------------------------------

    #[test]
    fn editor_without_lock_may_edit_unlocked_card() {
        assert!(ensure_not_blocked(None, 5, t(0)).is_ok());
    }

    #[test]
    fn holder_may_edit() {
        let lock = held_by(5, t(0));
        assert!(ensure_not_blocked(Some(&lock), 5, t(1)).is_ok());
    }

    #[test]
    fn other_holder_blocks_edit() {
        let lock = held_by(1, t(0));
        assert!(matches!(
            ensure_not_blocked(Some(&lock), 2, t(29)),
            Err(CoreError::Locked { holder_user_id: 1, .. })
        ));
        assert!(ensure_not_blocked(Some(&lock), 2, t(31)).is_ok());
    }

    // -----------------------------------------------------------------------
    // Lock duration validation
    // -----------------------------------------------------------------------

    #[test]
    fn test_valid_lock_durations() {
        assert!(validate_lock_duration(1).is_ok());
        assert!(validate_lock_duration(30).is_ok());
        assert!(validate_lock_duration(240).is_ok());
    }

    #[test]
    fn test_lock_duration_too_short() {
        let result = validate_lock_duration(0);
        assert!(result.unwrap_err().contains("at least"));
    }

    #[test]
    fn test_lock_duration_too_long() {
        let result = validate_lock_duration(241);
        assert!(result.unwrap_err().contains("at most"));
    }

    #[test]
    fn test_default_lock_duration_in_valid_range() {
        assert!(validate_lock_duration(DEFAULT_LOCK_DURATION_MINS).is_ok());
    }
}
