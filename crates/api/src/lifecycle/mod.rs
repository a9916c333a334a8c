//! Case card lifecycle operations.
//!
//! Each mutating operation is one unit of work: it checks governance first,
//! opens a transaction, row-locks the card (and for activation every card
//! sharing its key), re-validates lock and status against the locked rows,
//! writes the new state plus exactly one edit-log entry, and commits.

pub mod feedback;

use casecard_core::content::{
    validate_duration, validate_procedure_codes, validate_procedure_name, CaseCardContent,
    SECTION_NAMES,
};
use casecard_core::edit_log::{verify_chain, ChainVerification, EditAction};
use casecard_core::error::CoreError;
use casecard_core::governance::{authorize, Action, Actor};
use casecard_core::lifecycle::{
    require_text, validate_activate, validate_deactivate, validate_delete, validate_editable,
    CardStatus,
};
use casecard_core::lock::{self, live_lock, EditLock, Release};
use casecard_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use casecard_core::roles::ROLE_SURGEON;
use casecard_core::types::{DbId, Timestamp};
use casecard_core::versioning::SemVer;
use casecard_db::models::case_card::{
    CaseCard, CaseCardListQuery, CloneCaseCard, CreateCaseCard, HeaderPatch, NewCaseCard,
    ReasonRequest, RevertCaseCard, UpdateCaseCard,
};
use casecard_db::models::case_card_version::{CaseCardVersion, VersionSummary};
use casecard_db::models::edit_log::{EditLogEntry, NewEditLogEntry};
use casecard_db::repositories::{CaseCardRepo, CaseCardVersionRepo, EditLog, UserRepo};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A card header plus its formatted version number.
#[derive(Debug, Serialize)]
pub struct CaseCardView {
    #[serde(flatten)]
    pub card: CaseCard,
    pub version: String,
}

impl From<CaseCard> for CaseCardView {
    fn from(card: CaseCard) -> Self {
        let version = card.version().to_string();
        Self { card, version }
    }
}

/// Live lock status with the holder's display name.
#[derive(Debug, Serialize)]
pub struct LockInfo {
    pub holder_user_id: DbId,
    pub holder_name: Option<String>,
    pub locked_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Card detail: header, current content snapshot, and lock.
#[derive(Debug, Serialize)]
pub struct CaseCardDetail {
    #[serde(flatten)]
    pub card: CaseCardView,
    pub current_version: Option<CaseCardVersion>,
    pub lock: Option<LockInfo>,
}

/// Result of `activate`.
#[derive(Debug, Serialize)]
pub struct Activation {
    #[serde(flatten)]
    pub card: CaseCardView,
    /// Cards moved from ACTIVE to DEPRECATED by this activation.
    pub deprecated_card_ids: Vec<DbId>,
}

/// Section-level comparison of two versions of one card.
#[derive(Debug, Serialize)]
pub struct VersionComparison {
    pub from: VersionSummary,
    pub to: VersionSummary,
    pub changed_sections: Vec<&'static str>,
    pub unchanged_sections: Vec<&'static str>,
}

// ---------------------------------------------------------------------------
// Lifecycle service
// ---------------------------------------------------------------------------

/// Zero-sized entry point for every case card operation.
pub struct CaseCardLifecycle;

impl CaseCardLifecycle {
    // -- Reads --------------------------------------------------------------

    /// List the actor's facility cards with optional filters.
    pub async fn list(
        pool: &PgPool,
        actor: &Actor,
        query: &CaseCardListQuery,
    ) -> AppResult<Vec<CaseCardView>> {
        let status = query
            .status
            .as_deref()
            .map(str::parse::<CardStatus>)
            .transpose()?;
        let name_contains = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
        let limit = clamp_limit(query.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
        let offset = clamp_offset(query.offset);

        CaseCardRepo::clear_expired_locks_for_facility(pool, actor.facility_id, chrono::Utc::now())
            .await?;
        let cards = CaseCardRepo::list(
            pool,
            actor.facility_id,
            status,
            query.surgeon_id,
            name_contains,
            limit,
            offset,
        )
        .await?;

        Ok(cards.into_iter().map(CaseCardView::from).collect())
    }

    /// Card detail with current content and live lock.
    pub async fn get(pool: &PgPool, actor: &Actor, id: DbId) -> AppResult<CaseCardDetail> {
        let card = load_card(pool, actor, id).await?;
        let mut conn = pool.acquire().await?;
        detail(&mut conn, card).await
    }

    /// Current lock, if any.
    pub async fn lock_status(pool: &PgPool, actor: &Actor, id: DbId) -> AppResult<Option<LockInfo>> {
        let card = load_card(pool, actor, id).await?;
        let mut conn = pool.acquire().await?;
        lock_info(&mut conn, &card, card.lock()).await
    }

    /// Version history, oldest first.
    pub async fn versions(pool: &PgPool, actor: &Actor, id: DbId) -> AppResult<Vec<VersionSummary>> {
        let card = load_card(pool, actor, id).await?;
        Ok(CaseCardVersionRepo::list_for_card(pool, card.id).await?)
    }

    /// One historical snapshot.
    pub async fn version(
        pool: &PgPool,
        actor: &Actor,
        id: DbId,
        version_id: DbId,
    ) -> AppResult<CaseCardVersion> {
        let card = load_card(pool, actor, id).await?;
        find_version(pool, card.id, version_id).await
    }

    /// Compare two snapshots of the same card section by section.
    pub async fn compare(
        pool: &PgPool,
        actor: &Actor,
        id: DbId,
        from_id: DbId,
        to_id: DbId,
    ) -> AppResult<VersionComparison> {
        let card = load_card(pool, actor, id).await?;
        let from = find_version(pool, card.id, from_id).await?;
        let to = find_version(pool, card.id, to_id).await?;

        let changed_sections = from.content().changed_sections(&to.content());
        let unchanged_sections = SECTION_NAMES
            .iter()
            .copied()
            .filter(|name| !changed_sections.contains(name))
            .collect();

        Ok(VersionComparison {
            from: summary(&from),
            to: summary(&to),
            changed_sections,
            unchanged_sections,
        })
    }

    /// The card's audit trail, oldest first.
    pub async fn edit_log(pool: &PgPool, actor: &Actor, id: DbId) -> AppResult<Vec<EditLogEntry>> {
        let card = load_card(pool, actor, id).await?;
        Ok(EditLog::list(pool, card.id).await?)
    }

    /// Recompute the card's edit-log hash chain.
    pub async fn verify_edit_log(
        pool: &PgPool,
        actor: &Actor,
        id: DbId,
    ) -> AppResult<ChainVerification> {
        let card = load_card(pool, actor, id).await?;
        let entries = EditLog::list(pool, card.id).await?;
        let result = verify_chain(
            entries
                .iter()
                .map(|e| (e.id, e.hashed_fields(), e.integrity_hash.as_str())),
        );
        if !result.chain_valid {
            tracing::warn!(
                case_card_id = card.id,
                first_break = ?result.first_break,
                "Edit log hash chain is broken"
            );
        }
        Ok(result)
    }

    // -- Create / clone -----------------------------------------------------

    /// Create a DRAFT card at version 1.0.0.
    pub async fn create(
        pool: &PgPool,
        actor: &Actor,
        input: CreateCaseCard,
    ) -> AppResult<CaseCardDetail> {
        authorize(actor, Action::Create, None)?;

        let procedure_name = validate_procedure_name(&input.procedure_name)?;
        let procedure_codes = validate_procedure_codes(&input.procedure_codes)?;
        validate_duration(input.default_duration_minutes)?;
        input.content.validate()?;

        let mut tx = pool.begin().await?;

        ensure_surgeon(&mut tx, actor.facility_id, input.surgeon_id).await?;
        ensure_name_free(&mut tx, actor.facility_id, input.surgeon_id, &procedure_name).await?;

        let new_card = NewCaseCard {
            facility_id: actor.facility_id,
            surgeon_id: input.surgeon_id,
            procedure_name,
            procedure_codes,
            case_type: trim_opt(input.case_type),
            default_duration_minutes: input.default_duration_minutes,
            turnover_notes: trim_opt(input.turnover_notes),
            created_by_user_id: actor.user_id,
        };
        let (card, version) = insert_with_first_version(&mut tx, &new_card, &input.content).await?;

        EditLog::append(
            &mut tx,
            &log_entry(
                actor,
                card.id,
                EditAction::Create,
                format!(
                    "Created case card '{}' at version {}",
                    card.procedure_name, version.version_number
                ),
                None,
                None,
                Some(version.id),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = actor.user_id,
            case_card_id = card.id,
            surgeon_id = card.surgeon_id,
            "Case card created"
        );

        Ok(CaseCardDetail {
            card: card.into(),
            current_version: Some(version),
            lock: None,
        })
    }

    /// Seed a new DRAFT card from any card's current content.
    pub async fn clone_card(
        pool: &PgPool,
        actor: &Actor,
        source_id: DbId,
        input: CloneCaseCard,
    ) -> AppResult<CaseCardDetail> {
        authorize(actor, Action::Clone, None)?;

        let mut tx = pool.begin().await?;

        let source = CaseCardRepo::find_by_id(&mut *tx, actor.facility_id, source_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "case_card",
                id: source_id,
            })?;
        drop_expired_lock(&mut tx, &source, chrono::Utc::now()).await?;
        let source_version = current_version(&mut tx, &source).await?;

        let procedure_name = match input.procedure_name.as_deref() {
            Some(name) => validate_procedure_name(name)?,
            None => source.procedure_name.clone(),
        };

        ensure_surgeon(&mut tx, actor.facility_id, input.target_surgeon_id).await?;
        ensure_name_free(&mut tx, actor.facility_id, input.target_surgeon_id, &procedure_name)
            .await?;

        let new_card = NewCaseCard {
            facility_id: actor.facility_id,
            surgeon_id: input.target_surgeon_id,
            procedure_name,
            procedure_codes: source.procedure_codes.clone(),
            case_type: source.case_type.clone(),
            default_duration_minutes: source.default_duration_minutes,
            turnover_notes: source.turnover_notes.clone(),
            created_by_user_id: actor.user_id,
        };
        let (card, version) =
            insert_with_first_version(&mut tx, &new_card, &source_version.content()).await?;

        EditLog::append(
            &mut tx,
            &log_entry(
                actor,
                card.id,
                EditAction::Clone,
                format!(
                    "Cloned from case card {} version {}",
                    source.id, source_version.version_number
                ),
                None,
                None,
                Some(version.id),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = actor.user_id,
            case_card_id = card.id,
            source_case_card_id = source.id,
            "Case card cloned"
        );

        Ok(CaseCardDetail {
            card: card.into(),
            current_version: Some(version),
            lock: None,
        })
    }

    // -- Content edits ------------------------------------------------------

    /// Store a new full snapshot and bump the version.
    pub async fn update(
        pool: &PgPool,
        actor: &Actor,
        id: DbId,
        input: UpdateCaseCard,
    ) -> AppResult<CaseCardDetail> {
        authorize(actor, Action::Update, None)?;

        let change_summary = require_text("change_summary", input.change_summary.as_deref())?;
        input.content.validate()?;
        validate_duration(input.default_duration_minutes)?;
        let header = HeaderPatch {
            procedure_name: input
                .procedure_name
                .as_deref()
                .map(validate_procedure_name)
                .transpose()?,
            procedure_codes: input
                .procedure_codes
                .as_deref()
                .map(validate_procedure_codes)
                .transpose()?,
            case_type: trim_opt(input.case_type),
            default_duration_minutes: input.default_duration_minutes,
            turnover_notes: trim_opt(input.turnover_notes),
        };

        let mut tx = pool.begin().await?;
        let now = chrono::Utc::now();

        let card = lock_card(&mut tx, actor, id).await?;
        validate_editable(card.card_status()?)?;
        ensure_lock_allows(&mut tx, &card, actor, now).await?;
        if let Some(name) = header.procedure_name.as_deref() {
            ensure_rename_allowed(&mut tx, &card, name).await?;
        }

        let next = card.version().bump(input.version_bump);
        let version =
            CaseCardVersionRepo::insert(&mut tx, card.id, next, &input.content, actor.user_id)
                .await?;
        let updated =
            CaseCardRepo::set_current_version(&mut tx, card.id, version.id, next, &header).await?;

        EditLog::append(
            &mut tx,
            &log_entry(
                actor,
                card.id,
                EditAction::Update,
                change_summary,
                trim_opt(input.reason_for_change),
                card.current_version_id,
                Some(version.id),
            ),
        )
        .await?;

        let lock = lock_info(&mut tx, &updated, updated.lock()).await?;
        tx.commit().await?;

        tracing::info!(
            user_id = actor.user_id,
            case_card_id = card.id,
            from = %card.version(),
            to = %next,
            "Case card updated"
        );

        Ok(CaseCardDetail {
            card: updated.into(),
            current_version: Some(version),
            lock,
        })
    }

    /// Restore an earlier snapshot's content as a new patch version.
    pub async fn revert(
        pool: &PgPool,
        actor: &Actor,
        id: DbId,
        input: RevertCaseCard,
    ) -> AppResult<CaseCardDetail> {
        authorize(actor, Action::Revert, None)?;
        let reason = require_text("reason", input.reason.as_deref())?;

        let mut tx = pool.begin().await?;
        let now = chrono::Utc::now();

        let card = lock_card(&mut tx, actor, id).await?;
        validate_editable(card.card_status()?)?;
        ensure_lock_allows(&mut tx, &card, actor, now).await?;

        let target = find_version(&mut *tx, card.id, input.target_version_id).await?;
        let target_version = target.semver()?;
        let next = card.version().for_revert();
        let version =
            CaseCardVersionRepo::insert(&mut tx, card.id, next, &target.content(), actor.user_id)
                .await?;
        let updated = CaseCardRepo::set_current_version(
            &mut tx,
            card.id,
            version.id,
            next,
            &HeaderPatch::default(),
        )
        .await?;

        EditLog::append(
            &mut tx,
            &log_entry(
                actor,
                card.id,
                EditAction::Revert,
                format!("Reverted to version {target_version} as {next}"),
                Some(reason),
                card.current_version_id,
                Some(version.id),
            ),
        )
        .await?;

        let lock = lock_info(&mut tx, &updated, updated.lock()).await?;
        tx.commit().await?;

        tracing::info!(
            user_id = actor.user_id,
            case_card_id = card.id,
            target_version_id = target.id,
            from = %target_version,
            to = %next,
            "Case card reverted"
        );

        Ok(CaseCardDetail {
            card: updated.into(),
            current_version: Some(version),
            lock,
        })
    }

    // -- Status transitions -------------------------------------------------

    /// DRAFT -> ACTIVE, deprecating any other ACTIVE card with the same key.
    pub async fn activate(pool: &PgPool, actor: &Actor, id: DbId) -> AppResult<Activation> {
        authorize(actor, Action::Activate, None)?;

        let mut tx = pool.begin().await?;

        let unlocked = CaseCardRepo::find_by_id(&mut *tx, actor.facility_id, id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "case_card",
                id,
            })?;

        // Serialize with renames onto the key, lock the whole key in id
        // order, then re-read the target from the locked set.
        CaseCardRepo::lock_name_key(
            &mut tx,
            unlocked.facility_id,
            unlocked.surgeon_id,
            &unlocked.procedure_name,
        )
        .await?;
        let siblings = CaseCardRepo::lock_siblings(
            &mut tx,
            unlocked.facility_id,
            unlocked.surgeon_id,
            &unlocked.procedure_name,
        )
        .await?;
        let card = siblings
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| {
                CoreError::Conflict("Case card was renamed concurrently; retry".into())
            })?;

        validate_activate(card.card_status()?)?;
        drop_expired_lock(&mut tx, &card, chrono::Utc::now()).await?;

        let active_ids: Vec<DbId> = siblings
            .iter()
            .filter(|c| c.id != card.id && c.status == CardStatus::Active.as_str())
            .map(|c| c.id)
            .collect();
        let deprecated_card_ids = CaseCardRepo::deprecate_active(&mut tx, &active_ids).await?;
        let activated = CaseCardRepo::set_status(&mut tx, card.id, CardStatus::Active).await?;

        let mut summary = format!("Activated version {}", card.version());
        if !deprecated_card_ids.is_empty() {
            let ids: Vec<String> = deprecated_card_ids.iter().map(ToString::to_string).collect();
            summary.push_str(&format!("; deprecated case card(s) {}", ids.join(", ")));
        }

        EditLog::append(
            &mut tx,
            &log_entry(
                actor,
                card.id,
                EditAction::Activate,
                summary,
                None,
                card.current_version_id,
                card.current_version_id,
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = actor.user_id,
            case_card_id = card.id,
            deprecated = ?deprecated_card_ids,
            "Case card activated"
        );

        Ok(Activation {
            card: activated.into(),
            deprecated_card_ids,
        })
    }

    /// ACTIVE -> DEPRECATED. Owner or admin, with a reason.
    pub async fn deactivate(
        pool: &PgPool,
        actor: &Actor,
        id: DbId,
        input: ReasonRequest,
    ) -> AppResult<CaseCardView> {
        let mut tx = pool.begin().await?;

        let card = lock_card(&mut tx, actor, id).await?;
        authorize(actor, Action::Deactivate, Some(card.surgeon_id))?;
        let reason = require_text("reason", input.reason.as_deref())?;
        validate_deactivate(card.card_status()?)?;

        let updated = CaseCardRepo::deprecate(&mut tx, card.id).await?;

        EditLog::append(
            &mut tx,
            &log_entry(
                actor,
                card.id,
                EditAction::Deactivate,
                format!("Deactivated version {}", card.version()),
                Some(reason),
                card.current_version_id,
                card.current_version_id,
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = actor.user_id, case_card_id = card.id, "Case card deactivated");

        Ok(updated.into())
    }

    /// Tombstone a card. Owning surgeon only, with a reason.
    pub async fn delete(
        pool: &PgPool,
        actor: &Actor,
        id: DbId,
        input: ReasonRequest,
    ) -> AppResult<CaseCardView> {
        let mut tx = pool.begin().await?;

        let card = lock_card(&mut tx, actor, id).await?;
        authorize(actor, Action::Delete, Some(card.surgeon_id))?;
        let reason = require_text("reason", input.reason.as_deref())?;
        validate_delete(card.card_status()?)?;

        let deleted = CaseCardRepo::soft_delete(&mut tx, card.id, actor.user_id, &reason).await?;

        EditLog::append(
            &mut tx,
            &log_entry(
                actor,
                card.id,
                EditAction::Delete,
                format!("Deleted case card from status {}", card.status),
                Some(reason),
                card.current_version_id,
                None,
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = actor.user_id, case_card_id = card.id, "Case card deleted");

        Ok(deleted.into())
    }

    // -- Edit lock ----------------------------------------------------------

    /// Take or refresh the edit lock.
    pub async fn acquire_lock(
        pool: &PgPool,
        actor: &Actor,
        id: DbId,
        duration_mins: i64,
    ) -> AppResult<LockInfo> {
        authorize(actor, Action::Lock, None)?;

        let mut tx = pool.begin().await?;
        let now = chrono::Utc::now();

        let card = lock_card(&mut tx, actor, id).await?;
        validate_editable(card.card_status()?)?;

        let current = live_lock(card.lock(), now);
        let acquired = match lock::acquire(current.as_ref(), actor.user_id, now, duration_mins) {
            Ok(acquired) => acquired,
            Err(err) => return Err(with_holder_name(&mut tx, actor.facility_id, err).await),
        };
        CaseCardRepo::set_lock(&mut tx, card.id, &acquired).await?;

        tx.commit().await?;

        tracing::info!(
            user_id = actor.user_id,
            case_card_id = card.id,
            expires_at = %acquired.expires_at,
            "Edit lock acquired"
        );

        Ok(LockInfo {
            holder_user_id: acquired.holder_user_id,
            holder_name: Some(actor.name.clone()),
            locked_at: acquired.locked_at,
            expires_at: acquired.expires_at,
        })
    }

    /// Release the edit lock. Returns whether a live lock was released.
    pub async fn release_lock(pool: &PgPool, actor: &Actor, id: DbId) -> AppResult<bool> {
        let mut tx = pool.begin().await?;
        let now = chrono::Utc::now();

        let card = lock_card(&mut tx, actor, id).await?;
        let stored = card.lock();
        let outcome = lock::release(stored.as_ref(), actor.user_id, now)?;

        // Releasing also clears a stale expired lock.
        if stored.is_some() {
            CaseCardRepo::clear_lock(&mut tx, card.id).await?;
        }
        tx.commit().await?;

        let released = outcome == Release::Released;
        if released {
            tracing::info!(user_id = actor.user_id, case_card_id = card.id, "Edit lock released");
        }
        Ok(released)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Clear an expired lock, then load the card within the actor's facility.
async fn load_card(pool: &PgPool, actor: &Actor, id: DbId) -> AppResult<CaseCard> {
    CaseCardRepo::clear_expired_lock(pool, id, chrono::Utc::now()).await?;
    CaseCardRepo::find_by_id(pool, actor.facility_id, id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "case_card",
                id,
            }
            .into()
        })
}

/// Row-lock the card for the rest of the transaction.
async fn lock_card(conn: &mut PgConnection, actor: &Actor, id: DbId) -> AppResult<CaseCard> {
    CaseCardRepo::find_for_update(conn, actor.facility_id, id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "case_card",
                id,
            }
            .into()
        })
}

/// Clear the card's stored lock if it has lapsed.
async fn drop_expired_lock(
    conn: &mut PgConnection,
    card: &CaseCard,
    now: Timestamp,
) -> AppResult<()> {
    if card.lock().is_some() && live_lock(card.lock(), now).is_none() {
        CaseCardRepo::clear_lock(conn, card.id).await?;
    }
    Ok(())
}

/// Edit-path lock check. Clears an expired lock and fails if a different
/// user holds a live one. The editor need not hold the lock.
async fn ensure_lock_allows(
    conn: &mut PgConnection,
    card: &CaseCard,
    actor: &Actor,
    now: Timestamp,
) -> AppResult<()> {
    drop_expired_lock(&mut *conn, card, now).await?;
    let current = live_lock(card.lock(), now);
    if let Err(err) = lock::ensure_not_blocked(current.as_ref(), actor.user_id, now) {
        return Err(with_holder_name(conn, actor.facility_id, err).await);
    }
    Ok(())
}

/// Fill in the holder's display name on a lock conflict.
async fn with_holder_name(conn: &mut PgConnection, facility_id: DbId, err: CoreError) -> AppError {
    match err {
        CoreError::Locked {
            holder_user_id,
            expires_at,
            ..
        } => {
            let holder_name = match UserRepo::find_by_id(conn, facility_id, holder_user_id).await {
                Ok(user) => user.map(|u| u.name),
                Err(e) => return e.into(),
            };
            CoreError::Locked {
                holder_user_id,
                holder_name,
                expires_at,
            }
            .into()
        }
        other => other.into(),
    }
}

async fn lock_info(
    conn: &mut PgConnection,
    card: &CaseCard,
    lock: Option<EditLock>,
) -> AppResult<Option<LockInfo>> {
    let Some(lock) = live_lock(lock, chrono::Utc::now()) else {
        return Ok(None);
    };
    let holder = UserRepo::find_by_id(conn, card.facility_id, lock.holder_user_id).await?;
    Ok(Some(LockInfo {
        holder_user_id: lock.holder_user_id,
        holder_name: holder.map(|u| u.name),
        locked_at: lock.locked_at,
        expires_at: lock.expires_at,
    }))
}

async fn detail(conn: &mut PgConnection, card: CaseCard) -> AppResult<CaseCardDetail> {
    let current_version = match card.current_version_id {
        Some(version_id) => {
            CaseCardVersionRepo::find_for_card(&mut *conn, card.id, version_id).await?
        }
        None => None,
    };
    let lock = lock_info(conn, &card, card.lock()).await?;
    Ok(CaseCardDetail {
        card: card.into(),
        current_version,
        lock,
    })
}

async fn find_version<'e, E: sqlx::postgres::PgExecutor<'e>>(
    executor: E,
    case_card_id: DbId,
    version_id: DbId,
) -> AppResult<CaseCardVersion> {
    CaseCardVersionRepo::find_for_card(executor, case_card_id, version_id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "case_card_version",
                id: version_id,
            }
            .into()
        })
}

async fn current_version(conn: &mut PgConnection, card: &CaseCard) -> AppResult<CaseCardVersion> {
    let version_id = card.current_version_id.ok_or_else(|| {
        AppError::InternalError(format!("Case card {} has no current version", card.id))
    })?;
    find_version(conn, card.id, version_id).await
}

/// The named surgeon must exist in the facility, be active, and hold the
/// SURGEON role.
async fn ensure_surgeon(conn: &mut PgConnection, facility_id: DbId, surgeon_id: DbId) -> AppResult<()> {
    let user = UserRepo::find_by_id(conn, facility_id, surgeon_id).await?;
    match user {
        Some(u) if u.is_active && u.role == ROLE_SURGEON => Ok(()),
        Some(_) => Err(CoreError::Validation(format!(
            "User {surgeon_id} is not an active surgeon"
        ))
        .into()),
        None => Err(CoreError::Validation(format!("Surgeon {surgeon_id} does not exist")).into()),
    }
}

/// Hold the name key and reject a case-insensitive duplicate in any status.
async fn ensure_name_free(
    conn: &mut PgConnection,
    facility_id: DbId,
    surgeon_id: DbId,
    procedure_name: &str,
) -> AppResult<()> {
    CaseCardRepo::lock_name_key(&mut *conn, facility_id, surgeon_id, procedure_name).await?;
    if CaseCardRepo::name_taken(conn, facility_id, surgeon_id, procedure_name).await? {
        return Err(CoreError::Validation(format!(
            "A case card named '{procedure_name}' already exists for surgeon {surgeon_id}"
        ))
        .into());
    }
    Ok(())
}

/// A rename moves the card onto another key. Drafts may share a key with
/// any card, but an ACTIVE card may not join a key that already has one.
async fn ensure_rename_allowed(
    conn: &mut PgConnection,
    card: &CaseCard,
    new_name: &str,
) -> AppResult<()> {
    if new_name.to_lowercase() == card.procedure_name.to_lowercase() {
        return Ok(());
    }
    CaseCardRepo::lock_name_key(&mut *conn, card.facility_id, card.surgeon_id, new_name).await?;
    if card.card_status()? != CardStatus::Active {
        return Ok(());
    }
    if let Some(other) =
        CaseCardRepo::active_for_key(conn, card.facility_id, card.surgeon_id, new_name, card.id)
            .await?
    {
        return Err(CoreError::Validation(format!(
            "Case card {other} is already active as '{new_name}' for surgeon {}",
            card.surgeon_id
        ))
        .into());
    }
    Ok(())
}

/// Insert a card and its 1.0.0 snapshot, and point the card at it.
async fn insert_with_first_version(
    conn: &mut PgConnection,
    new_card: &NewCaseCard,
    content: &CaseCardContent,
) -> AppResult<(CaseCard, CaseCardVersion)> {
    let card = CaseCardRepo::insert(&mut *conn, new_card).await?;
    let version = CaseCardVersionRepo::insert(
        &mut *conn,
        card.id,
        SemVer::INITIAL,
        content,
        new_card.created_by_user_id,
    )
    .await?;
    let card = CaseCardRepo::set_current_version(
        conn,
        card.id,
        version.id,
        SemVer::INITIAL,
        &HeaderPatch::default(),
    )
    .await?;
    Ok((card, version))
}

fn log_entry(
    actor: &Actor,
    case_card_id: DbId,
    action: EditAction,
    change_summary: String,
    reason_for_change: Option<String>,
    previous_version_id: Option<DbId>,
    new_version_id: Option<DbId>,
) -> NewEditLogEntry {
    NewEditLogEntry {
        case_card_id,
        editor_user_id: actor.user_id,
        editor_name: actor.name.clone(),
        editor_role: actor.role.clone(),
        action,
        change_summary,
        reason_for_change,
        previous_version_id,
        new_version_id,
    }
}

fn summary(version: &CaseCardVersion) -> VersionSummary {
    VersionSummary {
        id: version.id,
        case_card_id: version.case_card_id,
        version_number: version.version_number.clone(),
        created_by_user_id: version.created_by_user_id,
        created_at: version.created_at,
    }
}

/// Trim an optional free-text field; blank becomes `None`.
fn trim_opt(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
