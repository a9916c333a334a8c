//! Role and ownership permission matrix for case card actions.
//!
//! Every mutating handler calls [`authorize`] before it touches any row, so a
//! rejected request never leaves partial state behind.

use serde::Serialize;

use crate::error::CoreError;
use crate::roles::{is_mutating_role, ROLE_ADMIN};
use crate::types::DbId;

/// The identity a request runs as, supplied by the identity context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub user_id: DbId,
    pub facility_id: DbId,
    pub name: String,
    pub role: String,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Actions subject to the permission matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Clone,
    Lock,
    Revert,
    Activate,
    Deactivate,
    Delete,
    SubmitFeedback,
    ReviewFeedback,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Clone => "clone",
            Self::Lock => "lock",
            Self::Revert => "revert",
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Delete => "delete",
            Self::SubmitFeedback => "submit feedback",
            Self::ReviewFeedback => "review feedback",
        }
    }
}

/// Check whether `actor` may perform `action`.
///
/// `owner_surgeon_id` is the surgeon owning the target card; it is only
/// consulted for the ownership-gated actions (`Deactivate`, `Delete`).
pub fn authorize(
    actor: &Actor,
    action: Action,
    owner_surgeon_id: Option<DbId>,
) -> Result<(), CoreError> {
    let is_owner = owner_surgeon_id == Some(actor.user_id);

    match action {
        Action::Create | Action::Update | Action::Clone | Action::Lock | Action::Revert => {
            if !is_mutating_role(&actor.role) {
                return Err(CoreError::Forbidden(format!(
                    "Role '{}' is not permitted to {} case cards",
                    actor.role,
                    action.as_str()
                )));
            }
        }
        Action::Deactivate => {
            if !is_owner && !actor.is_admin() {
                return Err(CoreError::Forbidden(
                    "Only the owning surgeon or an admin can deactivate this case card".into(),
                ));
            }
        }
        Action::Delete => {
            if !is_owner {
                return Err(CoreError::Forbidden(
                    "Only the owning surgeon can delete this case card".into(),
                ));
            }
        }
        Action::ReviewFeedback => {
            if !actor.is_admin() {
                return Err(CoreError::Forbidden(
                    "Admin role required to review feedback".into(),
                ));
            }
        }
        Action::Activate | Action::SubmitFeedback => {}
    }

    Ok(())
}
