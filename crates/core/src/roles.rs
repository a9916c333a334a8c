//! Well-known role name constants.
//!
//! These must match the `CHECK` constraint on `users.role` in
//! `20260301000001_create_collaborator_tables.sql`.

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_INVENTORY_TECH: &str = "INVENTORY_TECH";
pub const ROLE_CIRCULATOR: &str = "CIRCULATOR";
pub const ROLE_SCRUB: &str = "SCRUB";
pub const ROLE_SURGEON: &str = "SURGEON";
pub const ROLE_SCHEDULER: &str = "SCHEDULER";

/// Roles allowed to create, edit, clone, lock, and revert case cards.
pub const MUTATING_ROLES: &[&str] = &[
    ROLE_ADMIN,
    ROLE_INVENTORY_TECH,
    ROLE_CIRCULATOR,
    ROLE_SCRUB,
    ROLE_SURGEON,
];

/// Returns `true` if the role may perform content-mutating case card actions.
pub fn is_mutating_role(role: &str) -> bool {
    MUTATING_ROLES.contains(&role)
}
