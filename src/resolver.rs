//! Permission resolution logic.
//!
//! Combines role-scope and user-type-scope grants into one effective
//! [`PermissionSet`] per subject.
//!
//! Resolution order:
//! 1. An `admin` role resolves every (module, action) to allowed, regardless
//!    of stored grants.
//! 2. Otherwise each (module, action) is the OR of the role-scope grant and
//!    the user-type-scope grant; absent grants default to denied.
//! 3. Anything outside the catalog resolves to denied.

use crate::catalog::{Action, Module};
use crate::models::{Grant, PermissionSet, Role, Scope, Subject};

/// Compute the effective permission set for a subject.
///
/// Pure function of the two grant sequences; cheap enough to call per
/// render. Grants whose scope does not match the subject's role or
/// user-type are ignored.
#[must_use]
pub fn resolve_effective(
    subject: Subject,
    role_grants: &[Grant],
    user_type_grants: &[Grant],
) -> PermissionSet {
    // Admin overrides persisted state entirely
    if subject.role == Role::Admin {
        return PermissionSet::granted();
    }

    let mut effective = PermissionSet::denied();
    apply_scope(&mut effective, subject.role_scope(), role_grants);
    apply_scope(&mut effective, subject.user_type_scope(), user_type_grants);
    effective
}

/// Point query by string keys. Never fails: unknown module or action keys
/// resolve to denied.
#[must_use]
pub fn check(
    subject: Subject,
    role_grants: &[Grant],
    user_type_grants: &[Grant],
    module_key: &str,
    action_key: &str,
) -> bool {
    let (Some(module), Some(action)) = (Module::from_key(module_key), Action::from_key(action_key))
    else {
        return false;
    };

    resolve_effective(subject, role_grants, user_type_grants).allows(module, action)
}

fn apply_scope(effective: &mut PermissionSet, scope: Scope, grants: &[Grant]) {
    for grant in grants {
        if grant.scope == scope && grant.allowed {
            effective.grant(grant.module, grant.action);
        }
    }
}
