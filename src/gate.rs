//! UI-facing permission gate.
//!
//! The gate is a pure boundary adapter: resolution happens once upstream
//! (via [`crate::resolver::resolve_effective`]) and the resulting state is
//! passed down, so a render pass never re-fetches grants. While grants are
//! loading, and after a load failure, every check answers denied: a flash
//! of unauthorized UI is worse than a late one.

use crate::catalog::{Action, Module};
use crate::error::AccessErrorKind;
use crate::models::{Grant, PermissionSet, Subject};
use crate::resolver::resolve_effective;

/// Per-scope resolution state as seen by the rendering layer.
///
/// Callers distinguish "still loading", "denied", and "failed to load":
/// a denial in `Ready` is configuration, the other two states are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// Grants are still being loaded.
    Loading,
    /// Resolution completed.
    Ready(PermissionSet),
    /// The load failed; nothing may render as allowed.
    Failed(AccessErrorKind),
}

/// Allow/deny decisions for rendering protected actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionGate {
    state: PermissionState,
}

impl PermissionGate {
    /// Gate for a scope whose grants have not finished loading.
    #[must_use]
    pub const fn loading() -> Self {
        Self {
            state: PermissionState::Loading,
        }
    }

    /// Gate over a resolved permission set.
    #[must_use]
    pub const fn ready(set: PermissionSet) -> Self {
        Self {
            state: PermissionState::Ready(set),
        }
    }

    /// Gate for a scope whose grants failed to load.
    #[must_use]
    pub const fn failed(kind: AccessErrorKind) -> Self {
        Self {
            state: PermissionState::Failed(kind),
        }
    }

    /// Resolve a subject's grants and gate on the result.
    #[must_use]
    pub fn for_subject(
        subject: Subject,
        role_grants: &[Grant],
        user_type_grants: &[Grant],
    ) -> Self {
        Self::ready(resolve_effective(subject, role_grants, user_type_grants))
    }

    /// The underlying state, for UIs that render loading or error shells.
    #[must_use]
    pub const fn state(&self) -> PermissionState {
        self.state
    }

    /// Whether resolution has completed.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, PermissionState::Ready(_))
    }

    /// The load failure, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<AccessErrorKind> {
        match self.state {
            PermissionState::Failed(kind) => Some(kind),
            _ => None,
        }
    }

    /// Whether the given action may render. Denied unless the state is
    /// `Ready` and the effective set allows it.
    #[must_use]
    pub const fn allows(&self, module: Module, action: Action) -> bool {
        match &self.state {
            PermissionState::Ready(set) => set.allows(module, action),
            PermissionState::Loading | PermissionState::Failed(_) => false,
        }
    }

    /// String-keyed variant of [`allows`](Self::allows); unknown keys are
    /// denied.
    #[must_use]
    pub fn allows_key(&self, module_key: &str, action_key: &str) -> bool {
        match &self.state {
            PermissionState::Ready(set) => set.allows_key(module_key, action_key),
            PermissionState::Loading | PermissionState::Failed(_) => false,
        }
    }

    /// Invoke `on_allowed` if the action may render, `on_denied` otherwise.
    /// Pure dispatch; no I/O.
    pub fn render<T>(
        &self,
        module: Module,
        action: Action,
        on_allowed: impl FnOnce() -> T,
        on_denied: impl FnOnce() -> T,
    ) -> T {
        if self.allows(module, action) {
            on_allowed()
        } else {
            on_denied()
        }
    }

    /// [`render`](Self::render) with the default denied fallback: render
    /// nothing.
    pub fn render_or_hide<T>(
        &self,
        module: Module,
        action: Action,
        on_allowed: impl FnOnce() -> T,
    ) -> Option<T> {
        self.render(module, action, || Some(on_allowed()), || None)
    }
}

impl Default for PermissionGate {
    /// Gates start closed: the default is the loading state.
    fn default() -> Self {
        Self::loading()
    }
}
