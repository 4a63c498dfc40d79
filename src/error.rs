//! Error taxonomy for the permission core.

use thiserror::Error;

use crate::catalog::Module;

/// Errors surfaced by the permission store and scope parsing.
///
/// The resolver and gate never produce errors: resolution is pure and the
/// gate fails closed. Everything here is for the caller to turn into a
/// retryable UI state.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Transport or backend failure on load or save.
    ///
    /// Callers must show a retryable error state and must not present stale
    /// cached grants as authoritative.
    #[error("permission store unavailable: {reason}")]
    StoreUnavailable {
        /// Underlying backend failure, already rendered.
        reason: String,
    },

    /// A subset of module rows failed to upsert.
    ///
    /// Rows that persisted are not rolled back; callers retry exactly the
    /// listed modules.
    #[error("failed to persist grants for modules [{}]", join_keys(.failed))]
    PartialSave {
        /// Modules whose rows did not persist.
        failed: Vec<Module>,
    },

    /// Requested role or user-type name is not in the recognized enumeration.
    ///
    /// A programming error, not a user-facing condition.
    #[error("unknown {kind} scope: {value:?}")]
    UnknownScope {
        /// The scope dimension that was requested.
        kind: String,
        /// The unrecognized name.
        value: String,
    },
}

impl AccessError {
    /// Wrap a backend failure.
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable {
            reason: reason.to_string(),
        }
    }

    /// The coarse kind, for state-machine storage (kinds are `Copy`,
    /// errors are not).
    #[must_use]
    pub const fn kind(&self) -> AccessErrorKind {
        match self {
            Self::StoreUnavailable { .. } => AccessErrorKind::StoreUnavailable,
            Self::PartialSave { .. } => AccessErrorKind::PartialSave,
            Self::UnknownScope { .. } => AccessErrorKind::UnknownScope,
        }
    }
}

impl From<sqlx::Error> for AccessError {
    fn from(err: sqlx::Error) -> Self {
        Self::unavailable(err)
    }
}

/// Coarse error classification carried by gate and editor states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessErrorKind {
    /// Transport or backend failure.
    StoreUnavailable,
    /// Some module rows failed to persist.
    PartialSave,
    /// Unrecognized role or user-type name.
    UnknownScope,
}

fn join_keys(modules: &[Module]) -> String {
    modules
        .iter()
        .map(|m| m.key())
        .collect::<Vec<_>>()
        .join(", ")
}
