//! Storage backends for the permission store.
//!
//! The store talks to its backend through the [`GrantBackend`] trait: a
//! generic read/upsert/delete row contract plus audit recording. Two
//! implementations ship here: [`PgBackend`] (`PostgreSQL` via sqlx) and
//! [`MemoryBackend`] (in-process, for embedding and tests).

mod memory;
mod postgres;

use std::future::Future;

pub use memory::MemoryBackend;
pub use postgres::PgBackend;

use crate::error::AccessError;
use crate::models::{AuditEntry, GrantRow, ModuleGrants, Scope};

/// The two permission tables, one per scope dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionTable {
    /// `role_permissions`, keyed by (role, module).
    Role,
    /// `user_type_permissions`, keyed by (`user_type`, module).
    UserType,
}

impl PermissionTable {
    /// Table name in the backing database.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Role => "role_permissions",
            Self::UserType => "user_type_permissions",
        }
    }

    /// Scope identifier column of the table.
    #[must_use]
    pub const fn scope_column(self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::UserType => "user_type",
        }
    }

    /// The table holding grants for a scope.
    #[must_use]
    pub const fn for_scope(scope: Scope) -> Self {
        match scope {
            Scope::Role(_) => Self::Role,
            Scope::UserType(_) => Self::UserType,
        }
    }
}

/// Row-level persistence contract consumed by [`crate::store::GrantStore`].
///
/// Implementations must be `Send + Sync`; the store issues one upsert per
/// module row so that a failure is attributable to a single module key.
pub trait GrantBackend: Send + Sync {
    /// Read every grant row for one scope value. An empty result is not an
    /// error; the scope simply has no stored grants yet.
    fn read_rows(
        &self,
        table: PermissionTable,
        scope_value: &str,
    ) -> impl Future<Output = Result<Vec<GrantRow>, AccessError>> + Send;

    /// Upsert one module row, keyed on (scope, module). Replaces the four
    /// action booleans together and refreshes the row's `updated_at`.
    fn upsert_row(
        &self,
        table: PermissionTable,
        scope_value: &str,
        row: ModuleGrants,
    ) -> impl Future<Output = Result<(), AccessError>> + Send;

    /// Delete every grant row for one scope value. Returns the number of
    /// rows removed.
    fn delete_rows(
        &self,
        table: PermissionTable,
        scope_value: &str,
    ) -> impl Future<Output = Result<u64, AccessError>> + Send;

    /// Persist one audit entry.
    fn record_audit(
        &self,
        entry: &AuditEntry,
    ) -> impl Future<Output = Result<(), AccessError>> + Send;

    /// Read audit entries, newest first.
    fn read_audit(
        &self,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<Vec<AuditEntry>, AccessError>> + Send;
}
