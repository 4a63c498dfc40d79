//! Grant persistence operations.
//!
//! [`GrantStore`] turns the row-level [`GrantBackend`] contract into the
//! scope-level operations the editor and resolver callers use. Each module's
//! four action booleans are written together as one row, keyed on
//! (scope, module), so saves are idempotent upserts. There is no cross-row
//! transaction: a failed module row leaves already-persisted rows in place
//! and is reported back for targeted retry.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::backend::{GrantBackend, PermissionTable};
use crate::catalog::{ActionSet, Module};
use crate::error::AccessError;
use crate::models::{AuditEntry, Grant, ModuleGrants, Scope};

/// Scope-level grant persistence over a pluggable backend.
#[derive(Debug, Clone)]
pub struct GrantStore<B> {
    backend: B,
}

impl<B: GrantBackend> GrantStore<B> {
    /// Create a store over a backend.
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Load every grant stored for a scope.
    ///
    /// Returns an empty vec when the scope has no rows yet; callers apply
    /// catalog defaults (all denied). Rows referencing modules that have
    /// left the catalog are skipped.
    #[tracing::instrument(skip(self), fields(scope = %scope))]
    pub async fn load_grants(&self, scope: Scope) -> Result<Vec<Grant>, AccessError> {
        let table = PermissionTable::for_scope(scope);
        let rows = self.backend.read_rows(table, scope.value()).await?;

        let mut grants = Vec::with_capacity(rows.len() * 4);
        for row in rows {
            let Some(module) = Module::from_key(&row.module) else {
                tracing::warn!(module = %row.module, %scope, "skipping grant row for module not in catalog");
                continue;
            };
            grants.extend(ModuleGrants::new(module, row.actions()).to_grants(scope));
        }
        Ok(grants)
    }

    /// Load grants for a scope as one row value per stored module.
    ///
    /// Convenience shape for the permission editor, which works in whole
    /// rows rather than individual grants.
    pub async fn load_rows(&self, scope: Scope) -> Result<Vec<ModuleGrants>, AccessError> {
        let table = PermissionTable::for_scope(scope);
        let rows = self.backend.read_rows(table, scope.value()).await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                Module::from_key(&row.module).map(|module| ModuleGrants::new(module, row.actions()))
            })
            .collect())
    }

    /// Persist grants for a scope, one upsert per module row.
    ///
    /// Grants are grouped by module; actions not mentioned for a submitted
    /// module are written as denied, since the whole row replaces the stored
    /// one. Grants carrying a different scope than `scope` are rejected
    /// upstream by construction and skipped here with a warning.
    ///
    /// On any row failure the remaining rows are still attempted and the
    /// failed module keys are reported via [`AccessError::PartialSave`].
    /// Successful rows produce audit entries; audit failures are logged and
    /// never fail the save.
    #[tracing::instrument(skip(self, grants), fields(scope = %scope, grants = grants.len()))]
    pub async fn save_grants(
        &self,
        scope: Scope,
        grants: &[Grant],
        actor_id: Option<Uuid>,
    ) -> Result<(), AccessError> {
        let rows = group_by_module(scope, grants);
        let table = PermissionTable::for_scope(scope);

        let mut failed = Vec::new();
        for row in rows {
            match self.backend.upsert_row(table, scope.value(), row).await {
                Ok(()) => {
                    let entry = AuditEntry::grants_saved(actor_id, scope, &row);
                    if let Err(err) = self.backend.record_audit(&entry).await {
                        tracing::warn!(error = %err, module = %row.module, "failed to record grant audit entry");
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, module = %row.module, %scope, "grant row failed to persist");
                    failed.push(row.module);
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(AccessError::PartialSave { failed })
        }
    }

    /// Delete every stored grant for a scope, returning it to catalog
    /// defaults (all denied).
    #[tracing::instrument(skip(self), fields(scope = %scope))]
    pub async fn clear_grants(
        &self,
        scope: Scope,
        actor_id: Option<Uuid>,
    ) -> Result<u64, AccessError> {
        let table = PermissionTable::for_scope(scope);
        let deleted = self.backend.delete_rows(table, scope.value()).await?;

        let entry = AuditEntry::grants_cleared(actor_id, scope, deleted);
        if let Err(err) = self.backend.record_audit(&entry).await {
            tracing::warn!(error = %err, %scope, "failed to record grant audit entry");
        }

        Ok(deleted)
    }

    /// Read audit entries, newest first.
    pub async fn load_audit(&self, limit: i64, offset: i64) -> Result<Vec<AuditEntry>, AccessError> {
        self.backend.read_audit(limit, offset).await
    }
}

/// Group per-action grants into one row per module.
fn group_by_module(scope: Scope, grants: &[Grant]) -> Vec<ModuleGrants> {
    let mut by_module: BTreeMap<Module, ActionSet> = BTreeMap::new();

    for grant in grants {
        if grant.scope != scope {
            tracing::warn!(grant_scope = %grant.scope, %scope, "skipping grant submitted under a different scope");
            continue;
        }
        let actions = by_module.entry(grant.module).or_default();
        *actions = actions.with(grant.action, grant.allowed);
    }

    by_module
        .into_iter()
        .map(|(module, actions)| ModuleGrants::new(module, actions))
        .collect()
}
