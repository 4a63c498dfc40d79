//! In-memory backend.
//!
//! Backs the store for embedding scenarios and tests. Supports per-module
//! failure injection and a whole-backend offline switch so partial-save and
//! unavailability semantics can be exercised without a database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};

use super::{GrantBackend, PermissionTable};
use crate::catalog::{ActionSet, Module};
use crate::error::AccessError;
use crate::models::{AuditEntry, GrantRow, ModuleGrants};

#[derive(Debug, Clone, Copy)]
struct StoredRow {
    actions: ActionSet,
    updated_at: DateTime<Utc>,
}

/// In-process implementation of [`GrantBackend`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: DashMap<(PermissionTable, String, Module), StoredRow>,
    audit: Mutex<Vec<AuditEntry>>,
    failing_modules: DashSet<Module>,
    offline: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upsert for the given module fail until cleared.
    pub fn fail_module(&self, module: Module) {
        self.failing_modules.insert(module);
    }

    /// Clear all injected module failures.
    pub fn clear_failures(&self) {
        self.failing_modules.clear();
    }

    /// Toggle whole-backend availability. While offline every operation
    /// fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), AccessError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AccessError::unavailable("backend offline"));
        }
        Ok(())
    }
}

impl GrantBackend for MemoryBackend {
    async fn read_rows(
        &self,
        table: PermissionTable,
        scope_value: &str,
    ) -> Result<Vec<GrantRow>, AccessError> {
        self.check_online()?;

        let mut rows: Vec<GrantRow> = self
            .rows
            .iter()
            .filter(|entry| {
                let (row_table, row_scope, _) = entry.key();
                *row_table == table && row_scope == scope_value
            })
            .map(|entry| {
                let (_, _, module) = entry.key();
                let stored = entry.value();
                GrantRow {
                    scope_value: scope_value.to_string(),
                    module: module.key().to_string(),
                    can_view: stored.actions.can_view(),
                    can_create: stored.actions.can_create(),
                    can_edit: stored.actions.can_edit(),
                    can_delete: stored.actions.can_delete(),
                    updated_at: stored.updated_at,
                }
            })
            .collect();

        rows.sort_by(|a, b| a.module.cmp(&b.module));
        Ok(rows)
    }

    async fn upsert_row(
        &self,
        table: PermissionTable,
        scope_value: &str,
        row: ModuleGrants,
    ) -> Result<(), AccessError> {
        self.check_online()?;

        if self.failing_modules.contains(&row.module) {
            return Err(AccessError::unavailable(format!(
                "injected failure for module {}",
                row.module
            )));
        }

        self.rows.insert(
            (table, scope_value.to_string(), row.module),
            StoredRow {
                actions: row.actions,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_rows(
        &self,
        table: PermissionTable,
        scope_value: &str,
    ) -> Result<u64, AccessError> {
        self.check_online()?;

        let mut deleted = 0;
        for module in Module::ALL {
            if self
                .rows
                .remove(&(table, scope_value.to_string(), module))
                .is_some()
            {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn record_audit(&self, entry: &AuditEntry) -> Result<(), AccessError> {
        self.check_online()?;

        let mut audit = self
            .audit
            .lock()
            .map_err(|_| AccessError::unavailable("audit log lock poisoned"))?;
        audit.push(entry.clone());
        Ok(())
    }

    async fn read_audit(&self, limit: i64, offset: i64) -> Result<Vec<AuditEntry>, AccessError> {
        self.check_online()?;

        let audit = self
            .audit
            .lock()
            .map_err(|_| AccessError::unavailable("audit log lock poisoned"))?;

        let limit = usize::try_from(limit.max(0)).unwrap_or(0);
        let offset = usize::try_from(offset.max(0)).unwrap_or(0);

        Ok(audit
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
