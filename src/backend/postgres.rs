//! `PostgreSQL` backend.
//!
//! Static SQL per table, upserts via `ON CONFLICT (scope, module) DO UPDATE`
//! so repeated saves overwrite rather than duplicate.

use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use super::{GrantBackend, PermissionTable};
use crate::config::Config;
use crate::error::AccessError;
use crate::models::{AuditEntry, GrantRow, ModuleGrants};

/// sqlx-backed implementation of [`GrantBackend`].
#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a connection pool with health configuration and wrap it.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            // Keep minimum connections warm to prevent cold-start latency
            .min_connections(config.db_min_connections)
            .max_connections(config.db_max_connections)
            // Prevent hanging requests on pool exhaustion
            .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
            // Validate connections before use to catch stale/broken connections
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Run database migrations for the permission tables.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Permission table migrations completed");
        Ok(())
    }

    /// The underlying pool, for hosts sharing one pool across subsystems.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    const fn select_sql(table: PermissionTable) -> &'static str {
        match table {
            PermissionTable::Role => {
                r"
                SELECT role AS scope_value, module, can_view, can_create, can_edit, can_delete, updated_at
                FROM role_permissions
                WHERE role = $1
                ORDER BY module ASC
                "
            }
            PermissionTable::UserType => {
                r"
                SELECT user_type AS scope_value, module, can_view, can_create, can_edit, can_delete, updated_at
                FROM user_type_permissions
                WHERE user_type = $1
                ORDER BY module ASC
                "
            }
        }
    }

    const fn upsert_sql(table: PermissionTable) -> &'static str {
        match table {
            PermissionTable::Role => {
                r"
                INSERT INTO role_permissions (role, module, can_view, can_create, can_edit, can_delete)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (role, module) DO UPDATE
                SET can_view = EXCLUDED.can_view,
                    can_create = EXCLUDED.can_create,
                    can_edit = EXCLUDED.can_edit,
                    can_delete = EXCLUDED.can_delete,
                    updated_at = NOW()
                "
            }
            PermissionTable::UserType => {
                r"
                INSERT INTO user_type_permissions (user_type, module, can_view, can_create, can_edit, can_delete)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (user_type, module) DO UPDATE
                SET can_view = EXCLUDED.can_view,
                    can_create = EXCLUDED.can_create,
                    can_edit = EXCLUDED.can_edit,
                    can_delete = EXCLUDED.can_delete,
                    updated_at = NOW()
                "
            }
        }
    }

    const fn delete_sql(table: PermissionTable) -> &'static str {
        match table {
            PermissionTable::Role => "DELETE FROM role_permissions WHERE role = $1",
            PermissionTable::UserType => "DELETE FROM user_type_permissions WHERE user_type = $1",
        }
    }
}

impl GrantBackend for PgBackend {
    async fn read_rows(
        &self,
        table: PermissionTable,
        scope_value: &str,
    ) -> Result<Vec<GrantRow>, AccessError> {
        let rows = sqlx::query_as::<_, GrantRow>(Self::select_sql(table))
            .bind(scope_value)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn upsert_row(
        &self,
        table: PermissionTable,
        scope_value: &str,
        row: ModuleGrants,
    ) -> Result<(), AccessError> {
        sqlx::query(Self::upsert_sql(table))
            .bind(scope_value)
            .bind(row.module.key())
            .bind(row.actions.can_view())
            .bind(row.actions.can_create())
            .bind(row.actions.can_edit())
            .bind(row.actions.can_delete())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_rows(
        &self,
        table: PermissionTable,
        scope_value: &str,
    ) -> Result<u64, AccessError> {
        let result = sqlx::query(Self::delete_sql(table))
            .bind(scope_value)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn record_audit(&self, entry: &AuditEntry) -> Result<(), AccessError> {
        sqlx::query(
            r"
            INSERT INTO permission_audit_log
                (id, actor_id, action, scope_kind, scope_value, module, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(entry.id)
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.scope_kind)
        .bind(&entry.scope_value)
        .bind(&entry.module)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn read_audit(&self, limit: i64, offset: i64) -> Result<Vec<AuditEntry>, AccessError> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r"
            SELECT id, actor_id, action, scope_kind, scope_value, module, details, created_at
            FROM permission_audit_log
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
