//! Core models for the permission system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::catalog::{Action, ActionSet, Module};
use crate::error::AccessError;

/// Baseline capability tier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform administrator; overrides all stored grants.
    Admin,
    /// Regular account.
    User,
}

impl Role {
    /// All roles.
    pub const ALL: [Self; 2] = [Self::Admin, Self::User];

    /// Stable string key used in permission rows.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// Look up a role by its stable key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.key() == key)
    }
}

/// Organizational position of an account, the second permission dimension.
///
/// String keys use the deployment's Spanish names, which is what the
/// permission rows and account records store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// Delegation member
    Delegation,
    /// Delegation expert
    DelegationExpert,
    /// Collaborator
    Collaborator,
    /// Department head
    DepartmentHead,
    /// Administrative staff
    Administrator,
}

impl UserType {
    /// All user types.
    pub const ALL: [Self; 5] = [
        Self::Delegation,
        Self::DelegationExpert,
        Self::Collaborator,
        Self::DepartmentHead,
        Self::Administrator,
    ];

    /// Stable string key used in permission rows.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Delegation => "delegacion",
            Self::DelegationExpert => "delegacion-experto",
            Self::Collaborator => "colaborador",
            Self::DepartmentHead => "jefe-departamento",
            Self::Administrator => "administrador",
        }
    }

    /// Look up a user type by its stable key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key() == key)
    }
}

/// The two independent permission dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Role dimension (`admin` / `user`).
    Role,
    /// User-type dimension.
    UserType,
}

impl ScopeKind {
    /// Stable string key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::UserType => "user-type",
        }
    }
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A concrete scope: one value in one permission dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Scope {
    /// Grants attached to a role.
    Role(Role),
    /// Grants attached to a user type.
    UserType(UserType),
}

impl Scope {
    /// The dimension this scope belongs to.
    #[must_use]
    pub const fn kind(self) -> ScopeKind {
        match self {
            Self::Role(_) => ScopeKind::Role,
            Self::UserType(_) => ScopeKind::UserType,
        }
    }

    /// The scope value key as stored in permission rows.
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::Role(role) => role.key(),
            Self::UserType(user_type) => user_type.key(),
        }
    }

    /// Parse a (kind, value) pair arriving as strings.
    ///
    /// Fails fast with [`AccessError::UnknownScope`]; an unrecognized name
    /// is a programming error, not a user-facing condition.
    pub fn parse(kind: &str, value: &str) -> Result<Self, AccessError> {
        let scope = match kind {
            "role" => Role::from_key(value).map(Self::Role),
            "user-type" => UserType::from_key(value).map(Self::UserType),
            _ => None,
        };
        scope.ok_or_else(|| AccessError::UnknownScope {
            kind: kind.to_string(),
            value: value.to_string(),
        })
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

/// An acting user at evaluation time: exactly one role and one user type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    /// Baseline capability tier.
    pub role: Role,
    /// Organizational capability.
    pub user_type: UserType,
}

impl Subject {
    /// Create a subject.
    #[must_use]
    pub const fn new(role: Role, user_type: UserType) -> Self {
        Self { role, user_type }
    }

    /// The role-dimension scope this subject's grants are loaded from.
    #[must_use]
    pub const fn role_scope(self) -> Scope {
        Scope::Role(self.role)
    }

    /// The user-type-dimension scope this subject's grants are loaded from.
    #[must_use]
    pub const fn user_type_scope(self) -> Scope {
        Scope::UserType(self.user_type)
    }
}

impl Default for Subject {
    /// Provisioning default for accounts created without explicit
    /// assignments.
    fn default() -> Self {
        Self::new(Role::User, UserType::Collaborator)
    }
}

/// A single boolean decision for one (scope, module, action) tuple.
///
/// The unit of the editor API; storage groups grants into one row per
/// (scope, module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    /// The scope this grant belongs to.
    pub scope: Scope,
    /// The module being controlled.
    pub module: Module,
    /// The action being controlled.
    pub action: Action,
    /// Whether the action is allowed.
    pub allowed: bool,
}

impl Grant {
    /// Create a grant.
    #[must_use]
    pub const fn new(scope: Scope, module: Module, action: Action, allowed: bool) -> Self {
        Self {
            scope,
            module,
            action,
            allowed,
        }
    }
}

/// One module's four action booleans, the unit of storage and upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleGrants {
    /// The module this row controls.
    pub module: Module,
    /// The four action booleans.
    pub actions: ActionSet,
}

impl ModuleGrants {
    /// Create a row value.
    #[must_use]
    pub const fn new(module: Module, actions: ActionSet) -> Self {
        Self { module, actions }
    }

    /// Expand the row into per-action grants for a scope.
    #[must_use]
    pub fn to_grants(self, scope: Scope) -> Vec<Grant> {
        Action::ALL
            .into_iter()
            .map(|action| Grant::new(scope, self.module, action, self.actions.allows(action)))
            .collect()
    }
}

/// Persisted grant row as read from either permission table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GrantRow {
    /// Scope value key (`role` or `user_type` column, aliased on select).
    pub scope_value: String,
    /// Module key.
    pub module: String,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    /// Refreshed on every upsert; surfaced so callers can build optimistic
    /// versioning later.
    pub updated_at: DateTime<Utc>,
}

impl GrantRow {
    /// The four booleans as an [`ActionSet`].
    #[must_use]
    pub const fn actions(&self) -> ActionSet {
        ActionSet::from_columns(self.can_view, self.can_create, self.can_edit, self.can_delete)
    }
}

/// Audit log entry recording a grant mutation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditEntry {
    pub id: Uuid,
    /// Operator who performed the change, when known.
    pub actor_id: Option<Uuid>,
    /// Machine-readable action name (`grants.save`, `grants.clear`).
    pub action: String,
    pub scope_kind: String,
    pub scope_value: String,
    /// Module key; absent for whole-scope operations.
    pub module: Option<String>,
    /// Action-set snapshot or other structured context.
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Entry for one persisted module row.
    #[must_use]
    pub fn grants_saved(actor_id: Option<Uuid>, scope: Scope, row: &ModuleGrants) -> Self {
        Self {
            id: Uuid::now_v7(),
            actor_id,
            action: "grants.save".to_string(),
            scope_kind: scope.kind().key().to_string(),
            scope_value: scope.value().to_string(),
            module: Some(row.module.key().to_string()),
            details: serde_json::to_value(row.actions).ok(),
            created_at: Utc::now(),
        }
    }

    /// Entry for clearing every row of a scope.
    #[must_use]
    pub fn grants_cleared(actor_id: Option<Uuid>, scope: Scope, rows_deleted: u64) -> Self {
        Self {
            id: Uuid::now_v7(),
            actor_id,
            action: "grants.clear".to_string(),
            scope_kind: scope.kind().key().to_string(),
            scope_value: scope.value().to_string(),
            module: None,
            details: Some(serde_json::json!({ "rows_deleted": rows_deleted })),
            created_at: Utc::now(),
        }
    }
}

/// Materialized (module, action) -> bool mapping for one subject.
///
/// Derived by the resolver, never stored. Array-backed so point queries are
/// cheap enough to call per render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionSet {
    entries: [ActionSet; Module::COUNT],
}

impl PermissionSet {
    /// All actions denied for every module.
    #[must_use]
    pub const fn denied() -> Self {
        Self {
            entries: [ActionSet::empty(); Module::COUNT],
        }
    }

    /// All actions allowed for every module (the admin override).
    #[must_use]
    pub const fn granted() -> Self {
        Self {
            entries: [ActionSet::all(); Module::COUNT],
        }
    }

    /// Effective decision for one (module, action).
    #[must_use]
    pub const fn allows(&self, module: Module, action: Action) -> bool {
        self.entries[module.index()].allows(action)
    }

    /// Effective decision by string keys; unknown keys resolve to `false`.
    #[must_use]
    pub fn allows_key(&self, module_key: &str, action_key: &str) -> bool {
        match (Module::from_key(module_key), Action::from_key(action_key)) {
            (Some(module), Some(action)) => self.allows(module, action),
            _ => false,
        }
    }

    /// The action set for one module.
    #[must_use]
    pub const fn module(&self, module: Module) -> ActionSet {
        self.entries[module.index()]
    }

    /// Mark one action as allowed.
    pub fn grant(&mut self, module: Module, action: Action) {
        self.entries[module.index()] |= action.flag();
    }

    /// Merge another set; either set allowing is sufficient.
    pub fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.entries.iter_mut().zip(other.entries.iter()) {
            *mine |= *theirs;
        }
    }
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self::denied()
    }
}
