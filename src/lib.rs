//! Intranet Access Core
//!
//! Permission resolution library for the intranet platform. Effective
//! permissions are derived from two independent dimensions, a role
//! (`admin` / `user`) and a user type, each configurable per module and
//! action, combined by the resolver and consumed by a UI-facing gate.
//!
//! Three components:
//! - [`store::GrantStore`]: persistence of per-(scope, module, action)
//!   grants over a pluggable backend (`PostgreSQL` or in-memory).
//! - [`resolver`]: pure combination of the two grant dimensions into one
//!   effective [`models::PermissionSet`] per subject. Admin overrides
//!   everything; otherwise either dimension granting is sufficient;
//!   anything unknown is denied.
//! - [`gate::PermissionGate`]: I/O-free allow/deny decisions for rendering,
//!   failing closed while grants are loading or after a load failure.
//!
//! [`session::ScopeEditor`] drives the permission editor screen: stale load
//! results are discarded on scope switches, and partial save failures keep
//! exactly the failed modules pending for targeted retry.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gate;
pub mod models;
pub mod resolver;
pub mod session;
pub mod store;

pub use backend::{GrantBackend, MemoryBackend, PermissionTable, PgBackend};
pub use catalog::{Action, ActionSet, Module};
pub use config::Config;
pub use error::{AccessError, AccessErrorKind};
pub use gate::{PermissionGate, PermissionState};
pub use models::{
    AuditEntry, Grant, GrantRow, ModuleGrants, PermissionSet, Role, Scope, ScopeKind, Subject,
    UserType,
};
pub use resolver::{check, resolve_effective};
pub use session::{EditorState, LoadTicket, ScopeEditor};
pub use store::GrantStore;
