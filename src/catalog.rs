//! Module catalog and action primitives.
//!
//! The catalog is the fixed configuration surface of the permission model:
//! a closed set of functional areas ([`Module`]) and a closed set of
//! per-module operations ([`Action`]). Both are enums so that additions are
//! compile-time-checked instead of silently absent at runtime.

use bitflags::bitflags;

/// A functional area of the intranet.
///
/// Each module carries a stable string key (used in permission rows and UI
/// routes), a display name, and a short description. The catalog is
/// immutable at runtime; [`Module::from_key`] is the only string entry point
/// and returns `None` for anything outside the catalog.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    /// Document library (upload, organize, share files)
    Documents,
    /// Editorial content pages
    Content,
    /// User account management
    Users,
    /// News and announcements
    News,
    /// Shared calendar and events
    Calendar,
    /// Company and partner directory
    Companies,
    /// Discussion forums
    Forums,
    /// Training catalog and courses
    Training,
}

impl Module {
    /// Every module in the catalog, in display order.
    pub const ALL: [Self; 8] = [
        Self::Documents,
        Self::Content,
        Self::Users,
        Self::News,
        Self::Calendar,
        Self::Companies,
        Self::Forums,
        Self::Training,
    ];

    /// Number of modules in the catalog.
    pub const COUNT: usize = Self::ALL.len();

    /// Stable string key used in permission rows.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::Content => "content",
            Self::Users => "users",
            Self::News => "news",
            Self::Calendar => "calendar",
            Self::Companies => "companies",
            Self::Forums => "forums",
            Self::Training => "training",
        }
    }

    /// Human-readable display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Documents => "Documents",
            Self::Content => "Content",
            Self::Users => "Users",
            Self::News => "News",
            Self::Calendar => "Calendar",
            Self::Companies => "Companies",
            Self::Forums => "Forums",
            Self::Training => "Training",
        }
    }

    /// Short description shown in the permission editor.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Documents => "Document library and file sharing",
            Self::Content => "Editorial content pages",
            Self::Users => "User account management",
            Self::News => "News and announcements",
            Self::Calendar => "Shared calendar and events",
            Self::Companies => "Company and partner directory",
            Self::Forums => "Discussion forums",
            Self::Training => "Training catalog and courses",
        }
    }

    /// Look up a module by its stable key.
    ///
    /// Returns `None` for keys outside the catalog; callers must treat that
    /// as a denied module, never as an error.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }

    /// Dense index into catalog-sized arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// An operation on a module. Closed set, identical for every module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// View the module and its entries
    View,
    /// Create new entries
    Create,
    /// Edit existing entries
    Edit,
    /// Delete entries
    Delete,
}

impl Action {
    /// Every action, in editor column order.
    pub const ALL: [Self; 4] = [Self::View, Self::Create, Self::Edit, Self::Delete];

    /// Stable string key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }

    /// Look up an action by its stable key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.key() == key)
    }

    /// The corresponding single-bit [`ActionSet`].
    #[must_use]
    pub const fn flag(self) -> ActionSet {
        match self {
            Self::View => ActionSet::VIEW,
            Self::Create => ActionSet::CREATE,
            Self::Edit => ActionSet::EDIT,
            Self::Delete => ActionSet::DELETE,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

bitflags! {
    /// The four per-module action booleans as a bitfield.
    ///
    /// Rows persist the booleans as four columns; this is the in-memory
    /// representation used by the resolver and the editor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    #[serde(transparent)]
    pub struct ActionSet: u8 {
        /// Permission to view the module
        const VIEW   = 1 << 0;
        /// Permission to create entries
        const CREATE = 1 << 1;
        /// Permission to edit entries
        const EDIT   = 1 << 2;
        /// Permission to delete entries
        const DELETE = 1 << 3;
    }
}

impl ActionSet {
    /// Build a set from the four row columns.
    #[must_use]
    pub const fn from_columns(view: bool, create: bool, edit: bool, delete: bool) -> Self {
        let mut bits = 0;
        if view {
            bits |= Self::VIEW.bits();
        }
        if create {
            bits |= Self::CREATE.bits();
        }
        if edit {
            bits |= Self::EDIT.bits();
        }
        if delete {
            bits |= Self::DELETE.bits();
        }
        Self::from_bits_truncate(bits)
    }

    /// Check whether the set includes the given action.
    #[must_use]
    pub const fn allows(self, action: Action) -> bool {
        self.contains(action.flag())
    }

    /// Return a copy with one action toggled.
    #[must_use]
    pub const fn with(self, action: Action, allowed: bool) -> Self {
        if allowed {
            self.union(action.flag())
        } else {
            self.difference(action.flag())
        }
    }

    /// The `can_view` column value.
    #[must_use]
    pub const fn can_view(self) -> bool {
        self.contains(Self::VIEW)
    }

    /// The `can_create` column value.
    #[must_use]
    pub const fn can_create(self) -> bool {
        self.contains(Self::CREATE)
    }

    /// The `can_edit` column value.
    #[must_use]
    pub const fn can_edit(self) -> bool {
        self.contains(Self::EDIT)
    }

    /// The `can_delete` column value.
    #[must_use]
    pub const fn can_delete(self) -> bool {
        self.contains(Self::DELETE)
    }
}

impl Default for ActionSet {
    fn default() -> Self {
        Self::empty()
    }
}
