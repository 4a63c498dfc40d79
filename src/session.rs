//! Scope editing session.
//!
//! [`ScopeEditor`] is the explicit state machine behind the permission
//! editor screen: one scope selected at a time, grants loaded
//! asynchronously, toggles accumulated in a draft, saves batched per module
//! row. Two rules from the concurrency model are enforced here:
//!
//! - A load result arriving after the scope selection changed (or after a
//!   newer load started) is stale and must be discarded, never applied.
//! - A save is only issued from the `Ready` state, after the prior load for
//!   the same scope completed, and saves do not overlap.
//!
//! Across sessions the store is last-writer-wins per module row; this
//! editor does not attempt optimistic versioning.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::backend::GrantBackend;
use crate::catalog::{Action, ActionSet, Module};
use crate::error::{AccessError, AccessErrorKind};
use crate::models::{Grant, ModuleGrants, Scope};
use crate::store::GrantStore;

/// Lifecycle of the selected scope's grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    /// A load is in flight; the draft is not editable.
    Loading,
    /// Grants are loaded; the draft is editable and saves may be issued.
    Ready,
    /// The load failed. The caller surfaces a retryable error; the draft
    /// must not be presented as a deliberate all-denied configuration.
    Failed(AccessErrorKind),
}

/// Token tying an in-flight load to the selection that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    scope: Scope,
    generation: u64,
}

impl LoadTicket {
    /// The scope this load was issued for.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }
}

/// Editing session for one permission scope.
#[derive(Debug, Clone)]
pub struct ScopeEditor {
    scope: Scope,
    generation: u64,
    state: EditorState,
    draft: BTreeMap<Module, ActionSet>,
    dirty: BTreeSet<Module>,
    in_flight_save: Option<BTreeSet<Module>>,
}

impl ScopeEditor {
    /// Start a session for a scope. The draft is seeded with catalog
    /// defaults (all denied) and the state is `Loading` until the first
    /// load completes.
    #[must_use]
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            generation: 0,
            state: EditorState::Loading,
            draft: default_draft(),
            dirty: BTreeSet::new(),
            in_flight_save: None,
        }
    }

    /// The currently selected scope.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> EditorState {
        self.state
    }

    /// Draft action set for one module.
    #[must_use]
    pub fn actions(&self, module: Module) -> ActionSet {
        self.draft.get(&module).copied().unwrap_or_default()
    }

    /// The whole draft, one row per cataloged module.
    #[must_use]
    pub fn rows(&self) -> Vec<ModuleGrants> {
        Module::ALL
            .into_iter()
            .map(|module| ModuleGrants::new(module, self.actions(module)))
            .collect()
    }

    /// Modules with unsaved changes.
    #[must_use]
    pub fn dirty_modules(&self) -> Vec<Module> {
        self.dirty.iter().copied().collect()
    }

    /// Whether any toggles are unsaved.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Switch the session to another scope.
    ///
    /// Any in-flight load for the previous selection becomes stale and will
    /// be discarded by [`apply_load`](Self::apply_load); unsaved toggles are
    /// dropped with the old draft.
    pub fn select_scope(&mut self, scope: Scope) {
        self.scope = scope;
        self.generation += 1;
        self.state = EditorState::Loading;
        self.draft = default_draft();
        self.dirty.clear();
        self.in_flight_save = None;
    }

    /// Start a load for the current selection.
    ///
    /// Invalidates any previously issued ticket; only the newest load may
    /// apply its result.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.state = EditorState::Loading;
        LoadTicket {
            scope: self.scope,
            generation: self.generation,
        }
    }

    /// Apply a finished load.
    ///
    /// Returns `false` when the ticket is stale (the selection changed or a
    /// newer load started while this one was in flight); a stale result is
    /// discarded without touching the draft.
    pub fn apply_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<Grant>, AccessError>,
    ) -> bool {
        if ticket.generation != self.generation || ticket.scope != self.scope {
            return false;
        }

        match result {
            Ok(grants) => {
                self.draft = default_draft();
                for grant in grants {
                    if grant.scope != self.scope {
                        continue;
                    }
                    if let Some(actions) = self.draft.get_mut(&grant.module) {
                        *actions = actions.with(grant.action, grant.allowed);
                    }
                }
                self.dirty.clear();
                self.in_flight_save = None;
                self.state = EditorState::Ready;
            }
            Err(err) => {
                self.state = EditorState::Failed(err.kind());
            }
        }
        true
    }

    /// Toggle one action in the draft.
    ///
    /// Returns `false` (and changes nothing) unless the session is `Ready`.
    pub fn toggle(&mut self, module: Module, action: Action, allowed: bool) -> bool {
        if self.state != EditorState::Ready {
            return false;
        }
        let actions = self.draft.entry(module).or_default();
        *actions = actions.with(action, allowed);
        // An in-flight save captured this module's old row; drop it from the
        // snapshot so the save's completion cannot mark the new edit clean.
        if let Some(saved) = self.in_flight_save.as_mut() {
            saved.remove(&module);
        }
        self.dirty.insert(module);
        true
    }

    /// Snapshot the dirty modules for a save.
    ///
    /// Returns `None` when no save may be issued: the session is not
    /// `Ready`, a save is already in flight, or nothing is dirty.
    pub fn begin_save(&mut self) -> Option<Vec<Grant>> {
        if self.state != EditorState::Ready
            || self.in_flight_save.is_some()
            || self.dirty.is_empty()
        {
            return None;
        }

        let modules = self.dirty.clone();
        let grants = modules
            .iter()
            .flat_map(|module| {
                ModuleGrants::new(*module, self.actions(*module)).to_grants(self.scope)
            })
            .collect();
        self.in_flight_save = Some(modules);
        Some(grants)
    }

    /// Apply a finished save.
    ///
    /// On success the saved modules leave the dirty set. On a partial
    /// failure exactly the failed modules stay dirty, so the next save
    /// retries only that subset. Toggles made while the save was in flight
    /// stay dirty in every case.
    pub fn apply_save(&mut self, result: &Result<(), AccessError>) {
        let Some(saved) = self.in_flight_save.take() else {
            return;
        };

        match result {
            Ok(()) => {
                self.dirty.retain(|module| !saved.contains(module));
            }
            Err(AccessError::PartialSave { failed }) => {
                self.dirty
                    .retain(|module| failed.contains(module) || !saved.contains(module));
            }
            Err(_) => {
                // Whole save failed; everything stays dirty for retry.
            }
        }
    }

    /// Load the current scope from a store, discarding the result if the
    /// selection changed while the call was in flight.
    pub async fn reload<B: GrantBackend>(&mut self, store: &GrantStore<B>) -> bool {
        let ticket = self.begin_load();
        let result = store.load_grants(ticket.scope()).await;
        self.apply_load(ticket, result)
    }

    /// Save dirty modules to a store.
    ///
    /// Returns `Ok(false)` when no save was issued. Errors propagate after
    /// the dirty set has been updated, so callers can show which modules to
    /// retry.
    pub async fn save<B: GrantBackend>(
        &mut self,
        store: &GrantStore<B>,
        actor_id: Option<Uuid>,
    ) -> Result<bool, AccessError> {
        let Some(grants) = self.begin_save() else {
            return Ok(false);
        };

        let result = store.save_grants(self.scope, &grants, actor_id).await;
        self.apply_save(&result);
        result.map(|()| true)
    }
}

fn default_draft() -> BTreeMap<Module, ActionSet> {
    Module::ALL
        .into_iter()
        .map(|module| (module, ActionSet::empty()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, UserType};

    fn role_scope() -> Scope {
        Scope::Role(Role::User)
    }

    fn loaded_editor() -> ScopeEditor {
        let mut editor = ScopeEditor::new(role_scope());
        let ticket = editor.begin_load();
        assert!(editor.apply_load(ticket, Ok(vec![])));
        editor
    }

    #[test]
    fn test_starts_loading_with_denied_draft() {
        let editor = ScopeEditor::new(role_scope());
        assert_eq!(editor.state(), EditorState::Loading);
        for module in Module::ALL {
            assert!(editor.actions(module).is_empty());
        }
    }

    #[test]
    fn test_load_populates_draft() {
        let mut editor = ScopeEditor::new(role_scope());
        let ticket = editor.begin_load();

        let grants = vec![
            Grant::new(role_scope(), Module::Documents, Action::View, true),
            Grant::new(role_scope(), Module::Documents, Action::Edit, true),
        ];
        assert!(editor.apply_load(ticket, Ok(grants)));

        assert_eq!(editor.state(), EditorState::Ready);
        assert!(editor.actions(Module::Documents).allows(Action::View));
        assert!(editor.actions(Module::Documents).allows(Action::Edit));
        assert!(!editor.actions(Module::Documents).allows(Action::Delete));
    }

    #[test]
    fn test_stale_load_is_discarded_on_scope_change() {
        let mut editor = ScopeEditor::new(role_scope());
        let stale_ticket = editor.begin_load();

        editor.select_scope(Scope::UserType(UserType::Collaborator));

        let grants = vec![Grant::new(role_scope(), Module::News, Action::View, true)];
        assert!(!editor.apply_load(stale_ticket, Ok(grants)));

        // Still loading for the new selection; the stale rows never landed
        assert_eq!(editor.state(), EditorState::Loading);
        assert!(editor.actions(Module::News).is_empty());
    }

    #[test]
    fn test_stale_load_is_discarded_when_newer_load_started() {
        let mut editor = ScopeEditor::new(role_scope());
        let first = editor.begin_load();
        let second = editor.begin_load();

        assert!(!editor.apply_load(first, Ok(vec![])));
        assert!(editor.apply_load(second, Ok(vec![])));
        assert_eq!(editor.state(), EditorState::Ready);
    }

    #[test]
    fn test_load_failure_reports_kind() {
        let mut editor = ScopeEditor::new(role_scope());
        let ticket = editor.begin_load();

        editor.apply_load(ticket, Err(AccessError::unavailable("boom")));
        assert_eq!(
            editor.state(),
            EditorState::Failed(AccessErrorKind::StoreUnavailable)
        );
        assert!(!editor.toggle(Module::News, Action::View, true));
    }

    #[test]
    fn test_toggle_requires_ready() {
        let mut editor = ScopeEditor::new(role_scope());
        assert!(!editor.toggle(Module::News, Action::View, true));
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_save_requires_ready_and_dirty() {
        let mut editor = ScopeEditor::new(role_scope());
        assert!(editor.begin_save().is_none()); // still loading

        let mut editor = loaded_editor();
        assert!(editor.begin_save().is_none()); // nothing dirty

        editor.toggle(Module::News, Action::View, true);
        let grants = editor.begin_save().unwrap();
        assert_eq!(grants.len(), Action::ALL.len());
        assert!(editor.begin_save().is_none()); // save already in flight
    }

    #[test]
    fn test_successful_save_clears_dirty() {
        let mut editor = loaded_editor();
        editor.toggle(Module::News, Action::View, true);
        editor.toggle(Module::Documents, Action::Edit, true);

        editor.begin_save().unwrap();
        editor.apply_save(&Ok(()));
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_partial_save_keeps_only_failed_modules_dirty() {
        let mut editor = loaded_editor();
        editor.toggle(Module::News, Action::View, true);
        editor.toggle(Module::Documents, Action::Edit, true);
        editor.toggle(Module::Users, Action::Create, true);

        editor.begin_save().unwrap();
        editor.apply_save(&Err(AccessError::PartialSave {
            failed: vec![Module::News],
        }));

        assert_eq!(editor.dirty_modules(), vec![Module::News]);
    }

    #[test]
    fn test_toggles_during_save_stay_dirty() {
        let mut editor = loaded_editor();
        editor.toggle(Module::News, Action::View, true);
        editor.begin_save().unwrap();

        // Operator keeps editing while the save is in flight
        editor.toggle(Module::Calendar, Action::View, true);

        editor.apply_save(&Ok(()));
        assert_eq!(editor.dirty_modules(), vec![Module::Calendar]);
    }

    #[test]
    fn test_retoggled_module_stays_dirty_after_its_own_save_lands() {
        let mut editor = loaded_editor();
        editor.toggle(Module::News, Action::View, true);
        editor.begin_save().unwrap();

        // Same module edited again while its old row is still in flight;
        // the save completing must not mark the new edit clean.
        editor.toggle(Module::News, Action::Edit, true);

        editor.apply_save(&Ok(()));
        assert_eq!(editor.dirty_modules(), vec![Module::News]);
        assert!(editor.actions(Module::News).allows(Action::Edit));
    }

    #[test]
    fn test_retoggled_module_stays_dirty_through_partial_save() {
        let mut editor = loaded_editor();
        editor.toggle(Module::News, Action::View, true);
        editor.toggle(Module::Documents, Action::Edit, true);
        editor.begin_save().unwrap();

        editor.toggle(Module::Documents, Action::Delete, true);

        editor.apply_save(&Err(AccessError::PartialSave {
            failed: vec![Module::News],
        }));
        assert_eq!(
            editor.dirty_modules(),
            vec![Module::Documents, Module::News]
        );
    }

    #[test]
    fn test_failed_save_keeps_everything_dirty() {
        let mut editor = loaded_editor();
        editor.toggle(Module::News, Action::View, true);

        editor.begin_save().unwrap();
        editor.apply_save(&Err(AccessError::unavailable("boom")));
        assert_eq!(editor.dirty_modules(), vec![Module::News]);
    }
}
