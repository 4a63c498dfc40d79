//! Store integration tests against the in-memory backend, plus ignored
//! smoke tests for a real `PostgreSQL` instance.
//!
//! Run the database tests with:
//! `DATABASE_URL=postgres://... cargo test --test store_test -- --ignored`

use intranet_access::{
    AccessError, ActionSet, Grant, GrantStore, MemoryBackend, Module, ModuleGrants, Role, Scope,
    UserType,
};

fn memory_store() -> GrantStore<MemoryBackend> {
    init_tracing();
    GrantStore::new(MemoryBackend::new())
}

/// Route store spans to the test writer; `RUST_LOG` controls verbosity.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn row_grants(scope: Scope, module: Module, actions: ActionSet) -> Vec<Grant> {
    ModuleGrants::new(module, actions).to_grants(scope)
}

#[tokio::test]
async fn test_empty_scope_loads_no_grants() {
    let store = memory_store();
    let grants = store
        .load_grants(Scope::Role(Role::User))
        .await
        .expect("load");
    assert!(grants.is_empty());
}

#[tokio::test]
async fn test_save_then_load_roundtrip() {
    let store = memory_store();
    let scope = Scope::UserType(UserType::Collaborator);

    let mut grants = row_grants(scope, Module::Documents, ActionSet::VIEW | ActionSet::EDIT);
    grants.extend(row_grants(scope, Module::News, ActionSet::VIEW));

    store.save_grants(scope, &grants, None).await.expect("save");

    let loaded = store.load_grants(scope).await.expect("load");
    for grant in &grants {
        assert!(
            loaded.contains(grant),
            "missing grant after roundtrip: {grant:?}"
        );
    }
}

#[tokio::test]
async fn test_save_is_idempotent() {
    let store = memory_store();
    let scope = Scope::Role(Role::User);
    let grants = row_grants(scope, Module::Calendar, ActionSet::VIEW | ActionSet::CREATE);

    store.save_grants(scope, &grants, None).await.expect("first save");
    let after_first = store.load_grants(scope).await.expect("load");

    store.save_grants(scope, &grants, None).await.expect("second save");
    let after_second = store.load_grants(scope).await.expect("load");

    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_repeated_saves_overwrite_rather_than_duplicate() {
    let store = memory_store();
    let scope = Scope::Role(Role::User);

    store
        .save_grants(
            scope,
            &row_grants(scope, Module::News, ActionSet::all()),
            None,
        )
        .await
        .expect("save all");
    store
        .save_grants(
            scope,
            &row_grants(scope, Module::News, ActionSet::VIEW),
            None,
        )
        .await
        .expect("save view only");

    let rows = store.load_rows(scope).await.expect("load rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].actions, ActionSet::VIEW);
}

#[tokio::test]
async fn test_partial_save_reports_failed_modules_and_keeps_successes() {
    let store = memory_store();
    let scope = Scope::Role(Role::User);

    // Pre-existing value for news
    store
        .save_grants(
            scope,
            &row_grants(scope, Module::News, ActionSet::VIEW),
            None,
        )
        .await
        .expect("seed news");

    store.backend().fail_module(Module::News);

    let mut grants = row_grants(scope, Module::Documents, ActionSet::all());
    grants.extend(row_grants(scope, Module::Users, ActionSet::VIEW));
    grants.extend(row_grants(scope, Module::News, ActionSet::all()));

    let err = store
        .save_grants(scope, &grants, None)
        .await
        .expect_err("partial failure");
    match err {
        AccessError::PartialSave { failed } => assert_eq!(failed, vec![Module::News]),
        other => panic!("expected PartialSave, got {other:?}"),
    }

    // Successful rows persisted; news keeps its pre-existing value
    store.backend().clear_failures();
    let rows = store.load_rows(scope).await.expect("load rows");

    let get = |module: Module| rows.iter().find(|r| r.module == module).map(|r| r.actions);
    assert_eq!(get(Module::Documents), Some(ActionSet::all()));
    assert_eq!(get(Module::Users), Some(ActionSet::VIEW));
    assert_eq!(get(Module::News), Some(ActionSet::VIEW));
}

#[tokio::test]
async fn test_retry_of_failed_subset_completes_the_save() {
    let store = memory_store();
    let scope = Scope::Role(Role::User);

    store.backend().fail_module(Module::News);
    let grants = row_grants(scope, Module::News, ActionSet::all());
    assert!(store.save_grants(scope, &grants, None).await.is_err());

    store.backend().clear_failures();
    store.save_grants(scope, &grants, None).await.expect("retry");

    let rows = store.load_rows(scope).await.expect("load rows");
    assert_eq!(rows[0].actions, ActionSet::all());
}

#[tokio::test]
async fn test_offline_backend_is_store_unavailable() {
    let store = memory_store();
    store.backend().set_offline(true);

    let err = store
        .load_grants(Scope::Role(Role::User))
        .await
        .expect_err("offline");
    assert!(matches!(err, AccessError::StoreUnavailable { .. }));
}

#[tokio::test]
async fn test_clear_grants_resets_scope() {
    let store = memory_store();
    let scope = Scope::UserType(UserType::DepartmentHead);

    let mut grants = row_grants(scope, Module::Documents, ActionSet::all());
    grants.extend(row_grants(scope, Module::Forums, ActionSet::VIEW));
    store.save_grants(scope, &grants, None).await.expect("save");

    let deleted = store.clear_grants(scope, None).await.expect("clear");
    assert_eq!(deleted, 2);
    assert!(store.load_grants(scope).await.expect("load").is_empty());
}

#[tokio::test]
async fn test_scopes_are_independent() {
    let store = memory_store();
    let role_scope = Scope::Role(Role::User);
    let type_scope = Scope::UserType(UserType::Collaborator);

    store
        .save_grants(
            role_scope,
            &row_grants(role_scope, Module::News, ActionSet::VIEW),
            None,
        )
        .await
        .expect("save role scope");

    assert!(store.load_grants(type_scope).await.expect("load").is_empty());
}

#[tokio::test]
async fn test_saves_are_audited() {
    let store = memory_store();
    let scope = Scope::Role(Role::User);
    let actor = uuid::Uuid::now_v7();

    store
        .save_grants(
            scope,
            &row_grants(scope, Module::News, ActionSet::VIEW),
            Some(actor),
        )
        .await
        .expect("save");
    store.clear_grants(scope, Some(actor)).await.expect("clear");

    let audit = store.load_audit(10, 0).await.expect("audit");
    assert_eq!(audit.len(), 2);

    // Newest first
    assert_eq!(audit[0].action, "grants.clear");
    assert_eq!(audit[1].action, "grants.save");
    assert_eq!(audit[1].module.as_deref(), Some("news"));
    assert_eq!(audit[1].actor_id, Some(actor));
    assert_eq!(audit[1].scope_kind, "role");
    assert_eq!(audit[1].scope_value, "user");
}

// ============================================================================
// PostgreSQL smoke tests (require a running database)
// ============================================================================

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_pg_roundtrip() {
    use intranet_access::{Config, PgBackend};

    let config = std::env::var("DATABASE_URL").map_or_else(
        |_| Config::default_for_test(),
        |database_url| Config {
            database_url,
            ..Config::default_for_test()
        },
    );

    let backend = PgBackend::connect(&config).await.expect("connect");
    backend.run_migrations().await.expect("migrations");
    let store = GrantStore::new(backend);

    let scope = Scope::Role(Role::User);
    store.clear_grants(scope, None).await.expect("reset");

    let grants = row_grants(scope, Module::Training, ActionSet::VIEW | ActionSet::CREATE);
    store.save_grants(scope, &grants, None).await.expect("save");

    let rows = store.load_rows(scope).await.expect("load");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].module, Module::Training);
    assert_eq!(rows[0].actions, ActionSet::VIEW | ActionSet::CREATE);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_pg_upsert_refreshes_updated_at() {
    use intranet_access::{Config, GrantBackend, PermissionTable, PgBackend};

    let config = std::env::var("DATABASE_URL").map_or_else(
        |_| Config::default_for_test(),
        |database_url| Config {
            database_url,
            ..Config::default_for_test()
        },
    );

    let backend = PgBackend::connect(&config).await.expect("connect");
    backend.run_migrations().await.expect("migrations");

    let row = ModuleGrants::new(Module::Content, ActionSet::VIEW);
    backend
        .upsert_row(PermissionTable::Role, "user", row)
        .await
        .expect("first upsert");
    let first = backend
        .read_rows(PermissionTable::Role, "user")
        .await
        .expect("read")
        .into_iter()
        .find(|r| r.module == "content")
        .expect("row present");

    backend
        .upsert_row(
            PermissionTable::Role,
            "user",
            ModuleGrants::new(Module::Content, ActionSet::VIEW | ActionSet::EDIT),
        )
        .await
        .expect("second upsert");
    let second = backend
        .read_rows(PermissionTable::Role, "user")
        .await
        .expect("read")
        .into_iter()
        .find(|r| r.module == "content")
        .expect("row present");

    assert!(second.updated_at >= first.updated_at);
    assert!(second.can_edit);
}
