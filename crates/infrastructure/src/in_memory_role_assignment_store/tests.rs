use std::sync::Arc;

use chrono::NaiveDateTime;
use respsync_application::{
    AssignmentMutation, Clock, MutationKind, RoleAssignmentService, RoleAssignmentStore,
    RoleLookup,
};
use respsync_core::AppError;
use respsync_domain::{AssignmentScope, RoleAssignmentRecord, StoreCapabilities, TemporalValue};

use super::InMemoryRoleAssignmentStore;

struct FixedClock(NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

fn clock() -> Arc<FixedClock> {
    let now = NaiveDateTime::parse_from_str("2024-03-15 12:00:00", "%Y-%m-%d %H:%M:%S")
        .unwrap_or_default();
    Arc::new(FixedClock(now))
}

fn views() -> StoreCapabilities {
    StoreCapabilities {
        description_column: true,
        multi_view_layout: true,
    }
}

fn record(raw: &str) -> RoleAssignmentRecord {
    RoleAssignmentRecord::parse(raw).unwrap_or_else(|error| panic!("{raw}: {error}"))
}

fn catalog(capabilities: StoreCapabilities) -> InMemoryRoleAssignmentStore {
    InMemoryRoleAssignmentStore::new(clock(), capabilities)
        .with_responsibility("RoleA", "AppX")
        .with_responsibility("RoleB", "AppX")
        .with_responsibility("Shared", "AppZ")
        .with_security_group("GroupY")
}

fn add(raw: &str) -> AssignmentMutation {
    AssignmentMutation::for_record(MutationKind::Add, "jdoe", &record(raw), true)
}

#[tokio::test]
async fn added_assignment_is_listed_in_direct_scope() {
    let store = catalog(views());

    let result = store
        .mutate_assignment(&add("RoleA||AppX||GroupY||desc||2024-01-01||null"))
        .await;
    assert!(result.is_ok());

    let direct = store
        .fetch_current_assignments("jdoe", AssignmentScope::Direct, false)
        .await;
    assert_eq!(
        direct.unwrap_or_default(),
        vec!["RoleA||AppX||GroupY||desc||2024-01-01 00:00:00.0||null".to_owned()]
    );

    let other_identity = store
        .fetch_current_assignments("asmith", AssignmentScope::Direct, false)
        .await;
    assert!(other_identity.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn server_time_resolves_to_clock() {
    let store = catalog(views());

    let result = store
        .mutate_assignment(&add("RoleA||AppX||GroupY||desc||sysdate||null"))
        .await;
    assert!(result.is_ok());

    let rows = store
        .fetch_current_assignments("jdoe", AssignmentScope::Direct, false)
        .await
        .unwrap_or_default();
    assert_eq!(
        rows,
        vec!["RoleA||AppX||GroupY||desc||2024-03-15 12:00:00.0||null".to_owned()]
    );
}

#[tokio::test]
async fn qualified_lookup_needs_catalog_application() {
    let store = catalog(views());

    let mut mutation = add("Shared||AppX||GroupY||desc||2024-01-01||null");
    let qualified = store.mutate_assignment(&mutation).await;
    assert!(matches!(qualified, Err(AppError::NotFound(_))));

    mutation.lookup = RoleLookup::Unqualified;
    assert!(store.mutate_assignment(&mutation).await.is_ok());

    let rows = store
        .fetch_current_assignments("jdoe", AssignmentScope::Direct, false)
        .await
        .unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("Shared||AppZ||GroupY"));
}

#[tokio::test]
async fn unknown_role_or_group_is_not_found() {
    let store = catalog(views());

    let unknown_role = store
        .mutate_assignment(&add("Ghost||AppX||GroupY||desc||2024-01-01||null"))
        .await;
    let unknown_group = store
        .mutate_assignment(&add("RoleA||AppX||Nowhere||desc||2024-01-01||null"))
        .await;

    assert!(matches!(unknown_role, Err(AppError::NotFound(_))));
    assert!(matches!(unknown_group, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn duplicate_add_conflicts_and_missing_rows_are_not_found() {
    let store = catalog(views());
    let mutation = add("RoleA||AppX||GroupY||desc||2024-01-01||null");
    assert!(store.mutate_assignment(&mutation).await.is_ok());

    let duplicate = store.mutate_assignment(&mutation).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let mut update = add("RoleB||AppX||GroupY||desc||2024-01-01||null");
    update.kind = MutationKind::Update;
    let update_result = store.mutate_assignment(&update).await;
    assert!(matches!(update_result, Err(AppError::NotFound(_))));

    let delete = AssignmentMutation::delete("jdoe", &update.key);
    let delete_result = store.mutate_assignment(&delete).await;
    assert!(matches!(delete_result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn inherited_assignments_follow_scope_and_layout() {
    let seeded = |capabilities| {
        catalog(capabilities)
            .with_assignment(
                "jdoe",
                record("RoleA||AppX||GroupY||direct||2024-01-01||null"),
                false,
            )
            .with_assignment(
                "jdoe",
                record("RoleB||AppX||GroupY||inherited||2024-01-01||null"),
                true,
            )
    };

    let multi_view = seeded(views());
    let direct = multi_view
        .fetch_current_assignments("jdoe", AssignmentScope::Direct, false)
        .await
        .unwrap_or_default();
    let indirect = multi_view
        .fetch_current_assignments("jdoe", AssignmentScope::Indirect, false)
        .await
        .unwrap_or_default();
    assert_eq!(direct.len(), 1);
    assert!(direct[0].starts_with("RoleA"));
    assert_eq!(indirect.len(), 1);
    assert!(indirect[0].starts_with("RoleB"));

    let legacy = seeded(StoreCapabilities::default());
    let everything = legacy
        .fetch_current_assignments("jdoe", AssignmentScope::Direct, false)
        .await
        .unwrap_or_default();
    assert_eq!(everything.len(), 2);
}

#[tokio::test]
async fn active_only_uses_clock() {
    let store = catalog(views())
        .with_assignment(
            "jdoe",
            record("RoleA||AppX||GroupY||lapsed||2020-01-01||2020-12-31"),
            false,
        )
        .with_assignment(
            "jdoe",
            record("RoleB||AppX||GroupY||future||2030-01-01||null"),
            false,
        )
        .with_assignment(
            "jdoe",
            record("Shared||AppZ||GroupY||open||2024-01-01||null"),
            false,
        );

    let active = store
        .fetch_current_assignments("jdoe", AssignmentScope::Direct, true)
        .await
        .unwrap_or_default();

    assert_eq!(active.len(), 1);
    assert!(active[0].starts_with("Shared"));
}

#[tokio::test]
async fn missing_description_column_drops_descriptions() {
    let capabilities = StoreCapabilities {
        description_column: false,
        multi_view_layout: false,
    };
    let store = catalog(capabilities);

    let result = store
        .mutate_assignment(&add("RoleA||AppX||GroupY||desc||2024-01-01||null"))
        .await;
    assert!(result.is_ok());

    let rows = store
        .fetch_current_assignments("jdoe", AssignmentScope::Legacy, false)
        .await
        .unwrap_or_default();
    assert_eq!(
        rows,
        vec!["RoleA||AppX||GroupY||2024-01-01 00:00:00.0||null".to_owned()]
    );
}

#[tokio::test]
async fn service_reconciles_in_memory_store() {
    let store = Arc::new(
        catalog(views())
            .with_assignment(
                "jdoe",
                record("RoleA||AppX||GroupY||desc||2024-01-01 00:00:00.0||null"),
                false,
            )
            .with_assignment(
                "jdoe",
                record("RoleB||AppX||GroupY||stale||2023-01-01||null"),
                false,
            )
            .with_assignment(
                "jdoe",
                record("Shared||AppZ||GroupY||inherited||2023-01-01||null"),
                true,
            ),
    );
    let service = RoleAssignmentService::new(store.clone(), clock(), store.capabilities());
    let desired = vec![
        "RoleA||AppX||GroupY||desc||2024-01-01||null".to_owned(),
        "Shared||AppZ||GroupY||direct||2024-02-01||2024-12-31".to_owned(),
    ];

    let summary = service
        .reconcile("jdoe", &desired)
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert_eq!((summary.deleted, summary.added, summary.updated), (1, 1, 0));

    let repeat = service
        .plan("jdoe", &desired)
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert!(repeat.is_empty());

    let indirect = store
        .fetch_current_assignments("jdoe", AssignmentScope::Indirect, false)
        .await
        .unwrap_or_default();
    assert_eq!(indirect.len(), 1);
    assert!(indirect[0].contains("inherited"));
}

#[tokio::test]
async fn record_with_explicit_end_is_stored_as_given() {
    let store = catalog(views());
    let mutation = add("RoleA||AppX||GroupY||desc||2024-01-01||2024-06-30 18:00:00");

    assert!(store.mutate_assignment(&mutation).await.is_ok());
    assert!(matches!(mutation.end_date, TemporalValue::Explicit(_)));

    let rows = store
        .fetch_current_assignments("jdoe", AssignmentScope::Direct, false)
        .await
        .unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].ends_with("||2024-01-01 00:00:00.0||2024-06-30 18:00:00.0"));
}

#[tokio::test]
async fn server_time_records_stay_settled_after_reconcile() {
    let store = Arc::new(catalog(views()));
    let service = RoleAssignmentService::new(store.clone(), clock(), store.capabilities());
    let desired = vec![
        "RoleA||AppX||GroupY".to_owned(),
        "RoleB||AppX||GroupY||desc||sysdate||null".to_owned(),
    ];

    let summary = service
        .reconcile("jdoe", &desired)
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert_eq!(summary.added, 2);

    let plan = service
        .plan("jdoe", &desired)
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert!(plan.is_empty());

    let rows = store
        .fetch_current_assignments("jdoe", AssignmentScope::Direct, false)
        .await
        .unwrap_or_default();
    assert!(rows.iter().all(|row| row.contains("2024-03-15 12:00:00.0")));
}

#[tokio::test]
async fn fallback_onto_kept_lapsed_assignment_conflicts_and_stops() {
    let store = Arc::new(catalog(views()).with_assignment(
        "jdoe",
        record("RoleA||AppX||GroupY||old||2020-01-01||2020-12-31"),
        false,
    ));
    let service = RoleAssignmentService::new(store.clone(), clock(), store.capabilities());
    let desired = vec![
        "RoleA||StaleApp||GroupY||desc||2024-01-01||null".to_owned(),
        "RoleB||AppX||GroupY||desc||2024-01-01||null".to_owned(),
    ];

    let result = service.reconcile("jdoe", &desired).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let rows = store
        .fetch_current_assignments("jdoe", AssignmentScope::Direct, false)
        .await
        .unwrap_or_default();
    assert_eq!(
        rows,
        vec!["RoleA||AppX||GroupY||old||2020-01-01 00:00:00.0||2020-12-31 00:00:00.0".to_owned()]
    );
}
