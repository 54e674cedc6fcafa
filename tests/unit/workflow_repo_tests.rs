//! Unit tests for the workflow instance repository.

use std::sync::Arc;

use chrono::{Duration, Utc};

use atlas_gateway::models::workflow::{WorkflowInstance, WorkflowState};
use atlas_gateway::persistence::db;
use atlas_gateway::persistence::workflow_repo::WorkflowRepo;

async fn create(db: &Arc<sqlx::SqlitePool>, instance: &WorkflowInstance) {
    let mut tx = db.begin().await.expect("begin");
    WorkflowRepo::create_tx(&mut *tx, instance)
        .await
        .expect("create");
    tx.commit().await.expect("commit");
}

async fn transition(
    db: &Arc<sqlx::SqlitePool>,
    action_id: &str,
    from: WorkflowState,
    to: WorkflowState,
    deadline: Option<chrono::DateTime<Utc>>,
    decided_by: Option<&str>,
) -> bool {
    let mut tx = db.begin().await.expect("begin");
    let claimed = WorkflowRepo::transition_tx(&mut *tx, action_id, from, to, deadline, decided_by)
        .await
        .expect("transition");
    tx.commit().await.expect("commit");
    claimed
}

#[tokio::test]
async fn create_and_get_round_trip() {
    let database = Arc::new(db::connect_memory().await.expect("db connect"));
    let repo = WorkflowRepo::new(Arc::clone(&database));

    let instance = WorkflowInstance::new("wf-1".into());
    create(&database, &instance).await;

    let fetched = repo
        .get_by_id("wf-1")
        .await
        .expect("get")
        .expect("instance exists");
    assert_eq!(fetched.action_id, "wf-1");
    assert_eq!(fetched.state, WorkflowState::Created);
    assert!(fetched.deadline_at.is_none());
}

#[tokio::test]
async fn get_missing_returns_none() {
    let database = Arc::new(db::connect_memory().await.expect("db connect"));
    let repo = WorkflowRepo::new(database);
    assert!(repo.get_by_id("missing").await.expect("get").is_none());
}

#[tokio::test]
async fn duplicate_create_fails() {
    let database = Arc::new(db::connect_memory().await.expect("db connect"));
    let instance = WorkflowInstance::new("wf-1".into());
    create(&database, &instance).await;

    let mut tx = database.begin().await.expect("begin");
    assert!(WorkflowRepo::create_tx(&mut *tx, &instance).await.is_err());
}

#[tokio::test]
async fn guarded_transition_claims_only_from_expected_state() {
    let database = Arc::new(db::connect_memory().await.expect("db connect"));
    let repo = WorkflowRepo::new(Arc::clone(&database));

    let instance = WorkflowInstance::new("wf-1".into());
    create(&database, &instance).await;

    // Wrong prior state — no claim, row untouched.
    let claimed = transition(
        &database,
        "wf-1",
        WorkflowState::AwaitingDecision,
        WorkflowState::Approved,
        None,
        None,
    )
    .await;
    assert!(!claimed);
    let current = repo.get_by_id("wf-1").await.expect("get").expect("exists");
    assert_eq!(current.state, WorkflowState::Created);

    // Correct prior state — claimed.
    let claimed = transition(
        &database,
        "wf-1",
        WorkflowState::Created,
        WorkflowState::Assessing,
        None,
        None,
    )
    .await;
    assert!(claimed);
    let current = repo.get_by_id("wf-1").await.expect("get").expect("exists");
    assert_eq!(current.state, WorkflowState::Assessing);
}

#[tokio::test]
async fn transition_records_deadline_and_reviewer() {
    let database = Arc::new(db::connect_memory().await.expect("db connect"));
    let repo = WorkflowRepo::new(Arc::clone(&database));

    let instance = WorkflowInstance::new("wf-1".into());
    create(&database, &instance).await;

    let deadline = Utc::now() + Duration::hours(24);
    assert!(
        transition(
            &database,
            "wf-1",
            WorkflowState::Created,
            WorkflowState::AwaitingDecision,
            Some(deadline),
            None,
        )
        .await
    );

    let parked = repo.get_by_id("wf-1").await.expect("get").expect("exists");
    assert!(parked.deadline_at.is_some());
    assert!(parked.decided_by.is_none());

    assert!(
        transition(
            &database,
            "wf-1",
            WorkflowState::AwaitingDecision,
            WorkflowState::Approved,
            None,
            Some("sarah"),
        )
        .await
    );

    let resolved = repo.get_by_id("wf-1").await.expect("get").expect("exists");
    assert_eq!(resolved.state, WorkflowState::Approved);
    assert_eq!(resolved.decided_by.as_deref(), Some("sarah"));
    // The deadline stays on record after resolution.
    assert!(resolved.deadline_at.is_some());
}

#[tokio::test]
async fn second_contender_observes_no_claim() {
    let database = Arc::new(db::connect_memory().await.expect("db connect"));

    let instance = WorkflowInstance::new("wf-1".into());
    create(&database, &instance).await;
    assert!(
        transition(
            &database,
            "wf-1",
            WorkflowState::Created,
            WorkflowState::AwaitingDecision,
            Some(Utc::now() + Duration::hours(1)),
            None,
        )
        .await
    );

    // First contender wins the terminal transition.
    assert!(
        transition(
            &database,
            "wf-1",
            WorkflowState::AwaitingDecision,
            WorkflowState::Approved,
            None,
            Some("sarah"),
        )
        .await
    );

    // Second contender (e.g. the expiry sweep) observes a terminal state.
    assert!(
        !transition(
            &database,
            "wf-1",
            WorkflowState::AwaitingDecision,
            WorkflowState::Expired,
            None,
            None,
        )
        .await
    );

    let repo = WorkflowRepo::new(database);
    let current = repo.get_by_id("wf-1").await.expect("get").expect("exists");
    assert_eq!(current.state, WorkflowState::Approved);
}

#[tokio::test]
async fn list_overdue_honors_the_deadline_boundary() {
    let database = Arc::new(db::connect_memory().await.expect("db connect"));
    let repo = WorkflowRepo::new(Arc::clone(&database));

    let overdue = WorkflowInstance::new("wf-overdue".into());
    create(&database, &overdue).await;
    transition(
        &database,
        "wf-overdue",
        WorkflowState::Created,
        WorkflowState::AwaitingDecision,
        Some(Utc::now() - Duration::minutes(5)),
        None,
    )
    .await;

    let fresh = WorkflowInstance::new("wf-fresh".into());
    create(&database, &fresh).await;
    transition(
        &database,
        "wf-fresh",
        WorkflowState::Created,
        WorkflowState::AwaitingDecision,
        Some(Utc::now() + Duration::hours(1)),
        None,
    )
    .await;

    let listed = repo.list_overdue(Utc::now()).await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].action_id, "wf-overdue");

    assert_eq!(repo.count_awaiting().await.expect("count"), 2);
    let awaiting = repo.list_awaiting().await.expect("list awaiting");
    assert_eq!(awaiting.len(), 2);
}
