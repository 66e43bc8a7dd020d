//! Batch E2E tests: Update-All and batch rollback.

use std::time::Duration;

use vigil_core::catalog::Category;
use vigil_core::types::UpdateMode;
use vigil_orchestrator::{BatchKind, BatchOutcome, OperationState, OrchestratorError};

use crate::helpers::appliance::{FakeAppliance, PlanOutcome, UpdatePlan};
use crate::helpers::harness::{Harness, catalog, expectations};

// ---------------------------------------------------------------------------
// Update-All
// ---------------------------------------------------------------------------

/// Every component planned and expected -> overall success, patterns first.
#[tokio::test(start_paused = true)]
async fn test_e2e_update_all_succeeds_in_category_order() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    let mut expected = Vec::new();
    for descriptor in catalog.all() {
        appliance.plan_success(&descriptor.id, "2.0.0", 30);
        expected.push((descriptor.id.clone(), "2.0.0".to_owned()));
    }
    let h = Harness::start(appliance, catalog.clone()).await;
    let pairs: Vec<(&str, &str)> = expected
        .iter()
        .map(|(id, v)| (id.as_str(), v.as_str()))
        .collect();

    let batch = h
        .orchestrator
        .update_all(&expectations(&pairs))
        .await
        .unwrap();

    assert_eq!(batch.kind, BatchKind::UpdateAll);
    assert_eq!(batch.entries.len(), catalog.len());
    assert!(batch.overall_success(), "{:?}", batch.aborted);
    assert_eq!(batch.succeeded_count(), catalog.len());

    let categories: Vec<Category> = batch
        .entries
        .iter()
        .map(|e| catalog.get(&e.component_id).unwrap().category)
        .collect();
    let first_engine = categories
        .iter()
        .position(|c| *c == Category::Engine)
        .unwrap();
    assert!(categories[..first_engine].iter().all(|c| *c == Category::Pattern));
    assert!(categories[first_engine..].iter().all(|c| *c == Category::Engine));

    let triggered = h.appliance.inspect(|s| s.triggered.clone());
    assert!(triggered.iter().all(|(_, mode)| *mode == UpdateMode::Normal));
}

/// Missing expectations are recorded as not attempted, never as success.
#[tokio::test(start_paused = true)]
async fn test_e2e_update_all_partial_is_not_overall_success() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .plan_success("PTN", "18.501.00", 20)
        .plan_success("ENG", "24.552.1004", 20);
    let h = Harness::start(appliance, catalog.clone()).await;

    let batch = h
        .orchestrator
        .update_all(&expectations(&[("PTN", "18.501.00"), ("ENG", "24.552.1004")]))
        .await
        .unwrap();

    assert!(!batch.overall_success());
    assert_eq!(batch.succeeded_count(), 2);
    assert_eq!(batch.not_attempted_count(), catalog.len() - 2);
    assert!(batch.aborted.is_none());
}

/// A timeout is recorded and the batch continues.
#[tokio::test(start_paused = true)]
async fn test_e2e_update_all_continues_after_timeout() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .plan(
            "PTN",
            UpdatePlan {
                target_version: "18.501.00".to_owned(),
                completes_after: Duration::ZERO,
                outcome: PlanOutcome::NeverCompletes,
            },
        )
        .plan_success("SPYWARE", "2.812.00", 20);
    let h = Harness::start(appliance, catalog).await;

    let batch = h
        .orchestrator
        .update_all(&expectations(&[("PTN", "18.501.00"), ("SPYWARE", "2.812.00")]))
        .await
        .unwrap();

    assert_eq!(batch.timed_out_count(), 1);
    assert_eq!(batch.succeeded_count(), 1);
    assert!(batch.aborted.is_none());
    assert!(!batch.overall_success());
}

/// A structural failure stops the batch; the rest is not attempted.
#[tokio::test(start_paused = true)]
async fn test_e2e_update_all_aborts_on_structural_failure() {
    let catalog = catalog();
    let first_id = catalog
        .all()
        .iter()
        .find(|d| d.category == Category::Pattern)
        .map(|d| d.id.clone())
        .unwrap();
    let appliance = FakeAppliance::new(&catalog);
    appliance.remove_row(&first_id).plan_success("ENG", "24.552.1004", 20);
    let h = Harness::start(appliance, catalog.clone()).await;

    let batch = h
        .orchestrator
        .update_all(&expectations(&[(first_id.as_str(), "2.0.0"), ("ENG", "24.552.1004")]))
        .await
        .unwrap();

    let aborted = batch.aborted.as_deref().expect("batch aborted");
    assert!(aborted.contains("component row not found"), "{aborted}");
    assert_eq!(batch.entries[0].component_id, first_id);
    assert_eq!(
        batch.entries[0].report().map(|r| r.final_state),
        Some(OperationState::Failed)
    );
    assert!(batch.entries[1..].iter().all(|e| matches!(
        e.outcome,
        BatchOutcome::NotAttempted { ref reason } if reason.starts_with("batch aborted")
    )));
    assert_eq!(batch.entries.len(), catalog.len());
    assert!(h.appliance.inspect(|s| s.triggered.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn test_e2e_update_all_rejects_unknown_expectation() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    let h = Harness::start(appliance, catalog).await;

    let err = h
        .orchestrator
        .update_all(&expectations(&[("NOPE", "1.0.0")]))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::UnknownComponent(_)));
    assert!(h.appliance.inspect(|s| s.commands.is_empty()));
}

// ---------------------------------------------------------------------------
// Batch rollback
// ---------------------------------------------------------------------------

/// Eligibility is validated for every id before anything runs.
#[tokio::test(start_paused = true)]
async fn test_e2e_rollback_batch_validates_up_front() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance.plan_success("PTN", "18.500.00", 20);
    let h = Harness::start(appliance, catalog).await;

    let ids = vec!["PTN".to_owned(), "TMUFEENG".to_owned()];
    let err = h
        .orchestrator
        .rollback_batch(&ids, &expectations(&[("PTN", "18.500.00"), ("TMUFEENG", "1.0.0")]))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::RollbackNotSupported(ref id) if id == "TMUFEENG"));
    assert!(h.button_clicks().is_empty());
    assert!(h.appliance.inspect(|s| s.commands.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn test_e2e_rollback_batch_runs_in_given_order() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .set_version("ENG", "24.552.1004")
        .set_version("PTN", "18.501.00")
        .plan_success("ENG", "24.550.1001", 40)
        .plan_success("PTN", "18.500.00", 20);
    let h = Harness::start(appliance, catalog).await;

    let ids = vec!["ENG".to_owned(), "PTN".to_owned()];
    let batch = h
        .orchestrator
        .rollback_batch(&ids, &expectations(&[("ENG", "24.550.1001"), ("PTN", "18.500.00")]))
        .await
        .unwrap();

    assert_eq!(batch.kind, BatchKind::RollbackBatch);
    assert!(batch.overall_success());
    let order: Vec<&str> = batch.entries.iter().map(|e| e.component_id.as_str()).collect();
    assert_eq!(order, vec!["ENG", "PTN"]);
    let triggered = h.appliance.inspect(|s| s.triggered.clone());
    assert_eq!(
        triggered,
        vec![
            ("ENG".to_owned(), UpdateMode::Rollback),
            ("PTN".to_owned(), UpdateMode::Rollback),
        ]
    );
}
