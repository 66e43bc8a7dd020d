//! Policy E2E tests: rollback eligibility, unknown ids, mutual exclusion,
//! structural UI failures.

use std::time::Duration;

use vigil_orchestrator::{FailureCause, OperationState, OrchestratorError};

use crate::helpers::appliance::FakeAppliance;
use crate::helpers::harness::{Harness, catalog};

// ---------------------------------------------------------------------------
// Validation before the lock
// ---------------------------------------------------------------------------

/// TMUFEENG cannot roll back: rejected without touching lock or remote.
#[tokio::test(start_paused = true)]
async fn test_e2e_rollback_not_supported_touches_nothing() {
    let catalog = catalog();
    assert!(!catalog.get("TMUFEENG").unwrap().can_rollback);
    let appliance = FakeAppliance::new(&catalog);
    let h = Harness::start(appliance, catalog).await;
    let clicks_before = h.appliance.inspect(|s| s.clicks.len());

    let err = h
        .orchestrator
        .rollback("TMUFEENG", None, "1.0.0")
        .await
        .unwrap_err();

    assert!(
        matches!(err, OrchestratorError::RollbackNotSupported(ref id) if id == "TMUFEENG"),
        "{err}"
    );
    assert!(!h.orchestrator.lock().is_held());
    assert!(h.appliance.inspect(|s| s.commands.is_empty()));
    assert_eq!(h.appliance.inspect(|s| s.clicks.len()), clicks_before);
}

#[tokio::test(start_paused = true)]
async fn test_e2e_unknown_component_is_rejected() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    let h = Harness::start(appliance, catalog).await;

    let err = h
        .orchestrator
        .update("NOPE", None, "1.0.0")
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::UnknownComponent(ref id) if id == "NOPE"));
    assert!(h.appliance.inspect(|s| s.commands.is_empty()));
}

// ---------------------------------------------------------------------------
// Mutual exclusion
// ---------------------------------------------------------------------------

/// While PTN holds the lock a second request fails fast.
#[tokio::test(start_paused = true)]
async fn test_e2e_concurrent_update_fails_fast() {
    // Given: PTN takes 60 seconds to complete
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .set_version("PTN", "18.500.00")
        .plan_success("PTN", "18.501.00", 60)
        .plan_success("ENG", "24.552.1004", 60);
    let h = Harness::start(appliance, catalog).await;

    // When: ENG is requested one second after PTN started
    let first = h.orchestrator.update("PTN", None, "18.501.00");
    let second = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let clear = h.orchestrator.clear_lock("PTN").await;
        let update = h.orchestrator.update("ENG", None, "24.552.1004").await;
        (clear, update)
    };
    let (first, (clear, second)) = tokio::join!(first, second);

    // Then
    assert!(first.unwrap().succeeded());
    match second {
        Err(OrchestratorError::UpdateInProgress { held_by }) => {
            assert!(held_by.contains("normal PTN"), "{held_by}");
        }
        other => panic!("expected UpdateInProgress, got {other:?}"),
    }
    assert!(matches!(clear, Err(OrchestratorError::UpdateInProgress { .. })));
    let triggered = h.appliance.inspect(|s| s.triggered.len());
    assert_eq!(triggered, 1);

    // Then: lock is free again afterwards
    assert!(!h.orchestrator.lock().is_held());
}

// ---------------------------------------------------------------------------
// UI failures
// ---------------------------------------------------------------------------

/// Missing table row -> Failed with ComponentRowNotFound, lock released.
#[tokio::test(start_paused = true)]
async fn test_e2e_missing_row_fails_with_cause() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance.remove_row("ITP");
    let h = Harness::start(appliance, catalog).await;

    let report = h
        .orchestrator
        .update("ITP", None, "2.0.0")
        .await
        .unwrap();

    assert_eq!(report.final_state, OperationState::Failed);
    assert_eq!(
        report.cause,
        Some(FailureCause::ComponentRowNotFound {
            component_id: "ITP".to_owned()
        })
    );
    assert!(report.verification.results.is_empty());
    assert!(h.button_clicks().is_empty());
    assert!(!h.orchestrator.lock().is_held());
    assert_eq!(report.transitions.len(), 1);
    assert_eq!(report.transitions[0].from, OperationState::Pending);
}
