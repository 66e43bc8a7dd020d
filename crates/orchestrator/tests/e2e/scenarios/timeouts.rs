//! Timeout E2E tests: unknown outcomes and explicit lock recovery.

use std::time::Duration;

use vigil_orchestrator::OperationState;

use crate::helpers::appliance::{FakeAppliance, PlanOutcome, UpdatePlan};
use crate::helpers::harness::{Harness, catalog};

const PTN_LOCK: &str = "/var/iwss/updates/locks/ptn.lock";

fn never_completes() -> UpdatePlan {
    UpdatePlan {
        target_version: "18.501.00".to_owned(),
        completes_after: Duration::from_secs(0),
        outcome: PlanOutcome::NeverCompletes,
    }
}

/// Lock file still present at the deadline -> TimedOut, artifact reported
/// and left in place.
#[tokio::test(start_paused = true)]
async fn test_e2e_lock_never_removed_times_out() {
    // Given
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .set_version("PTN", "18.500.00")
        .plan("PTN", never_completes());
    let h = Harness::start(appliance, catalog).await;

    // When
    let started = tokio::time::Instant::now();
    let report = h
        .orchestrator
        .update("PTN", None, "18.501.00")
        .await
        .unwrap();

    // Then: unknown outcome, not failure
    assert_eq!(report.final_state, OperationState::TimedOut);
    assert!(report.timed_out());
    assert!(report.cause.is_none());
    assert_eq!(report.lock_artifact.as_deref(), Some(PTN_LOCK));
    assert!(report.verification.results.is_empty());
    assert!(started.elapsed() >= Duration::from_secs(300));

    // Then: artifact never auto-cleared, in-process lock released
    assert!(h.appliance.inspect(|s| s.locks.contains(PTN_LOCK)));
    assert!(!h.orchestrator.lock().is_held());
    let removals = h
        .appliance
        .inspect(|s| s.commands.iter().filter(|c| c.starts_with("rm ")).count());
    assert_eq!(removals, 0);
}

/// Cleanup is a separate explicit action.
#[tokio::test(start_paused = true)]
async fn test_e2e_clear_lock_after_timeout() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance.plan("PTN", never_completes());
    let h = Harness::start(appliance, catalog).await;

    let report = h
        .orchestrator
        .update("PTN", None, "18.501.00")
        .await
        .unwrap();
    assert!(report.timed_out());

    let status = h.orchestrator.lock_status().await;
    let ptn = status
        .artifacts
        .iter()
        .find(|a| a.component_id == "PTN")
        .unwrap();
    assert_eq!(ptn.present, Some(true));

    assert!(h.orchestrator.clear_lock("PTN").await.unwrap());
    assert!(!h.appliance.inspect(|s| s.locks.contains(PTN_LOCK)));
    assert!(!h.orchestrator.clear_lock("PTN").await.unwrap());
}

/// Without a remote session the table never shows the version -> TimedOut
/// with no artifact to report.
#[tokio::test(start_paused = true)]
async fn test_e2e_degraded_wait_times_out() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .plan("PTN", never_completes())
        .refuse_connections("connection refused");
    let h = Harness::start(appliance, catalog).await;

    let report = h
        .orchestrator
        .update("PTN", None, "18.501.00")
        .await
        .unwrap();

    assert_eq!(report.final_state, OperationState::TimedOut);
    assert!(report.lock_artifact.is_none());
    assert!(!report.remote_available);
}
