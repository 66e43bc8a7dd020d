//! Update flow E2E tests: trigger, completion, three-channel verification.

use std::time::Duration;

use vigil_core::types::{Channel, UpdateMode};
use vigil_orchestrator::{FailureCause, OperationState};

use crate::helpers::appliance::{FakeAppliance, PlanOutcome, UpdatePlan};
use crate::helpers::harness::{Harness, assert_all_channels_passed, catalog};

// ---------------------------------------------------------------------------
// Normal update
// ---------------------------------------------------------------------------

/// PTN 18.500.00 -> 18.501.00: lock goes away in time, backend, console and
/// log all agree.
#[tokio::test(start_paused = true)]
async fn test_e2e_normal_update_succeeds_across_all_channels() {
    // Given: PTN at 18.500.00, the update completes after 20 seconds
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .set_version("PTN", "18.500.00")
        .plan_success("PTN", "18.501.00", 20);
    let h = Harness::start(appliance, catalog).await;

    // When
    let report = h
        .orchestrator
        .update("PTN", Some("18.500.00"), "18.501.00")
        .await
        .expect("policy checks pass");

    // Then
    assert_eq!(report.final_state, OperationState::Succeeded, "{report}");
    assert!(report.succeeded());
    assert!(report.cause.is_none());
    assert!(report.remote_available);
    assert_all_channels_passed(&report);
    assert_eq!(report.verification.skipped().count(), 0);

    let baseline = report.baseline.as_ref().expect("baseline recorded");
    assert!(baseline.is_passed());
    assert_eq!(baseline.actual_value.as_deref(), Some("18.500.00"));

    let ui = report.verification.get(Channel::Ui).unwrap();
    assert_eq!(ui.actual_value.as_deref(), Some("18.501.00"));
    let backend = report.verification.get(Channel::Backend).unwrap();
    assert!(backend.evidence.iter().any(|e| e == "PTNVersion=18.501.00"));
    let log = report.verification.get(Channel::Log).unwrap();
    assert!(
        log.evidence
            .iter()
            .any(|e| e == "version changed 18.500.00 -> 18.501.00"),
        "{:?}",
        log.evidence
    );

    let states: Vec<OperationState> = report.transitions.iter().map(|t| t.to).collect();
    assert_eq!(
        states,
        vec![
            OperationState::Triggered,
            OperationState::Polling,
            OperationState::Verifying,
            OperationState::Succeeded,
        ]
    );
    assert!(!h.orchestrator.lock().is_held());
    assert_eq!(h.button_clicks(), vec!["btn:Update".to_owned()]);
}

/// The old PTN error line before the operation started is outside the
/// log window and does not fail the log channel.
#[tokio::test(start_paused = true)]
async fn test_e2e_errors_before_operation_start_are_ignored() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .set_version("PTN", "18.500.00")
        .plan_success("PTN", "18.501.00", 10);
    assert!(appliance.inspect(|s| s.log.iter().any(|l| l.contains("[ERROR] PTN"))));
    let h = Harness::start(appliance, catalog).await;

    let report = h
        .orchestrator
        .update("PTN", None, "18.501.00")
        .await
        .unwrap();

    assert!(report.succeeded(), "{report}");
    assert!(report.baseline.is_none());
}

// ---------------------------------------------------------------------------
// Engines and forced updates
// ---------------------------------------------------------------------------

/// Engine updates additionally require the dependent service to run.
#[tokio::test(start_paused = true)]
async fn test_e2e_engine_update_checks_service() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .set_version("ENG", "24.550.1001")
        .plan_success("ENG", "24.552.1004", 120);
    let h = Harness::start(appliance, catalog).await;

    let report = h
        .orchestrator
        .update("ENG", Some("24.550.1001"), "24.552.1004")
        .await
        .unwrap();

    assert!(report.succeeded(), "{report}");
    let backend = report.verification.get(Channel::Backend).unwrap();
    assert!(backend.evidence.iter().any(|e| e == "service iwss: running"));
}

/// A stopped service fails the backend channel only.
#[tokio::test(start_paused = true)]
async fn test_e2e_engine_update_with_stopped_service_fails_backend() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .set_version("ENG", "24.550.1001")
        .plan_success("ENG", "24.552.1004", 60);
    appliance.with(|s| s.service_state = "inactive".to_owned());
    let h = Harness::start(appliance, catalog).await;

    let report = h
        .orchestrator
        .update("ENG", None, "24.552.1004")
        .await
        .unwrap();

    assert_eq!(report.final_state, OperationState::Failed);
    assert_eq!(
        report.cause,
        Some(FailureCause::Verification {
            channels: vec![Channel::Backend]
        })
    );
    assert!(report.verification.get(Channel::Ui).unwrap().is_passed());
    assert!(report.verification.get(Channel::Log).unwrap().is_passed());
}

/// Forced update re-applies the same version through the forced button.
#[tokio::test(start_paused = true)]
async fn test_e2e_forced_update_reapplies_same_version() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .set_version("SPYWARE", "2.811.00")
        .plan_success("SPYWARE", "2.811.00", 15);
    let h = Harness::start(appliance, catalog).await;

    let report = h
        .orchestrator
        .force_update("SPYWARE", Some("2.811.00"), "2.811.00")
        .await
        .unwrap();

    assert!(report.succeeded(), "{report}");
    assert_eq!(report.mode, UpdateMode::Forced);
    assert_eq!(h.button_clicks(), vec!["btn:Forced Update".to_owned()]);
    let triggered = h.appliance.inspect(|s| s.triggered.clone());
    assert_eq!(triggered, vec![("SPYWARE".to_owned(), UpdateMode::Forced)]);
}

// ---------------------------------------------------------------------------
// Rollback
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_e2e_rollback_restores_previous_version() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .set_version("PTN", "18.501.00")
        .plan_success("PTN", "18.500.00", 30);
    let h = Harness::start(appliance, catalog).await;

    let report = h
        .orchestrator
        .rollback("PTN", Some("18.501.00"), "18.500.00")
        .await
        .unwrap();

    assert!(report.succeeded(), "{report}");
    assert_eq!(report.mode, UpdateMode::Rollback);
    assert_eq!(report.timeout_secs, 180);
    assert_eq!(h.button_clicks(), vec!["btn:Rollback".to_owned()]);
}

// ---------------------------------------------------------------------------
// Log ambiguity
// ---------------------------------------------------------------------------

/// An error marker in the window fails the log channel even though the
/// version changed everywhere else.
#[tokio::test(start_paused = true)]
async fn test_e2e_log_error_fails_operation() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance.set_version("PTN", "18.500.00").plan(
        "PTN",
        UpdatePlan {
            target_version: "18.501.00".to_owned(),
            completes_after: Duration::from_secs(20),
            outcome: PlanOutcome::LogError,
        },
    );
    let h = Harness::start(appliance, catalog).await;

    let report = h
        .orchestrator
        .update("PTN", None, "18.501.00")
        .await
        .unwrap();

    assert_eq!(report.final_state, OperationState::Failed);
    assert_eq!(
        report.cause,
        Some(FailureCause::Verification {
            channels: vec![Channel::Log]
        })
    );
    let log = report.verification.get(Channel::Log).unwrap();
    assert!(log.evidence.iter().any(|e| e.contains("checksum mismatch")));
}

/// A success line logged after an error is inconclusive, not a pass.
#[tokio::test(start_paused = true)]
async fn test_e2e_success_after_error_is_inconclusive() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .set_version("PTN", "18.500.00")
        .plan_success("PTN", "18.501.00", 20);
    appliance.with(|s| s.log_now("[ERROR] PTN download failed, retrying"));
    let h = Harness::start(appliance, catalog).await;

    let report = h
        .orchestrator
        .update("PTN", None, "18.501.00")
        .await
        .unwrap();

    assert_eq!(report.final_state, OperationState::Failed);
    let log = report.verification.get(Channel::Log).unwrap();
    assert_eq!(log.actual_value.as_deref(), Some("inconclusive"));
    assert!(log.evidence.iter().any(|e| e.contains("download failed")));
    assert!(
        log.evidence
            .iter()
            .any(|e| e.contains("Update completed successfully"))
    );
}
