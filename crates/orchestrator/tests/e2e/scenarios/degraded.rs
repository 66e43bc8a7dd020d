//! Degraded-mode E2E tests: the remote shell cannot be opened.

use vigil_core::types::Channel;
use vigil_orchestrator::{FailureCause, OperationState};

use crate::helpers::appliance::FakeAppliance;
use crate::helpers::harness::{Harness, catalog};

/// With `connect()` failing the console trigger and UI check still happen,
/// backend and log are skipped, and the operation never succeeds.
#[tokio::test(start_paused = true)]
async fn test_e2e_connect_failure_skips_remote_channels() {
    // Given: an appliance refusing ssh connections
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .set_version("PTN", "18.500.00")
        .plan_success("PTN", "18.501.00", 20)
        .refuse_connections("connection refused");
    let h = Harness::start(appliance, catalog).await;
    assert!(!h.orchestrator.remote().is_available());

    // When
    let report = h
        .orchestrator
        .update("PTN", Some("18.500.00"), "18.501.00")
        .await
        .unwrap();

    // Then: UI triggered and verified
    assert_eq!(h.button_clicks(), vec!["btn:Update".to_owned()]);
    let ui = report.verification.get(Channel::Ui).unwrap();
    assert!(ui.is_passed(), "{:?}", ui.status);

    // Then: remote channels visible as skipped, with the reason
    for channel in [Channel::Backend, Channel::Log] {
        let result = report.verification.get(channel).unwrap();
        assert!(result.is_skipped(), "{channel}: {:?}", result.status);
        assert!(
            result.reason().is_some_and(|r| r.contains("connection refused")),
            "{:?}",
            result.reason()
        );
    }

    // Then: never Succeeded
    assert_eq!(report.final_state, OperationState::Failed);
    assert!(matches!(
        report.cause,
        Some(FailureCause::Unverified { ref skipped, .. })
            if skipped == &vec![Channel::Backend, Channel::Log]
    ));
    assert!(!report.remote_available);
    assert!(report.baseline.is_none());
    assert!(h.appliance.inspect(|s| s.commands.is_empty()));
}

/// Without a remote session completion is awaited on the update table.
#[tokio::test(start_paused = true)]
async fn test_e2e_degraded_wait_polls_update_table() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .set_version("BOT", "1.101.00")
        .plan_success("BOT", "1.102.00", 45)
        .refuse_connections("no route to host");
    let h = Harness::start(appliance, catalog).await;

    let started = tokio::time::Instant::now();
    let report = h
        .orchestrator
        .update("BOT", None, "1.102.00")
        .await
        .unwrap();

    assert!(started.elapsed().as_secs() >= 45);
    assert!(
        report
            .transitions
            .iter()
            .any(|t| t.to == OperationState::Verifying),
        "degraded wait should reach verification"
    );
    assert_eq!(
        report.verification.get(Channel::Ui).unwrap().actual_value.as_deref(),
        Some("1.102.00")
    );
}

/// An unreadable appliance clock moves the log window onto the host clock
/// instead of leaving it unanchored.
#[tokio::test(start_paused = true)]
async fn test_e2e_unreadable_clock_uses_host_log_window() {
    // Given: the appliance `date` command fails
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance
        .set_version("PTN", "18.500.00")
        .plan_success("PTN", "18.501.00", 20);
    appliance.with(|s| s.clock_unreadable = true);
    let h = Harness::start(appliance, catalog).await;

    // When
    let report = h
        .orchestrator
        .update("PTN", Some("18.500.00"), "18.501.00")
        .await
        .unwrap();

    // Then: the log was read and evaluated, with the fallback in evidence
    let log = report.verification.get(Channel::Log).unwrap();
    assert!(!log.is_skipped(), "{:?}", log.status);
    assert!(log.actual_value.is_some());
    assert!(
        log.evidence
            .iter()
            .any(|e| e.starts_with("appliance clock unreadable at start")),
        "{:?}",
        log.evidence
    );
    assert!(h.appliance.inspect(|s| s.commands.iter().any(|c| c.starts_with("tail -n"))));
    assert!(report.verification.get(Channel::Backend).unwrap().is_passed());
}
