//! Read-only E2E tests: verify-only, kernel check, lock status, shutdown.

use vigil_core::types::Channel;

use crate::helpers::appliance::{FakeAppliance, KERNEL_RELEASE};
use crate::helpers::harness::{Harness, catalog};

// ---------------------------------------------------------------------------
// Verify-only
// ---------------------------------------------------------------------------

/// Verify-only checks all three channels without pressing any button.
#[tokio::test(start_paused = true)]
async fn test_e2e_verify_only_passes_for_applied_version() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance.set_version("PTN", "18.501.00");
    appliance.with(|s| s.log_now("[INFO] Update completed successfully for component: PTN"));
    let h = Harness::start(appliance, catalog).await;

    let summary = h
        .orchestrator
        .verify_only("PTN", "18.501.00", Some(600))
        .await
        .unwrap();

    assert!(summary.fully_passed(), "{:?}", summary.results);
    assert!(h.button_clicks().is_empty());
    assert!(!h.orchestrator.lock().is_held());
}

/// A lookback reaching the old error line makes the log channel fail.
#[tokio::test(start_paused = true)]
async fn test_e2e_verify_only_lookback_includes_older_errors() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance.set_version("PTN", "18.501.00");
    appliance.with(|s| s.log_now("[INFO] Update completed successfully for component: PTN"));
    let h = Harness::start(appliance, catalog).await;

    let summary = h
        .orchestrator
        .verify_only("PTN", "18.501.00", Some(3 * 3600))
        .await
        .unwrap();

    let log = summary.get(Channel::Log).unwrap();
    assert!(log.is_failed());
    assert_eq!(log.actual_value.as_deref(), Some("inconclusive"));
    assert!(summary.get(Channel::Ui).unwrap().is_passed());
    assert!(summary.get(Channel::Backend).unwrap().is_passed());
}

#[tokio::test(start_paused = true)]
async fn test_e2e_verify_only_reports_mismatch() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance.set_version("PTN", "18.500.00");
    let h = Harness::start(appliance, catalog).await;

    let summary = h
        .orchestrator
        .verify_only("PTN", "18.501.00", Some(600))
        .await
        .unwrap();

    let ui = summary.get(Channel::Ui).unwrap();
    assert!(ui.is_failed());
    assert_eq!(ui.actual_value.as_deref(), Some("18.500.00"));
    assert!(summary.get(Channel::Backend).unwrap().is_failed());
    assert_eq!(
        summary.get(Channel::Log).unwrap().actual_value.as_deref(),
        Some("missing_success")
    );
}

// ---------------------------------------------------------------------------
// Kernel
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_e2e_kernel_shown_matches_uname() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    let h = Harness::start(appliance, catalog).await;

    let summary = h.orchestrator.check_kernel().await;

    let ui = summary.get(Channel::Ui).unwrap();
    assert!(ui.is_passed(), "{:?}", ui.status);
    assert_eq!(ui.actual_value.as_deref(), Some(KERNEL_RELEASE));
    let backend = summary.get(Channel::Backend).unwrap();
    assert!(backend.is_passed(), "{:?}", backend.status);
    assert!(summary.get(Channel::Log).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_e2e_kernel_without_remote_skips_backend() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance.refuse_connections("connection refused");
    let h = Harness::start(appliance, catalog).await;

    let summary = h.orchestrator.check_kernel().await;

    assert!(summary.get(Channel::Ui).unwrap().is_passed());
    assert!(summary.get(Channel::Backend).unwrap().is_skipped());
    assert!(!summary.fully_passed());
}

// ---------------------------------------------------------------------------
// Lock status and shutdown
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_e2e_lock_status_lists_remote_artifacts() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance.add_lock("ENG");
    let h = Harness::start(appliance, catalog.clone()).await;

    let status = h.orchestrator.lock_status().await;

    assert!(status.holder.is_none());
    assert!(status.remote_unavailable.is_none());
    assert_eq!(status.artifacts.len(), catalog.len());
    for artifact in &status.artifacts {
        let expected = artifact.component_id == "ENG";
        assert_eq!(artifact.present, Some(expected), "{}", artifact.component_id);
    }
}

#[tokio::test(start_paused = true)]
async fn test_e2e_clear_lock_requires_remote_session() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    appliance.add_lock("ENG").refuse_connections("connection refused");
    let h = Harness::start(appliance, catalog).await;

    let status = h.orchestrator.lock_status().await;
    assert!(status.artifacts.is_empty());
    assert!(status.remote_unavailable.is_some());

    let err = h.orchestrator.clear_lock("ENG").await.unwrap_err();
    assert!(err.to_string().contains("remote session unavailable"), "{err}");
}

#[tokio::test(start_paused = true)]
async fn test_e2e_shutdown_closes_both_sessions() {
    let catalog = catalog();
    let appliance = FakeAppliance::new(&catalog);
    let h = Harness::start(appliance, catalog).await;
    let appliance = h.appliance.clone();

    h.orchestrator.shutdown().await.unwrap();

    assert!(appliance.inspect(|s| s.browser_closed && s.shell_closed));
}
