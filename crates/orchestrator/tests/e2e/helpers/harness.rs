//! Harness builder wiring the orchestrator to a fake appliance.

use std::collections::BTreeMap;
use std::sync::Arc;

use vigil_core::catalog::ComponentCatalog;
use vigil_core::types::{Channel, Credentials};
use vigil_inspector::InspectorConfig;
use vigil_navigator::{NavigatorConfig, UiNavigator};
use vigil_orchestrator::{OrchestratorConfig, OutcomeReport, RemoteState, UpdateOrchestrator};
use vigil_verifier::{Verifier, VerifierConfig};

use super::appliance::{FakeAppliance, FakeBrowser, FakeShell};

pub type TestOrchestrator = UpdateOrchestrator<FakeBrowser, FakeShell>;

pub struct Harness {
    pub appliance: FakeAppliance,
    pub orchestrator: TestOrchestrator,
}

pub fn catalog() -> Arc<ComponentCatalog> {
    Arc::new(ComponentCatalog::load_default().expect("embedded catalog loads"))
}

impl Harness {
    /// Logs in to the fake console and opens a remote session.
    ///
    /// When the appliance refuses connections the orchestrator runs with
    /// the remote channel unavailable.
    pub async fn start(appliance: FakeAppliance, catalog: Arc<ComponentCatalog>) -> Self {
        let navigator = UiNavigator::new(
            appliance.browser(),
            NavigatorConfig::default(),
            Arc::clone(&catalog),
        );
        navigator
            .login(&FakeAppliance::console_credentials())
            .await
            .expect("fake console login succeeds");

        let remote = RemoteState::connect(
            &appliance.connector(),
            &Credentials::new("root", "remote-secret"),
            InspectorConfig::default(),
            Arc::clone(&catalog),
        )
        .await;

        let verifier = Verifier::new(VerifierConfig::default(), Arc::clone(&catalog))
            .expect("default verifier config is valid");
        let orchestrator = UpdateOrchestrator::new(
            navigator,
            remote,
            verifier,
            catalog,
            OrchestratorConfig::default(),
        )
        .expect("default orchestrator config is valid");

        Self {
            appliance,
            orchestrator,
        }
    }

    /// Console button clicks recorded so far.
    #[allow(dead_code)]
    pub fn button_clicks(&self) -> Vec<String> {
        self.appliance.inspect(|s| {
            s.clicks
                .iter()
                .filter(|c| c.starts_with("btn:"))
                .cloned()
                .collect()
        })
    }
}

/// Builds an expectation map from `(id, version)` pairs.
#[allow(dead_code)]
pub fn expectations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(id, v)| ((*id).to_owned(), (*v).to_owned()))
        .collect()
}

/// Asserts that every channel was attempted and passed.
#[allow(dead_code)]
pub fn assert_all_channels_passed(report: &OutcomeReport) {
    for channel in Channel::ALL {
        let result = report
            .verification
            .get(channel)
            .unwrap_or_else(|| panic!("missing {channel} result in {report}"));
        assert!(
            result.is_passed(),
            "{channel} channel did not pass: {:?}",
            result.status
        );
    }
}
