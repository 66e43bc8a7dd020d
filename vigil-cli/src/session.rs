//! Wiring of a live orchestrator from the effective configuration.
//!
//! Opens the browser session (login included) and, when enabled, the remote
//! shell session. A remote connection failure degrades to an unavailable
//! remote instead of aborting; a browser or login failure aborts.

use std::sync::Arc;

use tracing::{info, warn};

use vigil_core::catalog::ComponentCatalog;
use vigil_core::config::VigilConfig;
use vigil_inspector::{InspectorConfig, SshConnector, SshShell};
use vigil_navigator::{NavigatorConfig, UiNavigator, WebDriverClient};
use vigil_orchestrator::{OrchestratorConfig, RemoteState, UpdateOrchestrator};
use vigil_verifier::{Verifier, VerifierConfig};

use crate::error::CliError;

/// Orchestrator over the production WebDriver and OpenSSH backends.
pub type LiveOrchestrator = UpdateOrchestrator<WebDriverClient, SshShell>;

/// Build and log in a live orchestrator.
///
/// # Errors
///
/// - `CliError::Unreachable` if the WebDriver server or console login fails.
/// - `CliError::Core` for invalid derived configuration.
pub async fn open(
    config: &VigilConfig,
    catalog: Arc<ComponentCatalog>,
) -> Result<LiveOrchestrator, CliError> {
    let verifier = Verifier::new(VerifierConfig::from_core(config), Arc::clone(&catalog))?;
    let orchestrator_config = OrchestratorConfig::from_core(config);
    orchestrator_config.validate()?;
    let inspector_config = InspectorConfig::from_core(&config.remote);
    if config.remote.enabled {
        inspector_config.validate()?;
    }

    let nav_config = NavigatorConfig::from_core(config);
    nav_config.validate()?;
    let driver = WebDriverClient::start(&nav_config).await?;
    let navigator = UiNavigator::new(driver, nav_config, Arc::clone(&catalog));

    if let Err(e) = navigator.login(&config.console_credentials()).await {
        if let Err(close_err) = navigator.close().await {
            warn!(error = %close_err, "browser session close failed after login failure");
        }
        return Err(CliError::Unreachable(e.to_string()));
    }

    let remote = if config.remote.enabled {
        let connector = SshConnector::new(inspector_config.clone());
        RemoteState::connect(
            &connector,
            &config.remote_credentials(),
            inspector_config,
            Arc::clone(&catalog),
        )
        .await
    } else {
        info!("remote inspection disabled, backend and log channels will be skipped");
        RemoteState::Unavailable("remote inspection disabled in configuration".to_owned())
    };

    let orchestrator =
        UpdateOrchestrator::new(navigator, remote, verifier, catalog, orchestrator_config)?;
    Ok(orchestrator)
}

/// Close the browser and remote sessions, logging teardown failures.
pub async fn close(orchestrator: LiveOrchestrator) {
    if let Err(e) = orchestrator.shutdown().await {
        warn!(error = %e, "session teardown incomplete");
    }
}
