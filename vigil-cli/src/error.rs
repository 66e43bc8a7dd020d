//! CLI-specific error types and exit code mapping

use vigil_core::error::VigilError;
use vigil_inspector::InspectorError;
use vigil_navigator::{DriverError, NavigationError};
use vigil_orchestrator::OrchestratorError;
use vigil_verifier::VerifierError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The appliance console or browser driver could not be reached.
    #[error("target not reachable: {0}")]
    Unreachable(String),

    /// The operation ran but did not verify.
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// The operation did not finish within its timeout; outcome unknown.
    #[error("timed out: {0}")]
    TimedOut(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from vigil-core.
    #[error("{0}")]
    Core(#[from] VigilError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                               |
    /// |------|---------------------------------------|
    /// | 0    | Success                               |
    /// | 1    | General / command error               |
    /// | 2    | Configuration error                   |
    /// | 3    | Target unreachable                    |
    /// | 4    | Verification failed                   |
    /// | 5    | Timed out (outcome unknown)           |
    /// | 10   | IO error                              |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Unreachable(_) => 3,
            Self::VerificationFailed(_) => 4,
            Self::TimedOut(_) => 5,
            Self::Io(_) => 10,
            Self::Core(core) => match core {
                VigilError::Config(_) => 2,
                VigilError::Remote(_) | VigilError::Ui(_) => 3,
                VigilError::Io(_) => 10,
                VigilError::Catalog(_) | VigilError::Orchestration(_) => 1,
            },
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<OrchestratorError> for CliError {
    fn from(e: OrchestratorError) -> Self {
        Self::Core(e.into())
    }
}

impl From<NavigationError> for CliError {
    fn from(e: NavigationError) -> Self {
        Self::Core(e.into())
    }
}

impl From<DriverError> for CliError {
    fn from(e: DriverError) -> Self {
        Self::Unreachable(e.to_string())
    }
}

impl From<InspectorError> for CliError {
    fn from(e: InspectorError) -> Self {
        Self::Core(e.into())
    }
}

impl From<VerifierError> for CliError {
    fn from(e: VerifierError) -> Self {
        Self::Core(e.into())
    }
}
