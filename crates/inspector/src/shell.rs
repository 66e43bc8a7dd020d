//! Remote shell abstraction for testability.
//!
//! The [`RemoteShell`] trait abstracts command execution on the appliance,
//! allowing production code to use [`SshShell`] (the system OpenSSH client
//! with connection multiplexing) while tests use `MockShell` or a fake
//! appliance.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ InspectorSession │  (serializes commands, applies timeouts)
//! └────────┬─────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │ RemoteShell │ (trait)
//!   └─────────────┘
//!        │     │
//!        ▼     ▼
//!   ┌────────┐ ┌──────┐
//!   │SshShell│ │ Mock │
//!   └───┬────┘ └──────┘
//!       │
//!       ▼
//!   ssh (ControlMaster) ──► appliance
//! ```

use std::future::Future;
use std::process::Stdio;

use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};
use vigil_core::types::Credentials;

use crate::config::InspectorConfig;
use crate::error::InspectorError;

/// ssh가 자체 에러로 종료할 때의 코드
const SSH_ERROR_EXIT: i32 = 255;
/// sshpass의 "잘못된 비밀번호" 종료 코드
const SSHPASS_BAD_PASSWORD_EXIT: i32 = 5;

/// Result of one remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code (`-1` when terminated by a signal).
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Builds a successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Builds a failed output.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait abstracting command execution on the appliance.
///
/// Implementations do not apply timeouts or serialization themselves;
/// [`InspectorSession`](crate::session::InspectorSession) does both.
pub trait RemoteShell: Send + Sync + 'static {
    /// Runs a shell command and captures its output.
    ///
    /// A non-zero exit code is *not* an error at this level.
    ///
    /// # Errors
    ///
    /// - `InspectorError::Connection`: the transport is broken
    /// - `InspectorError::Authentication`: the credentials were rejected
    fn run(&self, command: &str)
    -> impl Future<Output = Result<CommandOutput, InspectorError>> + Send;

    /// Releases the underlying transport.
    fn close(&self) -> impl Future<Output = Result<(), InspectorError>> + Send;
}

/// Trait abstracting how a [`RemoteShell`] is opened.
pub trait ShellConnector: Send + Sync {
    /// Shell type produced by this connector.
    type Shell: RemoteShell;

    /// Opens a shell with the given credentials.
    ///
    /// # Errors
    ///
    /// - `InspectorError::Authentication`: credentials rejected
    /// - `InspectorError::Connection`: host unreachable or handshake failed
    fn connect(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Shell, InspectorError>> + Send;
}

/// Connector that opens [`SshShell`]s through the system OpenSSH client.
#[derive(Debug, Clone)]
pub struct SshConnector {
    config: InspectorConfig,
}

impl SshConnector {
    /// Creates a connector for the configured host.
    pub fn new(config: InspectorConfig) -> Self {
        Self { config }
    }
}

impl ShellConnector for SshConnector {
    type Shell = SshShell;

    async fn connect(&self, credentials: &Credentials) -> Result<SshShell, InspectorError> {
        let control_dir = tempfile::Builder::new()
            .prefix("vigil-ssh-")
            .tempdir()
            .map_err(|e| InspectorError::Connection(format!("control dir: {e}")))?;

        let shell = SshShell {
            config: self.config.clone(),
            destination: format!("{}@{}", credentials.username, self.config.host),
            password: credentials
                .has_password()
                .then(|| credentials.password.clone()),
            control_dir,
        };

        // 첫 명령이 마스터 연결을 만들고 인증 결과를 드러낸다
        let probe = tokio::time::timeout(self.config.connect_timeout(), shell.run("true"))
            .await
            .map_err(|_| {
                InspectorError::Connection(format!(
                    "no response from {}:{} within {}s",
                    self.config.host, self.config.port, self.config.connect_timeout_secs
                ))
            })??;

        if !probe.success() {
            return Err(InspectorError::Connection(format!(
                "probe exited with {}: {}",
                probe.exit_code,
                probe.stderr.trim()
            )));
        }

        debug!(
            host = %self.config.host,
            port = self.config.port,
            user = %credentials.username,
            "ssh session established"
        );
        Ok(shell)
    }
}

/// OpenSSH-backed shell.
///
/// Commands share one multiplexed connection through a `ControlMaster`
/// socket inside a private temporary directory. Each command runs in its own
/// child process with `kill_on_drop`, so a timed-out command is terminated.
#[derive(Debug)]
pub struct SshShell {
    config: InspectorConfig,
    destination: String,
    password: Option<String>,
    control_dir: TempDir,
}

impl SshShell {
    fn base_command(&self) -> Command {
        let mut cmd = match &self.password {
            Some(password) => {
                let mut cmd = Command::new("sshpass");
                cmd.arg("-e")
                    .arg(&self.config.ssh_program)
                    .env("SSHPASS", password);
                cmd
            }
            None => {
                let mut cmd = Command::new(&self.config.ssh_program);
                cmd.args(["-o", "BatchMode=yes"]);
                cmd
            }
        };

        cmd.arg("-p")
            .arg(self.config.port.to_string())
            .args(["-o", "ControlMaster=auto"])
            .arg("-o")
            .arg(format!(
                "ControlPath={}/%C",
                self.control_dir.path().display()
            ))
            .arg("-o")
            .arg(format!("ControlPersist={}", self.config.control_persist_secs))
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.config.connect_timeout_secs))
            .arg("-o")
            .arg(format!(
                "StrictHostKeyChecking={}",
                self.config.host_key_checking
            ))
            .args(["-o", "LogLevel=ERROR"]);

        if !self.config.identity_file.is_empty() {
            cmd.arg("-i").arg(&self.config.identity_file);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn classify_transport_failure(&self, output: &CommandOutput) -> Option<InspectorError> {
        let stderr = output.stderr.trim();
        let auth_rejected = stderr.contains("Permission denied")
            || stderr.contains("Authentication failed")
            || (self.password.is_some() && output.exit_code == SSHPASS_BAD_PASSWORD_EXIT);

        if auth_rejected {
            return Some(InspectorError::Authentication(format!(
                "{}: {stderr}",
                self.destination
            )));
        }
        if output.exit_code == SSH_ERROR_EXIT {
            return Some(InspectorError::Connection(format!(
                "{}: {stderr}",
                self.destination
            )));
        }
        None
    }
}

impl RemoteShell for SshShell {
    async fn run(&self, command: &str) -> Result<CommandOutput, InspectorError> {
        let mut cmd = self.base_command();
        cmd.arg(&self.destination).arg("--").arg(command);

        let output = cmd.output().await.map_err(|e| {
            InspectorError::Connection(format!("failed to invoke ssh client: {e}"))
        })?;

        let output = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if let Some(err) = self.classify_transport_failure(&output) {
            return Err(err);
        }
        Ok(output)
    }

    async fn close(&self) -> Result<(), InspectorError> {
        let mut cmd = self.base_command();
        cmd.args(["-O", "exit"]).arg(&self.destination);

        match cmd.output().await {
            Ok(out) if out.status.success() => {
                debug!(destination = %self.destination, "ssh control master closed");
            }
            Ok(out) => {
                // 마스터가 이미 없으면 -O exit 는 실패한다
                debug!(
                    destination = %self.destination,
                    stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                    "ssh control master was not running"
                );
            }
            Err(e) => {
                warn!(destination = %self.destination, error = %e, "failed to close ssh control master");
            }
        }
        Ok(())
    }
}

/// 테스트용 Mock 셸
///
/// 명령 문자열에 포함된 패턴으로 응답을 고릅니다 (먼저 등록한 패턴 우선).
/// 패턴에 응답 시퀀스를 등록하면 호출마다 앞에서부터 소비하고,
/// 마지막 응답은 계속 반복합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockShell {
    responses: std::sync::Mutex<Vec<(String, std::collections::VecDeque<CommandOutput>)>>,
    delays: Vec<(String, std::time::Duration)>,
    history: std::sync::Mutex<Vec<String>>,
    fail_transport: bool,
}

#[cfg(test)]
impl MockShell {
    /// 응답이 없는 mock 셸을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 패턴에 고정 응답을 등록합니다.
    pub fn with_response(self, pattern: &str, output: CommandOutput) -> Self {
        self.with_sequence(pattern, vec![output])
    }

    /// 패턴에 응답 시퀀스를 등록합니다.
    pub fn with_sequence(self, pattern: &str, outputs: Vec<CommandOutput>) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push((pattern.to_owned(), outputs.into()));
        }
        self
    }

    /// 패턴에 응답 지연을 설정합니다.
    pub fn with_delay(mut self, pattern: &str, delay: std::time::Duration) -> Self {
        self.delays.push((pattern.to_owned(), delay));
        self
    }

    /// 모든 명령이 연결 에러로 실패하도록 설정합니다.
    pub fn with_broken_transport(mut self) -> Self {
        self.fail_transport = true;
        self
    }

    /// 실행된 명령 목록
    pub fn history(&self) -> Vec<String> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl RemoteShell for MockShell {
    async fn run(&self, command: &str) -> Result<CommandOutput, InspectorError> {
        if let Ok(mut history) = self.history.lock() {
            history.push(command.to_owned());
        }
        if self.fail_transport {
            return Err(InspectorError::Connection("mock transport down".to_owned()));
        }
        if let Some((_, delay)) = self.delays.iter().find(|(p, _)| command.contains(p)) {
            tokio::time::sleep(*delay).await;
        }

        let mut responses = self
            .responses
            .lock()
            .map_err(|_| InspectorError::Connection("mock poisoned".to_owned()))?;
        let Some((_, queue)) = responses.iter_mut().find(|(p, _)| command.contains(p)) else {
            return Ok(CommandOutput::failed(127, format!("{command}: not found")));
        };
        let output = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        Ok(output.unwrap_or_else(|| CommandOutput::failed(127, "empty sequence")))
    }

    async fn close(&self) -> Result<(), InspectorError> {
        Ok(())
    }
}
