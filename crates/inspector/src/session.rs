//! 원격 검사 세션 -- 어플라이언스 백엔드/로그 상태의 유일한 관문
//!
//! [`InspectorSession`]은 하나의 [`RemoteShell`] 위에서 동작하며:
//! - 한 번에 하나의 명령만 실행되도록 직렬화하고
//! - 모든 명령에 타임아웃을 적용하고
//! - 컴포넌트 ID를 카탈로그로 해석해 락 파일/버전 키를 찾습니다.
//!
//! 세션은 한 번의 실행 동안 재사용되고, 종료 시 [`InspectorSession::close`]로
//! 명시적으로 해제합니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vigil_core::catalog::{ComponentCatalog, ComponentDescriptor};
use vigil_core::poll::{BoundedPoll, PollOutcome};
use vigil_core::types::{Credentials, ServiceState};

use crate::commands::{self, REMOTE_TIME_FORMAT};
use crate::config::InspectorConfig;
use crate::error::InspectorError;
use crate::shell::{CommandOutput, RemoteShell, ShellConnector};
use crate::store::ConfigStore;

/// 어플라이언스 시스템 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    /// `uname -r`
    pub kernel: String,
    /// `/etc/redhat-release`
    pub os_release: Option<String>,
    /// 호스트명
    pub hostname: Option<String>,
    /// `uptime -p`
    pub uptime: Option<String>,
    /// 원격 시각
    pub remote_time: Option<String>,
}

/// 원격 검사 세션
pub struct InspectorSession<S: RemoteShell> {
    shell: S,
    gate: Mutex<()>,
    config: InspectorConfig,
    catalog: Arc<ComponentCatalog>,
}

impl<S: RemoteShell> InspectorSession<S> {
    /// 커넥터로 셸을 열어 세션을 만듭니다.
    ///
    /// # Errors
    ///
    /// 연결/인증 실패 시 `Connection`/`Authentication`을 반환하며,
    /// 호출자는 원격 의존 채널을 skipped로 처리합니다.
    pub async fn connect<C>(
        connector: &C,
        credentials: &Credentials,
        config: InspectorConfig,
        catalog: Arc<ComponentCatalog>,
    ) -> Result<Self, InspectorError>
    where
        C: ShellConnector<Shell = S>,
    {
        config.validate()?;
        let shell = connector.connect(credentials).await?;
        info!(host = %config.host, port = config.port, "remote inspector session opened");
        Ok(Self::new(shell, config, catalog))
    }

    /// 이미 열린 셸로 세션을 만듭니다.
    pub fn new(shell: S, config: InspectorConfig, catalog: Arc<ComponentCatalog>) -> Self {
        Self {
            shell,
            gate: Mutex::new(()),
            config,
            catalog,
        }
    }

    /// 세션 설정
    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// 명령을 실행합니다. 0이 아닌 종료 코드도 결과로 반환합니다.
    ///
    /// # Errors
    ///
    /// `timeout` 안에 끝나지 않으면 `CommandTimeout`을 반환합니다.
    pub async fn execute(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, InspectorError> {
        let _turn = self.gate.lock().await;
        debug!(command, timeout_secs = timeout.as_secs(), "executing remote command");

        match tokio::time::timeout(timeout, self.shell.run(command)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(command, timeout_secs = timeout.as_secs(), "remote command timed out");
                Err(InspectorError::CommandTimeout {
                    command: command.to_owned(),
                    timeout_secs: timeout.as_secs(),
                })
            }
        }
    }

    /// 명령을 실행하고 종료 코드 0을 요구합니다.
    ///
    /// # Errors
    ///
    /// 0이 아닌 종료 코드는 `RemoteExecution`입니다.
    pub async fn execute_checked(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, InspectorError> {
        let output = self.execute(command, timeout).await?;
        if !output.success() {
            return Err(InspectorError::RemoteExecution {
                command: command.to_owned(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_owned(),
            });
        }
        Ok(output)
    }

    async fn run_checked(&self, command: &str) -> Result<CommandOutput, InspectorError> {
        self.execute_checked(command, self.config.command_timeout())
            .await
    }

    fn descriptor(&self, component_id: &str) -> Result<&ComponentDescriptor, InspectorError> {
        Ok(self.catalog.get(component_id)?)
    }

    /// 원격 파일 전체를 읽습니다.
    pub async fn read_file(&self, path: &str) -> Result<String, InspectorError> {
        Ok(self.run_checked(&commands::cat(path)).await?.stdout)
    }

    /// 원격 경로가 존재하는지 확인합니다.
    pub async fn file_exists(&self, path: &str) -> Result<bool, InspectorError> {
        let command = commands::exists(path);
        let output = self
            .execute(&command, self.config.command_timeout())
            .await?;
        match output.exit_code {
            0 => Ok(true),
            1 => Ok(false),
            code => Err(InspectorError::RemoteExecution {
                command,
                exit_code: code,
                stderr: output.stderr.trim().to_owned(),
            }),
        }
    }

    /// 설정 저장소 전체를 읽어 파싱합니다.
    pub async fn read_config_store(&self) -> Result<ConfigStore, InspectorError> {
        let content = self.read_file(&self.config.config_store_path).await?;
        Ok(ConfigStore::parse(&content))
    }

    /// 설정 저장소에서 키를 읽습니다. 키가 없으면 `None`이며 에러가 아닙니다.
    pub async fn read_version_key(&self, key: &str) -> Result<Option<String>, InspectorError> {
        let store = self.read_config_store().await?;
        Ok(store.get(key).map(str::to_owned))
    }

    /// 컴포넌트의 락 파일이 존재하는지 확인합니다.
    pub async fn lock_file_exists(&self, component_id: &str) -> Result<bool, InspectorError> {
        let lock_file = self.descriptor(component_id)?.lock_file.clone();
        self.file_exists(&lock_file).await
    }

    /// 락 파일이 사라질 때까지 고정 간격으로 폴링합니다.
    ///
    /// `Ready`는 제거됨, `TimedOut`은 여전히 존재함을 뜻합니다.
    /// `timeout_secs == 0`이면 한 번도 확인하지 않고 `TimedOut`을 반환합니다.
    pub async fn wait_for_lock_removal(
        &self,
        component_id: &str,
        timeout_secs: u64,
    ) -> Result<PollOutcome<()>, InspectorError> {
        let lock_file = self.descriptor(component_id)?.lock_file.clone();
        let poll = BoundedPoll::from_secs(self.config.poll_interval_secs, timeout_secs);

        let this = self;
        let path = lock_file.as_str();
        let outcome = poll
            .until_true(|| async move { this.file_exists(path).await.map(|present| !present) })
            .await?;

        if outcome.is_ready() {
            debug!(
                component_id,
                attempts = outcome.attempts(),
                elapsed_secs = outcome.elapsed().as_secs(),
                "lock artifact removed"
            );
        } else {
            warn!(
                component_id,
                lock_file = %lock_file,
                attempts = outcome.attempts(),
                timeout_secs,
                "lock artifact still present at deadline"
            );
        }
        Ok(outcome)
    }

    /// 서비스 상태를 조회합니다.
    pub async fn service_status(&self, service: &str) -> Result<ServiceState, InspectorError> {
        // is-active 는 비활성 상태에서 0이 아닌 코드로 끝나므로 종료 코드를 요구하지 않는다
        let output = self
            .execute(&commands::service_active(service), self.config.command_timeout())
            .await?;
        Ok(ServiceState::from_systemctl(&output.stdout))
    }

    /// 업데이트 로그의 최근 `lines`줄을 읽습니다.
    pub async fn tail_log(&self, lines: usize) -> Result<Vec<String>, InspectorError> {
        let output = self
            .run_checked(&commands::tail(&self.config.update_log_path, lines))
            .await?;
        Ok(output.stdout.lines().map(str::to_owned).collect())
    }

    /// 설정된 줄 수로 업데이트 로그를 읽습니다.
    pub async fn tail_update_log(&self) -> Result<Vec<String>, InspectorError> {
        self.tail_log(self.config.log_tail_lines).await
    }

    /// 어플라이언스 시각을 읽습니다 (로그 윈도우 기준).
    pub async fn remote_now(&self) -> Result<NaiveDateTime, InspectorError> {
        let output = self.run_checked(&commands::now()).await?;
        let raw = output.stdout.trim();
        NaiveDateTime::parse_from_str(raw, REMOTE_TIME_FORMAT).map_err(|e| InspectorError::Parse {
            what: "remote time".to_owned(),
            reason: format!("'{raw}': {e}"),
        })
    }

    /// 커널 릴리스 (`uname -r`)
    pub async fn kernel_release(&self) -> Result<String, InspectorError> {
        let output = self.run_checked(commands::KERNEL_RELEASE).await?;
        let release = output.stdout.trim();
        if release.is_empty() {
            return Err(InspectorError::Parse {
                what: "kernel release".to_owned(),
                reason: "empty output".to_owned(),
            });
        }
        Ok(release.to_owned())
    }

    /// 시스템 정보를 모읍니다. 커널 외 항목은 실패해도 `None`으로 둡니다.
    pub async fn system_info(&self) -> Result<SystemInfo, InspectorError> {
        let kernel = self.kernel_release().await?;
        Ok(SystemInfo {
            kernel,
            os_release: self.optional_line(commands::OS_RELEASE).await?,
            hostname: self.optional_line(commands::HOSTNAME).await?,
            uptime: self.optional_line(commands::UPTIME).await?,
            remote_time: self.optional_line(&commands::now()).await?,
        })
    }

    async fn optional_line(&self, command: &str) -> Result<Option<String>, InspectorError> {
        let output = self
            .execute(command, self.config.command_timeout())
            .await?;
        let line = output.stdout.trim();
        if !output.success() || line.is_empty() {
            debug!(command, exit_code = output.exit_code, "optional system info unavailable");
            return Ok(None);
        }
        Ok(Some(line.to_owned()))
    }

    /// 남아 있는 락 파일을 지웁니다 (명시적 복구 작업).
    ///
    /// 락 파일이 있었으면 `true`를 반환합니다.
    pub async fn clear_lock(&self, component_id: &str) -> Result<bool, InspectorError> {
        let lock_file = self.descriptor(component_id)?.lock_file.clone();
        if !self.file_exists(&lock_file).await? {
            debug!(component_id, "no lock artifact to clear");
            return Ok(false);
        }
        self.run_checked(&commands::remove(&lock_file)).await?;
        warn!(component_id, lock_file = %lock_file, "lock artifact cleared by operator");
        Ok(true)
    }

    /// 세션을 닫습니다.
    pub async fn close(self) -> Result<(), InspectorError> {
        self.shell.close().await?;
        info!(host = %self.config.host, "remote inspector session closed");
        Ok(())
    }
}
