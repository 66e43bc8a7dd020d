//! 원격 검사기 설정
//!
//! [`InspectorConfig`]는 core의 [`RemoteConfig`](vigil_core::config::RemoteConfig)를
//! 기반으로 검사기 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use vigil_core::config::VigilConfig;
//! use vigil_inspector::config::InspectorConfig;
//!
//! let core_config = VigilConfig::default();
//! let config = InspectorConfig::from_core(&core_config.remote);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::InspectorError;

/// 명령 타임아웃 상한 (초)
const MAX_COMMAND_TIMEOUT_SECS: u64 = 600;
/// 락 파일 폴링 간격 상한 (초)
const MAX_POLL_INTERVAL_SECS: u64 = 60;
/// 로그 tail 줄 수 상한
const MAX_LOG_TAIL_LINES: usize = 100_000;

/// 원격 검사기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// SSH 호스트
    pub host: String,
    /// SSH 포트
    pub port: u16,
    /// 개인 키 경로 (비어 있으면 기본 키)
    pub identity_file: String,
    /// 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
    /// 명령 하나의 타임아웃 (초)
    pub command_timeout_secs: u64,
    /// INI 설정 저장소 경로
    pub config_store_path: String,
    /// 업데이트 로그 경로
    pub update_log_path: String,
    /// 로그 tail 줄 수
    pub log_tail_lines: usize,
    /// 락 파일 폴링 간격 (초)
    pub poll_interval_secs: u64,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// ssh 실행 파일
    pub ssh_program: String,
    /// `StrictHostKeyChecking` 옵션 값
    pub host_key_checking: String,
    /// ControlMaster 연결 유지 시간 (초)
    pub control_persist_secs: u64,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 22,
            identity_file: String::new(),
            connect_timeout_secs: 10,
            command_timeout_secs: 30,
            config_store_path: "/etc/iscan/intscan.ini".to_owned(),
            update_log_path: "/var/log/iwss/update.log".to_owned(),
            log_tail_lines: 1000,
            poll_interval_secs: 5,
            ssh_program: "ssh".to_owned(),
            host_key_checking: "accept-new".to_owned(),
            control_persist_secs: 600,
        }
    }
}

impl InspectorConfig {
    /// core 설정에서 검사기 설정을 생성합니다.
    pub fn from_core(core: &vigil_core::config::RemoteConfig) -> Self {
        Self {
            host: core.host.clone(),
            port: core.port,
            identity_file: core.identity_file.clone(),
            connect_timeout_secs: core.connect_timeout_secs,
            command_timeout_secs: core.command_timeout_secs,
            config_store_path: core.config_store_path.clone(),
            update_log_path: core.update_log_path.clone(),
            log_tail_lines: core.log_tail_lines,
            poll_interval_secs: core.poll_interval_secs,
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), InspectorError> {
        if self.host.is_empty() {
            return Err(config_err("host", "must not be empty"));
        }
        if self.port == 0 {
            return Err(config_err("port", "must be greater than 0"));
        }
        if self.command_timeout_secs == 0 || self.command_timeout_secs > MAX_COMMAND_TIMEOUT_SECS {
            return Err(config_err(
                "command_timeout_secs",
                format!("must be 1-{MAX_COMMAND_TIMEOUT_SECS}"),
            ));
        }
        if self.poll_interval_secs == 0 || self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(config_err(
                "poll_interval_secs",
                format!("must be 1-{MAX_POLL_INTERVAL_SECS}"),
            ));
        }
        if self.log_tail_lines == 0 || self.log_tail_lines > MAX_LOG_TAIL_LINES {
            return Err(config_err(
                "log_tail_lines",
                format!("must be 1-{MAX_LOG_TAIL_LINES}"),
            ));
        }
        if self.ssh_program.is_empty() {
            return Err(config_err("ssh_program", "must not be empty"));
        }
        let valid_checking = ["yes", "no", "accept-new"];
        if !valid_checking.contains(&self.host_key_checking.as_str()) {
            return Err(config_err(
                "host_key_checking",
                format!("must be one of: {}", valid_checking.join(", ")),
            ));
        }
        Ok(())
    }

    /// 명령 타임아웃
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// 연결 타임아웃
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn config_err(field: &str, reason: impl Into<String>) -> InspectorError {
    InspectorError::Config {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

/// 검사기 설정 빌더
#[derive(Debug, Default)]
pub struct InspectorConfigBuilder {
    config: InspectorConfig,
}

impl InspectorConfigBuilder {
    /// 기본값으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// SSH 호스트와 포트
    pub fn endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.host = host.into();
        self.config.port = port;
        self
    }

    /// 명령 타임아웃 (초)
    pub fn command_timeout_secs(mut self, secs: u64) -> Self {
        self.config.command_timeout_secs = secs;
        self
    }

    /// 락 파일 폴링 간격 (초)
    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.poll_interval_secs = secs;
        self
    }

    /// 로그 tail 줄 수
    pub fn log_tail_lines(mut self, lines: usize) -> Self {
        self.config.log_tail_lines = lines;
        self
    }

    /// 설정 저장소 경로
    pub fn config_store_path(mut self, path: impl Into<String>) -> Self {
        self.config.config_store_path = path.into();
        self
    }

    /// 업데이트 로그 경로
    pub fn update_log_path(mut self, path: impl Into<String>) -> Self {
        self.config.update_log_path = path.into();
        self
    }

    /// 설정을 검증하고 빌드합니다.
    pub fn build(self) -> Result<InspectorConfig, InspectorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
