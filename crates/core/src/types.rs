//! 도메인 타입 -- 여러 크레이트가 공유하는 공통 타입
//!
//! 업데이트 모드, 검증 채널, 서비스 상태, 접속 자격 증명처럼
//! inspector / navigator / verifier / orchestrator 가 함께 사용하는
//! 작은 값 타입들을 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 업데이트 작업 모드
///
/// 카탈로그 타임아웃 조회와 UI 액션 선택의 기준이 됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// 일반 업데이트
    Normal,
    /// 강제 업데이트 (버전이 같아도 재적용)
    Forced,
    /// 이전 버전으로 롤백
    Rollback,
}

impl UpdateMode {
    /// 롤백 계열 모드인지 여부
    pub fn is_rollback(self) -> bool {
        matches!(self, Self::Rollback)
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Forced => write!(f, "forced"),
            Self::Rollback => write!(f, "rollback"),
        }
    }
}

/// 검증 채널
///
/// 업데이트 결과를 관찰하는 세 개의 독립 경로입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// 브라우저 DOM 상태
    Ui,
    /// 원격 셸로 확인한 파일시스템/서비스 상태
    Backend,
    /// 원격 업데이트 로그
    Log,
}

impl Channel {
    /// 모든 채널 (보고서 출력 순서)
    pub const ALL: [Channel; 3] = [Channel::Ui, Channel::Backend, Channel::Log];

    /// 원격 세션이 있어야만 시도할 수 있는 채널인지 여부
    pub fn requires_remote(self) -> bool {
        matches!(self, Self::Backend | Self::Log)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ui => write!(f, "ui"),
            Self::Backend => write!(f, "backend"),
            Self::Log => write!(f, "log"),
        }
    }
}

/// 원격 서비스 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// 실행 중
    Running,
    /// 정지됨 (inactive, failed 등)
    Stopped,
    /// 판별 불가
    Unknown,
}

impl ServiceState {
    /// `systemctl is-active` 출력을 서비스 상태로 변환합니다.
    pub fn from_systemctl(output: &str) -> Self {
        match output.trim() {
            "active" | "reloading" => Self::Running,
            "inactive" | "failed" | "deactivating" => Self::Stopped,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// 접속 자격 증명
///
/// `Debug` 출력에서 비밀번호는 가려집니다.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// 사용자명
    pub username: String,
    /// 비밀번호 (비어 있으면 키 기반 인증)
    pub password: String,
}

impl Credentials {
    /// 새 자격 증명을 생성합니다.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// 비밀번호가 설정되어 있는지 여부
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
