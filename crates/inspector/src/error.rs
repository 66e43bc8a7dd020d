//! 원격 검사기 에러 타입
//!
//! [`InspectorError`]는 원격 셸 채널에서 발생하는 모든 에러를 표현합니다.
//! `From<InspectorError> for VigilError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use vigil_core::error::{CatalogError, ConfigError, RemoteError, VigilError};

/// 원격 검사기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum InspectorError {
    /// 원격 호스트 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 원격 호스트 인증 실패
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// 명령이 제한 시간 안에 끝나지 않음
    #[error("command timed out after {timeout_secs}s: {command}")]
    CommandTimeout {
        /// 실행한 명령
        command: String,
        /// 적용된 타임아웃 (초)
        timeout_secs: u64,
    },

    /// 성공이 필요한 명령이 0이 아닌 코드로 종료
    #[error("remote command '{command}' exited with {exit_code}: {stderr}")]
    RemoteExecution {
        /// 실행한 명령
        command: String,
        /// 종료 코드
        exit_code: i32,
        /// 표준 에러 출력
        stderr: String,
    },

    /// 카탈로그에 없는 컴포넌트
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    /// 원격 출력 해석 실패
    #[error("failed to parse {what}: {reason}")]
    Parse {
        /// 해석 대상
        what: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl InspectorError {
    /// 채널 자체를 쓸 수 없는 에러인지 여부 (의존 채널은 skipped 처리)
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Authentication(_))
    }

    /// 명령이 끝까지 실행되지 못해 아무것도 관찰하지 못했는지 여부
    pub fn is_incomplete(&self) -> bool {
        self.is_unavailable()
            || matches!(self, Self::CommandTimeout { .. } | Self::RemoteExecution { .. })
    }
}

impl From<CatalogError> for InspectorError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownComponent(id) => Self::UnknownComponent(id),
            other => Self::Config {
                field: "catalog".to_owned(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<InspectorError> for VigilError {
    fn from(err: InspectorError) -> Self {
        match err {
            InspectorError::Connection(msg) => VigilError::Remote(RemoteError::Connection(msg)),
            InspectorError::Authentication(msg) => {
                VigilError::Remote(RemoteError::Authentication(msg))
            }
            err @ InspectorError::CommandTimeout { .. } => {
                VigilError::Remote(RemoteError::CommandTimeout(err.to_string()))
            }
            err @ (InspectorError::RemoteExecution { .. } | InspectorError::Parse { .. }) => {
                VigilError::Remote(RemoteError::Execution(err.to_string()))
            }
            InspectorError::UnknownComponent(id) => {
                VigilError::Catalog(CatalogError::UnknownComponent(id))
            }
            InspectorError::Config { field, reason } => {
                VigilError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}
