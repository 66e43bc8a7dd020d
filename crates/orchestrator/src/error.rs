//! 오케스트레이터 에러 타입
//!
//! 정책/검증 단계의 에러만 `Err`로 반환됩니다. 작업이 시작된 뒤의
//! 원격/UI 실패는 [`OutcomeReport`](crate::report::OutcomeReport)의
//! [`FailureCause`](crate::state::FailureCause)로 기록되며 이 타입으로
//! 새어 나가지 않습니다.

use vigil_core::error::{CatalogError, ConfigError, VigilError};

use crate::state::OperationState;

/// 오케스트레이터 에러
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// 카탈로그에 없는 컴포넌트
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    /// 롤백을 지원하지 않는 컴포넌트
    #[error("component {0} does not support rollback")]
    RollbackNotSupported(String),

    /// 다른 작업이 전역 락을 보유 중
    #[error("update in progress: {held_by}")]
    UpdateInProgress {
        /// 보유자 설명
        held_by: String,
    },

    /// 원격 세션이 필요한 작업인데 세션이 없음
    #[error("remote session unavailable: {0}")]
    RemoteUnavailable(String),

    /// 원격 명령 실패 (명시적 복구 작업 등)
    #[error("remote operation failed: {0}")]
    Remote(String),

    /// 상태 머신이 허용하지 않는 전이
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        /// 현재 상태
        from: OperationState,
        /// 요청된 상태
        to: OperationState,
    },

    /// 세션 정리 실패
    #[error("teardown failed: {0}")]
    Teardown(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<CatalogError> for OrchestratorError {
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

impl From<OrchestratorError> for VigilError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::UnknownComponent(id) => {
                VigilError::Catalog(CatalogError::UnknownComponent(id))
            }
            OrchestratorError::Config { field, reason } => {
                VigilError::Config(ConfigError::InvalidValue { field, reason })
            }
            other => VigilError::Orchestration(other.to_string()),
        }
    }
}
