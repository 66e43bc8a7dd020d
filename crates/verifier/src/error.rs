//! 검증 엔진 에러 타입
//!
//! 채널 검사 자체는 에러를 반환하지 않고 실패 결과로 기록합니다.
//! 이 타입은 설정/분류기 구성 단계에서만 사용됩니다.

use vigil_core::error::{ConfigError, VigilError};

/// 검증 엔진 에러
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    /// 정규식 컴파일 실패
    #[error("invalid pattern for '{component_id}': {reason}")]
    Pattern {
        /// 대상 컴포넌트
        component_id: String,
        /// 컴파일 에러
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

impl From<VerifierError> for VigilError {
    fn from(err: VerifierError) -> Self {
        match err {
            VerifierError::Pattern {
                component_id,
                reason,
            } => VigilError::Config(ConfigError::InvalidValue {
                field: format!("catalog.{component_id}.success_patterns"),
                reason,
            }),
            VerifierError::Config { field, reason } => {
                VigilError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}
