//! 검증 엔진 설정

use serde::{Deserialize, Serialize};
use vigil_core::config::{DEFAULT_ERROR_PATTERN, VigilConfig};

use crate::error::VerifierError;

/// 검증 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// 로그 에러 마커 정규식
    pub error_pattern: String,
    /// 서비스 상태 확인 여부
    pub check_service: bool,
    /// 락 파일 부재 확인 여부
    pub check_lock_artifact: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            error_pattern: DEFAULT_ERROR_PATTERN.to_owned(),
            check_service: true,
            check_lock_artifact: true,
        }
    }
}

impl VerifierConfig {
    /// core 설정의 `[verify]` 섹션에서 생성합니다.
    pub fn from_core(core: &VigilConfig) -> Self {
        Self {
            error_pattern: core.verify.error_pattern.clone(),
            check_service: core.verify.check_service,
            check_lock_artifact: core.verify.check_lock_artifact,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), VerifierError> {
        if self.error_pattern.trim().is_empty() {
            return Err(VerifierError::Config {
                field: "error_pattern".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        regex::Regex::new(&self.error_pattern).map_err(|e| VerifierError::Config {
            field: "error_pattern".to_owned(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
