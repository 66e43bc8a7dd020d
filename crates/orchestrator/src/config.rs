//! 오케스트레이터 설정

use serde::{Deserialize, Serialize};
use vigil_core::config::VigilConfig;

use crate::error::OrchestratorError;

/// 완료 대기 간격 상한 (초)
const MAX_COMPLETION_POLL_SECS: u64 = 60;

/// 오케스트레이터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// 원격 세션 없이 UI 행을 폴링할 때의 간격 (초)
    pub completion_poll_interval_secs: u64,
    /// 기대 이전 버전이 주어지면 트리거 전에 기준 버전을 읽을지 여부
    pub verify_baseline: bool,
    /// 검증 전에 업데이트 페이지를 다시 탐색할지 여부
    pub refresh_before_verify: bool,
    /// verify-only 작업의 로그 창 길이 (초)
    pub verify_lookback_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            completion_poll_interval_secs: 5,
            verify_baseline: true,
            refresh_before_verify: true,
            verify_lookback_secs: 1800,
        }
    }
}

impl OrchestratorConfig {
    /// core 설정에서 생성합니다.
    pub fn from_core(core: &VigilConfig) -> Self {
        Self {
            completion_poll_interval_secs: core.remote.poll_interval_secs,
            ..Default::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.completion_poll_interval_secs == 0
            || self.completion_poll_interval_secs > MAX_COMPLETION_POLL_SECS
        {
            return Err(OrchestratorError::Config {
                field: "completion_poll_interval_secs".to_owned(),
                reason: format!("must be between 1 and {MAX_COMPLETION_POLL_SECS}"),
            });
        }
        if self.verify_lookback_secs == 0 {
            return Err(OrchestratorError::Config {
                field: "verify_lookback_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        Ok(())
    }
}
