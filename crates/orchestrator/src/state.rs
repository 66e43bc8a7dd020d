//! 작업 상태 머신
//!
//! ```text
//! Pending ──► Triggered ──► Polling ──► Verifying ──► Succeeded
//!    │            │            │            └───────► Failed
//!    │            │            ├──► TimedOut
//!    └────────────┴────────────┴──► Failed
//! ```
//!
//! `TimedOut`은 "결과 불명"이며 `Failed`와 구분됩니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use vigil_core::types::Channel;
use vigil_navigator::NavigationError;

/// 작업 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Pending,
    Triggered,
    Polling,
    Verifying,
    Succeeded,
    Failed,
    TimedOut,
}

impl OperationState {
    /// 종료 상태인지 여부
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }

    /// 허용된 전이인지 여부
    pub fn can_transition_to(self, next: Self) -> bool {
        use OperationState::*;
        matches!(
            (self, next),
            (Pending, Triggered)
                | (Triggered, Polling)
                | (Polling, Verifying)
                | (Polling, TimedOut)
                | (Verifying, Succeeded)
                | (Pending | Triggered | Polling | Verifying, Failed)
        )
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Triggered => "triggered",
            Self::Polling => "polling",
            Self::Verifying => "verifying",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        };
        f.write_str(name)
    }
}

/// 기록된 상태 전이
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: OperationState,
    pub to: OperationState,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// 실패 원인
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureCause {
    /// 콘솔 로그인 실패
    Authentication { message: String },
    /// 탐색 대기 초과
    NavigationTimeout { message: String },
    /// 필수 UI 요소 없음
    ElementNotFound { message: String },
    /// 업데이트 표에 컴포넌트 행 없음
    ComponentRowNotFound { component_id: String },
    /// 브라우저 드라이버 에러
    Driver { message: String },
    /// 완료 대기 중 원격 명령 실패
    CompletionCheck { message: String },
    /// 하나 이상의 채널이 실패
    Verification { channels: Vec<Channel> },
    /// 실패는 없지만 건너뛴 채널이 있어 성공을 확정할 수 없음
    Unverified { skipped: Vec<Channel>, reason: String },
}

impl FailureCause {
    /// 배치 전체를 중단해야 하는 구조적 원인인지 여부
    ///
    /// 업데이트 페이지 구조 자체가 기대와 다르면 다음 컴포넌트도 같은 이유로
    /// 실패하므로 배치를 계속하지 않습니다.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::ComponentRowNotFound { .. } | Self::ElementNotFound { .. }
        )
    }
}

impl From<&NavigationError> for FailureCause {
    fn from(err: &NavigationError) -> Self {
        let message = err.to_string();
        match err {
            NavigationError::Authentication(_) => Self::Authentication { message },
            NavigationError::NavigationTimeout { .. } => Self::NavigationTimeout { message },
            NavigationError::ComponentRowNotFound(id) | NavigationError::UnknownComponent(id) => {
                Self::ComponentRowNotFound {
                    component_id: id.clone(),
                }
            }
            NavigationError::ElementNotFound { .. } | NavigationError::FrameSetIncomplete { .. } => {
                Self::ElementNotFound { message }
            }
            NavigationError::Driver(_) | NavigationError::Config { .. } => Self::Driver { message },
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication { message }
            | Self::NavigationTimeout { message }
            | Self::ElementNotFound { message }
            | Self::Driver { message }
            | Self::CompletionCheck { message } => f.write_str(message),
            Self::ComponentRowNotFound { component_id } => {
                write!(f, "component row not found: {component_id}")
            }
            Self::Verification { channels } => {
                write!(f, "verification failed on: {}", join(channels))
            }
            Self::Unverified { skipped, reason } => {
                write!(f, "unverified, skipped {}: {reason}", join(skipped))
            }
        }
    }
}

fn join(channels: &[Channel]) -> String {
    channels
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
