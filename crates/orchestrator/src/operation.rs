//! 진행 중인 업데이트 작업

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use vigil_core::types::UpdateMode;
use vigil_verifier::WindowStart;

use crate::error::OrchestratorError;
use crate::lock::LockToken;
use crate::state::{OperationState, Transition};

/// 업데이트/롤백 요청
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub component_id: String,
    pub mode: UpdateMode,
    /// 작업 전 기대 버전 (있으면 기준 버전을 확인)
    #[serde(default)]
    pub expected_before: Option<String>,
    /// 작업 후 기대 버전
    pub expected_after: String,
}

impl UpdateRequest {
    pub fn new(component_id: impl Into<String>, mode: UpdateMode, expected_after: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            mode,
            expected_before: None,
            expected_after: expected_after.into(),
        }
    }

    pub fn with_expected_before(mut self, version: impl Into<String>) -> Self {
        self.expected_before = Some(version.into());
        self
    }
}

/// 진행 중인 작업. 종료 상태에 도달하면 보고서로 바뀌고 사라집니다.
#[derive(Debug)]
pub struct UpdateOperation {
    pub id: Uuid,
    pub component_id: String,
    pub mode: UpdateMode,
    pub expected_before: Option<String>,
    pub expected_after: String,
    pub started_at: DateTime<Utc>,
    /// `started_at` + 모드별 카탈로그 타임아웃
    pub deadline: DateTime<Utc>,
    pub timeout_secs: u64,
    pub state: OperationState,
    pub transitions: Vec<Transition>,
    /// 어플라이언스 시각 기준 시작 시점 (로그 창 시작)
    pub remote_started_at: Option<NaiveDateTime>,
    token: Option<LockToken>,
}

impl UpdateOperation {
    /// 작업을 만듭니다. 락은 [`attach_token`](Self::attach_token)으로 붙입니다.
    pub fn new(id: Uuid, request: &UpdateRequest, timeout_secs: u64) -> Self {
        let started_at = Utc::now();
        let offset = ChronoDuration::seconds(i64::try_from(timeout_secs).unwrap_or(i64::MAX));
        Self {
            id,
            component_id: request.component_id.clone(),
            mode: request.mode,
            expected_before: request.expected_before.clone(),
            expected_after: request.expected_after.clone(),
            started_at,
            deadline: started_at.checked_add_signed(offset).unwrap_or(started_at),
            timeout_secs,
            state: OperationState::Pending,
            transitions: Vec::new(),
            remote_started_at: None,
            token: None,
        }
    }

    /// 로그 창 시작. 어플라이언스 시각이 없으면 호스트 UTC 시작 시각입니다.
    pub fn log_window_start(&self) -> WindowStart {
        match self.remote_started_at {
            Some(at) => WindowStart::Remote(at),
            None => WindowStart::Host(self.started_at.naive_utc()),
        }
    }

    pub fn attach_token(&mut self, token: LockToken) {
        self.token = Some(token);
    }

    pub fn holds_lock(&self) -> bool {
        self.token.is_some()
    }

    /// 락을 해제합니다. 이미 해제되었으면 아무 일도 하지 않습니다.
    pub fn release_lock(&mut self) {
        self.token.take();
    }

    /// 다음 상태로 전이합니다.
    pub fn advance(
        &mut self,
        next: OperationState,
        note: Option<String>,
    ) -> Result<(), OrchestratorError> {
        if !self.state.can_transition_to(next) {
            return Err(OrchestratorError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        info!(
            operation_id = %self.id,
            component_id = %self.component_id,
            mode = %self.mode,
            from = %self.state,
            to = %next,
            "operation state changed"
        );
        self.transitions.push(Transition {
            from: self.state,
            to: next,
            at: Utc::now(),
            note,
        });
        self.state = next;
        if next.is_terminal() {
            self.release_lock();
        }
        Ok(())
    }
}
