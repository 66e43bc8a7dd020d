//! 작업/배치 결과 보고서
//!
//! 보고서는 어떤 채널을 시도했고 어떤 채널을 왜 건너뛰었는지 항상 드러냅니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use vigil_core::types::UpdateMode;
use vigil_verifier::{VerificationResult, VerificationSummary};

use crate::state::{FailureCause, OperationState, Transition};

/// 단일 작업 결과
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeReport {
    pub operation_id: Uuid,
    pub component_id: String,
    pub mode: UpdateMode,
    pub final_state: OperationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<FailureCause>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub timeout_secs: u64,
    /// 작업 전 기준 버전 확인 (판정에 영향 없음)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<VerificationResult>,
    pub verification: VerificationSummary,
    pub transitions: Vec<Transition>,
    /// 타임아웃 시 남아 있던 락 파일 경로
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_artifact: Option<String>,
    pub remote_available: bool,
}

impl OutcomeReport {
    pub fn succeeded(&self) -> bool {
        self.final_state == OperationState::Succeeded
    }

    pub fn timed_out(&self) -> bool {
        self.final_state == OperationState::TimedOut
    }
}

impl fmt::Display for OutcomeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.mode, self.component_id, self.final_state)?;
        if let Some(cause) = &self.cause {
            write!(f, " ({cause})")?;
        }
        Ok(())
    }
}

/// 배치 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    UpdateAll,
    RollbackBatch,
}

/// 배치의 컴포넌트별 결과
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// 실행됨
    Completed(Box<OutcomeReport>),
    /// 실행하지 않음
    NotAttempted { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub component_id: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchEntry {
    pub fn report(&self) -> Option<&OutcomeReport> {
        match &self.outcome {
            BatchOutcome::Completed(report) => Some(report),
            BatchOutcome::NotAttempted { .. } => None,
        }
    }
}

/// 배치 결과
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub kind: BatchKind,
    pub entries: Vec<BatchEntry>,
    /// 구조적 실패로 중단된 경우 그 사유
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl BatchReport {
    pub fn new(kind: BatchKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            aborted: None,
        }
    }

    pub(crate) fn completed(&mut self, report: OutcomeReport) {
        self.entries.push(BatchEntry {
            component_id: report.component_id.clone(),
            outcome: BatchOutcome::Completed(Box::new(report)),
        });
    }

    pub(crate) fn not_attempted(&mut self, component_id: &str, reason: impl Into<String>) {
        self.entries.push(BatchEntry {
            component_id: component_id.to_owned(),
            outcome: BatchOutcome::NotAttempted {
                reason: reason.into(),
            },
        });
    }

    /// 모든 항목이 실행되어 성공했는지 (부분 성공은 실패)
    pub fn overall_success(&self) -> bool {
        self.aborted.is_none()
            && !self.entries.is_empty()
            && self
                .entries
                .iter()
                .all(|e| e.report().is_some_and(OutcomeReport::succeeded))
    }

    pub fn succeeded_count(&self) -> usize {
        self.count(|r| r.is_some_and(OutcomeReport::succeeded))
    }

    pub fn timed_out_count(&self) -> usize {
        self.count(|r| r.is_some_and(OutcomeReport::timed_out))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|r| r.is_some_and(|r| r.final_state == OperationState::Failed))
    }

    pub fn not_attempted_count(&self) -> usize {
        self.count(|r| r.is_none())
    }

    fn count(&self, pred: impl Fn(Option<&OutcomeReport>) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(e.report())).count()
    }
}
