//! 검증 결과 타입
//!
//! 각 채널 검사는 하나의 [`VerificationResult`]를 만들고, 한 작업의 결과들은
//! [`VerificationSummary`]로 모입니다. 원격 세션이 없어 시도하지 못한 채널은
//! `Skipped`로 남으며 절대 통과로 집계되지 않습니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use vigil_core::types::Channel;

/// 채널 결과 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChannelStatus {
    /// 통과
    Passed,
    /// 실패
    Failed { reason: String },
    /// 시도하지 않음
    Skipped { reason: String },
}

/// 단일 채널 검증 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub channel: Channel,
    #[serde(flatten)]
    pub status: ChannelStatus,
    /// 관찰한 값
    pub actual_value: Option<String>,
    /// 기대한 값
    pub expected_value: Option<String>,
    /// 판단 근거 (로그 줄, 키=값 등)
    pub evidence: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl VerificationResult {
    fn new(channel: Channel, status: ChannelStatus) -> Self {
        Self {
            channel,
            status,
            actual_value: None,
            expected_value: None,
            evidence: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// 통과 결과
    pub fn passed(channel: Channel) -> Self {
        Self::new(channel, ChannelStatus::Passed)
    }

    /// 실패 결과
    pub fn failed(channel: Channel, reason: impl Into<String>) -> Self {
        Self::new(
            channel,
            ChannelStatus::Failed {
                reason: reason.into(),
            },
        )
    }

    /// 건너뛴 결과
    pub fn skipped(channel: Channel, reason: impl Into<String>) -> Self {
        Self::new(
            channel,
            ChannelStatus::Skipped {
                reason: reason.into(),
            },
        )
    }

    pub fn with_values(mut self, actual: Option<String>, expected: Option<String>) -> Self {
        self.actual_value = actual;
        self.expected_value = expected;
        self
    }

    pub fn with_evidence(mut self, evidence: impl IntoIterator<Item = String>) -> Self {
        self.evidence.extend(evidence);
        self
    }

    pub fn is_passed(&self) -> bool {
        matches!(self.status, ChannelStatus::Passed)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, ChannelStatus::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ChannelStatus::Failed { .. })
    }

    /// 실패/건너뜀 사유
    pub fn reason(&self) -> Option<&str> {
        match &self.status {
            ChannelStatus::Passed => None,
            ChannelStatus::Failed { reason } | ChannelStatus::Skipped { reason } => Some(reason),
        }
    }
}

/// 한 작업의 채널 결과 모음
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationSummary {
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    pub fn new(results: Vec<VerificationResult>) -> Self {
        Self { results }
    }

    pub fn push(&mut self, result: VerificationResult) {
        self.results.push(result);
    }

    /// 채널 결과 조회
    pub fn get(&self, channel: Channel) -> Option<&VerificationResult> {
        self.results.iter().find(|r| r.channel == channel)
    }

    /// 시도한 채널 결과
    pub fn attempted(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter().filter(|r| !r.is_skipped())
    }

    /// 건너뛴 채널 결과
    pub fn skipped(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter().filter(|r| r.is_skipped())
    }

    /// 실패한 채널 결과
    pub fn failures(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter().filter(|r| r.is_failed())
    }

    /// 시도한 모든 채널이 통과했는지 (건너뛴 채널은 판단에서 제외)
    pub fn attempted_passed(&self) -> bool {
        self.attempted().all(VerificationResult::is_passed)
    }

    /// 모든 채널이 시도되었고 모두 통과했는지
    ///
    /// 결과가 비어 있거나 하나라도 건너뛰었다면 `false`입니다.
    pub fn fully_passed(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(VerificationResult::is_passed)
    }
}
