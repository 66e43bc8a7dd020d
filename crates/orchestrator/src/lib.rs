//! # vigil-orchestrator
//!
//! 업데이트/롤백 작업의 상태 머신과 상호 배제, 타임아웃 정책을 담당합니다.
//!
//! - [`lock`]: 단일 슬롯 전역 락 ([`UpdateLock`])
//! - [`state`]: 작업 상태와 실패 원인
//! - [`operation`]: 진행 중인 작업과 요청
//! - [`orchestrator`]: 선택 → 트리거 → 대기 → 검증 → 판정 ([`UpdateOrchestrator`])
//! - [`report`]: 작업/배치 보고서

pub mod config;
pub mod error;
pub mod lock;
pub mod operation;
pub mod orchestrator;
pub mod report;
pub mod state;

pub use config::OrchestratorConfig;
pub use error::OrchestratorError;
pub use lock::{LockHolder, LockToken, UpdateLock};
pub use operation::{UpdateOperation, UpdateRequest};
pub use orchestrator::{LockArtifact, LockStatus, RemoteState, UpdateOrchestrator};
pub use report::{BatchEntry, BatchKind, BatchOutcome, BatchReport, OutcomeReport};
pub use state::{FailureCause, OperationState, Transition};
