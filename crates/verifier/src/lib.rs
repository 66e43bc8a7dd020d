//! # vigil-verifier
//!
//! 업데이트 결과를 세 개의 독립 채널로 교차 검증합니다.
//!
//! | 채널 | 관찰 대상 | 통과 조건 |
//! |---|---|---|
//! | UI | 업데이트 표의 표시 버전 | 기대 버전과 정확히 일치 |
//! | Backend | 설정 저장소, 락 파일, 서비스 | 버전 키 일치, 락 부재, 필요 시 서비스 running |
//! | Log | 업데이트 로그 창 | 성공 마커 존재, 에러 마커 없음 |
//!
//! 원격 세션이 없으면 Backend/Log는 `Skipped`이며 전체 통과로 집계되지 않습니다.

pub mod config;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod log_window;
pub mod result;

pub use config::VerifierConfig;
pub use engine::{INCOMPLETE_REASON, RemoteChannel, Verifier};
pub use error::VerifierError;
pub use kernel::{KernelParseError, KernelVersion};
pub use log_window::{LogClassifier, LogVerdict, LogWindow, Marker, VersionChange, WindowStart};
pub use result::{ChannelStatus, VerificationResult, VerificationSummary};
