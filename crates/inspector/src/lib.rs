//! # vigil-inspector
//!
//! 원격 셸로 어플라이언스의 백엔드 상태를 조회하는 검사기입니다.
//! 설정 저장소(INI), 컴포넌트 락 파일, 서비스 상태, 업데이트 로그를 읽는
//! 유일한 경로이며, 아무것도 다시 구현하지 않고 관찰만 합니다.
//!
//! # 모듈 구조
//! - [`shell`]: `RemoteShell`/`ShellConnector` trait과 OpenSSH 구현
//! - [`session`]: 직렬화와 타임아웃을 적용한 검사 세션
//! - [`store`]: INI 설정 저장소 파서
//! - [`commands`]: 원격 명령 문자열 생성
//! - [`config`]: 검사기 설정
//! - [`error`]: 도메인 에러

pub mod commands;
pub mod config;
pub mod error;
pub mod session;
pub mod shell;
pub mod store;

pub use config::{InspectorConfig, InspectorConfigBuilder};
pub use error::InspectorError;
pub use session::{InspectorSession, SystemInfo};
pub use shell::{CommandOutput, RemoteShell, ShellConnector, SshConnector, SshShell};
pub use store::ConfigStore;
