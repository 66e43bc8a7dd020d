//! 탐색기 에러 타입
//!
//! - [`DriverError`]: 브라우저 드라이버(WebDriver 등) 수준의 실패
//! - [`NavigationError`]: 탐색 단계 수준의 실패
//!
//! `From<NavigationError> for VigilError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use vigil_core::error::{CatalogError, ConfigError, UiError, VigilError};

/// 브라우저 드라이버 에러
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// 드라이버 서버와 통신 실패
    #[error("driver transport error: {0}")]
    Transport(String),

    /// 브라우저 세션 생성 실패
    #[error("session not created: {0}")]
    SessionNotCreated(String),

    /// 드라이버가 W3C 에러를 반환
    #[error("driver returned '{error}': {message}")]
    Protocol {
        /// W3C 에러 코드 (`stale element reference` 등)
        error: String,
        /// 드라이버 메시지
        message: String,
    },

    /// 이름에 해당하는 프레임이 없음
    #[error("no such frame: {0}")]
    NoSuchFrame(String),

    /// 응답 형식이 예상과 다름
    #[error("unexpected driver response: {0}")]
    InvalidResponse(String),
}

/// 탐색 에러
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    /// 로그인 실패
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// 제한 시간 안에 기대한 콘텐츠가 나타나지 않음
    #[error("navigation timed out after {timeout_secs}s waiting for {step}")]
    NavigationTimeout {
        /// 대기하던 단계
        step: String,
        /// 적용된 타임아웃 (초)
        timeout_secs: u64,
    },

    /// 프레임에 해당 텍스트의 요소가 없음
    #[error("element '{text}' not found in frame '{frame}'")]
    ElementNotFound {
        /// 검색한 프레임
        frame: String,
        /// 검색한 텍스트
        text: String,
    },

    /// 업데이트 페이지에 컴포넌트 행이 없음
    #[error("component row not found: {0}")]
    ComponentRowNotFound(String),

    /// 로그인 후 필수 프레임이 모두 있지 않음
    #[error("frame set incomplete, missing: {}", missing.join(", "))]
    FrameSetIncomplete {
        /// 없는 프레임 이름
        missing: Vec<String>,
    },

    /// 카탈로그에 없는 컴포넌트
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    /// 드라이버 에러
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<CatalogError> for NavigationError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownComponent(id) => Self::UnknownComponent(id),
            other => Self::Config {
                field: "catalog".to_owned(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<NavigationError> for VigilError {
    fn from(err: NavigationError) -> Self {
        match err {
            NavigationError::Authentication(msg) => VigilError::Ui(UiError::Authentication(msg)),
            err @ NavigationError::NavigationTimeout { .. } => {
                VigilError::Ui(UiError::NavigationTimeout(err.to_string()))
            }
            err @ (NavigationError::ElementNotFound { .. }
            | NavigationError::ComponentRowNotFound(_)
            | NavigationError::FrameSetIncomplete { .. }) => {
                VigilError::Ui(UiError::ElementNotFound(err.to_string()))
            }
            NavigationError::UnknownComponent(id) => {
                VigilError::Catalog(CatalogError::UnknownComponent(id))
            }
            NavigationError::Driver(err) => VigilError::Ui(UiError::Driver(err.to_string())),
            NavigationError::Config { field, reason } => {
                VigilError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}
