//! 탐색기 설정
//!
//! [`NavigatorConfig`]는 core의 `[target]`, `[browser]`, `[ui]` 섹션을
//! 하나로 묶어 탐색기가 필요로 하는 값만 담습니다.
//!
//! # 사용 예시
//! ```ignore
//! use vigil_core::config::VigilConfig;
//! use vigil_navigator::config::NavigatorConfig;
//!
//! let core_config = VigilConfig::default();
//! let config = NavigatorConfig::from_core(&core_config);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vigil_core::config::VigilConfig;

use crate::error::NavigationError;

/// 상단 내비게이션 프레임
pub const FRAME_TOPHEAD: &str = "tophead";
/// 메뉴 프레임
pub const FRAME_LEFT: &str = "left";
/// 콘텐츠 프레임
pub const FRAME_RIGHT: &str = "right";
/// 로그인 후 반드시 존재해야 하는 프레임
pub const REQUIRED_FRAMES: [&str; 3] = [FRAME_TOPHEAD, FRAME_LEFT, FRAME_RIGHT];

/// 요소 대기 상한 (초)
const MAX_ELEMENT_WAIT_SECS: u64 = 300;

/// 탐색기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigatorConfig {
    /// 콘솔 기본 URL
    pub base_url: String,
    /// 로그인 페이지 경로
    pub login_path: String,
    /// WebDriver 서버 URL
    pub webdriver_url: String,
    /// 브라우저 이름
    pub browser_name: String,
    /// 헤드리스 실행
    pub headless: bool,
    /// 요소/텍스트 대기 상한 (초)
    pub element_wait_secs: u64,
    /// 대기 폴링 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 페이지 로드 타임아웃 (초)
    pub page_load_timeout_secs: u64,
    /// 상위 메뉴 텍스트
    pub admin_menu_text: String,
    /// 서브메뉴 텍스트
    pub updates_menu_text: String,
    /// 업데이트 페이지 로드 표시 텍스트
    pub updates_page_marker: String,
    /// 버전 열 (1부터)
    pub version_column: usize,
    /// 일반 업데이트 버튼
    pub update_button: String,
    /// 강제 업데이트 버튼
    pub force_update_button: String,
    /// 롤백 버튼
    pub rollback_button: String,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 로그인 폼 사용자명 필드 name
    pub username_field: String,
    /// 로그인 폼 비밀번호 필드 name
    pub password_field: String,
    /// 로그인 폼 제출 버튼 name
    pub submit_field: String,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self::from_core(&VigilConfig::default())
    }
}

impl NavigatorConfig {
    /// core 설정에서 탐색기 설정을 생성합니다.
    pub fn from_core(core: &VigilConfig) -> Self {
        Self {
            base_url: core.target.base_url.trim_end_matches('/').to_owned(),
            login_path: core.target.login_path.clone(),
            webdriver_url: core.browser.webdriver_url.trim_end_matches('/').to_owned(),
            browser_name: core.browser.browser_name.clone(),
            headless: core.browser.headless,
            element_wait_secs: core.browser.element_wait_secs,
            poll_interval_ms: core.browser.poll_interval_ms,
            page_load_timeout_secs: core.browser.page_load_timeout_secs,
            admin_menu_text: core.ui.admin_menu_text.clone(),
            updates_menu_text: core.ui.updates_menu_text.clone(),
            updates_page_marker: core.ui.updates_page_marker.clone(),
            version_column: core.ui.version_column,
            update_button: core.ui.update_button.clone(),
            force_update_button: core.ui.force_update_button.clone(),
            rollback_button: core.ui.rollback_button.clone(),
            username_field: "userid".to_owned(),
            password_field: "password".to_owned(),
            submit_field: "submit".to_owned(),
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), NavigationError> {
        if self.base_url.is_empty() {
            return Err(config_err("base_url", "must not be empty"));
        }
        if self.element_wait_secs == 0 || self.element_wait_secs > MAX_ELEMENT_WAIT_SECS {
            return Err(config_err(
                "element_wait_secs",
                format!("must be 1-{MAX_ELEMENT_WAIT_SECS}"),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(config_err("poll_interval_ms", "must be greater than 0"));
        }
        if self.version_column == 0 {
            return Err(config_err("version_column", "columns are 1-based"));
        }
        for (field, value) in [
            ("admin_menu_text", &self.admin_menu_text),
            ("updates_menu_text", &self.updates_menu_text),
            ("update_button", &self.update_button),
            ("force_update_button", &self.force_update_button),
            ("rollback_button", &self.rollback_button),
        ] {
            if value.trim().is_empty() {
                return Err(config_err(field, "must not be empty"));
            }
        }
        Ok(())
    }

    /// 로그인 페이지 URL
    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url, self.login_path)
    }

    /// 요소 대기 상한
    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }

    /// 대기 폴링 간격
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn config_err(field: &str, reason: impl Into<String>) -> NavigationError {
    NavigationError::Config {
        field: field.to_owned(),
        reason: reason.into(),
    }
}
