//! 설정 관리 -- vigil.toml 파싱 및 런타임 설정
//!
//! [`VigilConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`VIGIL_REMOTE_HOST=10.0.0.5` 형식)
//! 3. 설정 파일 (`vigil.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), vigil_core::error::VigilError> {
//! use vigil_core::config::VigilConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = VigilConfig::load("vigil.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = VigilConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, VigilError};
use crate::types::Credentials;

/// 폴링 간격 상한 (초)
const MAX_POLL_INTERVAL_SECS: u64 = 60;
/// 원격 명령 타임아웃 상한 (초)
const MAX_COMMAND_TIMEOUT_SECS: u64 = 600;
/// UI 요소 대기 상한 (초)
const MAX_ELEMENT_WAIT_SECS: u64 = 300;
/// 브라우저 폴링 간격 상한 (밀리초)
const MAX_BROWSER_POLL_MS: u64 = 10_000;
/// 로그 tail 줄 수 상한
const MAX_LOG_TAIL_LINES: usize = 100_000;

/// vigil 통합 설정
///
/// `vigil.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 크레이트는 `from_core`로 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VigilConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 대상 어플라이언스 웹 콘솔
    #[serde(default)]
    pub target: TargetConfig,
    /// 원격 셸 채널
    #[serde(default)]
    pub remote: RemoteConfig,
    /// WebDriver 브라우저
    #[serde(default)]
    pub browser: BrowserConfig,
    /// 콘솔 메뉴/버튼 텍스트
    #[serde(default)]
    pub ui: UiConfig,
    /// 검증 채널
    #[serde(default)]
    pub verify: VerifyConfig,
    /// 컴포넌트 카탈로그 원본
    #[serde(default)]
    pub catalog: CatalogSourceConfig,
}

impl VigilConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, VigilError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 읽습니다 (환경변수 오버라이드 및 검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, VigilError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VigilError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                VigilError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, VigilError> {
        toml::from_str(toml_str).map_err(|e| {
            VigilError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `VIGIL_{SECTION}_{FIELD}`
    /// 예: `VIGIL_REMOTE_HOST=10.0.0.5`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "VIGIL_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "VIGIL_GENERAL_LOG_FORMAT");

        // Target
        override_string(&mut self.target.base_url, "VIGIL_TARGET_BASE_URL");
        override_string(&mut self.target.username, "VIGIL_TARGET_USERNAME");
        override_string(&mut self.target.password, "VIGIL_TARGET_PASSWORD");
        override_string(&mut self.target.login_path, "VIGIL_TARGET_LOGIN_PATH");

        // Remote
        override_bool(&mut self.remote.enabled, "VIGIL_REMOTE_ENABLED");
        override_string(&mut self.remote.host, "VIGIL_REMOTE_HOST");
        override_u16(&mut self.remote.port, "VIGIL_REMOTE_PORT");
        override_string(&mut self.remote.user, "VIGIL_REMOTE_USER");
        override_string(&mut self.remote.password, "VIGIL_REMOTE_PASSWORD");
        override_string(
            &mut self.remote.identity_file,
            "VIGIL_REMOTE_IDENTITY_FILE",
        );
        override_u64(
            &mut self.remote.connect_timeout_secs,
            "VIGIL_REMOTE_CONNECT_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.remote.command_timeout_secs,
            "VIGIL_REMOTE_COMMAND_TIMEOUT_SECS",
        );
        override_string(
            &mut self.remote.config_store_path,
            "VIGIL_REMOTE_CONFIG_STORE_PATH",
        );
        override_string(
            &mut self.remote.update_log_path,
            "VIGIL_REMOTE_UPDATE_LOG_PATH",
        );
        override_usize(
            &mut self.remote.log_tail_lines,
            "VIGIL_REMOTE_LOG_TAIL_LINES",
        );
        override_u64(
            &mut self.remote.poll_interval_secs,
            "VIGIL_REMOTE_POLL_INTERVAL_SECS",
        );

        // Browser
        override_string(
            &mut self.browser.webdriver_url,
            "VIGIL_BROWSER_WEBDRIVER_URL",
        );
        override_string(
            &mut self.browser.browser_name,
            "VIGIL_BROWSER_BROWSER_NAME",
        );
        override_bool(&mut self.browser.headless, "VIGIL_BROWSER_HEADLESS");
        override_u64(
            &mut self.browser.element_wait_secs,
            "VIGIL_BROWSER_ELEMENT_WAIT_SECS",
        );
        override_u64(
            &mut self.browser.poll_interval_ms,
            "VIGIL_BROWSER_POLL_INTERVAL_MS",
        );
        override_u64(
            &mut self.browser.page_load_timeout_secs,
            "VIGIL_BROWSER_PAGE_LOAD_TIMEOUT_SECS",
        );

        // Verify
        override_string(&mut self.verify.error_pattern, "VIGIL_VERIFY_ERROR_PATTERN");
        override_bool(&mut self.verify.check_service, "VIGIL_VERIFY_CHECK_SERVICE");
        override_bool(
            &mut self.verify.check_lock_artifact,
            "VIGIL_VERIFY_CHECK_LOCK_ARTIFACT",
        );

        // Catalog
        override_opt_string(&mut self.catalog.path, "VIGIL_CATALOG_PATH");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), VigilError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // 대상 URL
        if self.target.base_url.is_empty() {
            return Err(invalid("target.base_url", "must not be empty"));
        }
        if !is_http_url(&self.target.base_url) {
            return Err(invalid("target.base_url", "must start with http:// or https://"));
        }
        if !self.target.login_path.starts_with('/') {
            return Err(invalid("target.login_path", "must start with '/'"));
        }

        // 원격 채널 (비활성화 시 건너뜀)
        if self.remote.enabled {
            if self.remote.host.is_empty() {
                return Err(invalid(
                    "remote.host",
                    "host must not be empty when remote is enabled",
                ));
            }
            if self.remote.port == 0 {
                return Err(invalid("remote.port", "must be greater than 0"));
            }
            if self.remote.user.is_empty() {
                return Err(invalid(
                    "remote.user",
                    "user must not be empty when remote is enabled",
                ));
            }
        }
        if self.remote.command_timeout_secs == 0
            || self.remote.command_timeout_secs > MAX_COMMAND_TIMEOUT_SECS
        {
            return Err(invalid(
                "remote.command_timeout_secs",
                format!("must be between 1 and {MAX_COMMAND_TIMEOUT_SECS}"),
            ));
        }
        if self.remote.connect_timeout_secs == 0 {
            return Err(invalid("remote.connect_timeout_secs", "must be greater than 0"));
        }
        if self.remote.poll_interval_secs == 0
            || self.remote.poll_interval_secs > MAX_POLL_INTERVAL_SECS
        {
            return Err(invalid(
                "remote.poll_interval_secs",
                format!("must be between 1 and {MAX_POLL_INTERVAL_SECS}"),
            ));
        }
        if self.remote.log_tail_lines == 0 || self.remote.log_tail_lines > MAX_LOG_TAIL_LINES {
            return Err(invalid(
                "remote.log_tail_lines",
                format!("must be between 1 and {MAX_LOG_TAIL_LINES}"),
            ));
        }
        if self.remote.config_store_path.is_empty() {
            return Err(invalid("remote.config_store_path", "must not be empty"));
        }
        if self.remote.update_log_path.is_empty() {
            return Err(invalid("remote.update_log_path", "must not be empty"));
        }

        // 브라우저
        if !is_http_url(&self.browser.webdriver_url) {
            return Err(invalid(
                "browser.webdriver_url",
                "must start with http:// or https://",
            ));
        }
        if self.browser.element_wait_secs == 0
            || self.browser.element_wait_secs > MAX_ELEMENT_WAIT_SECS
        {
            return Err(invalid(
                "browser.element_wait_secs",
                format!("must be between 1 and {MAX_ELEMENT_WAIT_SECS}"),
            ));
        }
        if self.browser.poll_interval_ms == 0 || self.browser.poll_interval_ms > MAX_BROWSER_POLL_MS
        {
            return Err(invalid(
                "browser.poll_interval_ms",
                format!("must be between 1 and {MAX_BROWSER_POLL_MS}"),
            ));
        }
        if self.browser.page_load_timeout_secs == 0 {
            return Err(invalid(
                "browser.page_load_timeout_secs",
                "must be greater than 0",
            ));
        }

        // UI
        if self.ui.version_column == 0 {
            return Err(invalid("ui.version_column", "columns are 1-based"));
        }
        if self.ui.admin_menu_text.is_empty() || self.ui.updates_menu_text.is_empty() {
            return Err(invalid("ui", "menu texts must not be empty"));
        }

        // 검증
        if self.verify.error_pattern.trim().is_empty() {
            return Err(invalid("verify.error_pattern", "must not be empty"));
        }
        if let Err(e) = regex::Regex::new(&self.verify.error_pattern) {
            return Err(invalid("verify.error_pattern", e.to_string()));
        }

        Ok(())
    }

    /// 웹 콘솔 로그인 자격 증명
    pub fn console_credentials(&self) -> Credentials {
        Credentials::new(&self.target.username, &self.target.password)
    }

    /// 원격 셸 자격 증명
    pub fn remote_credentials(&self) -> Credentials {
        Credentials::new(&self.remote.user, &self.remote.password)
    }

    /// 비밀번호를 가린 사본을 반환합니다 (`config show` 출력용).
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.target.password.is_empty() {
            copy.target.password = REDACTED.to_owned();
        }
        if !copy.remote.password.is_empty() {
            copy.remote.password = REDACTED.to_owned();
        }
        copy
    }
}

const REDACTED: &str = "<redacted>";

fn invalid(field: &str, reason: impl Into<String>) -> VigilError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 대상 웹 콘솔 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// 콘솔 기본 URL (예: `https://10.0.0.5:8443`)
    pub base_url: String,
    /// 콘솔 사용자명
    pub username: String,
    /// 콘솔 비밀번호
    pub password: String,
    /// 로그인 페이지 경로
    pub login_path: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:8443".to_owned(),
            username: "admin".to_owned(),
            password: String::new(),
            login_path: "/login.jsp".to_owned(),
        }
    }
}

/// 원격 셸 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// 원격 채널 사용 여부 (비활성화 시 Backend/Log 채널은 skipped)
    pub enabled: bool,
    /// SSH 호스트
    pub host: String,
    /// SSH 포트
    pub port: u16,
    /// SSH 사용자
    pub user: String,
    /// SSH 비밀번호 (비어 있으면 키 기반 인증)
    pub password: String,
    /// 개인 키 경로 (선택)
    pub identity_file: String,
    /// 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
    /// 원격 명령 하나의 타임아웃 (초)
    pub command_timeout_secs: u64,
    /// 버전 정보가 저장된 INI 파일 경로
    pub config_store_path: String,
    /// 업데이트 로그 경로
    pub update_log_path: String,
    /// 로그 채널이 읽는 최근 줄 수
    pub log_tail_lines: usize,
    /// 락 파일 폴링 간격 (초)
    pub poll_interval_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_owned(),
            port: 22,
            user: "root".to_owned(),
            password: String::new(),
            identity_file: String::new(),
            connect_timeout_secs: 10,
            command_timeout_secs: 30,
            config_store_path: "/etc/iscan/intscan.ini".to_owned(),
            update_log_path: "/var/log/iwss/update.log".to_owned(),
            log_tail_lines: 1000,
            poll_interval_secs: 5,
        }
    }
}

/// WebDriver 브라우저 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver 서버 URL (chromedriver, geckodriver 등)
    pub webdriver_url: String,
    /// 브라우저 이름 (W3C `browserName` capability)
    pub browser_name: String,
    /// 헤드리스 실행 여부
    pub headless: bool,
    /// 요소/텍스트 대기 상한 (초)
    pub element_wait_secs: u64,
    /// UI 대기 폴링 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 페이지 로드 타임아웃 (초)
    pub page_load_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_owned(),
            browser_name: "chrome".to_owned(),
            headless: true,
            element_wait_secs: 30,
            poll_interval_ms: 500,
            page_load_timeout_secs: 60,
        }
    }
}

/// 콘솔 메뉴/버튼 텍스트 설정
///
/// 어플라이언스 펌웨어마다 라벨이 조금씩 달라서 설정으로 분리합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// `left` 프레임의 상위 메뉴 (정확히 일치)
    pub admin_menu_text: String,
    /// 상위 메뉴 아래 서브메뉴 (대소문자 무시 부분 일치)
    pub updates_menu_text: String,
    /// 업데이트 페이지 로드 완료를 나타내는 `right` 프레임 텍스트
    pub updates_page_marker: String,
    /// 컴포넌트 행에서 현재 버전이 표시되는 열 (1부터)
    pub version_column: usize,
    /// 일반 업데이트 버튼 라벨
    pub update_button: String,
    /// 강제 업데이트 버튼 라벨
    pub force_update_button: String,
    /// 롤백 버튼 라벨
    pub rollback_button: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            admin_menu_text: "Administration".to_owned(),
            updates_menu_text: "System Updates".to_owned(),
            updates_page_marker: "Component".to_owned(),
            version_column: 3,
            update_button: "Update".to_owned(),
            force_update_button: "Forced Update".to_owned(),
            rollback_button: "Rollback".to_owned(),
        }
    }
}

/// 로그 채널 기본 에러 패턴 (대소문자 무시로 적용)
pub const DEFAULT_ERROR_PATTERN: &str = "ERROR|FAIL|Exception|failed|error";

/// 검증 채널 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// 로그 에러 마커 정규식
    pub error_pattern: String,
    /// 서비스 재시작 컴포넌트의 서비스 상태 확인 여부
    pub check_service: bool,
    /// 백엔드 검사에서 락 파일 부재 확인 여부
    pub check_lock_artifact: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            error_pattern: DEFAULT_ERROR_PATTERN.to_owned(),
            check_service: true,
            check_lock_artifact: true,
        }
    }
}

/// 카탈로그 원본 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSourceConfig {
    /// 외부 카탈로그 파일 경로 (없으면 내장 카탈로그 사용)
    pub path: Option<String>,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = if val.is_empty() { None } else { Some(val) };
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
