//! UI 탐색기 -- 프레임 기반 관리 콘솔 구동
//!
//! [`UiNavigator`]는 [`FrameDriver`] 위에서 로그인, 메뉴 탐색, 컴포넌트 선택,
//! 액션 트리거, 표시 버전 읽기를 수행합니다.
//!
//! # 프레임 규칙
//! - 메뉴 링크는 `left`, 콘텐츠는 `right` 프레임에 있습니다.
//! - 업데이트 페이지는 항상 `left` 메뉴 클릭으로 도달하며 콘텐츠 URL로
//!   직접 이동하지 않습니다.
//! - 프레임에 들어가는 모든 호출은 성공/실패와 관계없이 최상위 컨텍스트로
//!   돌아온 뒤 반환합니다.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use vigil_core::catalog::{ComponentCatalog, ComponentDescriptor};
use vigil_core::poll::BoundedPoll;
use vigil_core::types::{Credentials, UpdateMode};

use crate::config::{FRAME_LEFT, FRAME_RIGHT, NavigatorConfig, REQUIRED_FRAMES};
use crate::driver::{ElementRef, FrameDriver};
use crate::error::NavigationError;

/// 로그인된 콘솔 세션 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiSession {
    /// 로그인 사용자
    pub username: String,
    /// 로그인 직후 최상위 URL
    pub landing_url: String,
    /// 발견된 프레임 이름
    pub frames: Vec<String>,
}

/// 업데이트 페이지 버튼 액션
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UiAction {
    /// 일반 업데이트
    Update,
    /// 강제 업데이트
    ForceUpdate,
    /// 롤백
    Rollback,
}

impl From<UpdateMode> for UiAction {
    fn from(mode: UpdateMode) -> Self {
        match mode {
            UpdateMode::Normal => Self::Update,
            UpdateMode::Forced => Self::ForceUpdate,
            UpdateMode::Rollback => Self::Rollback,
        }
    }
}

impl UiAction {
    /// 설정된 버튼 라벨
    pub fn label(self, config: &NavigatorConfig) -> &str {
        match self {
            Self::Update => &config.update_button,
            Self::ForceUpdate => &config.force_update_button,
            Self::Rollback => &config.rollback_button,
        }
    }
}

/// UI 탐색기
pub struct UiNavigator<D: FrameDriver> {
    driver: D,
    config: NavigatorConfig,
    catalog: Arc<ComponentCatalog>,
}

impl<D: FrameDriver> UiNavigator<D> {
    /// 새 탐색기를 생성합니다.
    pub fn new(driver: D, config: NavigatorConfig, catalog: Arc<ComponentCatalog>) -> Self {
        Self {
            driver,
            config,
            catalog,
        }
    }

    /// 탐색기 설정
    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// 내부 드라이버
    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn wait_poll(&self) -> BoundedPoll {
        BoundedPoll::new(self.config.poll_interval(), self.config.element_wait())
    }

    fn descriptor(&self, component_id: &str) -> Result<&ComponentDescriptor, NavigationError> {
        Ok(self.catalog.get(component_id)?)
    }

    /// 콘솔에 로그인합니다.
    ///
    /// 성공 기준은 세 프레임(`tophead`, `left`, `right`)이 모두 나타나는 것입니다.
    ///
    /// # Errors
    ///
    /// 대기 시간 안에 프레임 세트가 나타나지 않으면 `Authentication`.
    pub async fn login(&self, credentials: &Credentials) -> Result<UiSession, NavigationError> {
        let url = self.config.login_url();
        info!(url = %url, username = %credentials.username, "logging in to console");
        self.driver.goto(&url).await?;

        let username = self.login_field(&self.config.username_field).await?;
        self.driver
            .type_text(&username, &credentials.username)
            .await?;
        let password = self.login_field(&self.config.password_field).await?;
        self.driver
            .type_text(&password, &credentials.password)
            .await?;
        let submit = self.login_field(&self.config.submit_field).await?;
        self.driver.click(&submit).await?;

        let driver = &self.driver;
        let outcome = self
            .wait_poll()
            .until(|| async move {
                let names = driver.frame_names().await?;
                let complete = REQUIRED_FRAMES
                    .iter()
                    .all(|required| names.iter().any(|n| n == required));
                Ok::<_, NavigationError>(complete.then_some(names))
            })
            .await?;

        let Some(frames) = outcome.into_value() else {
            warn!(username = %credentials.username, "console frame set never appeared after login");
            return Err(NavigationError::Authentication(format!(
                "frame set did not appear within {}s after submitting credentials",
                self.config.element_wait_secs
            )));
        };

        let landing_url = self.driver.current_url().await?;
        info!(landing_url = %landing_url, "console login succeeded");
        Ok(UiSession {
            username: credentials.username.clone(),
            landing_url,
            frames,
        })
    }

    async fn login_field(
        &self,
        name: &str,
    ) -> Result<ElementRef, NavigationError> {
        self.driver
            .find_by_name(name)
            .await?
            .ok_or_else(|| NavigationError::ElementNotFound {
                frame: "top".to_owned(),
                text: name.to_owned(),
            })
    }

    /// 세 프레임이 모두 있는지 확인합니다.
    pub async fn verify_frame_set(&self) -> Result<Vec<String>, NavigationError> {
        let names = self.driver.frame_names().await?;
        let missing: Vec<String> = REQUIRED_FRAMES
            .iter()
            .filter(|required| !names.iter().any(|n| n == *required))
            .map(|s| (*s).to_owned())
            .collect();
        if !missing.is_empty() {
            return Err(NavigationError::FrameSetIncomplete { missing });
        }
        Ok(names)
    }

    /// 프레임 안에서 `body`를 실행하고 항상 최상위 컨텍스트로 돌아옵니다.
    async fn in_frame<T, F, Fut>(&self, frame: &str, body: F) -> Result<T, NavigationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, NavigationError>>,
    {
        let result = match self.driver.enter_frame(frame).await {
            Ok(()) => body().await,
            Err(e) => Err(e.into()),
        };
        let restored = self.driver.leave_frame().await;

        match (result, restored) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore_err)) => {
                warn!(frame, error = %restore_err, "failed to return to top-level context");
                Err(e)
            }
        }
    }

    /// 현재 컨텍스트에 `text`가 (대소문자 무시) 나타날 때까지 기다립니다.
    async fn wait_in_current(&self, text: &str, step: &str) -> Result<(), NavigationError> {
        let driver = &self.driver;
        let needle = text.to_lowercase();
        let needle = needle.as_str();
        let outcome = self
            .wait_poll()
            .until_true(|| async move {
                let body = driver.page_text().await?;
                Ok::<_, NavigationError>(body.to_lowercase().contains(needle))
            })
            .await?;

        if outcome.is_ready() {
            debug!(step, attempts = outcome.attempts(), "text appeared");
            Ok(())
        } else {
            Err(NavigationError::NavigationTimeout {
                step: step.to_owned(),
                timeout_secs: self.config.element_wait_secs,
            })
        }
    }

    /// 프레임에 `text`가 나타날 때까지 제한된 시간 동안 기다립니다.
    ///
    /// # Errors
    ///
    /// 제한 시간 초과 시 `NavigationTimeout`.
    pub async fn wait_for_text(&self, frame: &str, text: &str) -> Result<(), NavigationError> {
        let step = format!("'{text}' in frame '{frame}'");
        self.in_frame(frame, move || async move { self.wait_in_current(text, &step).await })
            .await
    }

    /// 메뉴를 따라 업데이트 페이지로 이동합니다.
    ///
    /// `left`에서 상위 메뉴(정확 일치) → 서브메뉴 대기 → 서브메뉴 링크
    /// (부분/대소문자 무시) 클릭 → `right`에서 페이지 표시 텍스트 대기.
    ///
    /// # Errors
    ///
    /// 링크가 없으면 `ElementNotFound`, 대기 초과는 `NavigationTimeout`.
    pub async fn navigate_to_update_page(&self) -> Result<(), NavigationError> {
        let admin = self.config.admin_menu_text.as_str();
        let updates = self.config.updates_menu_text.as_str();

        self.in_frame(FRAME_LEFT, move || async move {
            let admin_link = self
                .driver
                .find_by_text(admin)
                .await?
                .ok_or_else(|| NavigationError::ElementNotFound {
                    frame: FRAME_LEFT.to_owned(),
                    text: admin.to_owned(),
                })?;
            self.driver.click(&admin_link).await?;
            debug!(menu = admin, "menu activated");

            self.wait_in_current(updates, &format!("submenu '{updates}'"))
                .await?;

            let updates_link = self
                .driver
                .find_by_partial_text_ci(updates)
                .await?
                .ok_or_else(|| NavigationError::ElementNotFound {
                    frame: FRAME_LEFT.to_owned(),
                    text: updates.to_owned(),
                })?;
            self.driver.click(&updates_link).await?;
            Ok(())
        })
        .await?;

        self.wait_for_text(FRAME_RIGHT, &self.config.updates_page_marker)
            .await?;
        info!("update page loaded");
        Ok(())
    }

    /// 업데이트 표에서 컴포넌트 행을 선택합니다.
    ///
    /// # Errors
    ///
    /// 행이 없으면 `ComponentRowNotFound`.
    pub async fn select_component(&self, component_id: &str) -> Result<(), NavigationError> {
        let label = self.descriptor(component_id)?.ui_label.as_str();

        self.in_frame(FRAME_RIGHT, move || async move {
            let row = self
                .driver
                .find_row(label)
                .await?
                .ok_or_else(|| NavigationError::ComponentRowNotFound(component_id.to_owned()))?;
            let target = self.driver.row_selector(&row).await?.unwrap_or(row);
            self.driver.click(&target).await?;
            Ok(())
        })
        .await?;

        debug!(component_id, label, "component selected");
        Ok(())
    }

    /// 업데이트 페이지 버튼을 눌러 액션을 트리거합니다.
    ///
    /// 확인 대화상자가 뜨면 수락합니다.
    pub async fn trigger_action(&self, action: UiAction) -> Result<(), NavigationError> {
        let label = action.label(&self.config);

        let confirmed = self
            .in_frame(FRAME_RIGHT, move || async move {
                let button = self.driver.find_by_text(label).await?.ok_or_else(|| {
                    NavigationError::ElementNotFound {
                        frame: FRAME_RIGHT.to_owned(),
                        text: label.to_owned(),
                    }
                })?;
                self.driver.click(&button).await?;
                Ok(self.driver.accept_dialog().await?)
            })
            .await?;

        info!(action = ?action, button = label, confirmed, "update action triggered");
        Ok(())
    }

    /// 업데이트 표에 표시된 컴포넌트 버전을 읽습니다.
    ///
    /// 행이나 셀이 없거나 비어 있으면 `None`입니다.
    pub async fn read_displayed_version(
        &self,
        component_id: &str,
    ) -> Result<Option<String>, NavigationError> {
        let label = self.descriptor(component_id)?.ui_label.as_str();
        let column = self.config.version_column;

        self.in_frame(FRAME_RIGHT, move || async move {
            let Some(row) = self.driver.find_row(label).await? else {
                return Ok(None);
            };
            let text = self.driver.cell_text(&row, column).await?;
            Ok(text
                .map(|t| t.trim().to_owned())
                .filter(|t| !t.is_empty()))
        })
        .await
    }

    /// `right` 프레임의 전체 텍스트를 읽습니다.
    pub async fn read_kernel_or_system_text(&self) -> Result<String, NavigationError> {
        self.in_frame(FRAME_RIGHT, move || async move {
            Ok(self.driver.page_text().await?)
        })
        .await
    }

    /// 브라우저 세션을 종료합니다.
    pub async fn close(self) -> Result<(), NavigationError> {
        self.driver.close().await?;
        Ok(())
    }
}
