//! # vigil-navigator
//!
//! 프레임 기반 관리 콘솔을 구동하는 UI 탐색기입니다.
//!
//! - [`driver`]: DOM 접근 capability 트레이트 ([`FrameDriver`])
//! - [`webdriver`]: W3C WebDriver 바인딩 ([`WebDriverClient`])
//! - [`navigator`]: 로그인, 메뉴 탐색, 액션 트리거 ([`UiNavigator`])
//!
//! 구체 드라이버는 교체 가능하며, 탐색 로직은 [`FrameDriver`]에만 의존합니다.

pub mod config;
pub mod driver;
pub mod error;
pub mod navigator;
pub mod webdriver;

pub use config::NavigatorConfig;
pub use driver::{ElementRef, FrameDriver};
pub use error::{DriverError, NavigationError};
pub use navigator::{UiAction, UiNavigator, UiSession};
pub use webdriver::WebDriverClient;
