//! Frame driver capability interface.
//!
//! [`FrameDriver`] is the narrow set of DOM operations the navigator needs.
//! The DOM is treated as an untyped tree: elements are opaque
//! [`ElementRef`] handles and lookups are by visible text, form field name,
//! or table-row label. Production code uses
//! [`WebDriverClient`](crate::webdriver::WebDriverClient); tests use
//! `MockDriver` or a fake console.
//!
//! All lookups are scoped to the current browsing context. Callers enter a
//! frame with [`FrameDriver::enter_frame`] and must return to the top-level
//! context with [`FrameDriver::leave_frame`].

use std::fmt;
use std::future::Future;

use crate::error::DriverError;

/// Opaque handle to a DOM element in the current context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

impl ElementRef {
    /// Wraps a driver-specific element id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Driver-specific element id.
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait abstracting browser DOM access.
///
/// Lookup methods return `Ok(None)` when nothing matches; `Err` is reserved
/// for driver failures.
pub trait FrameDriver: Send + Sync + 'static {
    /// Loads a URL in the top-level context.
    fn goto(&self, url: &str) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// URL of the top-level document.
    fn current_url(&self) -> impl Future<Output = Result<String, DriverError>> + Send;

    /// Names of `frame`/`iframe` elements in the current context.
    fn frame_names(&self) -> impl Future<Output = Result<Vec<String>, DriverError>> + Send;

    /// Switches into the named child frame.
    ///
    /// # Errors
    ///
    /// `DriverError::NoSuchFrame` when no frame has that name.
    fn enter_frame(&self, name: &str) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Returns to the top-level browsing context.
    fn leave_frame(&self) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Visible text of the current context's body.
    fn page_text(&self) -> impl Future<Output = Result<String, DriverError>> + Send;

    /// Link, button, or submit input whose visible text equals `text`.
    fn find_by_text(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Option<ElementRef>, DriverError>> + Send;

    /// Link whose visible text contains `text`, ignoring case.
    fn find_by_partial_text_ci(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Option<ElementRef>, DriverError>> + Send;

    /// Element with the given `name` attribute.
    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<ElementRef>, DriverError>> + Send;

    /// Table row with a cell whose text equals `label`.
    fn find_row(
        &self,
        label: &str,
    ) -> impl Future<Output = Result<Option<ElementRef>, DriverError>> + Send;

    /// Checkbox or radio input inside `row`.
    fn row_selector(
        &self,
        row: &ElementRef,
    ) -> impl Future<Output = Result<Option<ElementRef>, DriverError>> + Send;

    /// Text of the `column`-th (1-based) cell of `row`.
    fn cell_text(
        &self,
        row: &ElementRef,
        column: usize,
    ) -> impl Future<Output = Result<Option<String>, DriverError>> + Send;

    /// Clicks an element.
    fn click(&self, element: &ElementRef) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Clears an input and types `text` into it.
    fn type_text(
        &self,
        element: &ElementRef,
        text: &str,
    ) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Accepts an open `confirm`/`alert` dialog. Returns `false` when none is open.
    fn accept_dialog(&self) -> impl Future<Output = Result<bool, DriverError>> + Send;

    /// Ends the browser session.
    fn close(&self) -> impl Future<Output = Result<(), DriverError>> + Send;
}

/// 테스트용 Mock 드라이버
///
/// 로그인 폼, 3-프레임 레이아웃, `left` 메뉴, `right` 업데이트 표를 가진
/// 최소한의 관리 콘솔을 흉내 냅니다.
#[cfg(test)]
pub struct MockDriver {
    state: std::sync::Mutex<MockState>,
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockState {
    pub url: String,
    pub frame: Option<String>,
    pub password_typed: String,
    pub expected_password: String,
    pub logged_in: bool,
    pub frames: Vec<String>,
    pub submenu_open: bool,
    pub submenu_never_renders: bool,
    pub has_admin_link: bool,
    pub update_page_loaded: bool,
    /// (label, version)
    pub rows: Vec<(String, String)>,
    pub buttons: Vec<String>,
    pub kernel_text: String,
    pub clicks: Vec<String>,
    pub leaves: usize,
    pub dialog_open: bool,
}

#[cfg(test)]
impl MockDriver {
    /// 비밀번호 `secret`을 받는 콘솔을 생성합니다.
    pub fn new() -> Self {
        let state = MockState {
            expected_password: "secret".to_owned(),
            frames: vec!["tophead".to_owned(), "left".to_owned(), "right".to_owned()],
            has_admin_link: true,
            rows: vec![("Virus Pattern".to_owned(), "18.500.00".to_owned())],
            buttons: vec!["Update".to_owned(), "Forced Update".to_owned(), "Rollback".to_owned()],
            kernel_text: "Kernel: 5.14.0-427.24.1.el9_4.x86_64 (build 42)".to_owned(),
            ..Default::default()
        };
        Self {
            state: std::sync::Mutex::new(state),
        }
    }

    /// 상태를 수정합니다.
    pub fn with(self, f: impl FnOnce(&mut MockState)) -> Self {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
        self
    }

    /// 상태를 읽습니다.
    pub fn inspect<T>(&self, f: impl FnOnce(&MockState) -> T) -> T {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&state)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
impl FrameDriver for MockDriver {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        let mut s = self.lock();
        s.url = url.to_owned();
        s.frame = None;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.lock().url.clone())
    }

    async fn frame_names(&self) -> Result<Vec<String>, DriverError> {
        let s = self.lock();
        Ok(if s.logged_in && s.frame.is_none() {
            s.frames.clone()
        } else {
            Vec::new()
        })
    }

    async fn enter_frame(&self, name: &str) -> Result<(), DriverError> {
        let mut s = self.lock();
        if !s.logged_in || s.frame.is_some() || !s.frames.iter().any(|f| f == name) {
            return Err(DriverError::NoSuchFrame(name.to_owned()));
        }
        s.frame = Some(name.to_owned());
        Ok(())
    }

    async fn leave_frame(&self) -> Result<(), DriverError> {
        let mut s = self.lock();
        s.frame = None;
        s.leaves += 1;
        Ok(())
    }

    async fn page_text(&self) -> Result<String, DriverError> {
        let s = self.lock();
        Ok(match s.frame.as_deref() {
            Some("left") => {
                let mut text = String::from("Summary\n");
                if s.has_admin_link {
                    text.push_str("Administration\n");
                }
                if s.submenu_open {
                    text.push_str("System Updates\n");
                }
                text
            }
            Some("right") if s.update_page_loaded => {
                let mut text = format!("{}\nComponent Current Version\n", s.kernel_text);
                for (label, version) in &s.rows {
                    text.push_str(&format!("{label} {version}\n"));
                }
                text
            }
            Some("right") => "Welcome".to_owned(),
            _ => String::new(),
        })
    }

    async fn find_by_text(&self, text: &str) -> Result<Option<ElementRef>, DriverError> {
        let s = self.lock();
        Ok(match s.frame.as_deref() {
            Some("left") if s.has_admin_link && text == "Administration" => {
                Some(ElementRef::new("link:admin"))
            }
            Some("right") if s.update_page_loaded && s.buttons.iter().any(|b| b == text) => {
                Some(ElementRef::new(format!("btn:{text}")))
            }
            _ => None,
        })
    }

    async fn find_by_partial_text_ci(&self, text: &str) -> Result<Option<ElementRef>, DriverError> {
        let s = self.lock();
        let matches = "system updates".contains(&text.to_lowercase());
        Ok((s.frame.as_deref() == Some("left") && s.submenu_open && matches)
            .then(|| ElementRef::new("link:updates")))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ElementRef>, DriverError> {
        let s = self.lock();
        let on_login = !s.logged_in && s.frame.is_none() && s.url.ends_with("/login.jsp");
        Ok((on_login && ["userid", "password", "submit"].contains(&name))
            .then(|| ElementRef::new(format!("field:{name}"))))
    }

    async fn find_row(&self, label: &str) -> Result<Option<ElementRef>, DriverError> {
        let s = self.lock();
        Ok((s.frame.as_deref() == Some("right")
            && s.update_page_loaded
            && s.rows.iter().any(|(l, _)| l == label))
        .then(|| ElementRef::new(format!("row:{label}"))))
    }

    async fn row_selector(&self, row: &ElementRef) -> Result<Option<ElementRef>, DriverError> {
        Ok(row
            .id()
            .strip_prefix("row:")
            .map(|label| ElementRef::new(format!("select:{label}"))))
    }

    async fn cell_text(
        &self,
        row: &ElementRef,
        column: usize,
    ) -> Result<Option<String>, DriverError> {
        let s = self.lock();
        let Some(label) = row.id().strip_prefix("row:") else {
            return Ok(None);
        };
        Ok(match column {
            1 => Some(label.to_owned()),
            3 => s
                .rows
                .iter()
                .find(|(l, _)| l == label)
                .map(|(_, v)| v.clone()),
            _ => None,
        })
    }

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        let mut s = self.lock();
        s.clicks.push(element.id().to_owned());
        match element.id() {
            "field:submit" => {
                s.logged_in = s.password_typed == s.expected_password;
                if s.logged_in {
                    s.url = s.url.replace("/login.jsp", "/index.jsp");
                }
            }
            "link:admin" => s.submenu_open = !s.submenu_never_renders,
            "link:updates" => s.update_page_loaded = true,
            id if id.starts_with("btn:") => s.dialog_open = true,
            _ => {}
        }
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        if element.id() == "field:password" {
            self.lock().password_typed = text.to_owned();
        }
        Ok(())
    }

    async fn accept_dialog(&self) -> Result<bool, DriverError> {
        let mut s = self.lock();
        Ok(std::mem::take(&mut s.dialog_open))
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}
