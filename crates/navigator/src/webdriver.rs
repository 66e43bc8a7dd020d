//! W3C WebDriver client.
//!
//! Implements [`FrameDriver`] against a WebDriver server (chromedriver,
//! geckodriver, or a Selenium grid) over its JSON wire protocol. Every
//! lookup is expressed as an XPath query so the same code path serves links,
//! buttons, form fields, and table rows.

use std::time::Duration;

use reqwest::Method;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::config::NavigatorConfig;
use crate::driver::{ElementRef, FrameDriver};
use crate::error::DriverError;

/// W3C web element identifier key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Extra time granted to HTTP requests beyond the page load timeout.
const HTTP_GRACE_SECS: u64 = 30;

/// WebDriver session bound to one browser instance.
pub struct WebDriverClient {
    http: reqwest::Client,
    base: String,
    session_id: String,
}

impl WebDriverClient {
    /// Starts a new browser session on the configured WebDriver server.
    ///
    /// # Errors
    ///
    /// `DriverError::SessionNotCreated` when the server refuses the session,
    /// `DriverError::Transport` when it cannot be reached.
    pub async fn start(config: &NavigatorConfig) -> Result<Self, DriverError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.page_load_timeout_secs + HTTP_GRACE_SECS,
            ))
            .build()
            .map_err(|e| DriverError::Transport(e.to_string()))?;

        let base = config.webdriver_url.trim_end_matches('/').to_owned();
        let response = http
            .post(format!("{base}/session"))
            .json(&capabilities(config))
            .send()
            .await
            .map_err(|e| DriverError::Transport(e.to_string()))?;
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| DriverError::InvalidResponse(e.to_string()))?;
        let value = payload.get("value").cloned().unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(DriverError::SessionNotCreated(
                protocol_error(&value).to_string(),
            ));
        }

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::InvalidResponse("missing sessionId".to_owned()))?
            .to_owned();

        info!(
            webdriver = %base,
            browser = %config.browser_name,
            session = %session_id,
            "browser session started"
        );

        Ok(Self {
            http,
            base,
            session_id,
        })
    }

    /// WebDriver session id.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, DriverError> {
        let url = format!("{}/session/{}{}", self.base, self.session_id, path);
        debug!(%method, path, "webdriver command");

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DriverError::Transport(e.to_string()))?;
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| DriverError::InvalidResponse(e.to_string()))?;
        let value = payload.get("value").cloned().unwrap_or(Value::Null);

        if status.is_success() {
            Ok(value)
        } else {
            Err(protocol_error(&value))
        }
    }

    /// Finds the first match of `xpath`, optionally relative to `scope`.
    async fn find(
        &self,
        scope: Option<&ElementRef>,
        xpath: &str,
    ) -> Result<Option<ElementRef>, DriverError> {
        let path = match scope {
            Some(parent) => format!("/element/{}/element", parent.id()),
            None => "/element".to_owned(),
        };
        let body = json!({ "using": "xpath", "value": xpath });
        match self.command(Method::POST, &path, Some(body)).await {
            Ok(value) => element_from(&value).map(Some),
            Err(err) if is_no_such_element(&err) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn find_all(&self, xpath: &str) -> Result<Vec<ElementRef>, DriverError> {
        let body = json!({ "using": "xpath", "value": xpath });
        let value = self.command(Method::POST, "/elements", Some(body)).await?;
        value
            .as_array()
            .ok_or_else(|| DriverError::InvalidResponse("expected element array".to_owned()))?
            .iter()
            .map(element_from)
            .collect()
    }

    async fn text_of(&self, element: &ElementRef) -> Result<String, DriverError> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element.id()), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_owned())
    }
}

impl FrameDriver for WebDriverClient {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let value = self.command(Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| DriverError::InvalidResponse("url is not a string".to_owned()))
    }

    async fn frame_names(&self) -> Result<Vec<String>, DriverError> {
        let mut names = Vec::new();
        for frame in self.find_all("//frame | //iframe").await? {
            let value = self
                .command(
                    Method::GET,
                    &format!("/element/{}/attribute/name", frame.id()),
                    None,
                )
                .await?;
            if let Some(name) = value.as_str() {
                names.push(name.to_owned());
            }
        }
        Ok(names)
    }

    async fn enter_frame(&self, name: &str) -> Result<(), DriverError> {
        let literal = xpath_literal(name);
        let xpath = format!("//frame[@name={literal}] | //iframe[@name={literal}]");
        let frame = self
            .find(None, &xpath)
            .await?
            .ok_or_else(|| DriverError::NoSuchFrame(name.to_owned()))?;
        self.command(
            Method::POST,
            "/frame",
            Some(json!({ "id": { ELEMENT_KEY: frame.id() } })),
        )
        .await?;
        Ok(())
    }

    async fn leave_frame(&self) -> Result<(), DriverError> {
        self.command(Method::POST, "/frame", Some(json!({ "id": null })))
            .await?;
        Ok(())
    }

    async fn page_text(&self) -> Result<String, DriverError> {
        match self.find(None, "//body").await? {
            Some(body) => self.text_of(&body).await,
            None => Ok(String::new()),
        }
    }

    async fn find_by_text(&self, text: &str) -> Result<Option<ElementRef>, DriverError> {
        let literal = xpath_literal(text);
        let xpath = format!(
            "//a[normalize-space(.)={literal}] \
             | //button[normalize-space(.)={literal}] \
             | //input[(@type='submit' or @type='button') and @value={literal}]"
        );
        self.find(None, &xpath).await
    }

    async fn find_by_partial_text_ci(&self, text: &str) -> Result<Option<ElementRef>, DriverError> {
        let xpath = format!(
            "//a[contains(translate(normalize-space(.), \
             'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), {})]",
            xpath_literal(&text.to_lowercase())
        );
        self.find(None, &xpath).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ElementRef>, DriverError> {
        self.find(None, &format!("//*[@name={}]", xpath_literal(name)))
            .await
    }

    async fn find_row(&self, label: &str) -> Result<Option<ElementRef>, DriverError> {
        self.find(
            None,
            &format!("//tr[td[normalize-space(.)={}]]", xpath_literal(label)),
        )
        .await
    }

    async fn row_selector(&self, row: &ElementRef) -> Result<Option<ElementRef>, DriverError> {
        self.find(
            Some(row),
            ".//input[@type='checkbox' or @type='radio']",
        )
        .await
    }

    async fn cell_text(
        &self,
        row: &ElementRef,
        column: usize,
    ) -> Result<Option<String>, DriverError> {
        match self.find(Some(row), &format!("./td[{column}]")).await? {
            Some(cell) => Ok(Some(self.text_of(&cell).await?.trim().to_owned())),
            None => Ok(None),
        }
    }

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        self.command(
            Method::POST,
            &format!("/element/{}/click", element.id()),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        self.command(
            Method::POST,
            &format!("/element/{}/clear", element.id()),
            Some(json!({})),
        )
        .await?;
        self.command(
            Method::POST,
            &format!("/element/{}/value", element.id()),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn accept_dialog(&self) -> Result<bool, DriverError> {
        match self
            .command(Method::POST, "/alert/accept", Some(json!({})))
            .await
        {
            Ok(_) => Ok(true),
            Err(DriverError::Protocol { error, .. }) if error == "no such alert" => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.command(Method::DELETE, "", None).await?;
        info!(session = %self.session_id, "browser session closed");
        Ok(())
    }
}

/// New-session request body.
fn capabilities(config: &NavigatorConfig) -> Value {
    let mut always = json!({
        "browserName": config.browser_name,
        "acceptInsecureCerts": true,
        "timeouts": { "pageLoad": config.page_load_timeout_secs * 1000 },
    });
    if config.headless {
        let (key, arg) = match config.browser_name.as_str() {
            "firefox" => ("moz:firefoxOptions", "-headless"),
            "MicrosoftEdge" | "msedge" => ("ms:edgeOptions", "--headless=new"),
            _ => ("goog:chromeOptions", "--headless=new"),
        };
        always[key] = json!({ "args": [arg] });
    }
    json!({ "capabilities": { "alwaysMatch": always } })
}

fn element_from(value: &Value) -> Result<ElementRef, DriverError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(ElementRef::new)
        .ok_or_else(|| DriverError::InvalidResponse(format!("not an element reference: {value}")))
}

fn protocol_error(value: &Value) -> DriverError {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };
    DriverError::Protocol {
        error: field("error"),
        message: field("message"),
    }
}

fn is_no_such_element(err: &DriverError) -> bool {
    matches!(err, DriverError::Protocol { error, .. } if error == "no such element")
}

/// Quotes `text` as an XPath 1.0 string literal.
///
/// XPath has no escape sequences, so text containing both quote kinds is
/// assembled with `concat()`.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    let parts: Vec<String> = text
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}
