//! Fake appliance shared by the browser and remote-shell fakes.
//!
//! One [`FakeAppliance`] owns the console state (login, frames, menu,
//! update table) and the backend state (INI store, lock files, update log,
//! service, kernel). [`FakeBrowser`] and [`FakeShell`] are two views over
//! the same state, so a button click in the console creates a lock file the
//! shell can see.
//!
//! The remote clock is derived from tokio's virtual time: tests run with
//! `start_paused = true`, so polling sleeps advance the clock
//! deterministically. A triggered update settles once its plan's
//! `completes_after` has elapsed: the lock file disappears, the INI key and
//! the table row change, and timestamped log lines are appended.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::time::Instant;
use vigil_core::catalog::ComponentCatalog;
use vigil_core::types::{Credentials, UpdateMode};
use vigil_inspector::{CommandOutput, InspectorError, RemoteShell, ShellConnector};
use vigil_navigator::{DriverError, ElementRef, FrameDriver};

pub const CONFIG_STORE_PATH: &str = "/etc/iscan/intscan.ini";
pub const UPDATE_LOG_PATH: &str = "/var/log/iwss/update.log";
pub const CONSOLE_PASSWORD: &str = "admin-secret";
pub const KERNEL_RELEASE: &str = "5.14.0-427.24.1.el9_4.x86_64";

const FRAMES: [&str; 3] = ["tophead", "left", "right"];
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How a triggered operation ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum PlanOutcome {
    /// Version changes, success line logged.
    Success,
    /// Version changes but the log reports an error.
    LogError,
    /// The lock file never goes away.
    NeverCompletes,
}

/// Scripted behavior for one component.
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub target_version: String,
    pub completes_after: Duration,
    pub outcome: PlanOutcome,
}

#[derive(Debug, Clone)]
struct ComponentInfo {
    id: String,
    label: String,
    version_key: String,
    lock_file: String,
    log_tag: String,
}

#[derive(Debug)]
struct Pending {
    component_id: String,
    mode: UpdateMode,
    triggered_at: Duration,
    plan: UpdatePlan,
}

/// Observable state of the fake appliance.
#[derive(Debug)]
pub struct ApplianceState {
    base_time: NaiveDateTime,
    epoch: Instant,
    components: Vec<ComponentInfo>,

    // console
    pub frame: Option<String>,
    pub logged_in: bool,
    typed_password: String,
    pub submenu_open: bool,
    pub page_loaded: bool,
    pub selected: Option<String>,
    dialog_open: bool,
    /// ui label -> displayed version
    pub rows: BTreeMap<String, String>,
    pub clicks: Vec<String>,
    pub browser_closed: bool,

    // backend
    pub ini: BTreeMap<String, String>,
    pub locks: HashSet<String>,
    pub log: Vec<String>,
    pub service_state: String,
    pub connect_error: Option<String>,
    /// `date` fails while set
    pub clock_unreadable: bool,
    pub commands: Vec<String>,
    pub shell_closed: bool,

    plans: HashMap<String, UpdatePlan>,
    pending: Option<Pending>,
    pub triggered: Vec<(String, UpdateMode)>,
}

impl ApplianceState {
    fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn now(&self) -> NaiveDateTime {
        self.at(self.elapsed())
    }

    fn at(&self, offset: Duration) -> NaiveDateTime {
        let offset = chrono::Duration::from_std(offset).unwrap_or_else(|_| chrono::Duration::zero());
        self.base_time + offset
    }

    fn component_by_id(&self, id: &str) -> Option<&ComponentInfo> {
        self.components.iter().find(|c| c.id == id)
    }

    fn component_by_label(&self, label: &str) -> Option<&ComponentInfo> {
        self.components.iter().find(|c| c.label == label)
    }

    /// Appends a log line stamped with the current remote time.
    pub fn log_now(&mut self, message: &str) {
        let line = format!("{} {message}", self.now().format(TIME_FORMAT));
        self.log.push(line);
    }

    fn trigger(&mut self, button: &str) {
        let Some(label) = self.selected.clone() else {
            return;
        };
        let mode = match button {
            "Update" => UpdateMode::Normal,
            "Forced Update" => UpdateMode::Forced,
            "Rollback" => UpdateMode::Rollback,
            _ => return,
        };
        let Some(info) = self.component_by_label(&label).cloned() else {
            return;
        };
        self.triggered.push((info.id.clone(), mode));
        self.dialog_open = true;

        let Some(plan) = self.plans.get(&info.id).cloned() else {
            return;
        };
        self.locks.insert(info.lock_file.clone());
        self.log_now(&format!("[INFO] {} {mode} requested from console", info.log_tag));
        self.pending = Some(Pending {
            component_id: info.id,
            mode,
            triggered_at: self.elapsed(),
            plan,
        });
    }

    /// Applies a pending operation whose completion time has passed.
    fn settle(&mut self) {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|p| p.plan.outcome != PlanOutcome::NeverCompletes
                && self.elapsed() >= p.triggered_at + p.plan.completes_after);
        if !due {
            return;
        }
        let Some(pending) = self.pending.take() else {
            return;
        };
        let Some(info) = self.component_by_id(&pending.component_id).cloned() else {
            return;
        };
        let stamp = self
            .at(pending.triggered_at + pending.plan.completes_after)
            .format(TIME_FORMAT)
            .to_string();
        let target = pending.plan.target_version.clone();
        let previous = self
            .ini
            .insert(info.version_key.clone(), target.clone())
            .unwrap_or_default();
        self.rows.insert(info.label.clone(), target.clone());
        self.locks.remove(&info.lock_file);

        self.log.push(format!(
            "{stamp} [INFO] Version changed from {previous} to {target} for component: {}",
            info.id
        ));
        match pending.plan.outcome {
            PlanOutcome::Success => self.log.push(format!(
                "{stamp} [INFO] Update completed successfully for component: {}",
                info.id
            )),
            PlanOutcome::LogError => self.log.push(format!(
                "{stamp} [ERROR] {} {} failed: checksum mismatch",
                info.log_tag, pending.mode
            )),
            PlanOutcome::NeverCompletes => {}
        }
    }

    fn render_ini(&self) -> String {
        let mut out = String::from("[Update]\n");
        for (key, value) in &self.ini {
            out.push_str(&format!("{key}={value}\n"));
        }
        out
    }

    fn right_text(&self) -> String {
        let mut text = String::new();
        if self.page_loaded {
            text.push_str("Component Current Version Last Updated\n");
            for (label, version) in &self.rows {
                text.push_str(&format!("{label} {version}\n"));
            }
        } else {
            text.push_str("Welcome to the management console\n");
        }
        text.push_str(&format!("Kernel: {KERNEL_RELEASE} (build 42)\n"));
        text
    }
}

/// Handle to the shared fake appliance.
#[derive(Clone)]
pub struct FakeAppliance {
    state: Arc<Mutex<ApplianceState>>,
}

#[allow(dead_code)]
impl FakeAppliance {
    /// Builds an appliance mirroring every catalog component.
    ///
    /// Every component starts at version `1.0.0`; tests override the ones
    /// they exercise. Must be called inside a tokio runtime.
    pub fn new(catalog: &ComponentCatalog) -> Self {
        let components: Vec<ComponentInfo> = catalog
            .all()
            .iter()
            .map(|d| ComponentInfo {
                id: d.id.clone(),
                label: d.ui_label.clone(),
                version_key: d.version_store_key.clone(),
                lock_file: d.lock_file.clone(),
                log_tag: d.log_tag.clone(),
            })
            .collect();
        let rows = components
            .iter()
            .map(|c| (c.label.clone(), "1.0.0".to_owned()))
            .collect();
        let ini = components
            .iter()
            .map(|c| (c.version_key.clone(), "1.0.0".to_owned()))
            .collect();

        let state = ApplianceState {
            base_time: NaiveDateTime::parse_from_str("2026-03-01 10:00:00", TIME_FORMAT)
                .unwrap_or_default(),
            epoch: Instant::now(),
            components,
            frame: None,
            logged_in: false,
            typed_password: String::new(),
            submenu_open: false,
            page_loaded: false,
            selected: None,
            dialog_open: false,
            rows,
            clicks: Vec::new(),
            browser_closed: false,
            ini,
            locks: HashSet::new(),
            log: vec![
                "2026-03-01 09:00:00 [INFO] iwss started".to_owned(),
                "2026-03-01 09:30:00 [ERROR] PTN update failed: server unreachable".to_owned(),
            ],
            service_state: "active".to_owned(),
            connect_error: None,
            clock_unreadable: false,
            commands: Vec::new(),
            shell_closed: false,
            plans: HashMap::new(),
            pending: None,
            triggered: Vec::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ApplianceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sets the version shown in the table and stored in the INI file.
    pub fn set_version(&self, component_id: &str, version: &str) -> &Self {
        let mut state = self.lock();
        if let Some(info) = state.component_by_id(component_id).cloned() {
            state.rows.insert(info.label, version.to_owned());
            state.ini.insert(info.version_key, version.to_owned());
        }
        drop(state);
        self
    }

    /// Scripts what happens when the component is triggered.
    pub fn plan(&self, component_id: &str, plan: UpdatePlan) -> &Self {
        self.lock().plans.insert(component_id.to_owned(), plan);
        self
    }

    /// Shortcut for a successful plan.
    pub fn plan_success(&self, component_id: &str, target: &str, after_secs: u64) -> &Self {
        self.plan(
            component_id,
            UpdatePlan {
                target_version: target.to_owned(),
                completes_after: Duration::from_secs(after_secs),
                outcome: PlanOutcome::Success,
            },
        )
    }

    /// Removes a component's row from the update table.
    pub fn remove_row(&self, component_id: &str) -> &Self {
        let mut state = self.lock();
        if let Some(info) = state.component_by_id(component_id).cloned() {
            state.rows.remove(&info.label);
        }
        drop(state);
        self
    }

    /// Makes every shell connection attempt fail.
    pub fn refuse_connections(&self, reason: &str) -> &Self {
        self.lock().connect_error = Some(reason.to_owned());
        self
    }

    /// Leaves a stale lock file behind.
    pub fn add_lock(&self, component_id: &str) -> &Self {
        let mut state = self.lock();
        if let Some(info) = state.component_by_id(component_id).cloned() {
            state.locks.insert(info.lock_file);
        }
        drop(state);
        self
    }

    pub fn inspect<T>(&self, f: impl FnOnce(&ApplianceState) -> T) -> T {
        f(&self.lock())
    }

    pub fn with(&self, f: impl FnOnce(&mut ApplianceState)) {
        f(&mut self.lock());
    }

    pub fn browser(&self) -> FakeBrowser {
        FakeBrowser {
            appliance: self.clone(),
        }
    }

    pub fn connector(&self) -> FakeConnector {
        FakeConnector {
            appliance: self.clone(),
        }
    }

    pub fn shell(&self) -> FakeShell {
        FakeShell {
            appliance: self.clone(),
        }
    }

    pub fn console_credentials() -> Credentials {
        Credentials::new("admin", CONSOLE_PASSWORD)
    }
}

// ---------------------------------------------------------------------------
// Browser view
// ---------------------------------------------------------------------------

/// Console view of the fake appliance.
pub struct FakeBrowser {
    appliance: FakeAppliance,
}

impl FrameDriver for FakeBrowser {
    async fn goto(&self, _url: &str) -> Result<(), DriverError> {
        let mut state = self.appliance.lock();
        state.frame = None;
        state.submenu_open = false;
        state.page_loaded = false;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let state = self.appliance.lock();
        Ok(if state.logged_in {
            "https://appliance.test:8443/index.jsp".to_owned()
        } else {
            "https://appliance.test:8443/login.jsp".to_owned()
        })
    }

    async fn frame_names(&self) -> Result<Vec<String>, DriverError> {
        let state = self.appliance.lock();
        if state.logged_in && state.frame.is_none() {
            Ok(FRAMES.iter().map(|f| (*f).to_owned()).collect())
        } else {
            Ok(Vec::new())
        }
    }

    async fn enter_frame(&self, name: &str) -> Result<(), DriverError> {
        let mut state = self.appliance.lock();
        if state.logged_in && state.frame.is_none() && FRAMES.contains(&name) {
            state.frame = Some(name.to_owned());
            Ok(())
        } else {
            Err(DriverError::NoSuchFrame(name.to_owned()))
        }
    }

    async fn leave_frame(&self) -> Result<(), DriverError> {
        self.appliance.lock().frame = None;
        Ok(())
    }

    async fn page_text(&self) -> Result<String, DriverError> {
        let mut state = self.appliance.lock();
        state.settle();
        Ok(match state.frame.as_deref() {
            Some("left") => {
                let mut text = String::from("Summary\nAdministration\n");
                if state.submenu_open {
                    text.push_str("System Updates\n");
                }
                text
            }
            Some("right") => state.right_text(),
            Some(_) => "Logged in as admin".to_owned(),
            None => String::new(),
        })
    }

    async fn find_by_text(&self, text: &str) -> Result<Option<ElementRef>, DriverError> {
        let state = self.appliance.lock();
        let found = match state.frame.as_deref() {
            Some("left") if text == "Administration" => Some("link:admin".to_owned()),
            Some("right")
                if state.page_loaded && ["Update", "Forced Update", "Rollback"].contains(&text) =>
            {
                Some(format!("btn:{text}"))
            }
            _ => None,
        };
        Ok(found.map(ElementRef::new))
    }

    async fn find_by_partial_text_ci(&self, text: &str) -> Result<Option<ElementRef>, DriverError> {
        let state = self.appliance.lock();
        let visible = state.frame.as_deref() == Some("left") && state.submenu_open;
        Ok((visible && "system updates".contains(&text.to_lowercase()))
            .then(|| ElementRef::new("link:updates")))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ElementRef>, DriverError> {
        let state = self.appliance.lock();
        let on_login_page = state.frame.is_none() && !state.logged_in;
        Ok((on_login_page && ["userid", "password", "submit"].contains(&name))
            .then(|| ElementRef::new(format!("field:{name}"))))
    }

    async fn find_row(&self, label: &str) -> Result<Option<ElementRef>, DriverError> {
        let mut state = self.appliance.lock();
        state.settle();
        let visible = state.frame.as_deref() == Some("right") && state.page_loaded;
        Ok((visible && state.rows.contains_key(label))
            .then(|| ElementRef::new(format!("row:{label}"))))
    }

    async fn row_selector(&self, row: &ElementRef) -> Result<Option<ElementRef>, DriverError> {
        Ok(row
            .id()
            .strip_prefix("row:")
            .map(|label| ElementRef::new(format!("select:{label}"))))
    }

    async fn cell_text(&self, row: &ElementRef, column: usize) -> Result<Option<String>, DriverError> {
        let state = self.appliance.lock();
        let Some(label) = row.id().strip_prefix("row:") else {
            return Ok(None);
        };
        Ok(match column {
            1 => Some(label.to_owned()),
            3 => state.rows.get(label).cloned(),
            _ => None,
        })
    }

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        let mut state = self.appliance.lock();
        state.clicks.push(element.id().to_owned());
        let id = element.id();
        if id == "field:submit" {
            state.logged_in = state.typed_password == CONSOLE_PASSWORD;
        } else if id == "link:admin" {
            state.submenu_open = true;
        } else if id == "link:updates" {
            state.page_loaded = true;
        } else if let Some(label) = id.strip_prefix("select:") {
            state.selected = Some(label.to_owned());
        } else if let Some(button) = id.strip_prefix("btn:") {
            let button = button.to_owned();
            state.trigger(&button);
        }
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        if element.id() == "field:password" {
            self.appliance.lock().typed_password = text.to_owned();
        }
        Ok(())
    }

    async fn accept_dialog(&self) -> Result<bool, DriverError> {
        let mut state = self.appliance.lock();
        Ok(std::mem::take(&mut state.dialog_open))
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.appliance.lock().browser_closed = true;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Remote shell view
// ---------------------------------------------------------------------------

/// Opens [`FakeShell`]s, or fails when the appliance refuses connections.
pub struct FakeConnector {
    appliance: FakeAppliance,
}

impl ShellConnector for FakeConnector {
    type Shell = FakeShell;

    async fn connect(&self, _credentials: &Credentials) -> Result<FakeShell, InspectorError> {
        if let Some(reason) = self.appliance.lock().connect_error.clone() {
            return Err(InspectorError::Connection(reason));
        }
        Ok(self.appliance.shell())
    }
}

/// Shell view of the fake appliance.
pub struct FakeShell {
    appliance: FakeAppliance,
}

fn quoted_arg<'a>(command: &'a str, prefix: &str) -> Option<&'a str> {
    command
        .strip_prefix(prefix)
        .map(|rest| rest.trim().trim_matches('\''))
}

impl RemoteShell for FakeShell {
    async fn run(&self, command: &str) -> Result<CommandOutput, InspectorError> {
        let mut state = self.appliance.lock();
        state.commands.push(command.to_owned());
        state.settle();

        if command.starts_with("date ") {
            if state.clock_unreadable {
                return Ok(CommandOutput::failed(1, "date: cannot read system clock"));
            }
            return Ok(CommandOutput::ok(format!("{}\n", state.now().format(TIME_FORMAT))));
        }
        if let Some(path) = quoted_arg(command, "test -e") {
            return Ok(if state.locks.contains(path) {
                CommandOutput::ok("")
            } else {
                CommandOutput::failed(1, "")
            });
        }
        if let Some(path) = quoted_arg(command, "rm -f --") {
            state.locks.remove(path);
            return Ok(CommandOutput::ok(""));
        }
        if let Some(path) = quoted_arg(command, "cat --") {
            return Ok(if path == CONFIG_STORE_PATH {
                CommandOutput::ok(state.render_ini())
            } else {
                CommandOutput::failed(1, format!("cat: {path}: No such file or directory"))
            });
        }
        if let Some(rest) = command.strip_prefix("tail -n ") {
            let count: usize = rest
                .split_whitespace()
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(10);
            let skip = state.log.len().saturating_sub(count);
            let mut out = state.log[skip..].join("\n");
            out.push('\n');
            return Ok(CommandOutput::ok(out));
        }
        if command.starts_with("systemctl is-active") {
            return Ok(CommandOutput::ok(format!("{}\n", state.service_state)));
        }
        if command == "uname -r" {
            return Ok(CommandOutput::ok(format!("{KERNEL_RELEASE}\n")));
        }
        Ok(CommandOutput::failed(127, format!("{command}: command not found")))
    }

    async fn close(&self) -> Result<(), InspectorError> {
        self.appliance.lock().shell_closed = true;
        Ok(())
    }
}
