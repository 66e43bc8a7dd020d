//! 검증 엔진 -- 세 채널 검사
//!
//! [`Verifier`]는 UI, Backend, Log 채널을 각각 독립적으로 검사합니다.
//! 채널 검사는 에러를 던지지 않습니다. 관찰한 값이 기대와 다르면 `Failed`,
//! 원격 세션이 없거나 원격 명령이 끝나지 못해 관찰 자체를 못 했으면
//! `Skipped`가 됩니다. 후자의 사유는 [`INCOMPLETE_REASON`]으로 시작합니다.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use vigil_core::catalog::{ComponentCatalog, ComponentDescriptor};
use vigil_core::types::{Channel, ServiceState};
use vigil_inspector::{InspectorError, InspectorSession, RemoteShell};
use vigil_navigator::{FrameDriver, UiNavigator};

use crate::config::VerifierConfig;
use crate::error::VerifierError;
use crate::kernel::KernelVersion;
use crate::log_window::{
    LogClassifier, LogVerdict, LogWindow, WindowStart, parse_lines, version_changes,
};
use crate::result::{VerificationResult, VerificationSummary};

/// 원격 명령이 끝나지 못한 채널의 사유 접두어
pub const INCOMPLETE_REASON: &str = "remote command did not complete";

/// 채널 검사 중단 사유
#[derive(Debug)]
enum CheckFailure {
    /// 관찰한 값이 기대와 다름
    Mismatch(String),
    /// 원격 명령이 끝나지 못해 관찰하지 못함
    Incomplete(String),
}

impl CheckFailure {
    fn remote(context: &str, err: &InspectorError) -> Self {
        if err.is_incomplete() {
            Self::Incomplete(format!("{INCOMPLETE_REASON}: {context}: {err}"))
        } else {
            Self::Mismatch(format!("{context}: {err}"))
        }
    }

    fn into_result(self, channel: Channel) -> VerificationResult {
        match self {
            Self::Mismatch(reason) => VerificationResult::failed(channel, reason),
            Self::Incomplete(reason) => VerificationResult::skipped(channel, reason),
        }
    }
}

/// 원격 채널 접근 상태
pub enum RemoteChannel<'a, S: RemoteShell> {
    /// 연결된 세션
    Session(&'a InspectorSession<S>),
    /// 세션 없음 (사유)
    Unavailable(&'a str),
}

impl<S: RemoteShell> Clone for RemoteChannel<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: RemoteShell> Copy for RemoteChannel<'_, S> {}

impl<'a, S: RemoteShell> RemoteChannel<'a, S> {
    /// `Option`에서 변환합니다.
    pub fn from_option(session: Option<&'a InspectorSession<S>>, reason: &'a str) -> Self {
        match session {
            Some(s) => Self::Session(s),
            None => Self::Unavailable(reason),
        }
    }
}

/// 검증 엔진
pub struct Verifier {
    config: VerifierConfig,
    catalog: Arc<ComponentCatalog>,
}

impl Verifier {
    /// 새 검증 엔진을 생성합니다.
    pub fn new(config: VerifierConfig, catalog: Arc<ComponentCatalog>) -> Result<Self, VerifierError> {
        config.validate()?;
        Ok(Self { config, catalog })
    }

    /// 설정
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    fn descriptor(&self, component_id: &str) -> Result<&ComponentDescriptor, String> {
        self.catalog.get(component_id).map_err(|e| e.to_string())
    }

    /// UI 채널: 표시 버전과 기대 버전의 정확한 일치
    pub async fn check_ui<D: FrameDriver>(
        &self,
        navigator: &UiNavigator<D>,
        component_id: &str,
        expected: &str,
    ) -> VerificationResult {
        let expected_value = Some(expected.to_owned());
        let label = match self.descriptor(component_id) {
            Ok(d) => d.ui_label.clone(),
            Err(reason) => return VerificationResult::failed(Channel::Ui, reason),
        };
        let evidence = vec![format!(
            "row '{label}' column {}",
            navigator.config().version_column
        )];

        let result = match navigator.read_displayed_version(component_id).await {
            Ok(Some(shown)) if shown == expected => VerificationResult::passed(Channel::Ui)
                .with_values(Some(shown), expected_value),
            Ok(Some(shown)) => VerificationResult::failed(
                Channel::Ui,
                format!("displayed version '{shown}' differs from expected '{expected}'"),
            )
            .with_values(Some(shown), expected_value),
            Ok(None) => VerificationResult::failed(Channel::Ui, "no version displayed for component")
                .with_values(None, expected_value),
            Err(e) => VerificationResult::failed(Channel::Ui, format!("ui read failed: {e}"))
                .with_values(None, expected_value),
        };
        debug!(component_id, passed = result.is_passed(), "ui channel checked");
        result.with_evidence(evidence)
    }

    /// Backend 채널: 버전 키, 락 파일 부재, (필요 시) 서비스 상태
    pub async fn check_backend<S: RemoteShell>(
        &self,
        session: &InspectorSession<S>,
        component_id: &str,
        expected: &str,
    ) -> VerificationResult {
        let descriptor = match self.descriptor(component_id) {
            Ok(d) => d,
            Err(reason) => return VerificationResult::failed(Channel::Backend, reason),
        };

        let mut actual = None;
        let mut evidence = Vec::new();
        let outcome = self
            .backend_checks(session, descriptor, expected, &mut actual, &mut evidence)
            .await;
        debug!(component_id, passed = outcome.is_ok(), "backend channel checked");
        conclude(
            Channel::Backend,
            outcome,
            actual,
            Some(expected.to_owned()),
            evidence,
        )
    }

    async fn backend_checks<S: RemoteShell>(
        &self,
        session: &InspectorSession<S>,
        descriptor: &ComponentDescriptor,
        expected: &str,
        actual: &mut Option<String>,
        evidence: &mut Vec<String>,
    ) -> Result<(), CheckFailure> {
        let store = session
            .read_config_store()
            .await
            .map_err(|e| CheckFailure::remote("config store unreadable", &e))?;

        let key = &descriptor.version_store_key;
        *actual = store.get(key).map(str::to_owned);
        evidence.push(format!("{key}={}", actual.as_deref().unwrap_or("<absent>")));
        if let Some(updated_at) = store.get(&descriptor.version_timestamp_key) {
            evidence.push(format!(
                "{}={updated_at}",
                descriptor.version_timestamp_key
            ));
        }
        if actual.as_deref() != Some(expected) {
            return Err(CheckFailure::Mismatch(format!(
                "{key} is {} but expected '{expected}'",
                actual
                    .as_deref()
                    .map_or_else(|| "absent".to_owned(), |v| format!("'{v}'"))
            )));
        }

        if self.config.check_lock_artifact {
            let present = session
                .lock_file_exists(&descriptor.id)
                .await
                .map_err(|e| CheckFailure::remote("lock check failed", &e))?;
            if present {
                return Err(CheckFailure::Mismatch(format!(
                    "lock artifact still present: {}",
                    descriptor.lock_file
                )));
            }
            evidence.push(format!("lock artifact absent: {}", descriptor.lock_file));
        }

        if descriptor.requires_service_restart && self.config.check_service {
            let state = session
                .service_status(&descriptor.service)
                .await
                .map_err(|e| CheckFailure::remote("service check failed", &e))?;
            evidence.push(format!("service {}: {state}", descriptor.service));
            if state != ServiceState::Running {
                return Err(CheckFailure::Mismatch(format!(
                    "service {} is {state}",
                    descriptor.service
                )));
            }
        }

        Ok(())
    }

    /// Log 채널: `[window_start, 현재]` 창에서 성공 마커 확인
    ///
    /// 창의 끝은 시작과 같은 시계로 읽습니다. 시작이 호스트 시각이면 끝도
    /// 호스트 UTC 현재 시각이고, 증거에 그 사실을 남깁니다.
    pub async fn check_log<S: RemoteShell>(
        &self,
        session: &InspectorSession<S>,
        component_id: &str,
        window_start: WindowStart,
    ) -> VerificationResult {
        let expected_value = Some("success marker, no error marker".to_owned());
        let descriptor = match self.descriptor(component_id) {
            Ok(d) => d,
            Err(reason) => return VerificationResult::failed(Channel::Log, reason),
        };
        let classifier = match LogClassifier::for_component(descriptor, &self.config.error_pattern) {
            Ok(c) => c,
            Err(e) => {
                return VerificationResult::failed(Channel::Log, format!("invalid log pattern: {e}"));
            }
        };

        let raw = match session.tail_update_log().await {
            Ok(lines) => lines,
            Err(e) => {
                return CheckFailure::remote("update log unreadable", &e)
                    .into_result(Channel::Log)
                    .with_values(None, expected_value);
            }
        };
        let end = match window_start {
            WindowStart::Host(_) => Utc::now().naive_utc(),
            WindowStart::Remote(_) => match session.remote_now().await {
                Ok(now) => now,
                Err(e) => {
                    return CheckFailure::remote("remote clock unreadable", &e)
                        .into_result(Channel::Log)
                        .with_values(None, expected_value);
                }
            },
        };
        let start = window_start.at();

        let window = LogWindow::cut(parse_lines(&raw), start, end);
        let verdict = classifier.evaluate(&window);
        let actual = Some(verdict.label().to_owned());

        let mut evidence = Vec::new();
        if window_start.is_host() {
            evidence.push(format!(
                "appliance clock unreadable at start; window uses host UTC from {start}"
            ));
        }
        if !window.anchored {
            evidence.push("log lines carry no timestamps; whole tail evaluated".to_owned());
        }
        match &verdict {
            LogVerdict::Confirmed { success } => {
                evidence.extend(success.iter().cloned());
                evidence.extend(
                    version_changes(&window)
                        .into_iter()
                        .map(|c| format!("version changed {} -> {}", c.from, c.to)),
                );
            }
            _ => evidence.extend(window.texts()),
        }

        info!(
            component_id,
            verdict = verdict.label(),
            window_lines = window.lines.len(),
            "log channel checked"
        );
        match verdict.reason() {
            None => VerificationResult::passed(Channel::Log),
            Some(reason) => VerificationResult::failed(Channel::Log, reason),
        }
        .with_values(actual, expected_value)
        .with_evidence(evidence)
    }

    /// 작업 전 기준 버전 확인 (판정에 영향 없음)
    pub async fn baseline<S: RemoteShell>(
        &self,
        session: &InspectorSession<S>,
        component_id: &str,
        expected_before: &str,
    ) -> VerificationResult {
        let key = match self.descriptor(component_id) {
            Ok(d) => d.version_store_key.clone(),
            Err(reason) => return VerificationResult::failed(Channel::Backend, reason),
        };
        let expected = Some(expected_before.to_owned());
        match session.read_version_key(&key).await {
            Ok(actual) if actual.as_deref() == Some(expected_before) => {
                VerificationResult::passed(Channel::Backend).with_values(actual, expected)
            }
            Ok(actual) => {
                warn!(component_id, ?actual, expected_before, "baseline version differs");
                VerificationResult::failed(Channel::Backend, "baseline version differs")
                    .with_values(actual, expected)
            }
            Err(e) => VerificationResult::failed(Channel::Backend, format!("baseline unreadable: {e}"))
                .with_values(None, expected),
        }
        .with_evidence([format!("baseline key {key}")])
    }

    /// 세 채널을 모두 검사합니다.
    pub async fn verify_all<D: FrameDriver, S: RemoteShell>(
        &self,
        navigator: &UiNavigator<D>,
        remote: RemoteChannel<'_, S>,
        component_id: &str,
        expected_after: &str,
        window_start: WindowStart,
    ) -> VerificationSummary {
        let mut summary = VerificationSummary::default();
        summary.push(self.check_ui(navigator, component_id, expected_after).await);

        match remote {
            RemoteChannel::Session(session) => {
                summary.push(self.check_backend(session, component_id, expected_after).await);
                summary.push(self.check_log(session, component_id, window_start).await);
            }
            RemoteChannel::Unavailable(reason) => {
                warn!(component_id, reason, "remote channels skipped");
                for channel in Channel::ALL.into_iter().filter(|c| c.requires_remote()) {
                    summary.push(VerificationResult::skipped(channel, reason));
                }
            }
        }
        summary
    }

    /// UI에 표시된 커널 버전을 문법으로 검사하고 `uname -r`과 대조합니다.
    pub async fn check_kernel<D: FrameDriver, S: RemoteShell>(
        &self,
        navigator: &UiNavigator<D>,
        remote: RemoteChannel<'_, S>,
    ) -> VerificationSummary {
        let mut summary = VerificationSummary::default();

        let shown = match navigator.read_kernel_or_system_text().await {
            Ok(text) => {
                let version = KernelVersion::extract(&text);
                let evidence: Vec<String> = text
                    .lines()
                    .filter(|l| l.to_lowercase().contains("kernel"))
                    .map(|l| l.trim().to_owned())
                    .collect();
                let result = match &version {
                    Some(v) => VerificationResult::passed(Channel::Ui)
                        .with_values(Some(v.to_string()), None),
                    None => VerificationResult::failed(
                        Channel::Ui,
                        "no kernel release matching the expected grammar",
                    ),
                };
                summary.push(result.with_evidence(evidence));
                version
            }
            Err(e) => {
                summary.push(VerificationResult::failed(
                    Channel::Ui,
                    format!("ui read failed: {e}"),
                ));
                None
            }
        };

        let session = match remote {
            RemoteChannel::Session(s) => s,
            RemoteChannel::Unavailable(reason) => {
                summary.push(VerificationResult::skipped(Channel::Backend, reason));
                return summary;
            }
        };

        let expected = shown.as_ref().map(ToString::to_string);
        let result = match session.kernel_release().await {
            Err(e) => VerificationResult::failed(Channel::Backend, format!("uname failed: {e}")),
            Ok(release) => match release.parse::<KernelVersion>() {
                Err(e) => VerificationResult::failed(Channel::Backend, e.to_string())
                    .with_values(Some(release), expected),
                Ok(actual) if shown.as_ref().is_some_and(|s| *s != actual) => {
                    VerificationResult::failed(
                        Channel::Backend,
                        "kernel shown in console differs from uname -r",
                    )
                    .with_values(Some(release), expected)
                }
                Ok(_) => VerificationResult::passed(Channel::Backend)
                    .with_values(Some(release), expected),
            },
        };
        summary.push(result);
        summary
    }
}

fn conclude(
    channel: Channel,
    outcome: Result<(), CheckFailure>,
    actual: Option<String>,
    expected: Option<String>,
    evidence: Vec<String>,
) -> VerificationResult {
    match outcome {
        Ok(()) => VerificationResult::passed(channel),
        Err(failure) => failure.into_result(channel),
    }
    .with_values(actual, expected)
    .with_evidence(evidence)
}
