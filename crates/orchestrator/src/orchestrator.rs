//! 업데이트 오케스트레이터
//!
//! [`UpdateOrchestrator`]는 한 작업을 다음 순서로 진행합니다.
//!
//! ```text
//! 정책 검사 ─► 전역 락 ─► 기준 버전 ─► 선택/트리거 ─► 완료 대기 ─► 3채널 검증 ─► 판정
//!  (Err)        (Err)      (선택)        Triggered      Polling      Verifying    Succeeded/Failed/TimedOut
//! ```
//!
//! 정책 에러(`UnknownComponent`, `RollbackNotSupported`, `UpdateInProgress`)만
//! `Err`로 반환되며 락도 원격도 건드리지 않습니다. 그 이후의 UI/원격 실패는
//! 모두 [`OutcomeReport`]에 typed cause로 기록됩니다.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use vigil_core::catalog::{Category, ComponentCatalog, ComponentDescriptor};
use vigil_core::poll::BoundedPoll;
use vigil_core::types::{Channel, Credentials, UpdateMode};
use vigil_inspector::{InspectorConfig, InspectorSession, RemoteShell, ShellConnector};
use vigil_navigator::{FrameDriver, NavigationError, UiAction, UiNavigator};
use vigil_verifier::{
    RemoteChannel, VerificationResult, VerificationSummary, Verifier, WindowStart,
};

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::lock::{LockHolder, UpdateLock};
use crate::operation::{UpdateOperation, UpdateRequest};
use crate::report::{BatchKind, BatchReport, OutcomeReport};
use crate::state::{FailureCause, OperationState};

/// 원격 세션 상태
///
/// 연결에 실패해도 오케스트레이터는 동작하며, 원격 의존 채널은 skipped가 됩니다.
pub enum RemoteState<S: RemoteShell> {
    Connected(InspectorSession<S>),
    Unavailable(String),
}

impl<S: RemoteShell> RemoteState<S> {
    /// 세션을 엽니다. 실패하면 사유와 함께 `Unavailable`이 됩니다.
    pub async fn connect<C>(
        connector: &C,
        credentials: &Credentials,
        config: InspectorConfig,
        catalog: Arc<ComponentCatalog>,
    ) -> Self
    where
        C: ShellConnector<Shell = S>,
    {
        match InspectorSession::connect(connector, credentials, config, catalog).await {
            Ok(session) => Self::Connected(session),
            Err(e) => {
                warn!(error = %e, "remote session unavailable, backend and log channels will be skipped");
                Self::Unavailable(format!("remote session unavailable: {e}"))
            }
        }
    }

    pub fn session(&self) -> Option<&InspectorSession<S>> {
        match self {
            Self::Connected(session) => Some(session),
            Self::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    /// 검증 엔진에 넘길 채널
    pub fn channel(&self) -> RemoteChannel<'_, S> {
        match self {
            Self::Connected(session) => RemoteChannel::Session(session),
            Self::Unavailable(reason) => RemoteChannel::Unavailable(reason),
        }
    }
}

/// 컴포넌트별 원격 락 파일 상태
#[derive(Debug, Clone, Serialize)]
pub struct LockArtifact {
    pub component_id: String,
    pub lock_file: String,
    /// `None`이면 확인 실패
    pub present: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 락 진단 정보
#[derive(Debug, Clone, Serialize)]
pub struct LockStatus {
    /// 프로세스 내 전역 락 보유자
    pub holder: Option<LockHolder>,
    pub artifacts: Vec<LockArtifact>,
    /// 원격 세션이 없을 때 그 사유
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_unavailable: Option<String>,
}

/// 판정 전까지 모으는 작업 결과
#[derive(Default)]
struct Draft {
    cause: Option<FailureCause>,
    baseline: Option<VerificationResult>,
    verification: VerificationSummary,
    lock_artifact: Option<String>,
}

enum Completion {
    Done,
    TimedOut { lock_artifact: Option<String> },
    CheckFailed(String),
}

/// 업데이트 오케스트레이터
pub struct UpdateOrchestrator<D: FrameDriver, S: RemoteShell> {
    navigator: UiNavigator<D>,
    remote: RemoteState<S>,
    verifier: Verifier,
    catalog: Arc<ComponentCatalog>,
    lock: Arc<UpdateLock>,
    config: OrchestratorConfig,
}

impl<D: FrameDriver, S: RemoteShell> UpdateOrchestrator<D, S> {
    /// 오케스트레이터를 생성합니다. 로그인은 호출자가 미리 마칩니다.
    pub fn new(
        navigator: UiNavigator<D>,
        remote: RemoteState<S>,
        verifier: Verifier,
        catalog: Arc<ComponentCatalog>,
        config: OrchestratorConfig,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;
        Ok(Self {
            navigator,
            remote,
            verifier,
            catalog,
            lock: UpdateLock::new(),
            config,
        })
    }

    /// 외부에서 만든 락을 공유합니다.
    pub fn with_lock(mut self, lock: Arc<UpdateLock>) -> Self {
        self.lock = lock;
        self
    }

    pub fn lock(&self) -> &Arc<UpdateLock> {
        &self.lock
    }

    pub fn navigator(&self) -> &UiNavigator<D> {
        &self.navigator
    }

    pub fn remote(&self) -> &RemoteState<S> {
        &self.remote
    }

    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    /// 일반 업데이트
    pub async fn update(
        &self,
        component_id: &str,
        expected_before: Option<&str>,
        expected_after: &str,
    ) -> Result<OutcomeReport, OrchestratorError> {
        self.run(request(component_id, UpdateMode::Normal, expected_before, expected_after))
            .await
    }

    /// 강제 업데이트
    pub async fn force_update(
        &self,
        component_id: &str,
        expected_before: Option<&str>,
        expected_after: &str,
    ) -> Result<OutcomeReport, OrchestratorError> {
        self.run(request(component_id, UpdateMode::Forced, expected_before, expected_after))
            .await
    }

    /// 롤백
    pub async fn rollback(
        &self,
        component_id: &str,
        expected_before: Option<&str>,
        expected_after: &str,
    ) -> Result<OutcomeReport, OrchestratorError> {
        self.run(request(component_id, UpdateMode::Rollback, expected_before, expected_after))
            .await
    }

    /// 작업 하나를 끝까지 진행합니다.
    ///
    /// # Errors
    ///
    /// - `UnknownComponent`: 카탈로그에 없음
    /// - `RollbackNotSupported`: 락/원격 접근 전에 거부
    /// - `UpdateInProgress`: 다른 작업이 락 보유 중
    pub async fn run(&self, request: UpdateRequest) -> Result<OutcomeReport, OrchestratorError> {
        let descriptor = self.catalog.get(&request.component_id)?;
        if request.mode.is_rollback() && !descriptor.can_rollback {
            warn!(component_id = %descriptor.id, "rollback rejected, component is not rollback-capable");
            return Err(OrchestratorError::RollbackNotSupported(descriptor.id.clone()));
        }

        let timeout_secs = descriptor.timeout_for(request.mode);
        let operation_id = Uuid::new_v4();
        let token = self.lock.try_acquire(LockHolder {
            operation_id,
            component_id: descriptor.id.clone(),
            mode: request.mode,
            since: Utc::now(),
        })?;

        let mut op = UpdateOperation::new(operation_id, &request, timeout_secs);
        op.attach_token(token);
        info!(
            operation_id = %op.id,
            component_id = %op.component_id,
            mode = %op.mode,
            timeout_secs,
            remote = self.remote.is_available(),
            "operation started"
        );

        let mut draft = Draft::default();
        self.drive(&mut op, descriptor, &mut draft).await?;
        op.release_lock();

        Ok(self.finish(op, draft))
    }

    async fn drive(
        &self,
        op: &mut UpdateOperation,
        descriptor: &ComponentDescriptor,
        draft: &mut Draft,
    ) -> Result<(), OrchestratorError> {
        let started = Instant::now();

        if let Some(session) = self.remote.session() {
            match session.remote_now().await {
                Ok(now) => op.remote_started_at = Some(now),
                Err(e) => warn!(component_id = %op.component_id, error = %e, "remote clock unreadable, log window falls back to host clock"),
            }
            if self.config.verify_baseline {
                if let Some(before) = op.expected_before.as_deref() {
                    draft.baseline = Some(self.verifier.baseline(session, &op.component_id, before).await);
                }
            }
        }

        if let Err(e) = self.trigger(&op.component_id, op.mode).await {
            let cause = FailureCause::from(&e);
            error!(component_id = %op.component_id, mode = %op.mode, error = %e, "trigger failed");
            op.advance(OperationState::Failed, Some(cause.to_string()))?;
            draft.cause = Some(cause);
            return Ok(());
        }
        op.advance(OperationState::Triggered, None)?;
        op.advance(OperationState::Polling, None)?;

        let remaining = Duration::from_secs(op.timeout_secs).saturating_sub(started.elapsed());
        match self.await_completion(op, descriptor, remaining).await {
            Completion::Done => {}
            Completion::TimedOut { lock_artifact } => {
                let note = match &lock_artifact {
                    Some(path) => format!("lock artifact still present: {path}"),
                    None => "expected version not shown before deadline".to_owned(),
                };
                warn!(component_id = %op.component_id, timeout_secs = op.timeout_secs, %note, "outcome unknown");
                draft.lock_artifact = lock_artifact;
                op.advance(OperationState::TimedOut, Some(note))?;
                return Ok(());
            }
            Completion::CheckFailed(message) => {
                error!(component_id = %op.component_id, error = %message, "completion check failed");
                op.advance(OperationState::Failed, Some(message.clone()))?;
                draft.cause = Some(FailureCause::CompletionCheck { message });
                return Ok(());
            }
        }

        op.advance(OperationState::Verifying, None)?;
        if self.config.refresh_before_verify {
            if let Err(e) = self.navigator.navigate_to_update_page().await {
                warn!(component_id = %op.component_id, error = %e, "update page refresh failed before verification");
            }
        }
        let summary = self
            .verifier
            .verify_all(
                &self.navigator,
                self.remote.channel(),
                &op.component_id,
                &op.expected_after,
                op.log_window_start(),
            )
            .await;

        match classify(&summary) {
            None => op.advance(OperationState::Succeeded, None)?,
            Some(cause) => {
                op.advance(OperationState::Failed, Some(cause.to_string()))?;
                draft.cause = Some(cause);
            }
        }
        draft.verification = summary;
        Ok(())
    }

    async fn trigger(&self, component_id: &str, mode: UpdateMode) -> Result<(), NavigationError> {
        self.navigator.navigate_to_update_page().await?;
        self.navigator.select_component(component_id).await?;
        self.navigator.trigger_action(UiAction::from(mode)).await
    }

    /// 원격 락 파일 제거를 기다립니다. 원격 세션이 없으면 UI 행을 폴링합니다.
    async fn await_completion(
        &self,
        op: &UpdateOperation,
        descriptor: &ComponentDescriptor,
        remaining: Duration,
    ) -> Completion {
        if let Some(session) = self.remote.session() {
            return match session
                .wait_for_lock_removal(&op.component_id, remaining.as_secs())
                .await
            {
                Ok(outcome) if outcome.is_ready() => Completion::Done,
                Ok(_) => Completion::TimedOut {
                    lock_artifact: Some(descriptor.lock_file.clone()),
                },
                Err(e) => Completion::CheckFailed(format!("lock polling failed: {e}")),
            };
        }

        debug!(component_id = %op.component_id, "no remote session, polling the update table instead");
        let poll = BoundedPoll::new(
            Duration::from_secs(self.config.completion_poll_interval_secs),
            remaining,
        );
        let navigator = &self.navigator;
        let component_id = op.component_id.as_str();
        let expected = op.expected_after.as_str();
        let outcome = poll
            .until(|| async move {
                let shown = match navigator.navigate_to_update_page().await {
                    Ok(()) => navigator.read_displayed_version(component_id).await,
                    Err(e) => Err(e),
                };
                match shown {
                    Ok(Some(version)) if version == expected => Ok(Some(())),
                    Ok(version) => {
                        debug!(component_id, ?version, expected, "expected version not shown yet");
                        Ok(None)
                    }
                    Err(e) => {
                        debug!(component_id, error = %e, "update table unreadable, retrying");
                        Ok::<_, OrchestratorError>(None)
                    }
                }
            })
            .await;

        match outcome {
            Ok(o) if o.is_ready() => Completion::Done,
            Ok(_) => Completion::TimedOut { lock_artifact: None },
            Err(e) => Completion::CheckFailed(e.to_string()),
        }
    }

    fn finish(&self, mut op: UpdateOperation, draft: Draft) -> OutcomeReport {
        let report = OutcomeReport {
            operation_id: op.id,
            component_id: op.component_id.clone(),
            mode: op.mode,
            final_state: op.state,
            cause: draft.cause,
            started_at: op.started_at,
            finished_at: Utc::now(),
            timeout_secs: op.timeout_secs,
            baseline: draft.baseline,
            verification: draft.verification,
            transitions: std::mem::take(&mut op.transitions),
            lock_artifact: draft.lock_artifact,
            remote_available: self.remote.is_available(),
        };

        match report.final_state {
            OperationState::Succeeded => info!(
                operation_id = %report.operation_id,
                component_id = %report.component_id,
                mode = %report.mode,
                "operation succeeded"
            ),
            OperationState::TimedOut => warn!(
                operation_id = %report.operation_id,
                component_id = %report.component_id,
                mode = %report.mode,
                lock_artifact = ?report.lock_artifact,
                "operation timed out"
            ),
            state => error!(
                operation_id = %report.operation_id,
                component_id = %report.component_id,
                mode = %report.mode,
                state = %state,
                cause = ?report.cause,
                "operation did not succeed"
            ),
        }
        report
    }

    /// 아무것도 트리거하지 않고 세 채널만 검사합니다.
    ///
    /// 쓰기가 없으므로 락을 잡지 않습니다. 로그 창은 원격 시각 기준
    /// `lookback_secs`(없으면 설정값)만큼 거슬러 올라갑니다.
    pub async fn verify_only(
        &self,
        component_id: &str,
        expected: &str,
        lookback_secs: Option<u64>,
    ) -> Result<VerificationSummary, OrchestratorError> {
        self.catalog.get(component_id)?;

        if let Err(e) = self.navigator.navigate_to_update_page().await {
            warn!(component_id, error = %e, "update page unreachable, ui check will fail");
        }

        let lookback = lookback_secs.unwrap_or(self.config.verify_lookback_secs);
        let host_start = || WindowStart::Host(window_start(Utc::now().naive_utc(), lookback));
        let window_start = match self.remote.session() {
            Some(session) => match session.remote_now().await {
                Ok(now) => WindowStart::Remote(window_start(now, lookback)),
                Err(e) => {
                    warn!(component_id, error = %e, "remote clock unreadable, log window falls back to host clock");
                    host_start()
                }
            },
            None => host_start(),
        };

        Ok(self
            .verifier
            .verify_all(
                &self.navigator,
                self.remote.channel(),
                component_id,
                expected,
                window_start,
            )
            .await)
    }

    /// 콘솔에 표시된 커널 버전을 검사하고 원격 `uname -r`과 대조합니다.
    pub async fn check_kernel(&self) -> VerificationSummary {
        self.verifier
            .check_kernel(&self.navigator, self.remote.channel())
            .await
    }

    /// 카탈로그 전체를 순서대로 일반 업데이트합니다 (패턴 먼저, 엔진 나중).
    ///
    /// 기대 버전이 없는 컴포넌트는 실행하지 않고 기록만 합니다. 컴포넌트별
    /// 타임아웃/검증 실패는 기록하고 계속하며, 구조적 실패에서만 중단합니다.
    pub async fn update_all(
        &self,
        expectations: &BTreeMap<String, String>,
    ) -> Result<BatchReport, OrchestratorError> {
        for id in expectations.keys() {
            self.catalog.get(id)?;
        }

        let mut order: Vec<&ComponentDescriptor> = self.catalog.all().iter().collect();
        order.sort_by_key(|d| category_rank(d.category));
        let ids: Vec<String> = order.into_iter().map(|d| d.id.clone()).collect();

        info!(components = ids.len(), given = expectations.len(), "update-all started");
        Ok(self
            .fold(BatchKind::UpdateAll, UpdateMode::Normal, &ids, expectations)
            .await)
    }

    /// 지정한 컴포넌트들을 순서대로 롤백합니다.
    ///
    /// 실행 전에 모든 id의 존재와 롤백 가능 여부를 검사합니다.
    pub async fn rollback_batch(
        &self,
        component_ids: &[String],
        expectations: &BTreeMap<String, String>,
    ) -> Result<BatchReport, OrchestratorError> {
        for id in component_ids {
            let descriptor = self.catalog.get(id)?;
            if !descriptor.can_rollback {
                return Err(OrchestratorError::RollbackNotSupported(id.clone()));
            }
        }

        info!(components = component_ids.len(), "rollback batch started");
        Ok(self
            .fold(
                BatchKind::RollbackBatch,
                UpdateMode::Rollback,
                component_ids,
                expectations,
            )
            .await)
    }

    async fn fold(
        &self,
        kind: BatchKind,
        mode: UpdateMode,
        component_ids: &[String],
        expectations: &BTreeMap<String, String>,
    ) -> BatchReport {
        let mut batch = BatchReport::new(kind);

        for id in component_ids {
            if let Some(reason) = &batch.aborted {
                let reason = format!("batch aborted: {reason}");
                batch.not_attempted(id, reason);
                continue;
            }
            let Some(expected) = expectations.get(id) else {
                debug!(component_id = %id, "no expected version, skipping");
                batch.not_attempted(id, "no expected version given");
                continue;
            };

            match self.run(UpdateRequest::new(id.as_str(), mode, expected.as_str())).await {
                Ok(report) => {
                    if let Some(cause) = report.cause.as_ref().filter(|c| c.is_structural()) {
                        error!(component_id = %id, %cause, "structural failure, aborting batch");
                        batch.aborted = Some(format!("{id}: {cause}"));
                    }
                    batch.completed(report);
                }
                Err(e) => {
                    error!(component_id = %id, error = %e, "batch aborted");
                    batch.aborted = Some(format!("{id}: {e}"));
                    batch.not_attempted(id, e.to_string());
                }
            }
        }

        info!(
            kind = ?kind,
            succeeded = batch.succeeded_count(),
            failed = batch.failed_count(),
            timed_out = batch.timed_out_count(),
            not_attempted = batch.not_attempted_count(),
            overall = batch.overall_success(),
            "batch finished"
        );
        batch
    }

    /// 전역 락 보유자와 원격 락 파일 상태를 모읍니다.
    pub async fn lock_status(&self) -> LockStatus {
        let holder = self.lock.holder();
        let Some(session) = self.remote.session() else {
            return LockStatus {
                holder,
                artifacts: Vec::new(),
                remote_unavailable: match &self.remote {
                    RemoteState::Unavailable(reason) => Some(reason.clone()),
                    RemoteState::Connected(_) => None,
                },
            };
        };

        let mut artifacts = Vec::with_capacity(self.catalog.len());
        for descriptor in self.catalog.all() {
            let (present, error) = match session.lock_file_exists(&descriptor.id).await {
                Ok(present) => (Some(present), None),
                Err(e) => (None, Some(e.to_string())),
            };
            artifacts.push(LockArtifact {
                component_id: descriptor.id.clone(),
                lock_file: descriptor.lock_file.clone(),
                present,
                error,
            });
        }
        LockStatus {
            holder,
            artifacts,
            remote_unavailable: None,
        }
    }

    /// 남아 있는 원격 락 파일을 지웁니다 (명시적 복구 작업).
    ///
    /// 같은 컴포넌트의 작업이 진행 중이면 거부합니다.
    pub async fn clear_lock(&self, component_id: &str) -> Result<bool, OrchestratorError> {
        self.catalog.get(component_id)?;
        if let Some(holder) = self.lock.holder().filter(|h| h.component_id == component_id) {
            return Err(OrchestratorError::UpdateInProgress {
                held_by: holder.to_string(),
            });
        }
        let session = match &self.remote {
            RemoteState::Connected(session) => session,
            RemoteState::Unavailable(reason) => {
                return Err(OrchestratorError::RemoteUnavailable(reason.clone()));
            }
        };
        session
            .clear_lock(component_id)
            .await
            .map_err(|e| OrchestratorError::Remote(e.to_string()))
    }

    /// 브라우저와 원격 세션을 모두 닫습니다.
    ///
    /// 하나가 실패해도 나머지는 닫습니다.
    pub async fn shutdown(self) -> Result<(), OrchestratorError> {
        let mut failures = Vec::new();

        if let Err(e) = self.navigator.close().await {
            warn!(error = %e, "browser session close failed");
            failures.push(format!("browser: {e}"));
        }
        if let RemoteState::Connected(session) = self.remote {
            if let Err(e) = session.close().await {
                warn!(error = %e, "remote session close failed");
                failures.push(format!("remote: {e}"));
            }
        }

        if failures.is_empty() {
            info!("orchestrator shut down");
            Ok(())
        } else {
            Err(OrchestratorError::Teardown(failures.join("; ")))
        }
    }
}

fn request(
    component_id: &str,
    mode: UpdateMode,
    expected_before: Option<&str>,
    expected_after: &str,
) -> UpdateRequest {
    let request = UpdateRequest::new(component_id, mode, expected_after);
    match expected_before {
        Some(before) => request.with_expected_before(before),
        None => request,
    }
}

/// 검증 결과를 판정합니다. `None`이면 성공입니다.
///
/// 실패 채널이 있으면 `Verification`, 실패는 없지만 건너뛴 채널이 있으면
/// `Unverified`입니다.
fn classify(summary: &VerificationSummary) -> Option<FailureCause> {
    if summary.fully_passed() {
        return None;
    }
    let failed: Vec<Channel> = summary.failures().map(|r| r.channel).collect();
    if !failed.is_empty() {
        return Some(FailureCause::Verification { channels: failed });
    }
    let skipped: Vec<&VerificationResult> = summary.skipped().collect();
    let reason = skipped
        .first()
        .and_then(|r| r.reason())
        .unwrap_or("no channel attempted")
        .to_owned();
    Some(FailureCause::Unverified {
        skipped: skipped.iter().map(|r| r.channel).collect(),
        reason,
    })
}

fn category_rank(category: Category) -> u8 {
    match category {
        Category::Pattern => 0,
        Category::Engine => 1,
    }
}

fn window_start(now: NaiveDateTime, lookback_secs: u64) -> NaiveDateTime {
    let lookback = ChronoDuration::seconds(i64::try_from(lookback_secs).unwrap_or(i64::MAX));
    now.checked_sub_signed(lookback).unwrap_or(now)
}
