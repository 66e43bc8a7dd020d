//! 전역 업데이트 락
//!
//! 한 번에 하나의 업데이트/롤백만 진행되도록 보장하는 단일 슬롯 보유자입니다.
//! 획득은 기다리지 않고 즉시 실패하며(`UpdateInProgress`), 해제는
//! [`LockToken`]이 drop될 때 자동으로 일어납니다. 모든 종료 경로에서
//! 해제가 보장됩니다.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;
use vigil_core::types::UpdateMode;

use crate::error::OrchestratorError;

/// 락 보유자 정보 (진단용)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockHolder {
    pub operation_id: Uuid,
    pub component_id: String,
    pub mode: UpdateMode,
    pub since: DateTime<Utc>,
}

impl fmt::Display for LockHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (operation {}, since {})",
            self.mode,
            self.component_id,
            self.operation_id,
            self.since.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

/// 단일 슬롯 업데이트 락
#[derive(Debug, Default)]
pub struct UpdateLock {
    slot: Mutex<Option<LockHolder>>,
}

impl UpdateLock {
    /// 빈 락을 생성합니다.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // 보유자 정보만 담고 있으므로 poison 상태에서도 값을 그대로 쓴다
    fn slot(&self) -> MutexGuard<'_, Option<LockHolder>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 락을 획득합니다. 이미 보유 중이면 즉시 실패합니다.
    pub fn try_acquire(self: &Arc<Self>, holder: LockHolder) -> Result<LockToken, OrchestratorError> {
        let mut slot = self.slot();
        if let Some(current) = slot.as_ref() {
            debug!(held_by = %current, requested = %holder.component_id, "update lock busy");
            return Err(OrchestratorError::UpdateInProgress {
                held_by: current.to_string(),
            });
        }
        info!(
            operation_id = %holder.operation_id,
            component_id = %holder.component_id,
            mode = %holder.mode,
            "update lock acquired"
        );
        let operation_id = holder.operation_id;
        *slot = Some(holder);
        Ok(LockToken {
            lock: Arc::clone(self),
            operation_id,
        })
    }

    /// 현재 보유자
    pub fn holder(&self) -> Option<LockHolder> {
        self.slot().clone()
    }

    /// 보유 중인지 여부
    pub fn is_held(&self) -> bool {
        self.slot().is_some()
    }

    fn release(&self, operation_id: Uuid) {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|h| h.operation_id == operation_id) {
            *slot = None;
            info!(operation_id = %operation_id, "update lock released");
        }
    }
}

/// 락 보유 증표. drop 시 해제됩니다.
#[derive(Debug)]
pub struct LockToken {
    lock: Arc<UpdateLock>,
    operation_id: Uuid,
}

impl LockToken {
    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }
}

impl Drop for LockToken {
    fn drop(&mut self) {
        self.lock.release(self.operation_id);
    }
}
