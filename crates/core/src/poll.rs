//! 제한된 폴링 -- 간격과 마감 시간을 갖는 재시도 프리미티브
//!
//! 서브메뉴 렌더링 대기, 프레임 콘텐츠 대기, 원격 락 파일 제거 대기처럼
//! "조건이 참이 될 때까지 기다리는" 모든 작업은 [`BoundedPoll`]을 사용합니다.
//! 어떤 대기도 무한정 블록하지 않으며, 항상 [`PollOutcome`]으로 끝납니다.
//!
//! # 의미론
//! - 경과 시간이 `timeout` 미만인 동안에만 probe를 호출합니다.
//!   따라서 `timeout == 0`이면 probe를 한 번도 호출하지 않고 `TimedOut`을 반환합니다.
//! - probe 사이의 대기는 `interval`이지만, 남은 시간보다 길게 자지 않습니다.
//! - probe가 에러를 반환하면 즉시 전파합니다.
//!
//! 시간 측정은 `tokio::time::Instant`를 사용하므로 `start_paused` 테스트에서
//! 가상 시간으로 동작합니다.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// 간격과 마감 시간으로 제한된 폴링 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedPoll {
    /// probe 사이 간격
    interval: Duration,
    /// 전체 대기 상한
    timeout: Duration,
}

/// 폴링 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// 조건 충족
    Ready {
        /// probe가 반환한 값
        value: T,
        /// probe 호출 횟수
        attempts: u32,
        /// 경과 시간
        elapsed: Duration,
    },
    /// 마감 시간 초과
    TimedOut {
        /// probe 호출 횟수
        attempts: u32,
        /// 경과 시간
        elapsed: Duration,
    },
}

impl<T> PollOutcome<T> {
    /// 조건이 충족되었는지 여부
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// probe 호출 횟수
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Ready { attempts, .. } | Self::TimedOut { attempts, .. } => *attempts,
        }
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Ready { elapsed, .. } | Self::TimedOut { elapsed, .. } => *elapsed,
        }
    }

    /// 충족된 값을 꺼냅니다.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Ready { value, .. } => Some(value),
            Self::TimedOut { .. } => None,
        }
    }
}

impl BoundedPoll {
    /// 새 폴링 설정을 생성합니다.
    ///
    /// `interval`이 0이면 1ms로 보정하여 busy loop를 방지합니다.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            timeout,
        }
    }

    /// 초 단위 편의 생성자
    pub fn from_secs(interval_secs: u64, timeout_secs: u64) -> Self {
        Self::new(
            Duration::from_secs(interval_secs),
            Duration::from_secs(timeout_secs),
        )
    }

    /// probe 간격
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 전체 대기 상한
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 다른 상한으로 복사본을 만듭니다.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// probe가 `Some`을 반환할 때까지 폴링합니다.
    ///
    /// probe는 `Ok(None)`으로 "아직"을, `Ok(Some(v))`로 "완료"를 알립니다.
    pub async fn until<T, E, F, Fut>(&self, mut probe: F) -> Result<PollOutcome<T>, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                debug!(
                    attempts = attempts,
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "bounded poll timed out"
                );
                return Ok(PollOutcome::TimedOut { attempts, elapsed });
            }

            attempts = attempts.saturating_add(1);
            if let Some(value) = probe().await? {
                return Ok(PollOutcome::Ready {
                    value,
                    attempts,
                    elapsed: started.elapsed(),
                });
            }

            let remaining = self.timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                continue;
            }
            tokio::time::sleep(self.interval.min(remaining)).await;
        }
    }

    /// probe가 `true`를 반환할 때까지 폴링합니다.
    pub async fn until_true<E, F, Fut>(&self, mut probe: F) -> Result<PollOutcome<()>, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, E>>,
    {
        self.until(|| {
            let fut = probe();
            async move { Ok(fut.await?.then_some(())) }
        })
        .await
    }
}
