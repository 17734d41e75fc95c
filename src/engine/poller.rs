//! 异步任务轮询器 (Async Job Poller)
//!
//! 反复获取资源状态，直到进入终态或超过时限。时限到达时返回最后一次观测到的状态，
//! 是否达到终态由调用方断言，轮询器本身不因此报错。

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::core::config::PollConfig;
use crate::core::error::Result;

/// 轮询参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// 两次观测之间的间隔
    pub interval: Duration,
    /// 自首次观测起的总时限
    pub deadline: Duration,
}

impl PollSettings {
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }
}

impl From<&PollConfig> for PollSettings {
    fn from(cfg: &PollConfig) -> Self {
        Self::new(cfg.interval(), cfg.deadline())
    }
}

/// 轮询结果
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    /// 观测到终态
    Terminal(T),
    /// 时限到达，最后一次观测仍为非终态
    Pending(T),
    /// 时限内没有任何观测
    NoObservation,
}

impl<T> PollOutcome<T> {
    pub fn last(&self) -> Option<&T> {
        match self {
            PollOutcome::Terminal(s) | PollOutcome::Pending(s) => Some(s),
            PollOutcome::NoObservation => None,
        }
    }

    pub fn into_last(self) -> Option<T> {
        match self {
            PollOutcome::Terminal(s) | PollOutcome::Pending(s) => Some(s),
            PollOutcome::NoObservation => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PollOutcome::Terminal(_))
    }
}

/// 轮询直到终态或超时
///
/// `fetch` 返回的错误原样上抛，其中 `Inconclusive` (如轮询中途 401/403) 由调用方映射为跳过。
/// 首次观测即为终态时立即返回，不会休眠。
pub async fn poll_until_terminal<T, F, Fut, P>(
    mut fetch: F,
    is_terminal: P,
    settings: PollSettings,
) -> Result<PollOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    let deadline = Instant::now() + settings.deadline;
    let mut last = None;
    let mut attempts = 0usize;

    while Instant::now() < deadline {
        attempts += 1;
        let state = fetch().await?;

        if is_terminal(&state) {
            debug!("第 {} 次观测到终态", attempts);
            return Ok(PollOutcome::Terminal(state));
        }
        last = Some(state);

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        tokio::time::sleep(settings.interval.min(remaining)).await;
    }

    debug!("轮询时限到达，共观测 {} 次", attempts);
    Ok(match last {
        Some(state) => PollOutcome::Pending(state),
        None => PollOutcome::NoObservation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::HarnessError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_first_observation_returns_without_sleeping() {
        let calls = counter();
        let started = Instant::now();

        let c = calls.clone();
        let outcome = poll_until_terminal(
            || {
                c.fetch_add(1, Ordering::SeqCst);
                async { Ok("completed".to_string()) }
            },
            |s: &String| s == "completed",
            PollSettings::new(Duration::from_secs(1), Duration::from_secs(30)),
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Terminal("completed".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_bounds_observations_and_returns_last_state() {
        let calls = counter();
        let interval = Duration::from_secs(1);

        let c = calls.clone();
        let outcome = poll_until_terminal(
            || {
                let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(format!("running-{}", n)) }
            },
            |_: &String| false,
            PollSettings::new(interval, interval * 2),
        )
        .await
        .unwrap();

        // t=0s 与 t=1s 各观测一次，t=2s 时限到达
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome, PollOutcome::Pending("running-2".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_terminal_after_several_observations() {
        let calls = counter();
        let c = calls.clone();
        let outcome = poll_until_terminal(
            || {
                let n = c.fetch_add(1, Ordering::SeqCst);
                async move { Ok(if n < 3 { "processing" } else { "done" }) }
            },
            |s: &&str| *s == "done",
            PollSettings::new(Duration::from_millis(500), Duration::from_secs(30)),
        )
        .await
        .unwrap();

        assert!(outcome.is_terminal());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_deadline_yields_no_observation() {
        let outcome = poll_until_terminal(
            || async { Ok::<_, HarnessError>(1) },
            |_| true,
            PollSettings::new(Duration::from_secs(1), Duration::ZERO),
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::NoObservation);
        assert!(outcome.last().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn inconclusive_fetch_propagates() {
        let calls = counter();
        let c = calls.clone();
        let err = poll_until_terminal(
            || {
                let n = c.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Ok("queued")
                    } else {
                        Err(HarnessError::auth_required("GET /jobs/{id}/status"))
                    }
                }
            },
            |_| false,
            PollSettings::new(Duration::from_secs(1), Duration::from_secs(30)),
        )
        .await
        .unwrap_err();

        assert!(err.is_inconclusive());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
