use std::time::Duration;

/// Init 阶段对单个数据源的重试策略。
///
/// - `retry_delay`：两次尝试之间的休眠间隔，默认 5 秒；
/// - `max_wait`：从 Init 调用开始计时的总预算，默认 10 分钟，耗尽即视为致命错误。
///
/// 测试与嵌入式宿主可以把两者调到毫秒级。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    retry_delay: Duration,
    max_wait: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
    pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(10 * 60);

    pub const fn new(retry_delay: Duration, max_wait: Duration) -> Self {
        Self {
            retry_delay,
            max_wait,
        }
    }

    pub const fn from_millis(retry_delay_ms: u64, max_wait_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(retry_delay_ms),
            Duration::from_millis(max_wait_ms),
        )
    }

    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    #[must_use]
    pub const fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    #[inline]
    pub const fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    #[inline]
    pub const fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// 已耗时 `elapsed` 后是否仍允许再试一次。
    pub fn allows_retry(&self, elapsed: Duration) -> bool {
        elapsed < self.max_wait
    }

    /// 下一次尝试前应休眠的时长，不会越过剩余预算。
    pub fn next_delay(&self, elapsed: Duration) -> Duration {
        self.retry_delay.min(self.max_wait.saturating_sub(elapsed))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RETRY_DELAY, Self::DEFAULT_MAX_WAIT)
    }
}
