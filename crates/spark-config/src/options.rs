//! 加载器自身的选项。
//!
//! 选项只影响编排行为（重试节奏、事件队列容量），与被加载的业务配置无关；
//! 宿主可以在代码中构造，也可以从一段 TOML 文本反序列化：
//!
//! ```
//! use std::time::Duration;
//! use spark_config::LoaderOptions;
//!
//! let options = LoaderOptions::from_toml_str(
//!     r#"
//!     retry_delay_ms = 250
//!     max_wait_ms = 30000
//!     event_queue_capacity = 16
//!     "#,
//! )
//! .expect("valid options");
//! assert_eq!(options.retry().retry_delay(), Duration::from_millis(250));
//! assert_eq!(options.event_queue_capacity(), 16);
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// 事件队列默认容量。
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoaderOptions {
    retry: RetryPolicy,
    event_queue_capacity: usize,
}

impl LoaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let raw: RawLoaderOptions = toml::from_str(document)?;
        Ok(raw.into())
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 设置事件队列容量，0 会被提升为 1。
    #[must_use]
    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity.max(1);
        self
    }

    #[inline]
    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    #[inline]
    pub fn event_queue_capacity(&self) -> usize {
        self.event_queue_capacity
    }
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }
}

impl<'de> Deserialize<'de> for LoaderOptions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        RawLoaderOptions::deserialize(deserializer).map(Into::into)
    }
}

/// 文档形态：时长以毫秒整数表示，缺省字段取默认值。
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawLoaderOptions {
    retry_delay_ms: u64,
    max_wait_ms: u64,
    event_queue_capacity: usize,
}

impl Default for RawLoaderOptions {
    fn default() -> Self {
        Self {
            retry_delay_ms: duration_ms(RetryPolicy::DEFAULT_RETRY_DELAY),
            max_wait_ms: duration_ms(RetryPolicy::DEFAULT_MAX_WAIT),
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }
}

impl From<RawLoaderOptions> for LoaderOptions {
    fn from(raw: RawLoaderOptions) -> Self {
        LoaderOptions::default()
            .with_retry(RetryPolicy::from_millis(raw.retry_delay_ms, raw.max_wait_ms))
            .with_event_queue_capacity(raw.event_queue_capacity)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
