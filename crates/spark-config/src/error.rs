//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义配置加载链路对外暴露的错误语义：数据源失败、初始化重试耗尽、未初始化访问、订阅未命中；
//! - 区分“数据源本身的失败”（[`SourceError`]）与“编排层的失败”（[`ConfigError`]），
//!   前者由 Provider / Parser 实现者返回，后者由加载器在其边界上附加来源名称、重试次数等上下文。
//!
//! ## 设计要求（What）
//! - 所有错误均派生 `thiserror::Error`，满足 `Send + Sync + 'static`，可直接交给 `anyhow` 等上层框架；
//! - 读取 API 不产生错误：未初始化时回退默认值，因此这里没有“读取失败”变体。

use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::events::SubscriptionId;

/// 事件处理器返回的错误类型。
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 数据源（Provider / Parser）在单次读取中产生的错误。
///
/// # 教案式说明
/// - **意图 (Why)**：不同来源的失败形态各异（IO、格式、能力缺失），统一枚举后合并引擎只需透传，
///   编排层再决定重试（Init）还是立即返回（Refresh）。
/// - **契约 (What)**：`Unsupported` 表示 Provider 不具备被调用的能力，例如环境变量源不提供原始字节；
///   `Custom` 承载自定义 Provider 的任意错误。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// 读取文件等 IO 资源失败。
    #[error("failed to read `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// 原始字节无法按给定格式解析，或映射无法序列化回该格式。
    #[error("invalid {format} document: {detail}")]
    Parse {
        format: &'static str,
        detail: String,
    },

    /// Provider 不支持被调用的读取方式。
    #[error("provider `{provider}` does not support `{operation}`")]
    Unsupported {
        provider: &'static str,
        operation: &'static str,
    },

    /// 自定义 Provider / Parser 的错误。
    #[error("{0}")]
    Custom(#[source] HandlerError),
}

impl SourceError {
    /// 构造格式错误，`detail` 通常来自底层解析库的错误描述。
    pub fn parse<D>(format: &'static str, detail: D) -> Self
    where
        D: ToString,
    {
        Self::Parse {
            format,
            detail: detail.to_string(),
        }
    }

    /// 包装任意错误。
    pub fn custom<E>(error: E) -> Self
    where
        E: Into<HandlerError>,
    {
        Self::Custom(error.into())
    }
}

/// 配置加载器的统一错误类型。
///
/// # 教案式说明
/// - **意图 (Why)**：Init 与 Refresh 对同一类数据源失败的处理截然不同（前者重试直至预算耗尽后终止进程，
///   后者立即返回并保留旧快照），错误需携带足够上下文让调用方判定与记录；
/// - **契约 (What)**：
///   - `NotInitialized`：在首次成功 Init 之前调用 Refresh；
///   - `Source`：单次合并中某个数据源失败，`source_name` 指明是哪一个；
///   - `InitExhausted`：Init 在重试预算内始终未能读取某个数据源，携带最后一次错误；
///   - `SubscriptionNotFound`：取消订阅时标识未知或已被移除；
///   - `NotifierClosed`：事件通知器已关闭，不再接受订阅；
///   - `WorkerSpawn`：事件投递线程无法创建；
///   - `Options`：加载器自身的选项文档非法。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("configuration loader is not initialized")]
    NotInitialized,

    #[error("property source `{source_name}` failed: {source}")]
    Source {
        source_name: Cow<'static, str>,
        source: SourceError,
    },

    #[error(
        "could not init configuration from property source `{source_name}` \
         after {attempts} attempts in {elapsed:?}: {source}"
    )]
    InitExhausted {
        source_name: Cow<'static, str>,
        attempts: u32,
        elapsed: Duration,
        source: SourceError,
    },

    #[error("cannot find subscriber with id `{0}`")]
    SubscriptionNotFound(SubscriptionId),

    #[error("configuration event notifier is closed")]
    NotifierClosed,

    #[error("failed to spawn configuration event worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("invalid loader options: {0}")]
    Options(#[from] toml::de::Error),
}

const _: fn() = || {
    fn assert_error_traits<T: std::error::Error + Send + Sync + 'static>() {}

    assert_error_traits::<ConfigError>();
    assert_error_traits::<SourceError>();
};
