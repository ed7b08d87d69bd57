#![deny(unsafe_code)]

//! # spark-config
//!
//! ## 定位与职责（Why）
//! - 维护进程级、可热更新的配置快照，快照由一组有序、异构的数据源（文件、环境变量、内存字节、
//!   自定义 Provider）逐个合并而成，后出现的数据源覆盖先出现的同名键；
//! - 合并是“分阶段”的：每个 Provider 读取时都能看到前序数据源已经写入的暂存结果，
//!   从而支持“先读本地文件得到配置中心地址，再拉取远端配置”这类依赖链；
//! - 配置提交后以异步事件通知订阅者，订阅者无需轮询。
//!
//! ## 架构嵌入（Where）
//! - `value` / `snapshot`：配置值模型与不可变快照；
//! - `source`：Provider / Parser 契约与数据源句柄，具体实现位于 `spark-config-sources`；
//! - `merge`：分阶段合并引擎；
//! - `store`：读写锁保护的当前快照；
//! - `loader`：Init（带重试）与 Refresh（尽力而为）两条加载路径；
//! - `events`：单线程 FIFO 事件投递；
//! - `options` / `retry` / `keys`：加载器自身的选项、重试策略与约定配置键。
//!
//! ## 使用约束（Trade-offs）
//! - 库本身只产出 `tracing` 事件，不安装订阅器；
//! - Init 失败被视为进程无法启动，默认 panic，需要 `Result` 语义的宿主使用 `try_init`。

mod error;
mod events;
pub mod keys;
mod loader;
pub mod merge;
mod options;
mod retry;
mod snapshot;
mod source;
mod store;
mod value;

pub use error::{ConfigError, HandlerError, SourceError};
pub use events::{Event, EventKind, EventNotifier, SubscriptionId};
pub use keys::WellKnownProperty;
pub use loader::{ConfigLoader, LoaderState};
pub use options::{DEFAULT_EVENT_QUEUE_CAPACITY, LoaderOptions};
pub use retry::RetryPolicy;
pub use snapshot::Snapshot;
pub use source::{PropertyParser, PropertyProvider, PropertySource};
pub use store::ConfigurationStore;
pub use value::{PropertyMap, PropertyValue};
