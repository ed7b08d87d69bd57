//! # loader 模块说明
//!
//! ## 角色定位（Why）
//! - 串联合并引擎、配置存储与事件通知器，对外提供 Init / Refresh 两条加载路径与只读查询；
//! - Init 面向进程启动：配置中心、挂载卷等依赖可能尚未就绪，因此逐源重试直到预算耗尽；
//! - Refresh 面向运行期热更新：尽力而为，失败立即返回并保留当前快照。
//!
//! ## 并发契约（What）
//! - 读取只在存储读锁内克隆 `Arc`，不与发布闸门交互；
//! - 提交与入队在同一把发布闸门内完成，事件顺序与提交顺序一致，且提交先于事件可见；
//! - 并发的 Init 不互斥，最后一次提交生效。
//!
//! ## 使用示例
//! ```
//! use spark_config::{ConfigLoader, PropertyMap, PropertySource};
//!
//! let loader = ConfigLoader::with_defaults().expect("event worker");
//! let defaults = PropertySource::from_fn("defaults", |_| {
//!     let mut map = PropertyMap::new();
//!     map.insert("server.port".into(), 8080_i64.into());
//!     Ok(map)
//! });
//!
//! loader.init([defaults]);
//! assert_eq!(loader.get_or_default_string("server.port", "80"), "8080");
//! ```

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::error::{ConfigError, HandlerError};
use crate::events::{Event, EventKind, EventNotifier, SubscriptionId};
use crate::keys::WellKnownProperty;
use crate::merge;
use crate::options::LoaderOptions;
use crate::retry::RetryPolicy;
use crate::snapshot::Snapshot;
use crate::source::PropertySource;
use crate::store::ConfigurationStore;
use crate::value::PropertyValue;

/// 加载器的生命周期阶段。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoaderState {
    /// 尚无提交，也没有进行中的 Init。
    Uninitialized,
    /// 尚无提交，至少一个 Init 正在读取数据源。
    Initializing,
    /// 至少完成过一次提交；此后不会再回到前两个阶段。
    Ready,
}

/// 分阶段、可热更新的配置加载器。
pub struct ConfigLoader {
    store: ConfigurationStore,
    notifier: EventNotifier,
    retry: RetryPolicy,
    publish_gate: Mutex<()>,
    inflight_inits: AtomicUsize,
}

impl ConfigLoader {
    /// 按选项创建加载器并启动事件投递线程。
    pub fn new(options: LoaderOptions) -> Result<Self, ConfigError> {
        Ok(Self {
            store: ConfigurationStore::new(),
            notifier: EventNotifier::new(options.event_queue_capacity())?,
            retry: options.retry(),
            publish_gate: Mutex::new(()),
            inflight_inits: AtomicUsize::new(0),
        })
    }

    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(LoaderOptions::default())
    }

    /// 进程级共享实例，首次调用时以默认选项创建。
    pub fn global() -> Result<&'static ConfigLoader, ConfigError> {
        static GLOBAL: OnceLock<ConfigLoader> = OnceLock::new();

        if let Some(loader) = GLOBAL.get() {
            return Ok(loader);
        }
        let loader = Self::with_defaults()?;
        Ok(GLOBAL.get_or_init(|| loader))
    }

    /// 按给定顺序加载全部数据源并提交，返回提交代数。
    ///
    /// # Panics
    /// 某个数据源在重试预算内始终失败时 panic。配置是进程其余部分的前置条件，
    /// 需要自行处理失败的宿主应改用 [`try_init`](Self::try_init)。
    pub fn init<I>(&self, sources: I) -> u64
    where
        I: IntoIterator<Item = PropertySource>,
    {
        match self.try_init(sources) {
            Ok(generation) => generation,
            Err(cause) => panic!("{cause}"),
        }
    }

    /// 与 [`init`](Self::init) 相同，数据源以切片给出。
    ///
    /// # Panics
    /// 同 [`init`](Self::init)。
    pub fn init_with_list(&self, sources: &[PropertySource]) -> u64 {
        self.init(sources.iter().cloned())
    }

    /// 不 panic 的 Init：重试预算耗尽时返回 [`ConfigError::InitExhausted`]。
    ///
    /// # 教案式说明
    /// - **逻辑 (How)**：
    ///   1. 从空暂存快照开始，按序对每个数据源调用 [`merge::apply_source`]；
    ///   2. 失败时记录 `warn`，休眠 `retry_delay` 后重试同一数据源，已合并的前序结果保持不变；
    ///   3. 自调用开始累计耗时超过 `max_wait` 即放弃，暂存快照被丢弃；
    ///   4. 全部成功后提交快照与数据源列表，并发出 [`EventKind::Initialized`]。
    /// - **契约 (What)**：返回值为本次提交的代数；失败时存储不受影响。
    pub fn try_init<I>(&self, sources: I) -> Result<u64, ConfigError>
    where
        I: IntoIterator<Item = PropertySource>,
    {
        let sources: Arc<[PropertySource]> = sources.into_iter().collect();
        let _inflight = InflightInit::enter(&self.inflight_inits);
        let started = Instant::now();

        let mut staging = Snapshot::empty();
        for source in sources.iter() {
            self.apply_with_retry(&mut staging, source, started)
                .inspect_err(|cause| error!(error = %cause, "configuration init gave up"))?;
        }

        let keys = staging.len();
        let generation =
            self.publish(staging, Some(Arc::clone(&sources)), EventKind::Initialized);
        info!(
            generation,
            sources = sources.len(),
            keys,
            elapsed_ms = millis(started.elapsed()),
            "configuration initialized"
        );
        Ok(generation)
    }

    /// 以最近一次成功 Init 的数据源列表重建快照。
    ///
    /// 不重试；任一数据源失败即返回错误，当前快照保持原样。
    pub fn refresh(&self) -> Result<u64, ConfigError> {
        let sources = self.store.sources().ok_or(ConfigError::NotInitialized)?;
        let started = Instant::now();

        let snapshot = merge::merge(&Snapshot::empty(), &sources).inspect_err(|cause| {
            warn!(error = %cause, "configuration refresh failed, keeping current snapshot");
        })?;

        let keys = snapshot.len();
        let generation = self.publish(snapshot, None, EventKind::Refreshed);
        info!(
            generation,
            keys,
            elapsed_ms = millis(started.elapsed()),
            "configuration refreshed"
        );
        Ok(generation)
    }

    pub fn get(&self, key: &str) -> Option<PropertyValue> {
        self.store.get(key)
    }

    /// 未初始化、键缺失或值为空时返回 `default`。
    pub fn get_or_default(&self, key: &str, default: impl Into<PropertyValue>) -> PropertyValue {
        self.store.get_or_default(key, default)
    }

    pub fn get_or_default_string(&self, key: &str, default: &str) -> String {
        self.store.get_or_default_string(key, default)
    }

    pub fn well_known(&self, property: WellKnownProperty) -> String {
        self.store
            .get_or_default_string(property.key, property.default)
    }

    pub fn is_initialized(&self) -> bool {
        self.store.is_initialized()
    }

    /// 当前快照的共享句柄；持有期间不受后续提交影响。
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.store.snapshot()
    }

    pub fn generation(&self) -> u64 {
        self.store.generation()
    }

    pub fn state(&self) -> LoaderState {
        if self.store.is_initialized() {
            LoaderState::Ready
        } else if self.inflight_inits.load(Ordering::Acquire) > 0 {
            LoaderState::Initializing
        } else {
            LoaderState::Uninitialized
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> Result<SubscriptionId, ConfigError>
    where
        F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.notifier.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), ConfigError> {
        self.notifier.unsubscribe(id)
    }

    pub fn pending_events(&self) -> usize {
        self.notifier.pending_events()
    }

    fn apply_with_retry(
        &self,
        staging: &mut Snapshot,
        source: &PropertySource,
        started: Instant,
    ) -> Result<(), ConfigError> {
        let mut attempts = 0_u32;
        loop {
            attempts += 1;
            let cause = match merge::apply_source(staging, source) {
                Ok(()) => return Ok(()),
                Err(cause) => cause,
            };

            let elapsed = started.elapsed();
            if !self.retry.allows_retry(elapsed) {
                return Err(ConfigError::InitExhausted {
                    source_name: source.name_owned(),
                    attempts,
                    elapsed,
                    source: cause,
                });
            }
            warn!(
                source = source.name(),
                attempt = attempts,
                error = %cause,
                "property source failed during init, retrying"
            );
            thread::sleep(self.retry.next_delay(elapsed));
        }
    }

    fn publish(
        &self,
        snapshot: Snapshot,
        sources: Option<Arc<[PropertySource]>>,
        kind: EventKind,
    ) -> u64 {
        let _gate = self.publish_gate.lock();
        let generation = self.store.commit(snapshot, sources);
        if let Err(cause) = self.notifier.notify(Event::new(kind, generation)) {
            warn!(event = %kind, generation, error = %cause, "configuration event dropped");
        }
        generation
    }
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("state", &self.state())
            .field("generation", &self.generation())
            .field("retry", &self.retry)
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

/// 进行中 Init 的计数守卫，panic 展开时同样递减。
struct InflightInit<'a>(&'a AtomicUsize);

impl<'a> InflightInit<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InflightInit<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;
    use crate::error::SourceError;
    use crate::value::PropertyMap;

    fn fast_loader() -> ConfigLoader {
        ConfigLoader::new(LoaderOptions::new().with_retry(RetryPolicy::from_millis(1, 200)))
            .expect("loader")
    }

    fn fixed(name: &'static str, key: &'static str, value: &'static str) -> PropertySource {
        PropertySource::from_fn(name, move |_| {
            let mut map = PropertyMap::new();
            map.insert(key.into(), value.into());
            Ok(map)
        })
    }

    #[test]
    fn refresh_before_init_is_rejected() {
        let loader = fast_loader();
        assert!(matches!(loader.refresh(), Err(ConfigError::NotInitialized)));
        assert_eq!(loader.state(), LoaderState::Uninitialized);
    }

    #[test]
    fn init_commits_and_moves_to_ready() {
        let loader = fast_loader();
        let generation = loader.init([fixed("a", "k", "v")]);
        assert_eq!(generation, 1);
        assert_eq!(loader.state(), LoaderState::Ready);
        assert_eq!(loader.get("k"), Some(PropertyValue::from("v")));
    }

    #[test]
    fn empty_source_list_initializes_empty_snapshot() {
        let loader = fast_loader();
        loader.init_with_list(&[]);
        assert!(loader.is_initialized());
        assert_eq!(loader.snapshot().map(|snapshot| snapshot.len()), Some(0));
    }

    #[test]
    fn init_retries_flaky_source_until_it_succeeds() {
        let loader = fast_loader();
        let calls = Arc::new(AtomicU32::new(0));
        let flaky = {
            let calls = Arc::clone(&calls);
            PropertySource::from_fn("flaky", move |_| {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    return Err(SourceError::custom("not ready yet"));
                }
                let mut map = PropertyMap::new();
                map.insert("ready".into(), true.into());
                Ok(map)
            })
        };

        loader.try_init([flaky]).expect("eventually succeeds");

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(loader.get("ready"), Some(PropertyValue::Boolean(true)));
    }

    #[test]
    fn exhausted_budget_reports_source_and_attempts() {
        let loader = ConfigLoader::new(
            LoaderOptions::new().with_retry(RetryPolicy::from_millis(1, 0)),
        )
        .expect("loader");
        let broken = PropertySource::from_fn("broken", |_| Err(SourceError::custom("down")));

        let error = loader.try_init([broken]).expect_err("budget is zero");

        match error {
            ConfigError::InitExhausted {
                source_name,
                attempts,
                ..
            } => {
                assert_eq!(source_name, "broken");
                assert_eq!(attempts, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!loader.is_initialized());
        assert_eq!(loader.state(), LoaderState::Uninitialized);
    }

    #[test]
    fn well_known_property_uses_default_until_set() {
        let loader = fast_loader();
        assert_eq!(loader.well_known(crate::keys::PROFILE), "default");
        loader.init([fixed("a", "profile", "dev")]);
        assert_eq!(loader.well_known(crate::keys::PROFILE), "dev");
        assert_eq!(
            loader.well_known(crate::keys::HTTP_BUFFER_HEADER_MAX_SIZE),
            "10240"
        );
    }

    #[test]
    fn global_returns_the_same_instance() {
        let first = ConfigLoader::global().expect("global loader");
        let second = ConfigLoader::global().expect("global loader");
        assert!(std::ptr::eq(first, second));
    }
}
