use std::sync::Arc;

use parking_lot::RwLock;

use crate::snapshot::Snapshot;
use crate::source::PropertySource;
use crate::value::PropertyValue;

/// 进程内的当前配置视图：最新快照、最近一次成功 Init 的数据源列表与提交代数。
///
/// # 教案式说明
/// - **意图 (Why)**：读路径频率远高于写路径，读者只需在读锁内克隆一个 `Arc`，
///   随即释放锁再做键查找，写者因此只会与极短的临界区竞争；
/// - **逻辑 (How)**：`commit` 在写锁内整体替换快照，不存在“半新半旧”的中间态；
///   `generation` 与快照同锁递增，调用方可据此判断两次读取是否观察到同一次提交；
/// - **契约 (What)**：
///   - 新建时为空，`is_initialized()` 为 `false`，读取全部回退默认值；
///   - 快照一经提交不可变，失败的合并永远到不了这里；
///   - 数据源列表仅在传入 `Some` 时替换（Init），Refresh 提交时沿用原列表。
#[derive(Debug, Default)]
pub struct ConfigurationStore {
    state: RwLock<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    snapshot: Option<Arc<Snapshot>>,
    sources: Option<Arc<[PropertySource]>>,
    generation: u64,
}

impl ConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 原子地发布新快照，返回本次提交的代数（从 1 开始）。
    pub fn commit(&self, snapshot: Snapshot, sources: Option<Arc<[PropertySource]>>) -> u64 {
        let snapshot = Arc::new(snapshot);
        let mut state = self.state.write();
        state.snapshot = Some(snapshot);
        if let Some(sources) = sources {
            state.sources = Some(sources);
        }
        state.generation += 1;
        state.generation
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state.read().snapshot.clone()
    }

    /// 最近一次成功 Init 的数据源列表，Refresh 以此重建快照。
    pub fn sources(&self) -> Option<Arc<[PropertySource]>> {
        self.state.read().sources.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().snapshot.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    pub fn get(&self, key: &str) -> Option<PropertyValue> {
        self.snapshot()?.get(key).cloned()
    }

    /// 读取配置值；未初始化、键缺失或值为空时返回 `default`。
    pub fn get_or_default(&self, key: &str, default: impl Into<PropertyValue>) -> PropertyValue {
        match self.get(key) {
            Some(value) if !value.is_empty() => value,
            _ => default.into(),
        }
    }

    /// 以字符串形式读取，规则同 [`get_or_default`](Self::get_or_default)。
    pub fn get_or_default_string(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => default.to_owned(),
        }
    }
}
