use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::SourceError;
use crate::snapshot::Snapshot;
use crate::value::PropertyMap;

/// 配置提供者契约。
///
/// ### 设计目的（Why）
/// - 抽象不同后端（文件、环境变量、内存字节、远程配置中心）的读取能力；
/// - 读取时可观察同一次合并中**前序数据源**已经写入的暂存快照，从而实现分阶段解析：
///   例如先由文件源确定配置中心地址，再由后续 Provider 据此拉取远端配置。
///
/// ### 契约说明（What）
/// - `read_bytes`：返回待 [`PropertyParser`] 解析的原始字节；
/// - `read`：直接返回扁平映射（点分键），用于无需解析器的数据源；
/// - 两种能力通常只实现其一，另一种返回 [`SourceError::Unsupported`]；
/// - `staged` 为只读视图，Provider 不得假设其中包含后续数据源的键。
///
/// ### 设计权衡（Trade-offs）
/// - 接口保持同步：加载发生在进程启动或显式刷新时，阻塞调用方是预期语义；
///   需要异步 IO 的实现可在内部自行 `block_on`。
pub trait PropertyProvider: Send + Sync {
    fn read_bytes(&self, staged: &Snapshot) -> Result<Vec<u8>, SourceError>;

    fn read(&self, staged: &Snapshot) -> Result<PropertyMap, SourceError>;
}

/// 配置格式解析器契约。
///
/// - `unmarshal`：把原始字节解析为扁平映射，嵌套结构需展开为点分键；
/// - `marshal`：逆向操作，合并路径不会调用，仅为往返转换提供完整契约。
pub trait PropertyParser: Send + Sync {
    fn unmarshal(&self, bytes: &[u8]) -> Result<PropertyMap, SourceError>;

    fn marshal(&self, map: &PropertyMap) -> Result<Vec<u8>, SourceError>;
}

/// 配置输入的基本单元：一个 Provider 与可选的 Parser。
///
/// ### 契约说明（What）
/// - 带解析器时，合并引擎调用 `read_bytes` 再交给 `unmarshal`；不带解析器时直接调用 `read`；
/// - 数据源列表的顺序由调用方决定且从不重排，越靠后优先级越高；
/// - 克隆只增加引用计数，存储层据此保留列表供 Refresh 复用。
#[derive(Clone)]
pub struct PropertySource {
    name: Cow<'static, str>,
    provider: Arc<dyn PropertyProvider>,
    parser: Option<Arc<dyn PropertyParser>>,
}

impl PropertySource {
    pub fn new<N, P, R>(name: N, provider: P, parser: R) -> Self
    where
        N: Into<Cow<'static, str>>,
        P: PropertyProvider + 'static,
        R: PropertyParser + 'static,
    {
        Self {
            name: name.into(),
            provider: Arc::new(provider),
            parser: Some(Arc::new(parser)),
        }
    }

    /// 不带解析器的数据源，合并时走 [`PropertyProvider::read`]。
    pub fn from_provider<N, P>(name: N, provider: P) -> Self
    where
        N: Into<Cow<'static, str>>,
        P: PropertyProvider + 'static,
    {
        Self {
            name: name.into(),
            provider: Arc::new(provider),
            parser: None,
        }
    }

    /// 以闭包充当 Provider，闭包接收暂存快照并返回本源的贡献。
    ///
    /// ```
    /// use spark_config::{PropertyMap, PropertySource};
    ///
    /// let derived = PropertySource::from_fn("derived", |staged| {
    ///     let mut map = PropertyMap::new();
    ///     if let Some(host) = staged.string("server.host") {
    ///         map.insert("server.url".into(), format!("http://{host}").into());
    ///     }
    ///     Ok(map)
    /// });
    /// assert_eq!(derived.name(), "derived");
    /// ```
    pub fn from_fn<N, F>(name: N, read: F) -> Self
    where
        N: Into<Cow<'static, str>>,
        F: Fn(&Snapshot) -> Result<PropertyMap, SourceError> + Send + Sync + 'static,
    {
        Self::from_provider(name, FnProvider { read })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_owned(&self) -> Cow<'static, str> {
        self.name.clone()
    }

    #[inline]
    pub fn provider(&self) -> &dyn PropertyProvider {
        &*self.provider
    }

    #[inline]
    pub fn parser(&self) -> Option<&dyn PropertyParser> {
        self.parser.as_deref()
    }
}

impl fmt::Debug for PropertySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySource")
            .field("name", &self.name)
            .field("has_parser", &self.parser.is_some())
            .finish_non_exhaustive()
    }
}

struct FnProvider<F> {
    read: F,
}

impl<F> PropertyProvider for FnProvider<F>
where
    F: Fn(&Snapshot) -> Result<PropertyMap, SourceError> + Send + Sync,
{
    fn read_bytes(&self, _staged: &Snapshot) -> Result<Vec<u8>, SourceError> {
        Err(SourceError::Unsupported {
            provider: "fn",
            operation: "read_bytes",
        })
    }

    fn read(&self, staged: &Snapshot) -> Result<PropertyMap, SourceError> {
        (self.read)(staged)
    }
}
