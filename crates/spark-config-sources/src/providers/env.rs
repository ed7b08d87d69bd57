use std::fmt;
use std::sync::Arc;

use spark_config::{PropertyMap, PropertyProvider, PropertyValue, SourceError, Snapshot};
use tracing::debug;

type KeyTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// 环境变量数据源。
///
/// # 教案式说明
/// - **意图 (Why)**：容器化部署中，环境变量是覆盖文件配置最常见的手段；
///   默认键变换把 `DBAAS_AGENT_PORT` 映射为 `dbaas.agent.port`，与 YAML 展开后的键处于同一命名空间；
/// - **逻辑 (How)**：每次 `read` 都重新枚举变量，Refresh 因此能观察到新增或修改的变量；
///   设置前缀时只保留以前缀开头的变量，并在变换前去掉前缀；
/// - **契约 (What)**：
///   - 值一律为文本，类型转换交给读取侧的 [`PropertyValue`] 访问器；
///   - 非 UTF-8 的变量被跳过，变换结果为空串的键被丢弃；
///   - `read_bytes` 不受支持，该数据源必须以无解析器方式使用。
#[derive(Clone)]
pub struct EnvProvider {
    prefix: String,
    transform: KeyTransform,
    fixed: Option<Arc<[(String, String)]>>,
}

impl EnvProvider {
    /// 读取进程环境变量，使用默认键变换。
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
            transform: Arc::new(default_key_transform),
            fixed: None,
        }
    }

    /// 以固定的变量集合代替进程环境，便于在测试与嵌入场景中获得确定结果。
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fixed: Some(
                vars.into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_key_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.transform = Arc::new(transform);
        self
    }

    fn collect<I>(&self, vars: I) -> PropertyMap
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter_map(|(name, value)| {
                let stripped = name.strip_prefix(self.prefix.as_str())?;
                let key = (self.transform)(stripped);
                (!key.is_empty()).then(|| (key, PropertyValue::Text(value)))
            })
            .collect()
    }
}

impl Default for EnvProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EnvProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvProvider")
            .field("prefix", &self.prefix)
            .field("fixed", &self.fixed.as_ref().map(|vars| vars.len()))
            .finish_non_exhaustive()
    }
}

impl PropertyProvider for EnvProvider {
    fn read_bytes(&self, _staged: &Snapshot) -> Result<Vec<u8>, SourceError> {
        Err(SourceError::Unsupported {
            provider: "env",
            operation: "read_bytes",
        })
    }

    fn read(&self, _staged: &Snapshot) -> Result<PropertyMap, SourceError> {
        let map = match &self.fixed {
            Some(vars) => self.collect(vars.iter().cloned()),
            None => self.collect(std::env::vars_os().filter_map(|(name, value)| {
                match (name.into_string(), value.into_string()) {
                    (Ok(name), Ok(value)) => Some((name, value)),
                    (name, _) => {
                        debug!(variable = ?name, "skipping non UTF-8 environment variable");
                        None
                    }
                }
            })),
        };
        Ok(map)
    }
}

/// `SERVER_HTTP_PORT` → `server.http.port`。
pub fn default_key_transform(name: &str) -> String {
    name.to_lowercase().replace('_', ".")
}
