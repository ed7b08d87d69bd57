//! 微服务默认数据源组合：`application.yaml` 加环境变量，环境变量优先。

use std::env;
use std::path::PathBuf;

use spark_config::PropertySource;

use crate::parsers::YamlParser;
use crate::providers::{EnvProvider, FileProvider};

/// 默认配置文件名。
pub const PROPERTY_FILE_NAME: &str = "application.yaml";

/// 指向 `application.yaml` 所在目录的环境变量。
pub const PROPERTY_FILE_PATH_ENV: &str = "PROPERTY_FILE_PATH";

/// YAML 数据源参数。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct YamlSourceParams {
    /// 配置文件的完整路径；未设置时按 [`PROPERTY_FILE_PATH_ENV`] 目录加默认文件名解析。
    pub config_file_path: Option<PathBuf>,
}

impl YamlSourceParams {
    pub fn with_config_file_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_file_path: Some(path.into()),
        }
    }

    /// 解析实际使用的文件路径，在构造数据源时调用一次。
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.config_file_path {
            return path.clone();
        }
        match env::var_os(PROPERTY_FILE_PATH_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir).join(PROPERTY_FILE_NAME),
            _ => PathBuf::from(PROPERTY_FILE_NAME),
        }
    }
}

/// 读取 YAML 配置文件的数据源。
pub fn yaml_property_source(params: YamlSourceParams) -> PropertySource {
    let path = params.resolve();
    let name = format!("yaml:{}", path.display());
    PropertySource::new(name, FileProvider::new(path), YamlParser)
}

/// 读取进程环境变量的数据源，键按 `TEST_VAR` → `test.var` 变换。
pub fn env_property_source() -> PropertySource {
    PropertySource::from_provider("env", EnvProvider::new())
}

/// `[yaml, env]`：环境变量覆盖文件中的同名键。
pub fn base_property_sources(params: YamlSourceParams) -> Vec<PropertySource> {
    vec![yaml_property_source(params), env_property_source()]
}
