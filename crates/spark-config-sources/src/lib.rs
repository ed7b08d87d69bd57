#![deny(unsafe_code)]

//! # spark-config-sources
//!
//! ## 定位与职责（Why）
//! - 为 `spark-config` 的 Provider / Parser 契约提供开箱即用的实现：
//!   文件、环境变量、内存字节块三类提供者，以及 YAML、JSON、TOML 三种扁平化解析器；
//! - 提供微服务默认的数据源组合 `[application.yaml, 环境变量]`。
//!
//! ## 使用示例
//! ```
//! use spark_config::{ConfigLoader, PropertySource};
//! use spark_config_sources::{BytesProvider, EnvProvider, JsonParser};
//!
//! let loader = ConfigLoader::with_defaults().expect("event worker");
//! loader.init([
//!     PropertySource::new("inline", BytesProvider::new(r#"{"server": {"port": 8080}}"#), JsonParser),
//!     PropertySource::from_provider("env", EnvProvider::from_vars([("SERVER_PORT", "9090")])),
//! ]);
//! assert_eq!(loader.get_or_default_string("server.port", "80"), "9090");
//! ```

mod defaults;
mod flatten;
pub mod parsers;
pub mod providers;

pub use defaults::{
    PROPERTY_FILE_NAME, PROPERTY_FILE_PATH_ENV, YamlSourceParams, base_property_sources,
    env_property_source, yaml_property_source,
};
pub use parsers::{JsonParser, TomlParser, YamlParser};
pub use providers::{BytesProvider, EnvProvider, FileProvider, default_key_transform};
