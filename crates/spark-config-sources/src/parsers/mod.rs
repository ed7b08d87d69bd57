//! 配置格式解析器。
//!
//! 所有解析器输出扁平映射：嵌套结构展开为点分键，展开规则集中在 `flatten` 模块。

mod json;
mod toml;
mod yaml;

pub use self::json::JsonParser;
pub use self::toml::TomlParser;
pub use self::yaml::YamlParser;
