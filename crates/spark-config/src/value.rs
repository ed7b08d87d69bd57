use std::collections::BTreeMap;
use std::fmt;

/// 扁平化后的配置映射：点分键（如 `server.http.port`）到配置值。
///
/// 采用 [`BTreeMap`] 以保证遍历顺序稳定，日志、快照比较与序列化输出均可复现。
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// 配置值的枚举表示。
///
/// ### 设计目标（Why）
/// - 数据源（YAML、JSON、环境变量、自定义 Provider）产出的值类型各异，合并引擎需要统一的强类型载体；
/// - 快照是扁平映射，嵌套结构在解析阶段已被展开为点分键，因此这里只保留标量与“标量序列”。
///
/// ### 契约定义（What）
/// - `Boolean` / `Integer` / `Float` / `Text`：基础标量；
/// - `List`：原始值序列，元素本身可以再次是 `List`，但不包含映射；
/// - [`is_empty`](Self::is_empty) 对空字符串与空序列返回 `true`，读取 API 据此回退到默认值。
///
/// ### 设计取舍（Trade-offs）
/// - 不提供 `Null` 变体：解析器遇到空值时直接不产出该键，读取侧自然回退默认值。
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// 空字符串或空序列视为“无值”。
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Boolean(_) | Self::Integer(_) | Self::Float(_) => false,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// 读取布尔值；文本 `"true"` / `"false"`（忽略大小写）同样被接受。
    ///
    /// 环境变量只能提供文本，调用方读取开关时无需关心值来自哪个数据源。
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(flag) => Some(*flag),
            Self::Text(text) if text.eq_ignore_ascii_case("true") => Some(true),
            Self::Text(text) if text.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// 读取整数；可解析为 `i64` 的文本同样被接受。
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// 读取浮点数；整数与可解析文本会被提升为 `f64`。
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Integer(value) => Some(*value as f64),
            Self::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    /// 标量按字面量输出，序列以逗号连接各元素，供 `get_or_default_string` 使用。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(flag) => write!(f, "{flag}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
            Self::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T> From<Vec<T>> for PropertyValue
where
    T: Into<PropertyValue>,
{
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}
