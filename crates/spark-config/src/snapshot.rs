use std::collections::btree_map;

use crate::value::{PropertyMap, PropertyValue};

/// 一次完整合并的只读结果。
///
/// ### 设计目的（Why）
/// - 存储层以 `Arc<Snapshot>` 的形式发布快照：读者拿到的是不可变视图，写者每次提交都生成新对象，
///   读写之间无需复制或加锁遍历；
/// - 合并过程中，Provider 以 `&Snapshot` 观察“截至当前数据源为止”的暂存结果，实现分阶段依赖解析。
///
/// ### 契约说明（What）
/// - 公共 API 仅提供读取能力；需要修改的调用方必须通过 [`to_map`](Self::to_map) 拷贝出独立映射；
/// - 唯一的写入入口 `merge_from` 为 crate 内部可见，仅由合并引擎作用于尚未发布的暂存快照。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    entries: PropertyMap,
}

impl Snapshot {
    /// 空快照。
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    /// 以字符串形式读取，非文本值按 `Display` 渲染。
    pub fn string(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(ToString::to_string)
    }

    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, PropertyValue> {
        self.entries.iter()
    }

    /// 拷贝出可自由修改的映射。
    pub fn to_map(&self) -> PropertyMap {
        self.entries.clone()
    }

    /// 将一个数据源的贡献并入暂存快照，同名键后写覆盖。
    pub(crate) fn merge_from(&mut self, contribution: PropertyMap) {
        self.entries.extend(contribution);
    }
}

impl From<PropertyMap> for Snapshot {
    fn from(entries: PropertyMap) -> Self {
        Self { entries }
    }
}

impl<K, V> FromIterator<(K, V)> for Snapshot
where
    K: Into<String>,
    V: Into<PropertyValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a String, &'a PropertyValue);
    type IntoIter = btree_map::Iter<'a, String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
