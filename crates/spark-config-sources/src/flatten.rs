//! 嵌套文档与扁平点分键映射之间的互转。
//!
//! 三种格式（YAML / JSON / TOML）先被转换为统一的 [`Node`] 树，再由同一套规则展开：
//! - 映射逐层以 `.` 连接键名，值为空值或空映射的键不产出；
//! - 标量序列整体成为一个 [`PropertyValue::List`]，序列内嵌套映射视为格式错误；
//! - 文档根为标量时同样视为格式错误，空文档得到空映射。
//!
//! 逆向的 [`unflatten`] 供 `marshal` 使用：同一路径既是叶子又是分支时无法还原，返回错误。

use spark_config::{PropertyMap, PropertyValue, SourceError};

/// 与具体格式无关的文档树。
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Node {
    Null,
    Scalar(PropertyValue),
    Seq(Vec<Node>),
    Map(Vec<(String, Node)>),
}

pub(crate) fn flatten(format: &'static str, root: Node) -> Result<PropertyMap, SourceError> {
    let mut flat = PropertyMap::new();
    match root {
        Node::Null => {}
        Node::Map(entries) => flatten_entries(format, "", entries, &mut flat)?,
        Node::Scalar(_) | Node::Seq(_) => {
            return Err(SourceError::parse(format, "document root must be a mapping"));
        }
    }
    Ok(flat)
}

fn flatten_entries(
    format: &'static str,
    prefix: &str,
    entries: Vec<(String, Node)>,
    flat: &mut PropertyMap,
) -> Result<(), SourceError> {
    for (key, node) in entries {
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        match node {
            Node::Null => {}
            Node::Scalar(value) => {
                flat.insert(path, value);
            }
            Node::Seq(items) => {
                let list = sequence(format, &path, items)?;
                flat.insert(path, list);
            }
            Node::Map(nested) => flatten_entries(format, &path, nested, flat)?,
        }
    }
    Ok(())
}

fn sequence(format: &'static str, path: &str, items: Vec<Node>) -> Result<PropertyValue, SourceError> {
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Node::Null => {}
            Node::Scalar(value) => values.push(value),
            Node::Seq(nested) => values.push(sequence(format, path, nested)?),
            Node::Map(_) => {
                return Err(SourceError::parse(
                    format,
                    format!("`{path}` contains a mapping inside a sequence"),
                ));
            }
        }
    }
    Ok(PropertyValue::List(values))
}

/// 把扁平映射还原为嵌套树，键的字典序即输出顺序。
pub(crate) fn unflatten(format: &'static str, flat: &PropertyMap) -> Result<Node, SourceError> {
    let mut root = Vec::new();
    for (key, value) in flat {
        let segments: Vec<&str> = key.split('.').collect();
        insert_path(format, &mut root, key, &segments, value)?;
    }
    Ok(Node::Map(root))
}

fn insert_path(
    format: &'static str,
    entries: &mut Vec<(String, Node)>,
    full_key: &str,
    segments: &[&str],
    value: &PropertyValue,
) -> Result<(), SourceError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(());
    };

    let position = entries.iter().position(|(name, _)| name.as_str() == *segment);
    match (position, rest.is_empty()) {
        (None, true) => {
            entries.push(((*segment).to_owned(), value_node(value)));
            Ok(())
        }
        (None, false) => {
            let mut nested = Vec::new();
            insert_path(format, &mut nested, full_key, rest, value)?;
            entries.push(((*segment).to_owned(), Node::Map(nested)));
            Ok(())
        }
        (Some(index), false) => match &mut entries[index].1 {
            Node::Map(nested) => insert_path(format, nested, full_key, rest, value),
            _ => Err(conflict(format, full_key)),
        },
        (Some(_), true) => Err(conflict(format, full_key)),
    }
}

fn value_node(value: &PropertyValue) -> Node {
    match value {
        PropertyValue::List(items) => Node::Seq(items.iter().map(value_node).collect()),
        other => Node::Scalar(other.clone()),
    }
}

fn conflict(format: &'static str, key: &str) -> SourceError {
    SourceError::parse(
        format,
        format!("`{key}` is both a value and a parent of other keys"),
    )
}
