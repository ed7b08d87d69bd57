use serde_yaml::{Mapping, Value};
use spark_config::{PropertyMap, PropertyParser, PropertyValue, SourceError};

use crate::flatten::{self, Node};

const FORMAT: &str = "yaml";

/// YAML 解析器：嵌套映射展开为点分键，序列保留为列表。
///
/// 映射键允许是字符串、数字或布尔值，统一转为字符串；
/// 自定义标签（`!tag value`）被忽略，只保留其内容。
#[derive(Clone, Copy, Debug, Default)]
pub struct YamlParser;

impl PropertyParser for YamlParser {
    fn unmarshal(&self, bytes: &[u8]) -> Result<PropertyMap, SourceError> {
        let document: Value =
            serde_yaml::from_slice(bytes).map_err(|error| SourceError::parse(FORMAT, error))?;
        flatten::flatten(FORMAT, to_node(document)?)
    }

    fn marshal(&self, map: &PropertyMap) -> Result<Vec<u8>, SourceError> {
        let tree = flatten::unflatten(FORMAT, map)?;
        serde_yaml::to_string(&from_node(tree))
            .map(String::into_bytes)
            .map_err(|error| SourceError::parse(FORMAT, error))
    }
}

fn to_node(value: Value) -> Result<Node, SourceError> {
    Ok(match value {
        Value::Null => Node::Null,
        Value::Bool(flag) => Node::Scalar(PropertyValue::Boolean(flag)),
        Value::Number(number) => Node::Scalar(match number.as_i64() {
            Some(integer) => PropertyValue::Integer(integer),
            None => PropertyValue::Float(number.as_f64().unwrap_or(f64::NAN)),
        }),
        Value::String(text) => Node::Scalar(PropertyValue::Text(text)),
        Value::Sequence(items) => Node::Seq(
            items
                .into_iter()
                .map(to_node)
                .collect::<Result<_, _>>()?,
        ),
        Value::Mapping(mapping) => {
            let mut entries = Vec::with_capacity(mapping.len());
            for (key, value) in mapping {
                entries.push((mapping_key(key)?, to_node(value)?));
            }
            Node::Map(entries)
        }
        Value::Tagged(tagged) => to_node(tagged.value)?,
    })
}

fn mapping_key(key: Value) -> Result<String, SourceError> {
    match key {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(SourceError::parse(
            FORMAT,
            format!("unsupported mapping key `{other:?}`"),
        )),
    }
}

fn from_node(node: Node) -> Value {
    match node {
        Node::Null => Value::Null,
        Node::Scalar(value) => scalar(value),
        Node::Seq(items) => Value::Sequence(items.into_iter().map(from_node).collect()),
        Node::Map(entries) => {
            let mut mapping = Mapping::with_capacity(entries.len());
            for (key, value) in entries {
                mapping.insert(Value::String(key), from_node(value));
            }
            Value::Mapping(mapping)
        }
    }
}

fn scalar(value: PropertyValue) -> Value {
    match value {
        PropertyValue::Boolean(flag) => Value::Bool(flag),
        PropertyValue::Integer(integer) => Value::Number(integer.into()),
        PropertyValue::Float(float) => Value::Number(float.into()),
        PropertyValue::Text(text) => Value::String(text),
        PropertyValue::List(items) => Value::Sequence(items.into_iter().map(scalar).collect()),
        other => Value::String(other.to_string()),
    }
}
