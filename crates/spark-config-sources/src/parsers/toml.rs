use ::toml::{Table, Value};
use spark_config::{PropertyMap, PropertyParser, PropertyValue, SourceError};

use crate::flatten::{self, Node};

const FORMAT: &str = "toml";

/// TOML 解析器。日期时间值以其文本形式保存。
#[derive(Clone, Copy, Debug, Default)]
pub struct TomlParser;

impl PropertyParser for TomlParser {
    fn unmarshal(&self, bytes: &[u8]) -> Result<PropertyMap, SourceError> {
        let text = std::str::from_utf8(bytes).map_err(|error| SourceError::parse(FORMAT, error))?;
        let table: Table = ::toml::from_str(text).map_err(|error| SourceError::parse(FORMAT, error))?;
        flatten::flatten(FORMAT, table_node(table))
    }

    fn marshal(&self, map: &PropertyMap) -> Result<Vec<u8>, SourceError> {
        let table = match flatten::unflatten(FORMAT, map)? {
            Node::Map(entries) => node_table(entries),
            _ => Table::new(),
        };
        ::toml::to_string(&table)
            .map(String::into_bytes)
            .map_err(|error| SourceError::parse(FORMAT, error))
    }
}

fn table_node(table: Table) -> Node {
    Node::Map(
        table
            .into_iter()
            .map(|(key, value)| (key, to_node(value)))
            .collect(),
    )
}

fn to_node(value: Value) -> Node {
    match value {
        Value::String(text) => Node::Scalar(PropertyValue::Text(text)),
        Value::Integer(integer) => Node::Scalar(PropertyValue::Integer(integer)),
        Value::Float(float) => Node::Scalar(PropertyValue::Float(float)),
        Value::Boolean(flag) => Node::Scalar(PropertyValue::Boolean(flag)),
        Value::Datetime(datetime) => Node::Scalar(PropertyValue::Text(datetime.to_string())),
        Value::Array(items) => Node::Seq(items.into_iter().map(to_node).collect()),
        Value::Table(table) => table_node(table),
    }
}

fn node_table(entries: Vec<(String, Node)>) -> Table {
    let mut table = Table::new();
    for (key, node) in entries {
        if let Some(value) = from_node(node) {
            table.insert(key, value);
        }
    }
    table
}

/// TOML 没有空值，`Node::Null` 被省略。
fn from_node(node: Node) -> Option<Value> {
    match node {
        Node::Null => None,
        Node::Scalar(value) => Some(scalar(value)),
        Node::Seq(items) => Some(Value::Array(items.into_iter().filter_map(from_node).collect())),
        Node::Map(entries) => Some(Value::Table(node_table(entries))),
    }
}

fn scalar(value: PropertyValue) -> Value {
    match value {
        PropertyValue::Boolean(flag) => Value::Boolean(flag),
        PropertyValue::Integer(integer) => Value::Integer(integer),
        PropertyValue::Float(float) => Value::Float(float),
        PropertyValue::Text(text) => Value::String(text),
        PropertyValue::List(items) => Value::Array(items.into_iter().map(scalar).collect()),
        other => Value::String(other.to_string()),
    }
}
