use serde_json::{Map, Value};
use spark_config::{PropertyMap, PropertyParser, PropertyValue, SourceError};

use crate::flatten::{self, Node};

const FORMAT: &str = "json";

/// JSON 解析器，展开规则与 [`YamlParser`](crate::YamlParser) 一致。
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonParser;

impl PropertyParser for JsonParser {
    fn unmarshal(&self, bytes: &[u8]) -> Result<PropertyMap, SourceError> {
        let document: Value =
            serde_json::from_slice(bytes).map_err(|error| SourceError::parse(FORMAT, error))?;
        flatten::flatten(FORMAT, to_node(document))
    }

    fn marshal(&self, map: &PropertyMap) -> Result<Vec<u8>, SourceError> {
        let tree = flatten::unflatten(FORMAT, map)?;
        serde_json::to_vec_pretty(&from_node(tree)).map_err(|error| SourceError::parse(FORMAT, error))
    }
}

fn to_node(value: Value) -> Node {
    match value {
        Value::Null => Node::Null,
        Value::Bool(flag) => Node::Scalar(PropertyValue::Boolean(flag)),
        Value::Number(number) => Node::Scalar(match number.as_i64() {
            Some(integer) => PropertyValue::Integer(integer),
            None => PropertyValue::Float(number.as_f64().unwrap_or(f64::NAN)),
        }),
        Value::String(text) => Node::Scalar(PropertyValue::Text(text)),
        Value::Array(items) => Node::Seq(items.into_iter().map(to_node).collect()),
        Value::Object(object) => Node::Map(
            object
                .into_iter()
                .map(|(key, value)| (key, to_node(value)))
                .collect(),
        ),
    }
}

fn from_node(node: Node) -> Value {
    match node {
        Node::Null => Value::Null,
        Node::Scalar(value) => scalar(value),
        Node::Seq(items) => Value::Array(items.into_iter().map(from_node).collect()),
        Node::Map(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key, from_node(value)))
                .collect::<Map<_, _>>(),
        ),
    }
}

fn scalar(value: PropertyValue) -> Value {
    match value {
        PropertyValue::Boolean(flag) => Value::Bool(flag),
        PropertyValue::Integer(integer) => Value::from(integer),
        PropertyValue::Float(float) => Value::from(float),
        PropertyValue::Text(text) => Value::String(text),
        PropertyValue::List(items) => Value::Array(items.into_iter().map(scalar).collect()),
        other => Value::String(other.to_string()),
    }
}
