//! [`ParseNode`] over a `serde_json::Value` tree.

use std::sync::Arc;

use abstractions::{
    ensure_content_type, AdditionalData, NodeKind, ParseNode, ParseNodeFactory,
    SerializationError, UntypedValue,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use uuid::Uuid;

use crate::JSON_CONTENT_TYPE;

static NULL: Value = Value::Null;

/// Cursor on one value of a parsed JSON document.
///
/// Every cursor derived from a root shares the parsed tree and addresses its
/// own value with a JSON pointer (RFC 6901), so descending into children never
/// copies the document.
///
/// Timestamps are RFC 3339 strings, UUIDs are hyphenated strings and byte
/// arrays are standard (padded) base64 strings.
#[derive(Debug, Clone)]
pub struct JsonParseNode {
    root: Arc<Value>,
    pointer: String,
}

impl JsonParseNode {
    /// Wraps an already parsed document as a root cursor.
    pub fn new(value: Value) -> Self {
        Self {
            root: Arc::new(value),
            pointer: String::new(),
        }
    }

    /// Parses `content` as a JSON document.
    pub fn from_slice(content: &[u8]) -> Result<Self, SerializationError> {
        serde_json::from_slice(content)
            .map(Self::new)
            .map_err(|e| SerializationError::Malformed {
                message: e.to_string(),
            })
    }

    /// The underlying JSON value.
    pub fn value(&self) -> &Value {
        self.root.pointer(&self.pointer).unwrap_or(&NULL)
    }

    fn child(&self, token: &str) -> Self {
        let mut pointer = String::with_capacity(self.pointer.len() + token.len() + 1);
        pointer.push_str(&self.pointer);
        pointer.push('/');
        pointer.push_str(token);
        Self {
            root: Arc::clone(&self.root),
            pointer,
        }
    }

    fn member(&self, key: &str) -> Self {
        self.child(&key.replace('~', "~0").replace('/', "~1"))
    }

    fn element(&self, index: usize) -> Self {
        self.child(&index.to_string())
    }

    fn mismatch(&self, expected: &'static str) -> SerializationError {
        SerializationError::TypeMismatch {
            expected,
            found: self.kind().name(),
        }
    }

    fn str_value(&self, expected: &'static str) -> Result<Option<&str>, SerializationError> {
        match self.value() {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.as_str())),
            _ => Err(self.mismatch(expected)),
        }
    }

    fn number(
        &self,
        expected: &'static str,
    ) -> Result<Option<&serde_json::Number>, SerializationError> {
        match self.value() {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(Some(n)),
            _ => Err(self.mismatch(expected)),
        }
    }
}

impl PartialEq for JsonParseNode {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

fn invalid(expected: &'static str, value: impl ToString) -> SerializationError {
    SerializationError::InvalidValue {
        expected,
        value: value.to_string(),
    }
}

fn to_untyped(value: &Value) -> UntypedValue {
    match value {
        Value::Null => UntypedValue::Null,
        Value::Bool(b) => UntypedValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => UntypedValue::Integer(i),
            None => UntypedValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => UntypedValue::String(s.clone()),
        Value::Array(items) => UntypedValue::Array(items.iter().map(to_untyped).collect()),
        Value::Object(map) => UntypedValue::Object(
            map.iter()
                .map(|(k, v)| (k.as_str(), to_untyped(v)))
                .collect::<AdditionalData>(),
        ),
    }
}

impl ParseNode for JsonParseNode {
    fn kind(&self) -> NodeKind {
        match self.value() {
            Value::Null => NodeKind::Null,
            Value::Bool(_) => NodeKind::Bool,
            Value::Number(_) => NodeKind::Number,
            Value::String(_) => NodeKind::String,
            Value::Array(_) => NodeKind::Array,
            Value::Object(_) => NodeKind::Object,
        }
    }

    fn get_child_node(&self, key: &str) -> Result<Box<dyn ParseNode>, SerializationError> {
        match self.value() {
            Value::Object(map) if map.contains_key(key) => Ok(Box::new(self.member(key))),
            _ => Err(SerializationError::ChildNotFound {
                key: key.to_owned(),
            }),
        }
    }

    fn field_names(&self) -> Vec<String> {
        match self.value() {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn get_collection_of_child_nodes(
        &self,
    ) -> Result<Option<Vec<Box<dyn ParseNode>>>, SerializationError> {
        match self.value() {
            Value::Null => Ok(None),
            Value::Array(items) => Ok(Some(
                (0..items.len())
                    .map(|index| Box::new(self.element(index)) as Box<dyn ParseNode>)
                    .collect(),
            )),
            _ => Err(self.mismatch("array")),
        }
    }

    fn get_string_value(&self) -> Result<Option<String>, SerializationError> {
        Ok(self.str_value("string")?.map(str::to_owned))
    }

    fn get_bool_value(&self) -> Result<Option<bool>, SerializationError> {
        match self.value() {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(*b)),
            _ => Err(self.mismatch("bool")),
        }
    }

    fn get_f32_value(&self) -> Result<Option<f32>, SerializationError> {
        let Some(n) = self.number("number")? else {
            return Ok(None);
        };
        let wide = n.as_f64().ok_or_else(|| invalid("float32", n))?;
        let narrow = wide as f32;
        if narrow.is_finite() {
            Ok(Some(narrow))
        } else {
            Err(invalid("float32", n))
        }
    }

    fn get_f64_value(&self) -> Result<Option<f64>, SerializationError> {
        self.number("number")?
            .map(|n| n.as_f64().ok_or_else(|| invalid("float64", n)))
            .transpose()
    }

    fn get_i32_value(&self) -> Result<Option<i32>, SerializationError> {
        self.number("number")?
            .map(|n| {
                n.as_i64()
                    .and_then(|i| i32::try_from(i).ok())
                    .ok_or_else(|| invalid("int32", n))
            })
            .transpose()
    }

    fn get_i64_value(&self) -> Result<Option<i64>, SerializationError> {
        self.number("number")?
            .map(|n| n.as_i64().ok_or_else(|| invalid("int64", n)))
            .transpose()
    }

    fn get_time_value(&self) -> Result<Option<DateTime<FixedOffset>>, SerializationError> {
        self.str_value("string")?
            .map(|s| DateTime::parse_from_rfc3339(s).map_err(|_| invalid("time", s)))
            .transpose()
    }

    fn get_uuid_value(&self) -> Result<Option<Uuid>, SerializationError> {
        self.str_value("string")?
            .map(|s| Uuid::parse_str(s).map_err(|_| invalid("uuid", s)))
            .transpose()
    }

    fn get_byte_array_value(&self) -> Result<Option<Vec<u8>>, SerializationError> {
        self.str_value("string")?
            .map(|s| STANDARD.decode(s).map_err(|_| invalid("base64", s)))
            .transpose()
    }

    fn get_untyped_value(&self) -> Result<Option<UntypedValue>, SerializationError> {
        Ok(match self.value() {
            Value::Null => None,
            other => Some(to_untyped(other)),
        })
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Creates [`JsonParseNode`]s for `application/json` payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParseNodeFactory;

impl JsonParseNodeFactory {
    /// Creates the factory.
    pub fn new() -> Self {
        Self
    }
}

impl ParseNodeFactory for JsonParseNodeFactory {
    fn valid_content_type(&self) -> Result<&str, SerializationError> {
        Ok(JSON_CONTENT_TYPE)
    }

    fn get_root_parse_node(
        &self,
        content_type: &str,
        content: &[u8],
    ) -> Result<Box<dyn ParseNode>, SerializationError> {
        ensure_content_type(content_type, JSON_CONTENT_TYPE)?;
        Ok(Box::new(JsonParseNode::from_slice(content)?))
    }
}
