//! [`SerializationWriter`] producing JSON.
//!
//! The writer builds a tree of nodes on a stack of open containers and renders
//! it once, on [`SerializationWriter::close`]. A keyed write with no open
//! container starts an implicit root object; a key-less write with no open
//! container sets the root value itself.
//!
//! Object members are emitted in the order they were written. Writing the same
//! key twice emits it twice; the writer does not deduplicate.
//!
//! A key-less [`SerializationWriter::write_object_value`] inside an open object
//! merges the model's members into that object instead of nesting it.

use abstractions::{
    ensure_content_type, validate_key, AdditionalData, Parsable, PrimitiveValue,
    SerializationError, SerializationWriter, SerializationWriterFactory, UntypedValue,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::JSON_CONTENT_TYPE;

/// A written value. Objects keep every member in call order.
#[derive(Debug)]
enum Node {
    Value(Value),
    Object(Vec<(String, Node)>),
    Array(Vec<Node>),
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Value(value) => value.serialize(serializer),
            Node::Object(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (key, value) in members {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Node::Array(items) => serializer.collect_seq(items),
        }
    }
}

#[derive(Debug)]
struct Frame {
    key: Option<String>,
    node: Node,
}

impl Frame {
    fn object(key: Option<&str>) -> Self {
        Self {
            key: key.map(str::to_owned),
            node: Node::Object(Vec::new()),
        }
    }

    fn array(key: Option<&str>) -> Self {
        Self {
            key: key.map(str::to_owned),
            node: Node::Array(Vec::new()),
        }
    }
}

/// Writes a JSON document.
#[derive(Debug, Default)]
pub struct JsonSerializationWriter {
    stack: Vec<Frame>,
    root: Option<Node>,
    content: Vec<u8>,
    closed: bool,
}

impl JsonSerializationWriter {
    /// Creates an empty, open writer.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), SerializationError> {
        if self.closed {
            Err(SerializationError::WriterClosed)
        } else {
            Ok(())
        }
    }

    fn check(&self, key: Option<&str>) -> Result<(), SerializationError> {
        self.ensure_open()?;
        validate_key(key)
    }

    /// Stores `node` under `key` in the innermost open container.
    fn put(&mut self, key: Option<&str>, node: Node) -> Result<(), SerializationError> {
        if key.is_some() && self.stack.is_empty() {
            if self.root.is_some() {
                return Err(malformed("the document root has already been written"));
            }
            self.stack.push(Frame::object(None));
        }

        let Some(frame) = self.stack.last_mut() else {
            if self.root.is_some() {
                return Err(malformed("the document root has already been written"));
            }
            self.root = Some(node);
            return Ok(());
        };

        match (&mut frame.node, key) {
            (Node::Object(members), Some(key)) => {
                members.push((key.to_owned(), node));
                Ok(())
            }
            (Node::Array(items), None) => {
                items.push(node);
                Ok(())
            }
            (Node::Object(_), None) => Err(malformed("a value inside an object needs a key")),
            (Node::Array(_), Some(key)) => Err(malformed(format!(
                "collection elements cannot be keyed (got '{key}')"
            ))),
            (Node::Value(_), _) => Err(malformed("an open container must be an object or array")),
        }
    }

    fn write(&mut self, key: Option<&str>, value: Option<Value>) -> Result<(), SerializationError> {
        self.check(key)?;
        match value {
            Some(value) => self.put(key, Node::Value(value)),
            None => Ok(()),
        }
    }

    fn pop_frame(&mut self) -> Result<(), SerializationError> {
        let Some(frame) = self.stack.pop() else {
            return Err(malformed("no open container to finish"));
        };
        self.put(frame.key.as_deref(), frame.node)
    }

    /// Runs `fill` inside a freshly opened `frame`, then closes it into its
    /// parent. On failure every frame opened since the call is discarded.
    fn nested(
        &mut self,
        frame: Frame,
        fill: impl FnOnce(&mut Self) -> Result<(), SerializationError>,
    ) -> Result<(), SerializationError> {
        let depth = self.stack.len();
        self.stack.push(frame);
        match fill(self) {
            Ok(()) => self.pop_frame(),
            Err(error) => {
                self.stack.truncate(depth);
                Err(error)
            }
        }
    }

    fn serialize_object(
        &mut self,
        key: Option<&str>,
        value: &dyn Parsable,
    ) -> Result<(), SerializationError> {
        let merge = key.is_none()
            && matches!(
                self.stack.last(),
                Some(Frame {
                    node: Node::Object(_),
                    ..
                })
            );
        if merge {
            return value.serialize(self);
        }
        self.nested(Frame::object(key), |writer| value.serialize(writer))
    }
}

fn malformed(message: impl Into<String>) -> SerializationError {
    SerializationError::Malformed {
        message: message.into(),
    }
}

fn float(
    expected: &'static str,
    value: f64,
    shown: impl ToString,
) -> Result<Value, SerializationError> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| SerializationError::InvalidValue {
            expected,
            value: shown.to_string(),
        })
}

fn f32_to_json(value: f32) -> Result<Value, SerializationError> {
    // Go through the shortest decimal form so 0.1f32 renders as 0.1.
    let wide = value.to_string().parse::<f64>().unwrap_or(f64::NAN);
    float("float32", wide, value)
}

fn time_to_json(value: &DateTime<FixedOffset>) -> Value {
    Value::String(value.to_rfc3339_opts(SecondsFormat::AutoSi, false))
}

fn primitive_to_json(value: &PrimitiveValue) -> Result<Value, SerializationError> {
    Ok(match value {
        PrimitiveValue::String(s) => Value::String(s.clone()),
        PrimitiveValue::Bool(b) => Value::Bool(*b),
        PrimitiveValue::Float32(f) => f32_to_json(*f)?,
        PrimitiveValue::Float64(f) => float("float64", *f, f)?,
        PrimitiveValue::Int32(i) => Value::from(*i),
        PrimitiveValue::Int64(i) => Value::from(*i),
        PrimitiveValue::Time(t) => time_to_json(t),
        PrimitiveValue::Uuid(u) => Value::String(u.hyphenated().to_string()),
        PrimitiveValue::Bytes(b) => Value::String(STANDARD.encode(b)),
    })
}

fn untyped_to_json(value: &UntypedValue) -> Result<Value, SerializationError> {
    Ok(match value {
        UntypedValue::Null => Value::Null,
        UntypedValue::Bool(b) => Value::Bool(*b),
        UntypedValue::Integer(i) => Value::from(*i),
        UntypedValue::Float(f) => float("float", *f, f)?,
        UntypedValue::String(s) => Value::String(s.clone()),
        UntypedValue::Array(items) => Value::Array(
            items
                .iter()
                .map(untyped_to_json)
                .collect::<Result<_, _>>()?,
        ),
        UntypedValue::Object(data) => {
            let mut map = Map::new();
            for (key, item) in data.iter() {
                map.insert(key.to_owned(), untyped_to_json(item)?);
            }
            Value::Object(map)
        }
    })
}

impl SerializationWriter for JsonSerializationWriter {
    fn write_string_value(
        &mut self,
        key: Option<&str>,
        value: Option<&str>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(|s| Value::String(s.to_owned())))
    }

    fn write_bool_value(
        &mut self,
        key: Option<&str>,
        value: Option<bool>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(Value::Bool))
    }

    fn write_f32_value(
        &mut self,
        key: Option<&str>,
        value: Option<f32>,
    ) -> Result<(), SerializationError> {
        self.check(key)?;
        let value = value.map(f32_to_json).transpose()?;
        self.write(key, value)
    }

    fn write_f64_value(
        &mut self,
        key: Option<&str>,
        value: Option<f64>,
    ) -> Result<(), SerializationError> {
        self.check(key)?;
        let value = value.map(|f| float("float64", f, f)).transpose()?;
        self.write(key, value)
    }

    fn write_i32_value(
        &mut self,
        key: Option<&str>,
        value: Option<i32>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(Value::from))
    }

    fn write_i64_value(
        &mut self,
        key: Option<&str>,
        value: Option<i64>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(Value::from))
    }

    fn write_time_value(
        &mut self,
        key: Option<&str>,
        value: Option<&DateTime<FixedOffset>>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(time_to_json))
    }

    fn write_uuid_value(
        &mut self,
        key: Option<&str>,
        value: Option<&Uuid>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(|u| Value::String(u.hyphenated().to_string())))
    }

    fn write_byte_array_value(
        &mut self,
        key: Option<&str>,
        value: Option<&[u8]>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(|b| Value::String(STANDARD.encode(b))))
    }

    fn write_null_value(&mut self, key: Option<&str>) -> Result<(), SerializationError> {
        self.write(key, Some(Value::Null))
    }

    fn write_untyped_value(
        &mut self,
        key: Option<&str>,
        value: &UntypedValue,
    ) -> Result<(), SerializationError> {
        self.check(key)?;
        let value = untyped_to_json(value)?;
        self.put(key, Node::Value(value))
    }

    fn write_collection_of_primitive_values(
        &mut self,
        key: Option<&str>,
        values: Option<&[PrimitiveValue]>,
    ) -> Result<(), SerializationError> {
        self.check(key)?;
        let Some(values) = values else {
            return Ok(());
        };
        let items = values
            .iter()
            .map(primitive_to_json)
            .collect::<Result<Vec<_>, _>>()?;
        self.put(key, Node::Value(Value::Array(items)))
    }

    fn write_object_value(
        &mut self,
        key: Option<&str>,
        value: Option<&dyn Parsable>,
    ) -> Result<(), SerializationError> {
        self.check(key)?;
        match value {
            Some(value) => self.serialize_object(key, value),
            None => Ok(()),
        }
    }

    fn write_collection_of_object_values(
        &mut self,
        key: Option<&str>,
        values: Option<&[&dyn Parsable]>,
    ) -> Result<(), SerializationError> {
        self.check(key)?;
        let Some(values) = values else {
            return Ok(());
        };
        self.nested(Frame::array(key), |writer| {
            for value in values {
                writer.nested(Frame::object(None), |writer| value.serialize(writer))?;
            }
            Ok(())
        })
    }

    fn write_additional_data(&mut self, data: &AdditionalData) -> Result<(), SerializationError> {
        self.ensure_open()?;
        for (key, value) in data.iter() {
            self.write_untyped_value(Some(key), value)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SerializationError> {
        if self.closed {
            return Ok(());
        }
        while !self.stack.is_empty() {
            self.pop_frame()?;
        }
        self.content = match &self.root {
            Some(root) => serde_json::to_vec(root).map_err(|e| malformed(e.to_string()))?,
            None => Vec::new(),
        };
        self.closed = true;
        Ok(())
    }

    fn get_serialized_content(&mut self) -> Result<Vec<u8>, SerializationError> {
        if !self.closed {
            return Err(SerializationError::WriterNotClosed);
        }
        Ok(self.content.clone())
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Creates [`JsonSerializationWriter`]s for `application/json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializationWriterFactory;

impl JsonSerializationWriterFactory {
    /// Creates the factory.
    pub fn new() -> Self {
        Self
    }
}

impl SerializationWriterFactory for JsonSerializationWriterFactory {
    fn valid_content_type(&self) -> Result<&str, SerializationError> {
        Ok(JSON_CONTENT_TYPE)
    }

    fn get_serialization_writer(
        &self,
        content_type: &str,
    ) -> Result<Box<dyn SerializationWriter>, SerializationError> {
        ensure_content_type(content_type, JSON_CONTENT_TYPE)?;
        Ok(Box::new(JsonSerializationWriter::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(writer: &mut JsonSerializationWriter) -> String {
        writer.close().unwrap();
        String::from_utf8(writer.get_serialized_content().unwrap()).unwrap()
    }

    /// Writes one member, then fails.
    struct HalfWritten;

    impl Parsable for HalfWritten {
        fn deserialize_field(
            &mut self,
            _name: &str,
            _node: &dyn abstractions::ParseNode,
        ) -> Result<bool, SerializationError> {
            Ok(false)
        }

        fn serialize(
            &self,
            writer: &mut dyn SerializationWriter,
        ) -> Result<(), SerializationError> {
            writer.write_i32_value(Some("partial"), Some(1))?;
            Err(SerializationError::InvalidValue {
                expected: "anything",
                value: "nothing".into(),
            })
        }
    }

    struct Named(&'static str);

    impl Parsable for Named {
        fn deserialize_field(
            &mut self,
            _name: &str,
            _node: &dyn abstractions::ParseNode,
        ) -> Result<bool, SerializationError> {
            Ok(false)
        }

        fn serialize(
            &self,
            writer: &mut dyn SerializationWriter,
        ) -> Result<(), SerializationError> {
            writer.write_string_value(Some("name"), Some(self.0))
        }
    }

    #[test]
    fn repeated_keys_are_emitted_in_call_order() {
        let mut writer = JsonSerializationWriter::new();
        writer.write_i32_value(Some("a"), Some(1)).unwrap();
        writer.write_i32_value(Some("b"), Some(2)).unwrap();
        writer.write_i32_value(Some("a"), Some(3)).unwrap();

        assert_eq!(render(&mut writer), r#"{"a":1,"b":2,"a":3}"#);
    }

    #[test]
    fn failed_nested_object_leaves_the_enclosing_object_open() {
        let mut writer = JsonSerializationWriter::new();
        writer.write_string_value(Some("first"), Some("a")).unwrap();
        assert!(writer
            .write_object_value(Some("bad"), Some(&HalfWritten as &dyn Parsable))
            .is_err());
        writer.write_string_value(Some("after"), Some("b")).unwrap();

        assert_eq!(render(&mut writer), r#"{"first":"a","after":"b"}"#);
    }

    #[test]
    fn failed_collection_element_discards_the_whole_collection() {
        let mut writer = JsonSerializationWriter::new();
        writer.write_string_value(Some("first"), Some("a")).unwrap();
        let items: [&dyn Parsable; 2] = [&Named("ok"), &HalfWritten];
        assert!(writer
            .write_collection_of_object_values(Some("items"), Some(&items[..]))
            .is_err());
        writer.write_string_value(Some("after"), Some("b")).unwrap();

        assert_eq!(render(&mut writer), r#"{"first":"a","after":"b"}"#);
    }

    #[test]
    fn collections_of_objects_nest_in_order() {
        let mut writer = JsonSerializationWriter::new();
        let items: [&dyn Parsable; 2] = [&Named("x"), &Named("y")];
        writer
            .write_collection_of_object_values(Some("items"), Some(&items[..]))
            .unwrap();

        assert_eq!(render(&mut writer), r#"{"items":[{"name":"x"},{"name":"y"}]}"#);
    }

    #[test]
    fn keyed_writes_build_an_implicit_root_object() {
        let mut writer = JsonSerializationWriter::new();
        writer.write_string_value(Some("name"), Some("Ada")).unwrap();
        writer.write_i32_value(Some("age"), Some(36)).unwrap();
        writer.write_bool_value(Some("skipped"), None).unwrap();
        writer.write_null_value(Some("nickname")).unwrap();

        assert_eq!(
            render(&mut writer),
            r#"{"name":"Ada","age":36,"nickname":null}"#
        );
    }

    #[test]
    fn key_less_scalar_becomes_the_root() {
        let mut writer = JsonSerializationWriter::new();
        writer.write_f32_value(None, Some(0.1)).unwrap();
        assert_eq!(render(&mut writer), "0.1");
    }

    #[test]
    fn second_root_value_is_rejected() {
        let mut writer = JsonSerializationWriter::new();
        writer.write_i64_value(None, Some(1)).unwrap();
        assert!(matches!(
            writer.write_i64_value(None, Some(2)),
            Err(SerializationError::Malformed { .. })
        ));
    }

    #[test]
    fn non_finite_floats_are_invalid() {
        let mut writer = JsonSerializationWriter::new();
        assert!(matches!(
            writer.write_f64_value(Some("x"), Some(f64::NAN)),
            Err(SerializationError::InvalidValue { expected: "float64", .. })
        ));
    }

    #[test]
    fn content_requires_close_and_writes_after_close_fail() {
        let mut writer = JsonSerializationWriter::new();
        writer.write_string_value(Some("a"), Some("b")).unwrap();
        assert!(matches!(
            writer.get_serialized_content(),
            Err(SerializationError::WriterNotClosed)
        ));

        writer.close().unwrap();
        writer.close().unwrap();
        assert!(matches!(
            writer.write_string_value(Some("c"), Some("d")),
            Err(SerializationError::WriterClosed)
        ));
        assert_eq!(writer.get_serialized_content().unwrap(), br#"{"a":"b"}"#.to_vec());
    }

    #[test]
    fn primitive_collections_keep_order() {
        let mut writer = JsonSerializationWriter::new();
        let values = [
            PrimitiveValue::Int32(3),
            PrimitiveValue::Bytes(vec![1u8, 2, 3]),
            PrimitiveValue::String("x".into()),
        ];
        writer
            .write_collection_of_primitive_values(Some("items"), Some(&values[..]))
            .unwrap();

        assert_eq!(render(&mut writer), r#"{"items":[3,"AQID","x"]}"#);
    }

    #[test]
    fn empty_key_is_rejected() {
        let mut writer = JsonSerializationWriter::new();
        assert!(matches!(
            writer.write_string_value(Some(""), Some("x")),
            Err(SerializationError::EmptyKey)
        ));
    }
}
