//! Plain-text codec for the client runtime.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Implements the `abstractions` serialization ports for
//! `text/plain`. A text payload is exactly one scalar, so every structured
//! operation (child nodes, collections, objects, keyed writes, additional
//! data) fails with [`SerializationError::Unsupported`].

use abstractions::{
    ensure_content_type, AdditionalData, NodeKind, Parsable, ParseNode, ParseNodeFactory,
    PrimitiveValue, SerializationError, SerializationWriter, SerializationWriterFactory,
    UntypedValue,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use uuid::Uuid;

/// The media type handled by this codec.
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

const NO_STRUCTURED_DATA: &str = "text does not support structured data";

fn unsupported() -> SerializationError {
    SerializationError::Unsupported {
        message: NO_STRUCTURED_DATA.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Parse node
// ---------------------------------------------------------------------------

/// Cursor over a plain-text payload.
///
/// Scalars are parsed from the trimmed text; the string extractor returns the
/// text verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextParseNode {
    text: String,
}

impl TextParseNode {
    /// Wraps the whole payload as a single scalar.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Decodes `content` as UTF-8.
    pub fn from_slice(content: &[u8]) -> Result<Self, SerializationError> {
        std::str::from_utf8(content)
            .map(Self::new)
            .map_err(|e| SerializationError::Malformed {
                message: e.to_string(),
            })
    }

    fn parse<T, E>(
        &self,
        expected: &'static str,
        parse: impl FnOnce(&str) -> Result<T, E>,
    ) -> Result<Option<T>, SerializationError> {
        let trimmed = self.text.trim();
        parse(trimmed)
            .map(Some)
            .map_err(|_| SerializationError::InvalidValue {
                expected,
                value: trimmed.to_owned(),
            })
    }
}

impl ParseNode for TextParseNode {
    fn kind(&self) -> NodeKind {
        NodeKind::String
    }

    fn get_child_node(&self, _key: &str) -> Result<Box<dyn ParseNode>, SerializationError> {
        Err(unsupported())
    }

    fn field_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn get_collection_of_child_nodes(
        &self,
    ) -> Result<Option<Vec<Box<dyn ParseNode>>>, SerializationError> {
        Err(unsupported())
    }

    fn get_string_value(&self) -> Result<Option<String>, SerializationError> {
        Ok(Some(self.text.clone()))
    }

    fn get_bool_value(&self) -> Result<Option<bool>, SerializationError> {
        self.parse("bool", |s| s.to_ascii_lowercase().parse::<bool>())
    }

    fn get_f32_value(&self) -> Result<Option<f32>, SerializationError> {
        self.parse("float32", str::parse::<f32>)
    }

    fn get_f64_value(&self) -> Result<Option<f64>, SerializationError> {
        self.parse("float64", str::parse::<f64>)
    }

    fn get_i32_value(&self) -> Result<Option<i32>, SerializationError> {
        self.parse("int32", str::parse::<i32>)
    }

    fn get_i64_value(&self) -> Result<Option<i64>, SerializationError> {
        self.parse("int64", str::parse::<i64>)
    }

    fn get_time_value(&self) -> Result<Option<DateTime<FixedOffset>>, SerializationError> {
        self.parse("time", DateTime::parse_from_rfc3339)
    }

    fn get_uuid_value(&self) -> Result<Option<Uuid>, SerializationError> {
        self.parse("uuid", Uuid::parse_str)
    }

    fn get_byte_array_value(&self) -> Result<Option<Vec<u8>>, SerializationError> {
        self.parse("base64", |s| STANDARD.decode(s))
    }

    fn get_untyped_value(&self) -> Result<Option<UntypedValue>, SerializationError> {
        Ok(Some(UntypedValue::String(self.text.clone())))
    }
}

/// Creates [`TextParseNode`]s for `text/plain` payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextParseNodeFactory;

impl TextParseNodeFactory {
    /// Creates the factory.
    pub fn new() -> Self {
        Self
    }
}

impl ParseNodeFactory for TextParseNodeFactory {
    fn valid_content_type(&self) -> Result<&str, SerializationError> {
        Ok(TEXT_CONTENT_TYPE)
    }

    fn get_root_parse_node(
        &self,
        content_type: &str,
        content: &[u8],
    ) -> Result<Box<dyn ParseNode>, SerializationError> {
        ensure_content_type(content_type, TEXT_CONTENT_TYPE)?;
        Ok(Box::new(TextParseNode::from_slice(content)?))
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Writes a single scalar as plain text.
#[derive(Debug, Default)]
pub struct TextSerializationWriter {
    text: Option<String>,
    closed: bool,
}

impl TextSerializationWriter {
    /// Creates an empty, open writer.
    pub fn new() -> Self {
        Self::default()
    }

    fn write(
        &mut self,
        key: Option<&str>,
        value: Option<String>,
    ) -> Result<(), SerializationError> {
        if self.closed {
            return Err(SerializationError::WriterClosed);
        }
        if key.is_some() {
            return Err(unsupported());
        }
        let Some(value) = value else {
            return Ok(());
        };
        if self.text.is_some() {
            return Err(SerializationError::Malformed {
                message: "a text payload holds a single value".to_owned(),
            });
        }
        self.text = Some(value);
        Ok(())
    }
}

impl SerializationWriter for TextSerializationWriter {
    fn write_string_value(
        &mut self,
        key: Option<&str>,
        value: Option<&str>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(str::to_owned))
    }

    fn write_bool_value(
        &mut self,
        key: Option<&str>,
        value: Option<bool>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(|b| b.to_string()))
    }

    fn write_f32_value(
        &mut self,
        key: Option<&str>,
        value: Option<f32>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(|f| f.to_string()))
    }

    fn write_f64_value(
        &mut self,
        key: Option<&str>,
        value: Option<f64>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(|f| f.to_string()))
    }

    fn write_i32_value(
        &mut self,
        key: Option<&str>,
        value: Option<i32>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(|i| i.to_string()))
    }

    fn write_i64_value(
        &mut self,
        key: Option<&str>,
        value: Option<i64>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(|i| i.to_string()))
    }

    fn write_time_value(
        &mut self,
        key: Option<&str>,
        value: Option<&DateTime<FixedOffset>>,
    ) -> Result<(), SerializationError> {
        self.write(
            key,
            value.map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
        )
    }

    fn write_uuid_value(
        &mut self,
        key: Option<&str>,
        value: Option<&Uuid>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(|u| u.hyphenated().to_string()))
    }

    fn write_byte_array_value(
        &mut self,
        key: Option<&str>,
        value: Option<&[u8]>,
    ) -> Result<(), SerializationError> {
        self.write(key, value.map(|b| STANDARD.encode(b)))
    }

    fn write_null_value(&mut self, key: Option<&str>) -> Result<(), SerializationError> {
        self.write(key, Some("null".to_owned()))
    }

    fn write_untyped_value(
        &mut self,
        key: Option<&str>,
        value: &UntypedValue,
    ) -> Result<(), SerializationError> {
        let text = match value {
            UntypedValue::Null => "null".to_owned(),
            UntypedValue::Bool(b) => b.to_string(),
            UntypedValue::Integer(i) => i.to_string(),
            UntypedValue::Float(f) => f.to_string(),
            UntypedValue::String(s) => s.clone(),
            UntypedValue::Array(_) | UntypedValue::Object(_) => return Err(unsupported()),
        };
        self.write(key, Some(text))
    }

    fn write_collection_of_primitive_values(
        &mut self,
        _key: Option<&str>,
        _values: Option<&[PrimitiveValue]>,
    ) -> Result<(), SerializationError> {
        Err(unsupported())
    }

    fn write_object_value(
        &mut self,
        _key: Option<&str>,
        _value: Option<&dyn Parsable>,
    ) -> Result<(), SerializationError> {
        Err(unsupported())
    }

    fn write_collection_of_object_values(
        &mut self,
        _key: Option<&str>,
        _values: Option<&[&dyn Parsable]>,
    ) -> Result<(), SerializationError> {
        Err(unsupported())
    }

    fn write_additional_data(&mut self, _data: &AdditionalData) -> Result<(), SerializationError> {
        Err(unsupported())
    }

    fn close(&mut self) -> Result<(), SerializationError> {
        self.closed = true;
        Ok(())
    }

    fn get_serialized_content(&mut self) -> Result<Vec<u8>, SerializationError> {
        if !self.closed {
            return Err(SerializationError::WriterNotClosed);
        }
        Ok(self.text.clone().unwrap_or_default().into_bytes())
    }
}

/// Creates [`TextSerializationWriter`]s for `text/plain`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSerializationWriterFactory;

impl TextSerializationWriterFactory {
    /// Creates the factory.
    pub fn new() -> Self {
        Self
    }
}

impl SerializationWriterFactory for TextSerializationWriterFactory {
    fn valid_content_type(&self) -> Result<&str, SerializationError> {
        Ok(TEXT_CONTENT_TYPE)
    }

    fn get_serialization_writer(
        &self,
        content_type: &str,
    ) -> Result<Box<dyn SerializationWriter>, SerializationError> {
        ensure_content_type(content_type, TEXT_CONTENT_TYPE)?;
        Ok(Box::new(TextSerializationWriter::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abstractions::PrimitiveType;

    fn node(text: &str) -> Box<dyn ParseNode> {
        TextParseNodeFactory::new()
            .get_root_parse_node("text/plain; charset=utf-8", text.as_bytes())
            .unwrap()
    }

    #[test]
    fn scalars_are_parsed_from_the_text() {
        assert_eq!(node("42\n").get_i32_value().unwrap(), Some(42));
        assert_eq!(node("TRUE").get_bool_value().unwrap(), Some(true));
        assert_eq!(node("2.5").get_f64_value().unwrap(), Some(2.5));
        assert_eq!(node(" hi ").get_string_value().unwrap().as_deref(), Some(" hi "));
        assert_eq!(
            node("8c9f4e2a-5b1d-4f57-9d7c-1e2a3b4c5d6e")
                .get_primitive_value(PrimitiveType::Uuid)
                .unwrap(),
            Some(PrimitiveValue::Uuid(
                Uuid::parse_str("8c9f4e2a-5b1d-4f57-9d7c-1e2a3b4c5d6e").unwrap()
            ))
        );
    }

    #[test]
    fn unparsable_scalar_is_an_invalid_value() {
        assert!(matches!(
            node("forty-two").get_i64_value(),
            Err(SerializationError::InvalidValue { expected: "int64", .. })
        ));
    }

    #[test]
    fn structured_reads_are_unsupported() {
        let root = node("x");
        assert!(matches!(root.get_child_node("a"), Err(SerializationError::Unsupported { .. })));
        assert!(matches!(
            root.get_collection_of_primitive_values("string"),
            Err(SerializationError::Unsupported { .. })
        ));
    }

    #[test]
    fn writer_emits_one_scalar() {
        let mut writer = TextSerializationWriterFactory::new()
            .get_serialization_writer(TEXT_CONTENT_TYPE)
            .unwrap();
        writer.write_i64_value(None, Some(-7)).unwrap();
        assert!(matches!(
            writer.write_string_value(None, Some("again")),
            Err(SerializationError::Malformed { .. })
        ));
        assert!(matches!(
            writer.write_string_value(Some("key"), Some("v")),
            Err(SerializationError::Unsupported { .. })
        ));
        writer.close().unwrap();

        assert_eq!(writer.get_serialized_content().unwrap(), b"-7".to_vec());
    }

    #[test]
    fn factories_reject_other_media_types() {
        assert!(matches!(
            TextParseNodeFactory::new().get_root_parse_node("application/json", b"1"),
            Err(SerializationError::UnsupportedMediaType { .. })
        ));
        assert!(matches!(
            TextSerializationWriterFactory::new().get_serialization_writer("application/json"),
            Err(SerializationError::UnsupportedMediaType { .. })
        ));
    }
}
