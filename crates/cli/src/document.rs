//! A schema-less model and the JSON rendering of decoded responses.

use abstractions::{
    AdditionalData, NodeKind, Parsable, ParseNode, PrimitiveValue, SerializationError,
    SerializationWriter,
};
use serialization_json::{JsonParseNode, JsonSerializationWriter};

/// Model that keeps every member it is given as additional data.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Document {
    pub fields: AdditionalData,
}

impl Document {
    /// Parses a JSON object, e.g. a request body given on the command line.
    pub fn from_json(json: &str) -> Result<Self, SerializationError> {
        let node = JsonParseNode::from_slice(json.as_bytes())?;
        if node.kind() != NodeKind::Object {
            return Err(SerializationError::TypeMismatch {
                expected: "object",
                found: node.kind().name(),
            });
        }
        let mut document = Document::default();
        document.deserialize(&node)?;
        Ok(document)
    }
}

impl Parsable for Document {
    fn deserialize_field(
        &mut self,
        _name: &str,
        _node: &dyn ParseNode,
    ) -> Result<bool, SerializationError> {
        Ok(false)
    }

    fn additional_data_mut(&mut self) -> Option<&mut AdditionalData> {
        Some(&mut self.fields)
    }

    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<(), SerializationError> {
        writer.write_additional_data(&self.fields)
    }
}

/// A decoded response in one of the supported shapes.
#[derive(Debug)]
pub enum Decoded {
    Object(Document),
    Collection(Vec<Document>),
    Primitive(PrimitiveValue),
    Primitives(Vec<PrimitiveValue>),
}

impl Decoded {
    /// Renders the value as JSON.
    pub fn to_json(&self) -> Result<String, SerializationError> {
        let mut writer = JsonSerializationWriter::new();
        let w: &mut dyn SerializationWriter = &mut writer;
        match self {
            Decoded::Object(document) => {
                w.write_object_value(None, Some(document as &dyn Parsable))?
            }
            Decoded::Collection(documents) => {
                w.write_collection_of_object_values_of(None, Some(documents.as_slice()))?
            }
            Decoded::Primitive(value) => w.write_primitive_value(None, value)?,
            Decoded::Primitives(values) => {
                w.write_collection_of_primitive_values(None, Some(values.as_slice()))?
            }
        }
        w.close()?;
        let content = w.get_serialized_content()?;
        Ok(String::from_utf8_lossy(&content).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abstractions::UntypedValue;

    #[test]
    fn every_member_lands_in_fields() {
        let document =
            Document::from_json(r#"{"b": 1, "a": [true, null], "c": {"d": "e"}}"#).unwrap();

        assert_eq!(document.fields.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(
            document.fields.get("a"),
            Some(&UntypedValue::Array(vec![UntypedValue::Bool(true), UntypedValue::Null]))
        );
    }

    #[test]
    fn object_renders_in_member_order() {
        let document = Document::from_json(r#"{"z": "last?", "a": 2}"#).unwrap();

        assert_eq!(
            Decoded::Object(document).to_json().unwrap(),
            r#"{"z":"last?","a":2}"#
        );
    }

    #[test]
    fn collections_and_primitives_render() {
        let docs = vec![
            Document::from_json(r#"{"id": 1}"#).unwrap(),
            Document::from_json(r#"{"id": 2}"#).unwrap(),
        ];
        assert_eq!(
            Decoded::Collection(docs).to_json().unwrap(),
            r#"[{"id":1},{"id":2}]"#
        );

        assert_eq!(
            Decoded::Primitive(PrimitiveValue::Int64(42)).to_json().unwrap(),
            "42"
        );
        assert_eq!(
            Decoded::Primitives(vec![
                PrimitiveValue::String("a".into()),
                PrimitiveValue::Bool(false)
            ])
            .to_json()
            .unwrap(),
            r#"["a",false]"#
        );
    }

    #[test]
    fn malformed_body_is_rejected() {
        assert!(Document::from_json("{not json").is_err());
        assert!(matches!(
            Document::from_json("[1, 2]"),
            Err(SerializationError::TypeMismatch { expected: "object", found: "array" })
        ));
    }
}
