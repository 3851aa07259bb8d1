//! The deserialization cursor contract.

use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use crate::serialization::Parsable;
use crate::{PrimitiveType, PrimitiveValue, SerializationError, UntypedValue};

/// Shape of the value a [`ParseNode`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Explicit null (or, for some codecs, an empty payload).
    Null,
    /// Boolean scalar.
    Bool,
    /// Numeric scalar.
    Number,
    /// String scalar (timestamps, UUIDs and byte arrays are strings on most codecs).
    String,
    /// Ordered collection.
    Array,
    /// Keyed structure.
    Object,
}

impl NodeKind {
    /// Short name used in [`SerializationError::TypeMismatch`].
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Null => "null",
            NodeKind::Bool => "bool",
            NodeKind::Number => "number",
            NodeKind::String => "string",
            NodeKind::Array => "array",
            NodeKind::Object => "object",
        }
    }
}

/// A read-only position in a parsed payload.
///
/// Scalar extractors return `Ok(None)` when the node is null and
/// [`SerializationError::TypeMismatch`] when it holds a value of another
/// shape. Child nodes are independent values; nothing read through a child
/// affects its parent.
///
/// Generic extraction of models and enums (`get_object_value`,
/// `get_collection_of_object_values`, `get_enum_value`, ...) is provided by
/// inherent methods on `dyn ParseNode`, so codecs only implement the
/// object-safe primitives below.
pub trait ParseNode: Send + Sync {
    /// Shape of the current value.
    fn kind(&self) -> NodeKind;

    /// Returns a cursor on the member `key` of an object node.
    ///
    /// Fails with [`SerializationError::ChildNotFound`] when the member is absent.
    fn get_child_node(&self, key: &str) -> Result<Box<dyn ParseNode>, SerializationError>;

    /// Member names of an object node, in payload order. Empty for any other shape.
    fn field_names(&self) -> Vec<String>;

    /// Cursors on every element of an array node; `None` for a null node.
    fn get_collection_of_child_nodes(
        &self,
    ) -> Result<Option<Vec<Box<dyn ParseNode>>>, SerializationError>;

    /// Reads a string.
    fn get_string_value(&self) -> Result<Option<String>, SerializationError>;

    /// Reads a boolean.
    fn get_bool_value(&self) -> Result<Option<bool>, SerializationError>;

    /// Reads a 32-bit float.
    fn get_f32_value(&self) -> Result<Option<f32>, SerializationError>;

    /// Reads a 64-bit float.
    fn get_f64_value(&self) -> Result<Option<f64>, SerializationError>;

    /// Reads a 32-bit integer; out-of-range values are
    /// [`SerializationError::InvalidValue`].
    fn get_i32_value(&self) -> Result<Option<i32>, SerializationError>;

    /// Reads a 64-bit integer.
    fn get_i64_value(&self) -> Result<Option<i64>, SerializationError>;

    /// Reads a timestamp with offset.
    fn get_time_value(&self) -> Result<Option<DateTime<FixedOffset>>, SerializationError>;

    /// Reads a UUID.
    fn get_uuid_value(&self) -> Result<Option<Uuid>, SerializationError>;

    /// Reads an opaque byte array.
    fn get_byte_array_value(&self) -> Result<Option<Vec<u8>>, SerializationError>;

    /// Reads the value without a schema. Used to capture additional data.
    fn get_untyped_value(&self) -> Result<Option<UntypedValue>, SerializationError>;

    /// Reads an array of scalars of the type named `type_name`.
    ///
    /// Unknown type names fail with
    /// [`SerializationError::UnsupportedPrimitiveType`] even when the node is
    /// null. Null elements are skipped.
    fn get_collection_of_primitive_values(
        &self,
        type_name: &str,
    ) -> Result<Option<Vec<PrimitiveValue>>, SerializationError> {
        let ty: PrimitiveType = type_name.parse()?;
        let Some(children) = self.get_collection_of_child_nodes()? else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(children.len());
        for child in &children {
            if let Some(value) = read_primitive(child.as_ref(), ty)? {
                values.push(value);
            }
        }
        Ok(Some(values))
    }
}

/// Dispatches to the scalar extractor matching `ty`.
pub fn read_primitive(
    node: &dyn ParseNode,
    ty: PrimitiveType,
) -> Result<Option<PrimitiveValue>, SerializationError> {
    let value = match ty {
        PrimitiveType::String => node.get_string_value()?.map(PrimitiveValue::String),
        PrimitiveType::Bool => node.get_bool_value()?.map(PrimitiveValue::Bool),
        PrimitiveType::Float32 => node.get_f32_value()?.map(PrimitiveValue::Float32),
        PrimitiveType::Float64 => node.get_f64_value()?.map(PrimitiveValue::Float64),
        PrimitiveType::Int32 => node.get_i32_value()?.map(PrimitiveValue::Int32),
        PrimitiveType::Int64 => node.get_i64_value()?.map(PrimitiveValue::Int64),
        PrimitiveType::Time => node.get_time_value()?.map(PrimitiveValue::Time),
        PrimitiveType::Uuid => node.get_uuid_value()?.map(PrimitiveValue::Uuid),
        PrimitiveType::Bytes => node.get_byte_array_value()?.map(PrimitiveValue::Bytes),
    };
    Ok(value)
}

impl dyn ParseNode + '_ {
    /// Reads the scalar of type `ty`.
    pub fn get_primitive_value(
        &self,
        ty: PrimitiveType,
    ) -> Result<Option<PrimitiveValue>, SerializationError> {
        read_primitive(self, ty)
    }

    /// Builds a `T` from an object node; `None` for a null node.
    pub fn get_object_value<T: Parsable + Default>(&self) -> Result<Option<T>, SerializationError> {
        self.get_object_value_with(T::default)
    }

    /// Builds a model with `ctor` and populates it from an object node.
    pub fn get_object_value_with<T, F>(&self, ctor: F) -> Result<Option<T>, SerializationError>
    where
        T: Parsable,
        F: FnOnce() -> T,
    {
        match self.kind() {
            NodeKind::Null => Ok(None),
            NodeKind::Object => {
                let mut item = ctor();
                item.deserialize(self)?;
                Ok(Some(item))
            }
            other => Err(SerializationError::TypeMismatch {
                expected: "object",
                found: other.name(),
            }),
        }
    }

    /// Builds a `T` from every element of an array node. Null elements are skipped.
    pub fn get_collection_of_object_values<T: Parsable + Default>(
        &self,
    ) -> Result<Option<Vec<T>>, SerializationError> {
        self.get_collection_of_object_values_with(T::default)
    }

    /// Builds one model per array element with `ctor`.
    pub fn get_collection_of_object_values_with<T, F>(
        &self,
        ctor: F,
    ) -> Result<Option<Vec<T>>, SerializationError>
    where
        T: Parsable,
        F: Fn() -> T,
    {
        let Some(children) = self.get_collection_of_child_nodes()? else {
            return Ok(None);
        };
        let mut items = Vec::with_capacity(children.len());
        for child in &children {
            if let Some(item) = child.get_object_value_with(&ctor)? {
                items.push(item);
            }
        }
        Ok(Some(items))
    }

    /// Reads a string and converts it with the caller-supplied `parser`.
    ///
    /// Parser failures are reported as [`SerializationError::InvalidEnumValue`].
    pub fn get_enum_value<T, E, P>(&self, parser: P) -> Result<Option<T>, SerializationError>
    where
        E: std::fmt::Display,
        P: Fn(&str) -> Result<T, E>,
    {
        self.get_string_value()?
            .map(|raw| parse_enum(&raw, &parser))
            .transpose()
    }

    /// Reads an array of strings and converts each with `parser`.
    pub fn get_collection_of_enum_values<T, E, P>(
        &self,
        parser: P,
    ) -> Result<Option<Vec<T>>, SerializationError>
    where
        E: std::fmt::Display,
        P: Fn(&str) -> Result<T, E>,
    {
        let Some(children) = self.get_collection_of_child_nodes()? else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(children.len());
        for child in &children {
            if let Some(raw) = child.get_string_value()? {
                values.push(parse_enum(&raw, &parser)?);
            }
        }
        Ok(Some(values))
    }
}

fn parse_enum<T, E, P>(raw: &str, parser: &P) -> Result<T, SerializationError>
where
    E: std::fmt::Display,
    P: Fn(&str) -> Result<T, E>,
{
    parser(raw).map_err(|err| SerializationError::InvalidEnumValue {
        value: raw.to_owned(),
        reason: err.to_string(),
    })
}
