//! The serialization sink contract.

use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use crate::serialization::Parsable;
use crate::{AdditionalData, PrimitiveValue, SerializationError, UntypedValue};

/// Write-only accumulator producing a serialized payload.
///
/// Every write takes a `key`: `Some(name)` writes a member of the current
/// object, `None` writes at the document root or appends to the collection
/// being written. Keys must be non-empty
/// ([`SerializationError::EmptyKey`]). A `None` value is skipped; use
/// [`SerializationWriter::write_null_value`] for an explicit null.
///
/// The payload is only available after [`SerializationWriter::close`]; any
/// write after close fails with [`SerializationError::WriterClosed`]. Writers
/// neither reorder nor deduplicate keys; duplicate keys are the caller's error.
pub trait SerializationWriter: Send {
    /// Writes a string.
    fn write_string_value(
        &mut self,
        key: Option<&str>,
        value: Option<&str>,
    ) -> Result<(), SerializationError>;

    /// Writes a boolean.
    fn write_bool_value(
        &mut self,
        key: Option<&str>,
        value: Option<bool>,
    ) -> Result<(), SerializationError>;

    /// Writes a 32-bit float.
    fn write_f32_value(
        &mut self,
        key: Option<&str>,
        value: Option<f32>,
    ) -> Result<(), SerializationError>;

    /// Writes a 64-bit float.
    fn write_f64_value(
        &mut self,
        key: Option<&str>,
        value: Option<f64>,
    ) -> Result<(), SerializationError>;

    /// Writes a 32-bit integer.
    fn write_i32_value(
        &mut self,
        key: Option<&str>,
        value: Option<i32>,
    ) -> Result<(), SerializationError>;

    /// Writes a 64-bit integer.
    fn write_i64_value(
        &mut self,
        key: Option<&str>,
        value: Option<i64>,
    ) -> Result<(), SerializationError>;

    /// Writes a timestamp.
    fn write_time_value(
        &mut self,
        key: Option<&str>,
        value: Option<&DateTime<FixedOffset>>,
    ) -> Result<(), SerializationError>;

    /// Writes a UUID.
    fn write_uuid_value(
        &mut self,
        key: Option<&str>,
        value: Option<&Uuid>,
    ) -> Result<(), SerializationError>;

    /// Writes an opaque byte array.
    fn write_byte_array_value(
        &mut self,
        key: Option<&str>,
        value: Option<&[u8]>,
    ) -> Result<(), SerializationError>;

    /// Writes an explicit null.
    fn write_null_value(&mut self, key: Option<&str>) -> Result<(), SerializationError>;

    /// Writes a schema-less value, recursing into arrays and objects.
    fn write_untyped_value(
        &mut self,
        key: Option<&str>,
        value: &UntypedValue,
    ) -> Result<(), SerializationError>;

    /// Writes a collection of scalars, preserving order.
    fn write_collection_of_primitive_values(
        &mut self,
        key: Option<&str>,
        values: Option<&[PrimitiveValue]>,
    ) -> Result<(), SerializationError>;

    /// Writes a nested model by letting it serialize itself into a new object.
    fn write_object_value(
        &mut self,
        key: Option<&str>,
        value: Option<&dyn Parsable>,
    ) -> Result<(), SerializationError>;

    /// Writes a collection of models, preserving order.
    fn write_collection_of_object_values(
        &mut self,
        key: Option<&str>,
        values: Option<&[&dyn Parsable]>,
    ) -> Result<(), SerializationError>;

    /// Writes every entry of `data` as a member of the current object, in
    /// order, each key exactly once.
    fn write_additional_data(&mut self, data: &AdditionalData) -> Result<(), SerializationError>;

    /// Signals that no more writes follow and finalises the payload.
    /// Closing twice is a no-op.
    fn close(&mut self) -> Result<(), SerializationError>;

    /// Returns the finished payload. Fails with
    /// [`SerializationError::WriterNotClosed`] before [`SerializationWriter::close`].
    fn get_serialized_content(&mut self) -> Result<Vec<u8>, SerializationError>;

    /// Writes one scalar, dispatching on its type.
    fn write_primitive_value(
        &mut self,
        key: Option<&str>,
        value: &PrimitiveValue,
    ) -> Result<(), SerializationError> {
        match value {
            PrimitiveValue::String(v) => self.write_string_value(key, Some(v.as_str())),
            PrimitiveValue::Bool(v) => self.write_bool_value(key, Some(*v)),
            PrimitiveValue::Float32(v) => self.write_f32_value(key, Some(*v)),
            PrimitiveValue::Float64(v) => self.write_f64_value(key, Some(*v)),
            PrimitiveValue::Int32(v) => self.write_i32_value(key, Some(*v)),
            PrimitiveValue::Int64(v) => self.write_i64_value(key, Some(*v)),
            PrimitiveValue::Time(v) => self.write_time_value(key, Some(v)),
            PrimitiveValue::Uuid(v) => self.write_uuid_value(key, Some(v)),
            PrimitiveValue::Bytes(v) => self.write_byte_array_value(key, Some(v.as_slice())),
        }
    }
}

impl dyn SerializationWriter + '_ {
    /// Writes a collection of strings.
    pub fn write_collection_of_string_values<S: AsRef<str>>(
        &mut self,
        key: Option<&str>,
        values: Option<&[S]>,
    ) -> Result<(), SerializationError> {
        let values = values.map(|values| {
            values
                .iter()
                .map(|v| PrimitiveValue::String(v.as_ref().to_owned()))
                .collect::<Vec<_>>()
        });
        self.write_collection_of_primitive_values(key, values.as_deref())
    }

    /// Writes a homogeneous collection of models.
    pub fn write_collection_of_object_values_of<T: Parsable>(
        &mut self,
        key: Option<&str>,
        values: Option<&[T]>,
    ) -> Result<(), SerializationError> {
        let values = values.map(|values| {
            values
                .iter()
                .map(|v| v as &dyn Parsable)
                .collect::<Vec<_>>()
        });
        self.write_collection_of_object_values(key, values.as_deref())
    }

    /// Writes an enum-like value through its string form.
    pub fn write_enum_value<T: std::fmt::Display>(
        &mut self,
        key: Option<&str>,
        value: Option<&T>,
    ) -> Result<(), SerializationError> {
        let value = value.map(ToString::to_string);
        self.write_string_value(key, value.as_deref())
    }
}

/// Validates a write key: `None` (root or collection element) or non-empty.
pub fn validate_key(key: Option<&str>) -> Result<(), SerializationError> {
    match key {
        Some("") => Err(SerializationError::EmptyKey),
        _ => Ok(()),
    }
}
