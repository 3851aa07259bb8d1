//! Shared value types for the serialization contracts.
//!
//! These types are the runtime's vocabulary for data whose shape is only known
//! at run time: schema-unknown fields ([`UntypedValue`], [`AdditionalData`]),
//! scalars selected by a runtime type name ([`PrimitiveType`],
//! [`PrimitiveValue`]), and the shape a request adapter call decodes
//! ([`ResponseShape`]).

use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use crate::SerializationError;

// ---------------------------------------------------------------------------
// Untyped values
// ---------------------------------------------------------------------------

/// A schema-less value as found in a payload.
///
/// Used for additional data: fields a model does not declare are captured as
/// `UntypedValue`s so they survive a deserialize/serialize round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum UntypedValue {
    /// An explicit null.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number without a fractional part that fits in an `i64`.
    Integer(i64),
    /// Any other number.
    Float(f64),
    /// A string.
    String(String),
    /// An ordered list of values.
    Array(Vec<UntypedValue>),
    /// A nested object.
    Object(AdditionalData),
}

impl UntypedValue {
    /// Short name of the value's shape, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            UntypedValue::Null => "null",
            UntypedValue::Bool(_) => "bool",
            UntypedValue::Integer(_) => "integer",
            UntypedValue::Float(_) => "float",
            UntypedValue::String(_) => "string",
            UntypedValue::Array(_) => "array",
            UntypedValue::Object(_) => "object",
        }
    }

    /// Returns `true` for [`UntypedValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, UntypedValue::Null)
    }
}

impl From<bool> for UntypedValue {
    fn from(value: bool) -> Self {
        UntypedValue::Bool(value)
    }
}

impl From<i64> for UntypedValue {
    fn from(value: i64) -> Self {
        UntypedValue::Integer(value)
    }
}

impl From<i32> for UntypedValue {
    fn from(value: i32) -> Self {
        UntypedValue::Integer(i64::from(value))
    }
}

impl From<f64> for UntypedValue {
    fn from(value: f64) -> Self {
        UntypedValue::Float(value)
    }
}

impl From<&str> for UntypedValue {
    fn from(value: &str) -> Self {
        UntypedValue::String(value.to_owned())
    }
}

impl From<String> for UntypedValue {
    fn from(value: String) -> Self {
        UntypedValue::String(value)
    }
}

impl From<Vec<UntypedValue>> for UntypedValue {
    fn from(values: Vec<UntypedValue>) -> Self {
        UntypedValue::Array(values)
    }
}

impl From<AdditionalData> for UntypedValue {
    fn from(data: AdditionalData) -> Self {
        UntypedValue::Object(data)
    }
}

// ---------------------------------------------------------------------------

/// Insertion-ordered bag of schema-unknown fields.
///
/// Keys are unique: inserting an existing key replaces its value in place,
/// keeping the key's original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdditionalData {
    entries: Vec<(String, UntypedValue)>,
}

impl AdditionalData {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous value for `key` if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<UntypedValue>,
    ) -> Option<UntypedValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&UntypedValue> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<UntypedValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bag holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UntypedValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>, V: Into<UntypedValue>> FromIterator<(K, V)> for AdditionalData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = AdditionalData::new();
        for (key, value) in iter {
            data.insert(key, value);
        }
        data
    }
}

impl IntoIterator for AdditionalData {
    type Item = (String, UntypedValue);
    type IntoIter = std::vec::IntoIter<(String, UntypedValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Primitive types
// ---------------------------------------------------------------------------

/// Scalar types a caller can request by runtime type name.
///
/// Used by primitive and primitive-collection responses, where the generated
/// code only knows the expected scalar type as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// UTF-8 string.
    String,
    /// Boolean.
    Bool,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// Timestamp with offset.
    Time,
    /// UUID.
    Uuid,
    /// Opaque byte array.
    Bytes,
}

impl PrimitiveType {
    /// Every supported type, in declaration order.
    pub const ALL: [PrimitiveType; 9] = [
        PrimitiveType::String,
        PrimitiveType::Bool,
        PrimitiveType::Float32,
        PrimitiveType::Float64,
        PrimitiveType::Int32,
        PrimitiveType::Int64,
        PrimitiveType::Time,
        PrimitiveType::Uuid,
        PrimitiveType::Bytes,
    ];

    /// Resolves a runtime type name.
    ///
    /// Accepts the canonical names returned by [`PrimitiveType::name`], the
    /// equivalent Rust type names (`String`, `f32`, `i64`, `DateTime`, `Uuid`,
    /// ...), and the `Time` / `UUID` spellings used by generated clients.
    /// Matching is case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let ty = match name {
            "string" | "String" => PrimitiveType::String,
            "bool" | "boolean" => PrimitiveType::Bool,
            "float32" | "f32" => PrimitiveType::Float32,
            "float64" | "f64" | "double" => PrimitiveType::Float64,
            "int32" | "i32" => PrimitiveType::Int32,
            "int64" | "i64" => PrimitiveType::Int64,
            "time" | "Time" | "DateTime" => PrimitiveType::Time,
            "uuid" | "UUID" | "Uuid" => PrimitiveType::Uuid,
            "bytes" | "byte[]" => PrimitiveType::Bytes,
            _ => return None,
        };
        Some(ty)
    }

    /// Canonical runtime name of the type.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Bool => "bool",
            PrimitiveType::Float32 => "float32",
            PrimitiveType::Float64 => "float64",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::Time => "time",
            PrimitiveType::Uuid => "uuid",
            PrimitiveType::Bytes => "bytes",
        }
    }
}

impl FromStr for PrimitiveType {
    type Err = SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrimitiveType::from_name(s).ok_or_else(|| SerializationError::UnsupportedPrimitiveType {
            type_name: s.to_owned(),
        })
    }
}

impl std::fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ---------------------------------------------------------------------------

/// One decoded scalar of a [`PrimitiveType`].
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    /// UTF-8 string.
    String(String),
    /// Boolean.
    Bool(bool),
    /// 32-bit float.
    Float32(f32),
    /// 64-bit float.
    Float64(f64),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// Timestamp with offset.
    Time(DateTime<FixedOffset>),
    /// UUID.
    Uuid(Uuid),
    /// Opaque byte array.
    Bytes(Vec<u8>),
}

impl PrimitiveValue {
    /// The type of this value.
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            PrimitiveValue::String(_) => PrimitiveType::String,
            PrimitiveValue::Bool(_) => PrimitiveType::Bool,
            PrimitiveValue::Float32(_) => PrimitiveType::Float32,
            PrimitiveValue::Float64(_) => PrimitiveType::Float64,
            PrimitiveValue::Int32(_) => PrimitiveType::Int32,
            PrimitiveValue::Int64(_) => PrimitiveType::Int64,
            PrimitiveValue::Time(_) => PrimitiveType::Time,
            PrimitiveValue::Uuid(_) => PrimitiveType::Uuid,
            PrimitiveValue::Bytes(_) => PrimitiveType::Bytes,
        }
    }
}

impl std::fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimitiveValue::String(v) => write!(f, "{v}"),
            PrimitiveValue::Bool(v) => write!(f, "{v}"),
            PrimitiveValue::Float32(v) => write!(f, "{v}"),
            PrimitiveValue::Float64(v) => write!(f, "{v}"),
            PrimitiveValue::Int32(v) => write!(f, "{v}"),
            PrimitiveValue::Int64(v) => write!(f, "{v}"),
            PrimitiveValue::Time(v) => write!(f, "{}", v.to_rfc3339()),
            PrimitiveValue::Uuid(v) => write!(f, "{v}"),
            PrimitiveValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

/// The shape a request adapter call decodes its response into.
///
/// Not stored anywhere; a call-site choice recorded in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseShape {
    /// A single model.
    Object,
    /// A collection of models.
    Collection,
    /// A single scalar selected by type name.
    Primitive,
    /// A collection of scalars selected by type name.
    PrimitiveCollection,
    /// No content is decoded.
    NoContent,
}

impl std::fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResponseShape::Object => "object",
            ResponseShape::Collection => "collection",
            ResponseShape::Primitive => "primitive",
            ResponseShape::PrimitiveCollection => "primitive_collection",
            ResponseShape::NoContent => "no_content",
        };
        write!(f, "{name}")
    }
}
