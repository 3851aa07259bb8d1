//! The capability every model exposes to the codecs.

use crate::serialization::{ParseNode, SerializationWriter};
use crate::{AdditionalData, SerializationError, UntypedValue};

/// A model that can be populated from a [`ParseNode`] and written to a
/// [`SerializationWriter`].
///
/// Models are constructed empty (via `Default` or a caller-supplied
/// constructor) and then filled field by field. Implementors only describe
/// their own fields; walking the payload and routing unknown fields is done by
/// the provided [`Parsable::deserialize`].
///
/// # Example
///
/// ```
/// use abstractions::{
///     AdditionalData, Parsable, ParseNode, SerializationError, SerializationWriter,
/// };
///
/// #[derive(Debug, Default)]
/// struct Team {
///     name: Option<String>,
///     additional_data: AdditionalData,
/// }
///
/// impl Parsable for Team {
///     fn deserialize_field(
///         &mut self,
///         name: &str,
///         node: &dyn ParseNode,
///     ) -> Result<bool, SerializationError> {
///         match name {
///             "name" => self.name = node.get_string_value()?,
///             _ => return Ok(false),
///         }
///         Ok(true)
///     }
///
///     fn additional_data_mut(&mut self) -> Option<&mut AdditionalData> {
///         Some(&mut self.additional_data)
///     }
///
///     fn serialize(
///         &self,
///         writer: &mut dyn SerializationWriter,
///     ) -> Result<(), SerializationError> {
///         writer.write_string_value(Some("name"), self.name.as_deref())?;
///         writer.write_additional_data(&self.additional_data)
///     }
/// }
/// ```
pub trait Parsable: Send + Sync {
    /// Reads one field from `node`.
    ///
    /// Returns `Ok(false)` when the model does not declare a field called
    /// `name`, so the caller can treat it as additional data.
    fn deserialize_field(
        &mut self,
        name: &str,
        node: &dyn ParseNode,
    ) -> Result<bool, SerializationError>;

    /// Writes every field of the model (including additional data) to
    /// `writer`, at the writer's current object level.
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<(), SerializationError>;

    /// The model's bag for fields not declared by its schema.
    ///
    /// Models without a bag keep the default, and unknown fields are dropped.
    fn additional_data_mut(&mut self) -> Option<&mut AdditionalData> {
        None
    }

    /// Populates the model from an object node.
    ///
    /// Every member of `node` is offered to [`Parsable::deserialize_field`];
    /// members it declines are stored in the additional-data bag, when the
    /// model has one.
    fn deserialize(&mut self, node: &dyn ParseNode) -> Result<(), SerializationError> {
        for name in node.field_names() {
            let child = node.get_child_node(&name)?;
            if self.deserialize_field(&name, child.as_ref())? {
                continue;
            }
            if let Some(bag) = self.additional_data_mut() {
                let value = child.get_untyped_value()?.unwrap_or(UntypedValue::Null);
                bag.insert(name, value);
            }
        }
        Ok(())
    }
}
