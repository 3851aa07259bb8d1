//! Format-agnostic serialization contracts.
//!
//! | Item | Role |
//! |------|------|
//! | [`Parsable`] | Capability every model exposes |
//! | [`ParseNode`] | Read-only cursor over a parsed payload |
//! | [`SerializationWriter`] | Write-only sink producing a payload |
//! | [`ParseNodeFactory`] / [`SerializationWriterFactory`] | Per-codec constructors |
//! | [`ParseNodeFactoryRegistry`] / [`SerializationWriterFactoryRegistry`] | Content-type dispatch |
//!
//! Concrete codecs (JSON, text, ...) live in their own crates and implement
//! these traits; nothing here knows about a particular wire format.

mod factory;
mod parsable;
mod parse_node;
mod serialization_writer;

pub use factory::{
    ensure_content_type, ParseNodeFactory, ParseNodeFactoryRegistry, SerializationWriterFactory,
    SerializationWriterFactoryRegistry,
};
pub use parsable::Parsable;
pub use parse_node::{read_primitive, NodeKind, ParseNode};
pub use serialization_writer::{validate_key, SerializationWriter};
