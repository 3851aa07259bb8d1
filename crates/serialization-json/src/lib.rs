//! JSON codec for the client runtime.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Implements the `abstractions` serialization ports for
//! `application/json` on top of `serde_json`. Nothing outside this crate knows
//! the payload is JSON; callers select it through the codec registries.
//!
//! ## Wire mapping
//!
//! | Runtime type | JSON |
//! |--------------|------|
//! | string, bool, integers, floats | native JSON scalars |
//! | time | RFC 3339 string |
//! | uuid | hyphenated string |
//! | bytes | standard base64 string |
//! | additional data | members of the enclosing object, in insertion order |

mod parse_node;
mod writer;

pub use parse_node::{JsonParseNode, JsonParseNodeFactory};
pub use writer::{JsonSerializationWriter, JsonSerializationWriterFactory};

/// The media type handled by this codec.
pub const JSON_CONTENT_TYPE: &str = "application/json";
